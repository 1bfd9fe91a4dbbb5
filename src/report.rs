use crate::{
    data::domain::Price,
    gym::{Reward, eval::EvaluationResult, train::EpisodeResult},
};

/// Formats an absolute amount as `$1234.56`.
pub fn format_currency(price: impl Into<f64>) -> String {
    format!("${:.2}", price.into().abs())
}

/// Formats a signed amount as `+$1.23` / `-$1.23`.
pub fn format_position(delta: impl Into<f64>) -> String {
    let value: f64 = delta.into();
    let sign = if value < 0.0 { "-" } else { "+" };
    format!("{sign}${:.2}", value.abs())
}

/// One line summary of a training episode and the validation pass that followed it.
///
/// The validation result is printed as `USELESS` when it equals the initial
/// offset of the validation series or zero: both mean the agent did nothing
/// worth measuring.
pub fn train_result_line(
    train: &EpisodeResult,
    validation: &EvaluationResult,
    initial_offset: Price,
) -> String {
    let loss = train
        .mean_loss
        .map_or_else(|| "n/a".to_string(), |loss| format!("{loss:.4}"));

    let val_profit = validation.total_profit;
    let val_position = if is_useless(val_profit, initial_offset) {
        "USELESS".to_string()
    } else {
        format_position(val_profit)
    };

    format!(
        "Episode {}/{} - Train Position: {}  Val Position: {}  Train Loss: {}",
        train.episode,
        train.episode_count,
        format_position(train.total_profit),
        val_position,
        loss
    )
}

/// Logs the per-episode summary line and returns it.
pub fn show_train_result(
    train: &EpisodeResult,
    validation: &EvaluationResult,
    initial_offset: Price,
) -> String {
    let line = train_result_line(train, validation, initial_offset);
    tracing::info!(
        episode = train.episode,
        train_profit = train.total_profit.0,
        val_profit = validation.total_profit.0,
        mean_loss = train.mean_loss,
        "{line}"
    );
    line
}

fn is_useless(val_profit: Reward, initial_offset: Price) -> bool {
    val_profit.0 == initial_offset.0 || val_profit.0 == 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(total_profit: f64, mean_loss: Option<f64>) -> EpisodeResult {
        EpisodeResult {
            episode: 3,
            episode_count: 10,
            total_profit: Reward(total_profit),
            mean_loss,
            updates: 0,
        }
    }

    fn validation(total_profit: f64) -> EvaluationResult {
        EvaluationResult {
            total_profit: Reward(total_profit),
            history: Vec::new(),
        }
    }

    #[test]
    fn test_format_currency_and_position() {
        assert_eq!(format_currency(Price(1234.5)), "$1234.50");
        assert_eq!(format_currency(Price(-3.0)), "$3.00");
        assert_eq!(format_position(Price(1.234)), "+$1.23");
        assert_eq!(format_position(Reward(-0.5)), "-$0.50");
        assert_eq!(format_position(0.0), "+$0.00");
    }

    #[test]
    fn test_result_line_with_loss() {
        let line = train_result_line(&episode(12.5, Some(0.123456)), &validation(-4.0), Price(1.0));
        assert_eq!(
            line,
            "Episode 3/10 - Train Position: +$12.50  Val Position: -$4.00  Train Loss: 0.1235"
        );
    }

    #[test]
    fn test_result_line_marks_useless_validation() {
        let line = train_result_line(&episode(1.0, None), &validation(2.5), Price(2.5));
        assert!(line.contains("Val Position: USELESS"));
        assert!(line.ends_with("Train Loss: n/a"));

        let line = train_result_line(&episode(1.0, None), &validation(0.0), Price(2.5));
        assert!(line.contains("Val Position: USELESS"));
    }
}
