use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    data::state::State,
    error::{AgentError, TraderResult},
};

/// Half-width of the uniform interval used to initialise weights.
const INIT_SCALE: f64 = 0.1;

/// Linear action-value function `Q(s) = W s + b`.
///
/// Fitted with mini-batch gradient descent on the Huber loss (delta = 1),
/// averaged over every entry of the target matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearQ {
    /// `action_size x state_size`
    weights: Array2<f64>,
    bias: Array1<f64>,
}

impl LinearQ {
    pub fn new<R: Rng + ?Sized>(state_size: usize, action_size: usize, rng: &mut R) -> Self {
        let weights = Array2::from_shape_fn((action_size, state_size), |_| {
            rng.random_range(-INIT_SCALE..INIT_SCALE)
        });
        Self {
            weights,
            bias: Array1::zeros(action_size),
        }
    }

    pub fn state_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn action_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn predict(&self, state: &State) -> TraderResult<Array1<f64>> {
        self.check_input(state.len())?;
        Ok(self.forward(state.as_array().view()))
    }

    fn forward(&self, x: ArrayView1<f64>) -> Array1<f64> {
        self.weights.dot(&x) + &self.bias
    }

    /// One gradient step on `inputs` (`batch x state_size`) against `targets`
    /// (`batch x action_size`). Returns the loss before the step.
    pub fn fit(
        &mut self,
        inputs: &Array2<f64>,
        targets: &Array2<f64>,
        learning_rate: f64,
    ) -> TraderResult<f64> {
        self.check_input(inputs.ncols())?;
        if targets.dim() != (inputs.nrows(), self.action_size()) {
            return Err(AgentError::InvalidInput(format!(
                "target shape {:?} does not match batch of {} x {} actions",
                targets.dim(),
                inputs.nrows(),
                self.action_size()
            ))
            .into());
        }
        if inputs.nrows() == 0 {
            return Err(AgentError::InvalidInput("empty training batch".to_string()).into());
        }

        let predictions = inputs.dot(&self.weights.t()) + &self.bias;
        let error = predictions - targets;
        let n = error.len() as f64;

        let loss = error.mapv(huber).sum() / n;
        if !loss.is_finite() {
            return Err(AgentError::Training(format!("non-finite loss {loss}")).into());
        }

        let grad = error.mapv(|e| e.clamp(-1.0, 1.0) / n);
        let grad_w = grad.t().dot(inputs);
        let grad_b = grad.sum_axis(Axis(0));

        self.weights.scaled_add(-learning_rate, &grad_w);
        self.bias.scaled_add(-learning_rate, &grad_b);
        Ok(loss)
    }

    fn check_input(&self, len: usize) -> TraderResult<()> {
        if len != self.state_size() {
            return Err(AgentError::InvalidInput(format!(
                "state has {len} features, model expects {}",
                self.state_size()
            ))
            .into());
        }
        Ok(())
    }
}

fn huber(e: f64) -> f64 {
    let a = e.abs();
    if a <= 1.0 { 0.5 * e * e } else { a - 0.5 }
}

/// Index of the first maximum, `0` for an empty vector.
pub fn argmax(values: &Array1<f64>) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best, best_v), (i, &v)| {
            if v > best_v { (i, v) } else { (best, best_v) }
        })
        .0
}

#[cfg(test)]
mod tests {
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::error::TraderError;

    fn zeros(state_size: usize, action_size: usize) -> LinearQ {
        LinearQ {
            weights: Array2::zeros((action_size, state_size)),
            bias: Array1::zeros(action_size),
        }
    }

    #[test]
    fn test_predict_shape_and_bias() {
        let q = zeros(4, 3);
        let out = q
            .predict(&State::from(vec![0.5; 4]))
            .expect("matching input");
        assert_eq!(out, array![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_wrong_input_size_is_rejected() {
        let q = zeros(4, 3);
        assert!(matches!(
            q.predict(&State::from(vec![0.5; 3])),
            Err(TraderError::Agent(AgentError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_fit_reduces_loss() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut q = LinearQ::new(2, 3, &mut rng);
        let inputs = array![[1.0, 0.0], [0.0, 1.0], [0.5, 0.5]];
        let targets = array![[1.0, 0.0, -1.0], [0.0, 2.0, 0.0], [0.5, 1.0, -0.5]];

        let first = q.fit(&inputs, &targets, 0.5).expect("fit");
        let mut last = first;
        for _ in 0..200 {
            last = q.fit(&inputs, &targets, 0.5).expect("fit");
        }
        assert!(last < first, "loss should fall: {first} -> {last}");
    }

    #[test]
    fn test_huber_is_quadratic_then_linear() {
        assert_eq!(huber(0.5), 0.125);
        assert_eq!(huber(-3.0), 2.5);
    }

    #[test]
    fn test_argmax_prefers_first_maximum() {
        assert_eq!(argmax(&array![1.0, 3.0, 3.0]), 1);
        assert_eq!(argmax(&array![0.0, 0.0, 0.0]), 0);
        assert_eq!(argmax(&array![-1.0, -5.0, -0.5]), 2);
    }
}
