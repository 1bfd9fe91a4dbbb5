use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::{Price, StockId},
    error::{DataError, SimError, TraderResult},
};

/// An ordered, immutable sequence of prices for a single instrument.
///
/// The simulator only ever reads from a series; ownership stays with the caller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    id: StockId,
    prices: Vec<Price>,
}

impl PriceSeries {
    pub fn new(id: impl Into<StockId>, prices: Vec<Price>) -> Self {
        Self {
            id: id.into(),
            prices,
        }
    }

    pub fn from_f64(id: impl Into<StockId>, prices: impl IntoIterator<Item = f64>) -> Self {
        Self::new(id, prices.into_iter().map(Price).collect())
    }

    pub fn id(&self) -> &StockId {
        &self.id
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn get(&self, t: usize) -> Option<Price> {
        self.prices.get(t).copied()
    }

    pub fn as_slice(&self) -> &[Price] {
        &self.prices
    }

    /// Number of timesteps an episode iterates over.
    ///
    /// The last price only ever feeds the final `next_state`, so a series of
    /// `N` prices yields `N - 1` actionable timesteps.
    pub fn data_length(&self) -> usize {
        self.prices.len().saturating_sub(1)
    }

    /// Difference between the first two prices.
    ///
    /// Used by reporting to recognise a validation profit that equals what a
    /// single buy-at-open / sell-next-step trade would have earned.
    pub fn initial_offset(&self) -> TraderResult<Price> {
        match (self.get(0), self.get(1)) {
            (Some(first), Some(second)) => Ok(second - first),
            _ => Err(DataError::SeriesTooShort {
                purpose: "initial offset",
                required: 2,
                actual: self.len(),
            }
            .into()),
        }
    }

    /// Splits the series at `ratio * len` into a training and a validation part.
    ///
    /// Both halves keep the parent's identifier with a `#train` / `#val` suffix.
    pub fn split(&self, ratio: f64) -> TraderResult<(PriceSeries, PriceSeries)> {
        if !(ratio > 0.0 && ratio < 1.0) {
            return Err(
                SimError::InvalidConfig(format!("split ratio {ratio} is not in (0, 1)")).into(),
            );
        }
        let at = (ratio * self.len() as f64) as usize;
        let (train, val) = self.prices.split_at(at);
        Ok((
            PriceSeries::new(StockId(format!("{}#train", self.id)), train.to_vec()),
            PriceSeries::new(StockId(format!("{}#val", self.id)), val.to_vec()),
        ))
    }
}

impl Index<usize> for PriceSeries {
    type Output = Price;

    fn index(&self, index: usize) -> &Self::Output {
        &self.prices[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(len: usize) -> PriceSeries {
        PriceSeries::from_f64("TEST", (0..len).map(|i| 100.0 + i as f64))
    }

    #[test]
    fn test_data_length_excludes_last_price() {
        assert_eq!(series(10).data_length(), 9);
        assert_eq!(series(1).data_length(), 0);
        assert_eq!(series(0).data_length(), 0);
    }

    #[test]
    fn test_split_eighty_twenty() {
        let (train, val) = series(10).split(0.8).expect("valid split");
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert_eq!(val[0], Price(108.0));
        assert_eq!(train.id().0, "TEST#train");
        assert_eq!(val.id().0, "TEST#val");
    }

    #[test]
    fn test_split_rejects_out_of_range_ratio() {
        assert!(series(10).split(0.0).is_err());
        assert!(series(10).split(1.0).is_err());
        assert!(series(10).split(f64::NAN).is_err());
    }

    #[test]
    fn test_initial_offset() {
        let s = PriceSeries::from_f64("X", [10.0, 12.5, 11.0]);
        assert_eq!(s.initial_offset().expect("two prices"), Price(2.5));
        assert!(PriceSeries::from_f64("X", [10.0]).initial_offset().is_err());
    }
}
