use std::{fmt, path::Path};

use serde::{Deserialize, Serialize};

use crate::{impl_abs_primitive, impl_arithmetic_primitive, impl_from_primitive};

/// Represents a price level in the quote currency.
///
/// Used for: series entries, position entry prices and sell prices.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Price(pub f64);
impl_from_primitive!(Price, f64);
impl_arithmetic_primitive!(Price, f64);
impl_abs_primitive!(Price, f64);

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Human readable identifier of a price source (ticker or CSV path).
///
/// Carried through to reporting and notifications so failures can be traced
/// back to the data they were trained on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct StockId(pub String);

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl StockId {
    /// File stem of `path`, or the whole path when it has none.
    pub fn from_path(path: &Path) -> Self {
        path.file_stem()
            .and_then(|s| s.to_str())
            .map(StockId::from)
            .unwrap_or_else(|| StockId(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_arithmetic() {
        let mut total = Price(10.0) + Price(2.5);
        assert_eq!(total, Price(12.5));

        total -= Price(20.0);
        assert_eq!(total, Price(-7.5));
        assert_eq!(total.abs(), Price(7.5));
        assert_eq!(Price(1.0) + 0.5, Price(1.5));
    }

    #[test]
    fn test_stock_id_from_path() {
        assert_eq!(
            StockId::from_path(Path::new("data/GOOG_2018.csv")),
            StockId::from("GOOG_2018")
        );
        assert_eq!(StockId::from_path(Path::new("..")), StockId::from(".."));
    }

    #[test]
    fn test_price_sum_and_display() {
        let sum: Price = [Price(1.0), Price(2.0), Price(3.25)].into_iter().sum();
        assert_eq!(sum.to_string(), "6.25");
    }
}
