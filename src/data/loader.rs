use std::path::Path;

use polars::prelude::{DataType, LazyCsvReader, LazyFileListReader, PlPath, col};

use crate::{
    data::{
        domain::{Price, StockId},
        series::PriceSeries,
    },
    error::{DataError, TraderError, TraderResult},
};

/// Column holding split- and dividend-adjusted closing prices in Yahoo style exports.
pub const ADJ_CLOSE: &str = "Adj Close";

/// Loads a price series from the `Adj Close` column of a CSV file.
pub fn load_adj_close(path: &Path) -> TraderResult<PriceSeries> {
    load_column(path, ADJ_CLOSE)
}

/// Loads a single numeric column of a headered CSV file as a [`PriceSeries`].
///
/// The series is named after the file stem. Null cells are rejected rather than
/// filled, since a gap would silently shift every subsequent timestep.
#[tracing::instrument(skip_all, fields(path = %path.display(), column = %column))]
pub fn load_column(path: &Path, column: &str) -> TraderResult<PriceSeries> {
    let source_name = path.display().to_string();
    let path_str = path
        .to_str()
        .ok_or_else(|| DataError::DataFrame(format!("non UTF-8 path: {source_name}")))?;

    let mut lf = LazyCsvReader::new(PlPath::new(path_str))
        .with_has_header(true)
        .finish()
        .map_err(convert_err)?;

    let schema = lf.collect_schema().map_err(convert_err)?;
    if !schema.contains(column) {
        return Err(DataError::MissingColumn {
            column: column.to_string(),
            source_name,
        }
        .into());
    }

    let df = lf
        .select([col(column).cast(DataType::Float64)])
        .collect()
        .map_err(convert_err)?;

    let values = df
        .column(column)
        .map_err(convert_err)?
        .f64()
        .map_err(convert_err)?;

    let prices = values
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(Price).ok_or_else(|| DataError::NullPrice {
                row,
                source_name: source_name.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if prices.is_empty() {
        return Err(DataError::EmptySeries(source_name).into());
    }

    let id = StockId::from_path(path);

    tracing::debug!(stock = %id, rows = prices.len(), "Loaded price series");
    Ok(PriceSeries::new(id, prices))
}

fn convert_err(e: polars::error::PolarsError) -> TraderError {
    DataError::DataFrame(e.to_string()).into()
}
