use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::{
    data::series::PriceSeries,
    error::{SimError, TraderResult},
};

/// Fixed-size feature vector describing the market around one timestep.
///
/// Opaque to the simulator: it is only produced by a [`StateEncoder`] and handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State(pub Array1<f64>);

impl State {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.0
    }
}

impl From<Vec<f64>> for State {
    fn from(value: Vec<f64>) -> Self {
        Self(Array1::from(value))
    }
}

/// Turns a window of a price series into a [`State`].
///
/// Implementations must be deterministic: equal inputs give equal states.
pub trait StateEncoder {
    /// Encodes the window of `window_length` prices ending at index `t`.
    fn encode(&self, series: &PriceSeries, t: usize, window_length: usize) -> TraderResult<State>;

    /// Length of the vectors produced for a given `window_size`.
    ///
    /// The simulator always asks for `window_size + 1` prices.
    fn state_size(&self, window_size: usize) -> usize;
}

/// Encodes a window as the sigmoid of consecutive price differences.
///
/// Windows reaching before the start of the series are left-padded with the
/// first price, so early timesteps read as "no movement".
#[derive(Debug, Clone, Copy, Default)]
pub struct SigmoidWindowEncoder;

impl StateEncoder for SigmoidWindowEncoder {
    fn encode(&self, series: &PriceSeries, t: usize, window_length: usize) -> TraderResult<State> {
        let prices = series.as_slice();
        if t >= prices.len() {
            return Err(SimError::WindowOutOfRange {
                index: t,
                len: prices.len(),
            }
            .into());
        }

        let first = prices[0];
        let block: Vec<f64> = (0..window_length)
            .map(|i| {
                // Position of the i-th window element in the series, may be negative.
                let idx = t as isize - window_length as isize + 1 + i as isize;
                if idx < 0 { first.0 } else { prices[idx as usize].0 }
            })
            .collect();

        let features = block.windows(2).map(|w| sigmoid(w[1] - w[0])).collect::<Vec<_>>();
        Ok(State::from(features))
    }

    fn state_size(&self, window_size: usize) -> usize {
        window_size
    }
}

fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        // Same value, but avoids exp() overflow for large negative inputs.
        let e = x.exp();
        e / (1.0 + e)
    }
}
