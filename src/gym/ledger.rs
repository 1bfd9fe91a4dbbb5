use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::{
    data::domain::Price,
    error::{SimError, TraderResult},
    gym::SkipReason,
};

/// Upper bound on simultaneously open positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PositionLimit {
    #[default]
    Unbounded,
    Bounded(usize),
}

impl PositionLimit {
    pub fn allows(&self, open: usize) -> bool {
        match self {
            PositionLimit::Unbounded => true,
            PositionLimit::Bounded(max) => open < *max,
        }
    }
}

impl From<Option<usize>> for PositionLimit {
    fn from(value: Option<usize>) -> Self {
        value.map_or(PositionLimit::Unbounded, PositionLimit::Bounded)
    }
}

/// Result of [`PositionLedger::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    Skipped(SkipReason),
}

/// FIFO queue of open long positions, each represented by its entry price.
///
/// Owned by exactly one simulator pass. Sells always close the oldest
/// position regardless of price, and the number of open positions never
/// exceeds the configured [`PositionLimit`].
#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    positions: VecDeque<Price>,
    limit: PositionLimit,
}

impl PositionLedger {
    pub fn new(limit: PositionLimit) -> Self {
        Self {
            positions: VecDeque::new(),
            limit,
        }
    }

    /// Opens a position at `price` unless the ledger is at capacity.
    pub fn open(&mut self, price: Price) -> OpenOutcome {
        if !self.limit.allows(self.positions.len()) {
            return OpenOutcome::Skipped(SkipReason::AtCapacity);
        }
        self.positions.push_back(price);
        OpenOutcome::Opened
    }

    /// Closes the earliest opened position and returns its entry price.
    pub fn close_oldest(&mut self) -> TraderResult<Price> {
        self.positions
            .pop_front()
            .ok_or_else(|| SimError::LedgerEmpty.into())
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Maximum number of open positions, `None` when unbounded.
    pub fn capacity(&self) -> Option<usize> {
        match self.limit {
            PositionLimit::Unbounded => None,
            PositionLimit::Bounded(max) => Some(max),
        }
    }
}
