use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::{AgentError, TraderResult},
    gym::Transition,
};

/// Default number of transitions kept for experience replay.
pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Bounded FIFO store of past transitions.
///
/// Once full, every new transition evicts the oldest one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayMemory {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl Default for ReplayMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_CAPACITY)
    }
}

impl ReplayMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(DEFAULT_MEMORY_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draws `batch_size` distinct transitions uniformly at random.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        batch_size: usize,
    ) -> TraderResult<Vec<&Transition>> {
        if batch_size > self.buffer.len() {
            return Err(AgentError::InvalidInput(format!(
                "cannot sample {batch_size} transitions from a memory of {}",
                self.buffer.len()
            ))
            .into());
        }
        Ok(rand::seq::index::sample(rng, self.buffer.len(), batch_size)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::{
        data::state::State,
        error::TraderError,
        gym::{Action, Reward},
    };

    fn transition(tag: f64) -> Transition {
        Transition {
            state: State::from(vec![tag]),
            action: Action::Hold,
            reward: Reward(tag),
            next_state: State::from(vec![tag + 1.0]),
            done: false,
        }
    }

    #[test]
    fn test_evicts_oldest_when_full() {
        let mut memory = ReplayMemory::new(3);
        for i in 0..5 {
            memory.push(transition(f64::from(i)));
        }

        assert_eq!(memory.len(), 3);
        let rewards: Vec<_> = memory.buffer.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, vec![Reward(2.0), Reward(3.0), Reward(4.0)]);
    }

    #[test]
    fn test_sample_is_distinct_and_sized() {
        let mut memory = ReplayMemory::default();
        for i in 0..50 {
            memory.push(transition(f64::from(i)));
        }
        let mut rng = StdRng::seed_from_u64(7);

        let batch = memory.sample(&mut rng, 32).expect("enough transitions");

        assert_eq!(batch.len(), 32);
        let mut tags: Vec<i64> = batch.iter().map(|t| t.reward.0 as i64).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), 32);
    }

    #[test]
    fn test_oversized_sample_is_rejected() {
        let mut memory = ReplayMemory::new(10);
        memory.push(transition(1.0));
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            memory.sample(&mut rng, 2),
            Err(TraderError::Agent(AgentError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut memory = ReplayMemory::new(0);
        memory.push(transition(1.0));
        assert!(memory.is_empty());
    }
}
