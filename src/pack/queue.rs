use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Hands out command indices without replacement.
///
/// In shuffled mode every pass over the pack is a fresh Fisher-Yates
/// permutation; once a pass is used up the next one is drawn.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    len: usize,
    shuffle: bool,
    pending: VecDeque<usize>,
    rng: StdRng,
}

impl CommandQueue {
    pub fn shuffled(len: usize) -> Self {
        Self::with_rng(len, true, StdRng::from_entropy())
    }

    /// Same as [`CommandQueue::shuffled`] with a reproducible order.
    pub fn seeded(len: usize, seed: u64) -> Self {
        Self::with_rng(len, true, StdRng::seed_from_u64(seed))
    }

    /// Pack order, repeating from the start once exhausted.
    pub fn sequential(len: usize) -> Self {
        Self::with_rng(len, false, StdRng::seed_from_u64(0))
    }

    fn with_rng(len: usize, shuffle: bool, rng: StdRng) -> Self {
        let mut queue = Self {
            len,
            shuffle,
            pending: VecDeque::with_capacity(len),
            rng,
        };
        queue.refill();
        queue
    }

    fn refill(&mut self) {
        let mut order: Vec<usize> = (0..self.len).collect();
        if self.shuffle {
            order.shuffle(&mut self.rng);
        }
        self.pending = order.into();
    }

    /// Next command index, or `None` for an empty pack.
    pub fn draw(&mut self) -> Option<usize> {
        if self.pending.is_empty() {
            self.refill();
        }
        self.pending.pop_front()
    }

    /// Commands left before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn pack_len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_each_pass_draws_every_command_once() {
        let mut queue = CommandQueue::seeded(10, 7);
        for _ in 0..3 {
            let pass: HashSet<usize> = (0..10).map(|_| queue.draw().unwrap()).collect();
            assert_eq!(pass.len(), 10);
            assert_eq!(queue.remaining(), 0);
        }
    }

    #[test]
    fn test_remaining_counts_down() {
        let mut queue = CommandQueue::shuffled(4);
        assert_eq!(queue.remaining(), 4);
        queue.draw();
        queue.draw();
        assert_eq!(queue.remaining(), 2);
    }

    #[test]
    fn test_seeded_queues_agree() {
        let mut a = CommandQueue::seeded(25, 42);
        let mut b = CommandQueue::seeded(25, 42);
        for _ in 0..60 {
            assert_eq!(a.draw(), b.draw());
        }
    }

    #[test]
    fn test_sequential_keeps_pack_order() {
        let mut queue = CommandQueue::sequential(3);
        let drawn: Vec<usize> = (0..7).filter_map(|_| queue.draw()).collect();
        assert_eq!(drawn, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_empty_pack_draws_nothing() {
        let mut queue = CommandQueue::shuffled(0);
        assert_eq!(queue.draw(), None);
        assert_eq!(queue.pack_len(), 0);
    }
}
