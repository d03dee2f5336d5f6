//! Injectable uniform random sources

use parking_lot::Mutex;
use rand::Rng;

/// Uniform source of die faces
pub trait RandomSource: Send + Sync {
    /// A value uniformly distributed over `[1, sides]`
    fn roll(&self, sides: u32) -> u32;
}

/// Thread-local OS-seeded generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll(&self, sides: u32) -> u32 {
        if sides == 0 {
            return 0;
        }
        rand::rng().random_range(1..=sides)
    }
}

/// Replays a fixed sequence of faces, cycling when exhausted.
///
/// A queued value larger than `sides` wraps into range, so one script can
/// drive dice of different sizes.
#[derive(Debug)]
pub struct SequenceRandom {
    state: Mutex<(Vec<u32>, usize)>,
}

impl SequenceRandom {
    /// Replay `values` in order
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    #[must_use]
    pub fn new(values: Vec<u32>) -> Self {
        assert!(!values.is_empty(), "SequenceRandom needs at least one value");
        Self {
            state: Mutex::new((values, 0)),
        }
    }
}

impl RandomSource for SequenceRandom {
    fn roll(&self, sides: u32) -> u32 {
        let mut state = self.state.lock();
        let (values, cursor) = &mut *state;
        if sides == 0 {
            return 0;
        }
        let raw = values[*cursor % values.len()];
        *cursor += 1;
        (raw.max(1) - 1) % sides + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_range() {
        let rng = ThreadRandom;
        for _ in 0..1_000 {
            let v = rng.roll(6);
            assert!((1..=6).contains(&v));
        }
    }

    #[test]
    fn sequence_replays_and_cycles() {
        let rng = SequenceRandom::new(vec![3, 1, 6]);
        let faces: Vec<u32> = (0..5).map(|_| rng.roll(6)).collect();
        assert_eq!(faces, vec![3, 1, 6, 3, 1]);
    }

    #[test]
    #[should_panic(expected = "at least one value")]
    fn sequence_rejects_empty_script() {
        let _ = SequenceRandom::new(Vec::new());
    }

    #[test]
    fn sequence_wraps_values_larger_than_the_die() {
        let rng = SequenceRandom::new(vec![20, 7]);
        assert_eq!(rng.roll(6), 2);
        assert_eq!(rng.roll(6), 1);
    }
}
