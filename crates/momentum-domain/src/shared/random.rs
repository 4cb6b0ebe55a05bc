/// Uniform random source used for experiment bucketing and surprise rolls.
///
/// Only `next_f64` must be implemented; the helpers derive from it so a
/// scripted sequence fully determines every draw.
pub trait RandomSource: Send + Sync {
    /// Uniform value in `[0, 1)`
    fn next_f64(&self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Uniform integer in `min..=max`
    fn range_inclusive(&self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f64;
        let offset = (self.next_f64() * span) as i64;
        (min + offset).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Fixed(Mutex<Vec<f64>>);

    impl RandomSource for Fixed {
        fn next_f64(&self) -> f64 {
            self.0.lock().unwrap().remove(0)
        }
    }

    #[test]
    fn test_pick_index_bounds() {
        let rng = Fixed(Mutex::new(vec![0.0, 0.5, 0.999_999]));
        assert_eq!(rng.pick_index(3), 0);
        assert_eq!(rng.pick_index(3), 1);
        assert_eq!(rng.pick_index(3), 2);
    }

    #[test]
    fn test_range_inclusive_covers_both_ends() {
        let rng = Fixed(Mutex::new(vec![0.0, 0.999_999]));
        assert_eq!(rng.range_inclusive(10, 100), 10);
        assert_eq!(rng.range_inclusive(10, 100), 100);
        assert_eq!(rng.range_inclusive(5, 5), 5);
    }
}
