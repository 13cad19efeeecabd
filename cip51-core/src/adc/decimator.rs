//! Integrate-and-dump decimation

use core::num::NonZeroU16;

/// Accumulates N samples and reports their integer mean
///
/// The accumulator is a `u32`: 65535 samples of 65535 still fit, so no
/// count/width combination the constructor accepts can overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Decimator {
    count: NonZeroU16,
    accumulator: u32,
    taken: u16,
}

impl Decimator {
    pub const fn new(count: NonZeroU16) -> Self {
        Self {
            count,
            accumulator: 0,
            taken: 0,
        }
    }

    /// Add one sample; returns the mean when the N-th sample arrives
    ///
    /// The accumulator and sample count are zero again on return.
    pub fn push(&mut self, sample: u16) -> Option<u16> {
        self.accumulator += sample as u32;
        self.taken += 1;
        if self.taken < self.count.get() {
            return None;
        }
        let mean = self.accumulator / self.count.get() as u32;
        self.reset();
        Some(mean as u16)
    }

    /// Running sum of the current batch
    pub fn accumulated(&self) -> u32 {
        self.accumulator
    }

    /// Samples in the current batch
    pub fn taken(&self) -> u16 {
        self.taken
    }

    pub fn count(&self) -> u16 {
        self.count.get()
    }

    /// Drop the current batch
    pub fn reset(&mut self) {
        self.accumulator = 0;
        self.taken = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn decimator(n: u16) -> Decimator {
        Decimator::new(NonZeroU16::new(n).unwrap())
    }

    #[test]
    fn test_reports_on_nth_sample() {
        let mut d = decimator(4);
        assert_eq!(d.push(10), None);
        assert_eq!(d.push(20), None);
        assert_eq!(d.push(30), None);
        assert_eq!(d.push(41), Some(25));
        assert_eq!(d.accumulated(), 0);
        assert_eq!(d.taken(), 0);
    }

    #[test]
    fn test_full_scale_does_not_overflow() {
        let mut d = decimator(u16::MAX);
        for _ in 0..u16::MAX - 1 {
            assert_eq!(d.push(u16::MAX), None);
        }
        assert_eq!(d.push(u16::MAX), Some(u16::MAX));
    }

    #[test]
    fn test_single_sample_passthrough() {
        let mut d = decimator(1);
        assert_eq!(d.push(777), Some(777));
        assert_eq!(d.push(3), Some(3));
    }

    proptest! {
        #[test]
        fn prop_mean_of_batch(samples in prop::collection::vec(0u16..4096, 1..300)) {
            let n = samples.len() as u16;
            let mut d = decimator(n);
            let (last, head) = samples.split_last().unwrap();
            for &s in head {
                prop_assert_eq!(d.push(s), None);
            }
            let sum: u32 = samples.iter().map(|&s| s as u32).sum();
            prop_assert_eq!(d.push(*last), Some((sum / n as u32) as u16));
            prop_assert_eq!(d.accumulated(), 0);
        }
    }
}
