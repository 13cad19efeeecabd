//! ADC0 with a queue of conversion results

use std::collections::VecDeque;

use cip51_hal::adc::AdcSampler;

/// ADC0 model
///
/// Each [`SimAdc::convert`] stands for one timer-triggered conversion: it
/// latches the next queued sample and sets `AD0INT`. When the queue runs
/// dry the last value repeats, like a steady input voltage.
#[derive(Debug, Default)]
pub struct SimAdc {
    queue: VecDeque<u16>,
    result: u16,
    ad0int: bool,
    conversions: u64,
}

impl SimAdc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue input samples
    pub fn feed(&mut self, samples: impl IntoIterator<Item = u16>) {
        self.queue.extend(samples);
    }

    /// Run one conversion
    pub fn convert(&mut self) {
        if let Some(sample) = self.queue.pop_front() {
            self.result = sample;
        }
        self.ad0int = true;
        self.conversions += 1;
    }

    /// `AD0INT`
    pub fn conversion_complete(&self) -> bool {
        self.ad0int
    }

    pub fn conversions(&self) -> u64 {
        self.conversions
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl AdcSampler for SimAdc {
    fn read_sample(&mut self) -> u16 {
        self.result
    }

    fn clear_conversion_complete(&mut self) {
        self.ad0int = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_last_value() {
        let mut adc = SimAdc::new();
        adc.feed([5, 6]);
        adc.convert();
        assert!(adc.conversion_complete());
        assert_eq!(adc.read_sample(), 5);
        adc.clear_conversion_complete();
        assert!(!adc.conversion_complete());
        adc.convert();
        adc.convert();
        assert_eq!(adc.read_sample(), 6);
        assert_eq!(adc.conversions(), 3);
    }
}
