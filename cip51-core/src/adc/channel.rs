//! ADC end-of-conversion interrupt body

use core::num::NonZeroU16;

use cip51_hal::adc::AdcSampler;

use super::decimator::Decimator;
use crate::sync::{Mailbox, Shared};

/// State shared between the ADC interrupt and the foreground loop
pub struct AdcShared {
    decimator: Shared<Decimator>,
    /// Decimated results
    pub results: Mailbox<u16>,
}

impl AdcShared {
    pub const fn new(count: NonZeroU16) -> Self {
        Self {
            decimator: Shared::new(Decimator::new(count)),
            results: Mailbox::new(),
        }
    }

    /// Sum and sample count of the batch in progress
    ///
    /// Read under a critical section so the two values belong together.
    pub fn accumulated(&self) -> (u32, u16) {
        self.decimator.lock(|d| (d.accumulated(), d.taken()))
    }

    /// Discard the batch in progress
    pub fn restart(&self) {
        self.decimator.lock(|d| d.reset());
    }
}

/// ADC channel owned by the conversion-complete interrupt
pub struct AdcChannel<'a, A> {
    sampler: A,
    shared: &'a AdcShared,
}

impl<'a, A: AdcSampler> AdcChannel<'a, A> {
    pub fn new(sampler: A, shared: &'a AdcShared) -> Self {
        Self { sampler, shared }
    }

    pub fn sampler_mut(&mut self) -> &mut A {
        &mut self.sampler
    }

    /// Interrupt body: clear `AD0INT`, accumulate, post a finished mean
    pub fn on_interrupt(&mut self) -> Option<u16> {
        self.sampler.clear_conversion_complete();
        let sample = self.sampler.read_sample();
        let mean = self.shared.decimator.lock(|d| d.push(sample))?;
        self.shared.results.post(mean);
        Some(mean)
    }
}
