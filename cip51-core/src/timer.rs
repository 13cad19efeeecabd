//! Timer reload arithmetic
//!
//! Timer1 in 8-bit auto-reload mode clocks UART0: the port shifts one bit
//! per two overflows, so the overflow rate must be `2 * baud`. Timer2/3 in
//! 16-bit auto-reload mode pace ADC conversions and DAC updates.

/// Timer1 clock source (`CKCON` T1M / SCA bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Timer1Prescale {
    Sysclk = 1,
    Div4 = 4,
    Div12 = 12,
    Div48 = 48,
}

impl Timer1Prescale {
    /// Candidates in the order the reload search tries them
    pub const ALL: [Self; 4] = [Self::Sysclk, Self::Div4, Self::Div12, Self::Div48];

    pub fn divisor(self) -> u32 {
        self as u32
    }
}

/// Timer1 settings for a baud rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timer1Reload {
    pub prescale: Timer1Prescale,
    /// Value loaded into `TH1`
    pub th1: u8,
}

/// Timer configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Requested rate or clock is zero
    ZeroRate,
    /// Fewer than one timer count per period at the fastest clock
    TooFast,
    /// More counts per period than the timer holds at the slowest clock
    TooSlow,
}

/// Largest baud error a UART link tolerates, in parts per million
pub const MAX_BAUD_ERROR_PPM: u32 = 20_000;

/// Compute the Timer1 reload for `baud` at `sysclk` Hz
///
/// The fastest usable prescaler wins, which keeps the count (and the
/// resolution) as large as possible. Division truncates the same way the
/// `SYSCLK/BAUDRATE/2` expression in the vendor init code does.
pub fn baud_reload(sysclk: u32, baud: u32) -> Result<Timer1Reload, TimerError> {
    if sysclk == 0 || baud == 0 {
        return Err(TimerError::ZeroRate);
    }
    let ticks = sysclk / baud / 2;
    if ticks == 0 {
        return Err(TimerError::TooFast);
    }
    Timer1Prescale::ALL
        .into_iter()
        .find_map(|prescale| {
            let count = ticks / prescale.divisor();
            (1..=256).contains(&count).then(|| Timer1Reload {
                prescale,
                th1: (256 - count) as u8,
            })
        })
        .ok_or(TimerError::TooSlow)
}

/// Baud rate a reload actually produces
pub fn actual_baud(sysclk: u32, reload: Timer1Reload) -> u32 {
    let count = 256 - reload.th1 as u32;
    sysclk / reload.prescale.divisor() / count / 2
}

/// Relative error between a requested and produced baud rate
pub fn baud_error_ppm(requested: u32, actual: u32) -> u32 {
    if requested == 0 {
        return u32::MAX;
    }
    let diff = requested.abs_diff(actual) as u64;
    (diff * 1_000_000 / requested as u64).min(u32::MAX as u64) as u32
}

/// Reload value for a 16-bit auto-reload timer overflowing at `rate_hz`
///
/// `prescale` is the timer clock divisor (1 for SYSCLK, 12 for SYSCLK/12).
pub fn timer_reload_16(sysclk: u32, prescale: u32, rate_hz: u32) -> Result<u16, TimerError> {
    if sysclk == 0 || prescale == 0 || rate_hz == 0 {
        return Err(TimerError::ZeroRate);
    }
    let counts = sysclk / prescale / rate_hz;
    match counts {
        0 => Err(TimerError::TooFast),
        1..=65536 => Ok((65536 - counts) as u16),
        _ => Err(TimerError::TooSlow),
    }
}
