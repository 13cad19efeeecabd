//! Flash scratchpad
//!
//! Writes one byte per cycle, then rewrites the run in place, copies it,
//! clears it, and finally shows a write being refused on low supply.

use cip51_core::flash::{BankedAddress, FlashWriter};
use cip51_core::report::StatusLine;
use cip51_hal::flash::FlashError;
use cip51_hal_sim::{SimFlash, SimUart, SimVdd};

use crate::{emit, expect_byte, Demo, DemoConfig, DemoError, DemoReport};

/// Written over the start of the scratch area by the in-place update
const TAG: &[u8] = b"CIP51";

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    let geometry = config.flash.part.geometry();
    let base = config.flash.address;
    let mut uart = SimUart::new();
    let mut writer = FlashWriter::new(SimFlash::new(geometry), SimVdd::new());

    if geometry.is_banked() {
        let location = BankedAddress::from_linear(base);
        emit(
            &mut uart,
            StatusLine::format(format_args!(
                "Flash 0x{:05X}: bank {} offset 0x{:04X}",
                base,
                location.bank.unwrap_or(0),
                location.offset
            )),
        )?;
    }

    for cycle in 0..cycles {
        let addr = base + cycle;
        let value = 0xA0 | (cycle as u8 & 0x0F);
        writer.write_byte(addr, value)?;
        let stored = writer.read_byte(addr)?;
        expect_byte(value, stored)?;
        emit(&mut uart, StatusLine::byte("Flash write", stored))?;
    }

    // Read-modify-erase-write of the containing page
    let run_len = cycles.max(TAG.len() as u32);
    writer.update(base, TAG)?;
    let mut tag = [0u8; TAG.len()];
    writer.read(base, &mut tag)?;
    for (&expected, &actual) in TAG.iter().zip(&tag) {
        expect_byte(expected, actual)?;
    }
    emit(&mut uart, StatusLine::format(format_args!("Flash update: ok")))?;

    let page = geometry.page_size as u32;
    let copy_to = geometry.page_start(base) + page;
    writer.copy(copy_to, base, run_len)?;
    for offset in 0..run_len {
        let expected = writer.read_byte(base + offset)?;
        expect_byte(expected, writer.read_byte(copy_to + offset)?)?;
    }
    emit(
        &mut uart,
        StatusLine::format(format_args!("Flash copy: {} bytes", run_len)),
    )?;

    for start in [base, copy_to] {
        writer.clear(start, run_len)?;
        for offset in 0..run_len {
            expect_byte(0xFF, writer.read_byte(start + offset)?)?;
        }
    }
    emit(&mut uart, StatusLine::format(format_args!("Flash clear: ok")))?;

    writer.vdd_mut().set_supply_ok(false);
    match writer.write_byte(base, 0x00) {
        Err(FlashError::SupplyLow) => {
            expect_byte(0xFF, writer.read_byte(base)?)?;
            emit(
                &mut uart,
                StatusLine::format(format_args!("Flash write refused: VDD low")),
            )?;
        }
        Err(err) => return Err(err.into()),
        Ok(()) => return Err(DemoError::Unexpected("flash written with VDD low")),
    }

    let (flash, _) = writer.into_parts();
    log::debug!(
        "flash: {} programs, {} erases, bank {}",
        flash.programs(),
        flash.erases(),
        flash.bank()
    );
    Ok(DemoReport::new(Demo::FlashScratch, &uart, 0, 0))
}
