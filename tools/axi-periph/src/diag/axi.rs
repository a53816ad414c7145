//! Bus write-ordering checks
//!
//! Five write patterns against the start of the CPU instruction memory, each
//! read back afterwards. A window that drops, merges or reorders writes shows
//! up here before any device-level test is run.
//!
//! | Check   | Offsets           | Pattern                            |
//! |---------|-------------------|------------------------------------|
//! | single  | +0x00             | one write                          |
//! | paired  | +0x00, +0x04      | two writes, no delay               |
//! | repeat  | +0x08             | three writes, last one must win    |
//! | delayed | +0x10..=+0x18     | settle delay after each write      |
//! | burst   | +0x20..=+0x30     | five consecutive writes            |

use std::time::Duration;

use super::{CheckSeverity, DiagReport};
use crate::cpu::regs::INSTR_BASE;
use crate::error::Result;
use crate::wait::settle;
use crate::window::RegisterAccess;

/// Write each `(offset, value)` then read them all back
fn write_then_verify<A: RegisterAccess>(
    bus: &mut A,
    writes: &[(usize, u32)],
    delay: Option<Duration>,
) -> Result<(bool, String)> {
    for &(offset, value) in writes {
        bus.write32(INSTR_BASE + offset, value)?;
        if let Some(delay) = delay {
            settle(delay);
        }
    }

    // Only the final write to each offset is expected to survive
    let mut mismatches = Vec::new();
    for (i, &(offset, expected)) in writes.iter().enumerate() {
        if writes[i + 1..].iter().any(|&(later, _)| later == offset) {
            continue;
        }
        let found = bus.read32(INSTR_BASE + offset)?;
        if found != expected {
            mismatches.push(format!("+{:#04x}: {:#010x} != {:#010x}", offset, found, expected));
        }
    }

    if mismatches.is_empty() {
        Ok((true, format!("{} writes read back", writes.len())))
    } else {
        Ok((false, mismatches.join(", ")))
    }
}

/// Run the five write-ordering checks on a CPU register window
pub fn write_ordering<A: RegisterAccess>(bus: &mut A, delay: Duration) -> Result<DiagReport> {
    let mut report = DiagReport::new("axi write ordering");

    let outcome = write_then_verify(bus, &[(0x00, 0xAAAA_AAAA)], None);
    report.judge("single write", CheckSeverity::Critical, outcome)?;

    let outcome = write_then_verify(bus, &[(0x00, 0x1111_1111), (0x04, 0x2222_2222)], None);
    report.judge("paired writes", CheckSeverity::Critical, outcome)?;

    let outcome = write_then_verify(
        bus,
        &[(0x08, 0xBBBB_BBBB), (0x08, 0xCCCC_CCCC), (0x08, 0xDDDD_DDDD)],
        None,
    );
    report.judge("repeated writes", CheckSeverity::Critical, outcome)?;

    let outcome = write_then_verify(
        bus,
        &[(0x10, 0xAAAA_AAAA), (0x14, 0xBBBB_BBBB), (0x18, 0xCCCC_CCCC)],
        Some(delay),
    );
    report.judge("delayed writes", CheckSeverity::Critical, outcome)?;

    let burst: Vec<(usize, u32)> = (0..5u32)
        .map(|i| (0x20 + 4 * i as usize, 0x1111_1111 * (i + 1)))
        .collect();
    let outcome = write_then_verify(bus, &burst, None);
    report.judge("burst writes", CheckSeverity::Critical, outcome)?;

    Ok(report)
}
