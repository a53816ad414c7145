//! CPU bring-up checks

use std::time::Duration;

use super::{CheckSeverity, DiagReport};
use crate::cpu::regs::{self, NOP};
use crate::cpu::CpuDevice;
use crate::error::Result;
use crate::wait::settle;
use crate::window::RegisterAccess;

/// addi x1, x0, 1 / addi x2, x0, 2 / add x3, x1, x2 / jal x0, 0
const PROGRAM: [u32; 4] = [0x0010_0093, 0x0020_0113, 0x0020_81B3, 0x0000_006F];

const DATA: [u32; 4] = [0xDEAD_BEEF, 0xCAFE_BABE, 0x1234_5678, 0x8765_4321];

const TELEMETRY_WORD: u32 = 0x5A5A_A5A5;

/// Run every CPU check
///
/// `delay` is how long the core is left running before its PC is sampled.
/// The core is left halted and reset.
pub fn run<A: RegisterAccess>(cpu: &mut CpuDevice<A>, delay: Duration) -> Result<DiagReport> {
    let mut report = DiagReport::new("cpu");

    report.info("Status", cpu.get_status().map(|s| format!("{:#010x}", s)))?;
    report.info("PC", cpu.get_pc().map(|pc| format!("{:#010x}", pc)))?;

    let read = cpu.reset().and_then(|()| cpu.get_pc());
    report.expect_word("Reset clears PC", 0, read)?;

    let read = cpu.set_pc(0x100).and_then(|()| cpu.get_pc());
    report.expect_word("PC write/read-back", 0x100, read)?;

    let outcome = cpu
        .load_program(&PROGRAM)
        .and_then(|()| verify_words(&PROGRAM, |i| cpu.read_instruction(i)));
    report.judge("Instruction memory read-back", CheckSeverity::Critical, outcome)?;

    let outcome = cpu
        .load_data(0, &DATA)
        .and_then(|()| verify_words(&DATA, |i| cpu.read_data(i)));
    report.judge("Data memory read-back", CheckSeverity::Critical, outcome)?;

    let index = DATA.len();
    let telemetry = cpu.get_debug_state().and_then(|before| {
        cpu.write_data(index, TELEMETRY_WORD)?;
        Ok((before, cpu.get_debug_state()?))
    });
    match telemetry {
        Ok((before, after)) => {
            let counted = after.write_count.wrapping_sub(before.write_count);
            let message = format!(
                "last data {:#010x}, {} write(s) counted",
                after.last_data, counted
            );
            let passed = after.last_data == TELEMETRY_WORD && counted == 1;
            report.judge("Debug telemetry", CheckSeverity::Critical, Ok((passed, message)))?;

            // Some bitstreams latch the absolute bus address instead of the offset
            let expected = (regs::DATA_BASE + 4 * index) as u32;
            let message = format!(
                "last address {:#06x}, expected {:#06x}",
                after.last_addr, expected
            );
            let passed = after.last_addr == expected;
            report.judge("Debug telemetry address", CheckSeverity::Warning, Ok((passed, message)))?;
        }
        Err(e) => report.judge("Debug telemetry", CheckSeverity::Critical, Err(e))?,
    }

    let nops = vec![NOP; cpu.instr_words()];
    let outcome = cpu
        .reset()
        .and_then(|()| cpu.load_program(&nops))
        .and_then(|()| cpu.set_pc(0))
        .and_then(|()| cpu.run())
        .and_then(|()| {
            settle(delay);
            cpu.get_pc()
        })
        .and_then(|pc| cpu.stop().map(|()| pc))
        .map(|pc| (pc != 0, format!("PC {:#010x} after {:?}", pc, delay)));
    report.judge("NOP program advances PC", CheckSeverity::Critical, outcome)?;

    cpu.reset()?;
    Ok(report)
}

/// Compare each expected word with `read(index)`
fn verify_words<F>(expected: &[u32], mut read: F) -> Result<(bool, String)>
where
    F: FnMut(usize) -> Result<u32>,
{
    let mut wrong = Vec::new();
    for (i, &want) in expected.iter().enumerate() {
        let got = read(i)?;
        if got != want {
            wrong.push(format!("[{}] {:#010x} != {:#010x}", i, got, want));
        }
    }
    if wrong.is_empty() {
        Ok((true, format!("{} words read back", expected.len())))
    } else {
        Ok((false, wrong.join(", ")))
    }
}
