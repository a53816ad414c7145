//! CPU register map
//!
//! | Offset    | Register        |
//! |-----------|-----------------|
//! | 0x00      | CTRL            |
//! | 0x04      | STATUS          |
//! | 0x08      | PC              |
//! | 0x0C      | REG             |
//! | 0x30      | DEBUG_LAST_ADDR |
//! | 0x34      | DEBUG_LAST_DATA |
//! | 0x38      | DEBUG_WRITE_CNT |
//! | 0x3C      | DEBUG_STATE     |
//! | 0x40..    | instruction mem |
//! | 0x80..    | data mem        |

pub const CTRL: usize = 0x00;
pub const STATUS: usize = 0x04;
pub const PC: usize = 0x08;
pub const REG: usize = 0x0C;

pub const DEBUG_LAST_ADDR: usize = 0x30;
pub const DEBUG_LAST_DATA: usize = 0x34;
pub const DEBUG_WRITE_CNT: usize = 0x38;
pub const DEBUG_STATE: usize = 0x3C;

pub const INSTR_BASE: usize = 0x40;
pub const DATA_BASE: usize = 0x80;

/// CTRL register bits
pub mod ctrl_bits {
    pub const RUN: u32 = 1 << 0;
    pub const RESET: u32 = 1 << 1;
    pub const STEP: u32 = 1 << 2;
}

/// RV32I `addi x0, x0, 0`
pub const NOP: u32 = 0x0000_0013;
