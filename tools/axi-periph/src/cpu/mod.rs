//! # Soft CPU Core
//!
//! Control and debug interface of the RV32I core at `0x4400_0000`.
//!
//! ## Control Word
//!
//! | Bit | Name  | Behaviour                          |
//! |-----|-------|------------------------------------|
//! | 0   | RUN   | level; core executes while set     |
//! | 1   | RESET | pulse; PC returns to 0             |
//! | 2   | STEP  | pulse; one instruction is executed |

pub mod driver;
pub mod regs;

pub use driver::{CpuDebugState, CpuDevice, Memory};
