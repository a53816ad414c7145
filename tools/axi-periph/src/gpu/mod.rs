//! # Command-Queue GPU
//!
//! Register map, command encoding and the driver for the FPGA GPU at
//! `0x4300_0000`: drawing primitives, the scalar math coprocessor and the
//! framebuffer read-back channel.

pub mod command;
pub mod driver;
pub mod patterns;
pub mod regs;

pub use command::{GpuCommand, GpuStatus, MathOp, Opcode};
pub use driver::GpuDevice;
