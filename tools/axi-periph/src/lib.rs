//! # AXI Peripheral Drivers
//!
//! Host-side drivers for two FPGA peripherals reached through `/dev/mem`
//! on a Zynq board: a command-queue GPU and a soft RV32I CPU core.
//!
//! ## Modules
//!
//! | Module      | Role                                                   |
//! |-------------|--------------------------------------------------------|
//! | [`window`]  | mapped 32-bit register windows with ordering barriers  |
//! | [`gpu`]     | drawing commands, math unit, framebuffer read-back     |
//! | [`cpu`]     | reset/run/step, PC, instruction and data memory, debug |
//! | [`capture`] | full-frame read-back into a grayscale image            |
//! | [`diag`]    | bring-up checks returning pass/fail reports            |
//! | [`sim`]     | software models of both peripherals                    |
//! | [`config`]  | addresses, geometry and timings, loadable from TOML    |
//!
//! ## Usage
//!
//! ```no_run
//! use axi_periph::{GpuDevice, PeriphConfig};
//!
//! # fn main() -> axi_periph::Result<()> {
//! let config = PeriphConfig::default();
//! let mut gpu = GpuDevice::open(&config)?;
//! gpu.clear(0x00)?;
//! gpu.fill_rect(50, 50, 100, 100, 0xAA)?;
//! gpu.await_ready()?;
//! let frame = gpu.capture_frame()?;
//! assert_eq!(frame.get(75, 75), Some(0xAA));
//! gpu.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! Each device owns its window. There is no process-wide handle, and a window
//! must not be shared between threads.

pub mod capture;
pub mod config;
pub mod cpu;
pub mod diag;
pub mod error;
pub mod gpu;
pub mod sim;
pub mod wait;
pub mod window;

pub use capture::{capture, FramebufferImage};
pub use config::PeriphConfig;
pub use cpu::{CpuDebugState, CpuDevice};
pub use diag::{CheckSeverity, DiagCheck, DiagReport};
pub use error::{PeriphError, Region, Result};
pub use gpu::{GpuCommand, GpuDevice, GpuStatus, MathOp, Opcode};
pub use window::RegisterAccess;

#[cfg(unix)]
pub use window::RegisterWindow;
