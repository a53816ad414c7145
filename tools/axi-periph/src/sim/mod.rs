//! # Software Device Models
//!
//! Register-level models of the GPU and CPU peripherals. They implement
//! [`RegisterAccess`](crate::window::RegisterAccess), so the drivers, the
//! capture pipeline and the diagnostics run against them unchanged.
//!
//! ## Behaviour
//!
//! | Model    | Modelled                                                 |
//! |----------|----------------------------------------------------------|
//! | `SimGpu` | identity, busy window after a command, command execution |
//! | `SimCpu` | control pulses, PC, memories, debug telemetry            |
//!
//! Both models record every register write in order, which is what the driver
//! tests assert against. Commands execute on the CMD write; the busy bit then
//! stays set for a configurable number of STATUS reads.

mod cpu;
mod gpu;

pub use cpu::SimCpu;
pub use gpu::SimGpu;
