//! Error taxonomy for register windows and the devices built on them
//!
//! Register window failures are fatal to the operation that raised them. The
//! device layers never retry a failed register access; only the ready-poll
//! loop repeats, and it gives up with [`PeriphError::DeviceHung`].

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, PeriphError>;

/// Addressable region an index was checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Byte offset inside a mapped register window
    Window,
    /// Word index into the CPU instruction memory
    InstructionMemory,
    /// Word index into the CPU data memory
    DataMemory,
    /// Linear pixel index into the GPU framebuffer
    Raster,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Region::Window => "register window",
            Region::InstructionMemory => "instruction memory",
            Region::DataMemory => "data memory",
            Region::Raster => "framebuffer raster",
        };
        f.write_str(name)
    }
}

/// Errors raised by the peripheral drivers
#[derive(Debug, Error)]
pub enum PeriphError {
    /// The caller may not map physical memory (not root, or CAP_SYS_RAWIO missing)
    #[error("access denied mapping {} at {base:#010x}", path.display())]
    AccessDenied {
        path: PathBuf,
        base: u64,
        #[source]
        source: io::Error,
    },

    /// The platform refused the mapping
    #[error("failed to map {len:#x} bytes of {} at {base:#010x}", path.display())]
    MapFailed {
        path: PathBuf,
        base: u64,
        len: usize,
        #[source]
        source: io::Error,
    },

    /// Operation on a window that has already been closed
    #[error("register window at {base:#010x} used after close")]
    UseAfterClose { base: u64 },

    /// Offset or memory index outside its region
    #[error("{region} index {index:#x} out of range (limit {limit:#x})")]
    OutOfRange {
        region: Region,
        index: usize,
        limit: usize,
    },

    /// Register offset not on a 32-bit boundary
    #[error("register offset {offset:#x} is not 4-byte aligned")]
    Misaligned { offset: usize },

    /// Ready-wait exceeded its bound
    #[error("{device} still busy after {waited:?}")]
    DeviceHung {
        device: &'static str,
        waited: Duration,
    },

    /// A read failed part way through a framebuffer capture
    #[error("framebuffer capture aborted at ({x}, {y})")]
    CaptureAborted {
        x: u32,
        y: u32,
        #[source]
        source: Box<PeriphError>,
    },

    /// Identity register did not hold the expected constant
    #[error("GPU not detected: ID register read {found:#010x}, expected {expected:#010x}")]
    GpuNotDetected { found: u32, expected: u32 },

    /// A raw command was built with more arguments than there are ARG registers
    #[error("command takes at most {max} arguments, got {given}")]
    TooManyArguments { given: usize, max: usize },
}

impl PeriphError {
    /// True for errors that mean the window itself is unusable
    pub fn is_window_fault(&self) -> bool {
        matches!(
            self,
            PeriphError::AccessDenied { .. }
                | PeriphError::MapFailed { .. }
                | PeriphError::UseAfterClose { .. }
        )
    }
}
