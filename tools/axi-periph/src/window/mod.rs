//! # Register Windows
//!
//! A register window is a range of physical address space through which a
//! peripheral's registers are reached as 32-bit words.
//!
//! ## Ordering
//!
//! Peripherals sample their registers asynchronously to the issuing core, so
//! every write is followed by a data synchronization barrier and every read is
//! preceded by one. A read therefore observes the peripheral's committed state
//! and never a value buffered on the CPU side.
//!
//! ## Access Rules
//!
//! | Rule              | Failure                       |
//! |-------------------|-------------------------------|
//! | offset % 4 == 0   | [`PeriphError::Misaligned`]   |
//! | offset < length   | [`PeriphError::OutOfRange`]   |
//! | window still open | [`PeriphError::UseAfterClose`]|

#[cfg(unix)]
mod mmap;

#[cfg(unix)]
pub use mmap::RegisterWindow;

use crate::error::{PeriphError, Region, Result};

/// 32-bit register access at byte offsets
///
/// Implemented by [`RegisterWindow`] for real hardware and by the
/// [`sim`](crate::sim) models for tests. The GPU and CPU interfaces are generic
/// over this trait.
pub trait RegisterAccess {
    /// Read the register at `offset`
    fn read32(&mut self, offset: usize) -> Result<u32>;

    /// Write `value` to the register at `offset`
    fn write32(&mut self, offset: usize, value: u32) -> Result<()>;

    /// Window length in bytes
    fn window_len(&self) -> usize;
}

impl<A: RegisterAccess + ?Sized> RegisterAccess for &mut A {
    fn read32(&mut self, offset: usize) -> Result<u32> {
        (**self).read32(offset)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        (**self).write32(offset, value)
    }

    fn window_len(&self) -> usize {
        (**self).window_len()
    }
}

/// Validate a register offset against a window of `len` bytes
#[inline]
pub fn check_offset(offset: usize, len: usize) -> Result<()> {
    if offset % 4 != 0 {
        return Err(PeriphError::Misaligned { offset });
    }
    if offset >= len {
        return Err(PeriphError::OutOfRange {
            region: Region::Window,
            index: offset,
            limit: len,
        });
    }
    Ok(())
}

/// Full-system data synchronization barrier
///
/// `dsb sy` on ARM; a sequentially consistent fence on other targets, which is
/// enough for file-backed windows.
#[inline(always)]
pub fn io_barrier() {
    #[cfg(any(target_arch = "aarch64", target_arch = "arm"))]
    unsafe {
        core::arch::asm!("dsb sy", options(nostack, preserves_flags));
    }

    #[cfg(not(any(target_arch = "aarch64", target_arch = "arm")))]
    core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
}
