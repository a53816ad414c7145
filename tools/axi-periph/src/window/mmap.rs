//! /dev/mem backed register window

use std::fs::OpenOptions;
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use super::{check_offset, io_barrier, RegisterAccess};
use crate::config::DEFAULT_MEM_DEVICE;
use crate::error::{PeriphError, Result};

/// A mapped range of physical address space
///
/// Created by [`RegisterWindow::open`], released by [`RegisterWindow::close`]
/// or on drop. After close every access fails with
/// [`PeriphError::UseAfterClose`] without touching memory.
pub struct RegisterWindow {
    path: PathBuf,
    base: u64,
    len: usize,
    /// `None` once closed
    ptr: Option<NonNull<u32>>,
}

// SAFETY: the mapping is owned exclusively by this value and is only accessed
// through `&mut self`, so moving it to another thread cannot create aliasing.
unsafe impl Send for RegisterWindow {}

impl RegisterWindow {
    /// Map `len` bytes of physical memory at `physical_base` through /dev/mem
    pub fn open(physical_base: u64, len: usize) -> Result<Self> {
        Self::open_device(Path::new(DEFAULT_MEM_DEVICE), physical_base, len)
    }

    /// Map `len` bytes at offset `physical_base` of an arbitrary device or file
    pub fn open_device(path: &Path, physical_base: u64, len: usize) -> Result<Self> {
        let map_failed = |source: io::Error| PeriphError::MapFailed {
            path: path.to_path_buf(),
            base: physical_base,
            len,
            source,
        };

        if len == 0 || len % 4 != 0 {
            return Err(map_failed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "window length must be a non-zero multiple of 4",
            )));
        }
        let offset = libc::off_t::try_from(physical_base).map_err(|_| {
            map_failed(io::Error::new(
                io::ErrorKind::InvalidInput,
                "physical base does not fit in off_t",
            ))
        })?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(path)
            .map_err(|e| classify(path, physical_base, len, e))?;

        // SAFETY: fresh shared mapping of a descriptor we own; the kernel
        // validates offset and length and reports failure as MAP_FAILED.
        let raw = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(classify(path, physical_base, len, io::Error::last_os_error()));
        }
        // The mapping stays valid after the descriptor is closed
        drop(file);

        let ptr = NonNull::new(raw.cast::<u32>())
            .ok_or_else(|| map_failed(io::Error::new(io::ErrorKind::Other, "null mapping")))?;

        log::info!(
            "Mapped {:#x} bytes of {} at {:#010x}",
            len,
            path.display(),
            physical_base
        );

        Ok(Self {
            path: path.to_path_buf(),
            base: physical_base,
            len,
            ptr: Some(ptr),
        })
    }

    /// Release the mapping
    ///
    /// Closing twice is an error, like any other use after close.
    pub fn close(&mut self) -> Result<()> {
        let ptr = self.ptr.take().ok_or(PeriphError::UseAfterClose { base: self.base })?;
        // SAFETY: ptr/len describe the mapping created in open_device, and
        // taking it out of `self.ptr` guarantees it is unmapped only once.
        let rc = unsafe { libc::munmap(ptr.as_ptr().cast(), self.len) };
        if rc != 0 {
            return Err(PeriphError::MapFailed {
                path: self.path.clone(),
                base: self.base,
                len: self.len,
                source: io::Error::last_os_error(),
            });
        }
        log::info!("Unmapped window at {:#010x}", self.base);
        Ok(())
    }

    /// Whether the window is still mapped
    pub fn is_open(&self) -> bool {
        self.ptr.is_some()
    }

    /// Physical base address
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Device node the window was mapped from
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn word_ptr(&self, offset: usize) -> Result<*mut u32> {
        let ptr = self.ptr.ok_or(PeriphError::UseAfterClose { base: self.base })?;
        check_offset(offset, self.len)?;
        // SAFETY: offset is aligned and inside the mapping
        Ok(unsafe { ptr.as_ptr().add(offset / 4) })
    }
}

impl RegisterAccess for RegisterWindow {
    fn read32(&mut self, offset: usize) -> Result<u32> {
        let reg = self.word_ptr(offset)?;
        io_barrier();
        // SAFETY: reg points at an aligned word of a live mapping
        let value = unsafe { reg.read_volatile() };
        log::trace!("[READ]  {:#010x}+{:#05x} = {:#010x}", self.base, offset, value);
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        let reg = self.word_ptr(offset)?;
        log::trace!("[WRITE] {:#010x}+{:#05x} = {:#010x}", self.base, offset, value);
        // SAFETY: reg points at an aligned word of a live mapping
        unsafe { reg.write_volatile(value) };
        io_barrier();
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.len
    }
}

impl Drop for RegisterWindow {
    fn drop(&mut self) {
        if self.is_open() {
            if let Err(e) = self.close() {
                log::warn!("Failed to unmap window at {:#010x}: {}", self.base, e);
            }
        }
    }
}

impl std::fmt::Debug for RegisterWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterWindow")
            .field("path", &self.path)
            .field("base", &format_args!("{:#010x}", self.base))
            .field("len", &format_args!("{:#x}", self.len))
            .field("open", &self.is_open())
            .finish()
    }
}

/// Map an OS error to the window error taxonomy
fn classify(path: &Path, base: u64, len: usize, source: io::Error) -> PeriphError {
    let denied = source.kind() == io::ErrorKind::PermissionDenied
        || matches!(source.raw_os_error(), Some(libc::EACCES) | Some(libc::EPERM));
    if denied {
        PeriphError::AccessDenied {
            path: path.to_path_buf(),
            base,
            source,
        }
    } else {
        PeriphError::MapFailed {
            path: path.to_path_buf(),
            base,
            len,
            source,
        }
    }
}
