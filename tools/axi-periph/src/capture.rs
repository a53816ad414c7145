//! Framebuffer capture
//!
//! Scans the raster through the GPU read-back channel one sample at a time,
//! top to bottom and left to right. The scan is synchronous and all or
//! nothing: the first failed read discards everything captured so far.

use crate::error::{PeriphError, Region, Result};
use crate::gpu::GpuDevice;
use crate::window::RegisterAccess;

/// Rows between capture progress messages
const PROGRESS_ROWS: u32 = 20;

/// Row-major 8-bit grayscale image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramebufferImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl FramebufferImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Sample at (x, y), if inside the image
    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = (y as usize)
            .checked_mul(self.width as usize)?
            .checked_add(x as usize)?;
        self.pixels.get(index).copied()
    }

    /// Iterate rows top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[u8]> {
        self.pixels.chunks(self.width.max(1) as usize)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.pixels
    }
}

/// Capture a `width` x `height` image from the top-left of the framebuffer
pub fn capture<A: RegisterAccess>(
    gpu: &mut GpuDevice<A>,
    width: u32,
    height: u32,
) -> Result<FramebufferImage> {
    let raster = gpu.raster();
    if width > raster.width {
        return Err(PeriphError::OutOfRange {
            region: Region::Raster,
            index: width as usize,
            limit: raster.width as usize,
        });
    }
    if height > raster.height {
        return Err(PeriphError::OutOfRange {
            region: Region::Raster,
            index: height as usize,
            limit: raster.height as usize,
        });
    }

    log::debug!("Capturing {}x{} framebuffer", width, height);
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
        if y % PROGRESS_ROWS == 0 {
            log::debug!("Capture row {}/{}", y, height);
        }
        for x in 0..width {
            let sample = gpu.read_pixel(x, y).map_err(|e| PeriphError::CaptureAborted {
                x,
                y,
                source: Box::new(e),
            })?;
            pixels.push(sample);
        }
    }

    Ok(FramebufferImage { width, height, pixels })
}

impl<A: RegisterAccess> GpuDevice<A> {
    /// Capture the whole configured raster
    pub fn capture_frame(&mut self) -> Result<FramebufferImage> {
        let raster = self.raster();
        capture(self, raster.width, raster.height)
    }
}
