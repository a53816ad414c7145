//! Canned scenes for bring-up
//!
//! The test pattern is eight vertical grey bars (0x00, 0x20, .. 0xE0) framed
//! by a one-pixel white border. The pong scene is the demo picture used when
//! dumping the framebuffer: grey horizontal bands, two paddles, a ball, a
//! dashed centre line and block lettering.

use super::driver::GpuDevice;
use crate::config::RasterConfig;
use crate::error::Result;
use crate::window::RegisterAccess;

pub const WHITE: u8 = 0xFF;
pub const BLACK: u8 = 0x00;
pub const MID_GREY: u8 = 0x80;

/// Number of bars in the test pattern
pub const BAR_COUNT: u32 = 8;

/// Grey level of bar `i`
pub const fn bar_color(i: u32) -> u8 {
    (i * 32) as u8
}

fn coord(v: u32) -> u16 {
    v.min(u16::MAX as u32) as u16
}

/// Draw the vertical grey bars
pub fn color_bars<A: RegisterAccess>(gpu: &mut GpuDevice<A>) -> Result<()> {
    let raster = gpu.raster();
    let bar = (raster.width / BAR_COUNT).max(1);
    for i in 0..BAR_COUNT {
        let x0 = i * bar;
        let x1 = if i == BAR_COUNT - 1 { raster.width - 1 } else { (i + 1) * bar - 1 };
        gpu.fill_rect(coord(x0), 0, coord(x1), coord(raster.height - 1), bar_color(i))?;
    }
    gpu.await_ready()
}

/// Draw a one-pixel frame around the raster
pub fn border<A: RegisterAccess>(gpu: &mut GpuDevice<A>, color: u8) -> Result<()> {
    let raster = gpu.raster();
    let (right, bottom) = (coord(raster.width - 1), coord(raster.height - 1));
    gpu.draw_line(0, 0, right, 0, color)?;
    gpu.draw_line(0, bottom, right, bottom, color)?;
    gpu.draw_line(0, 0, 0, bottom, color)?;
    gpu.draw_line(right, 0, right, bottom, color)?;
    gpu.await_ready()
}

/// Clear, bars, border
pub fn test_pattern<A: RegisterAccess>(gpu: &mut GpuDevice<A>) -> Result<()> {
    log::debug!("Drawing test pattern");
    gpu.clear(BLACK)?;
    color_bars(gpu)?;
    border(gpu, WHITE)
}

/// Sample the test pattern is expected to hold at (x, y)
pub fn test_pattern_pixel(raster: RasterConfig, x: u32, y: u32) -> u8 {
    let (right, bottom) = (raster.width.saturating_sub(1), raster.height.saturating_sub(1));
    if x == 0 || y == 0 || x == right || y == bottom {
        return WHITE;
    }
    let bar = (raster.width / BAR_COUNT).max(1);
    bar_color((x / bar).min(BAR_COUNT - 1))
}

/// Draw the pong demo scene
///
/// Laid out for the 320x200 raster; larger rasters leave the extra area in
/// the background bands.
pub fn pong_scene<A: RegisterAccess>(gpu: &mut GpuDevice<A>) -> Result<()> {
    let raster = gpu.raster();
    let (width, height) = (coord(raster.width), coord(raster.height));
    log::debug!("Drawing pong scene");

    gpu.clear(BLACK)?;

    let band = (height / 8).max(1);
    for i in 0..8u16 {
        let y1 = ((i + 1) * band).saturating_sub(1);
        gpu.fill_rect(0, i * band, width - 1, y1, bar_color(i as u32))?;
    }

    // Paddles and ball
    gpu.fill_rect(20, 70, 30, 130, WHITE)?;
    gpu.fill_rect(289, 50, 299, 110, WHITE)?;
    gpu.fill_rect(155, 95, 165, 105, WHITE)?;

    // Dashed centre line
    let centre = width / 2;
    let mut y = 0;
    while y < height {
        gpu.draw_line(centre, y, centre, (y + 5).min(height - 1), MID_GREY)?;
        y += 10;
    }

    gpu.draw_line(0, 0, width - 1, 0, WHITE)?;
    gpu.draw_line(0, height - 1, width - 1, height - 1, WHITE)?;

    // "P"
    gpu.fill_rect(130, 10, 135, 30, WHITE)?;
    gpu.fill_rect(135, 10, 145, 15, WHITE)?;
    gpu.fill_rect(135, 18, 145, 23, WHITE)?;
    gpu.fill_rect(145, 10, 150, 23, WHITE)?;
    // "O"
    gpu.fill_rect(155, 10, 160, 30, WHITE)?;
    gpu.fill_rect(160, 10, 170, 15, WHITE)?;
    gpu.fill_rect(160, 25, 170, 30, WHITE)?;
    gpu.fill_rect(170, 10, 175, 30, WHITE)?;

    gpu.await_ready()
}
