//! GPU bring-up checks

use super::{CheckSeverity, DiagReport};
use crate::error::Result;
use crate::gpu::patterns::{self, test_pattern_pixel};
use crate::gpu::{regs, GpuDevice, MathOp};
use crate::window::RegisterAccess;

/// Math unit cases with their expected results
const MATH_CASES: [(MathOp, i32, i32, i32); 4] = [
    (MathOp::Add, 100, 50, 150),
    (MathOp::Sub, 100, 50, 50),
    (MathOp::Mul, 12, 5, 60),
    (MathOp::Div, 100, 4, 25),
];

/// Registers written and read back unchanged
const READBACK: [(&str, usize, u32); 6] = [
    ("CONTROL read-back", regs::CONTROL, 0x1234_5678),
    ("COLOR read-back", regs::COLOR, 0xAB),
    ("ARG0 read-back", regs::ARG0, 0xDEAD_BEEF),
    ("ARG1 read-back", regs::ARG1, 0xCAFE_BABE),
    ("ARG2 read-back", regs::ARG2, 0x5555_AAAA),
    ("ARG3 read-back", regs::ARG3, 0x0F0F_0F0F),
];

const CLEAR_COLOR: u8 = 0x42;
const FILL_COLOR: u8 = 0xAA;

/// Run every GPU check, leaving the test pattern on screen
pub fn run<A: RegisterAccess>(gpu: &mut GpuDevice<A>) -> Result<DiagReport> {
    let mut report = DiagReport::new("gpu");
    let raster = gpu.raster();
    let (w, h) = (raster.width, raster.height);

    report.expect_word("Identity", regs::EXPECTED_ID, gpu.id())?;

    let status = gpu
        .status()
        .map(|s| format!("{:#010x} (busy={}, done={})", s.raw, s.busy, s.done));
    report.info("Status", status)?;

    let control = gpu.control();
    for &(name, offset, value) in &READBACK {
        let read = gpu
            .bus_mut()
            .write32(offset, value)
            .and_then(|()| gpu.bus_mut().read32(offset));
        report.expect_word(name, value, read)?;
    }
    if let Ok(previous) = control {
        gpu.set_control(previous)?;
    }

    for &(op, a, b, expected) in &MATH_CASES {
        let name = format!("Math {} {} {}", a, op.symbol(), b);
        let outcome = gpu.math(op, a, b).map(|result| {
            (result == expected, format!("got {}, expected {}", result, expected))
        });
        report.judge(&name, CheckSeverity::Critical, outcome)?;
    }

    // Drawing coordinates are 16 bits wide
    let limit = u16::MAX as u32;
    let (px, py) = ((w / 32).min(limit) as u16, (h / 20).min(limit) as u16);
    let outcome = gpu
        .clear(0)
        .and_then(|()| gpu.draw_pixel(px, py, 0xFF))
        .and_then(|()| gpu.await_ready())
        .and_then(|()| gpu.read_pixel(px as u32, py as u32))
        .map(|p| (p == 0xFF, format!("({}, {}) = {:#04x}", px, py, p)));
    report.judge("Pixel draw and read-back", CheckSeverity::Critical, outcome)?;

    let (right, bottom) = (w.saturating_sub(1), h.saturating_sub(1));
    let samples = [(0, 0), (w / 2, h / 2), (right, bottom)];
    let outcome = gpu
        .clear(CLEAR_COLOR)
        .and_then(|()| gpu.await_ready())
        .and_then(|()| sample_all(gpu, &samples, |_, _| CLEAR_COLOR));
    report.judge("Clear", CheckSeverity::Critical, outcome)?;

    let (x0, y0) = ((w / 4).min(limit), (h / 4).min(limit));
    let (x1, y1) = ((w / 2).min(limit), (h / 2).min(limit));
    let inside = [(x0, y0), ((x0 + x1) / 2, (y0 + y1) / 2), (x1, y1)];
    // On small rasters some of these land inside the rectangle or off screen
    let in_rect = |x: u32, y: u32| (x0..=x1).contains(&x) && (y0..=y1).contains(&y);
    let outside: Vec<(u32, u32)> = [
        (x0.saturating_sub(1), y0),
        (x1.saturating_add(1), y1),
        (right, bottom),
    ]
    .into_iter()
    .filter(|&(x, y)| x < w && y < h && !in_rect(x, y))
    .collect();
    let outcome = gpu
        .clear(0)
        .and_then(|()| gpu.fill_rect(x0 as u16, y0 as u16, x1 as u16, y1 as u16, FILL_COLOR))
        .and_then(|()| gpu.await_ready())
        .and_then(|()| sample_all(gpu, &inside, |_, _| FILL_COLOR));
    report.judge("Fill rect interior", CheckSeverity::Critical, outcome)?;
    let outcome = sample_all(gpu, &outside, |_, _| 0);
    report.judge("Fill rect exterior", CheckSeverity::Critical, outcome)?;

    let points: Vec<(u32, u32)> = [
        (0, 0),
        (1, 1),
        ((w / 8).saturating_sub(1), h / 2),
        (w / 8, h / 2),
        (w.saturating_sub(2), h.saturating_sub(2)),
        (right, h / 2),
    ]
    .into_iter()
    .filter(|&(x, y)| x < w && y < h)
    .collect();
    let outcome = patterns::test_pattern(gpu)
        .and_then(|()| sample_all(gpu, &points, |x, y| test_pattern_pixel(raster, x, y)));
    report.judge("Test pattern", CheckSeverity::Critical, outcome)?;

    Ok(report)
}

/// Read each point and compare it against `expected(x, y)`
fn sample_all<A, F>(
    gpu: &mut GpuDevice<A>,
    points: &[(u32, u32)],
    expected: F,
) -> Result<(bool, String)>
where
    A: RegisterAccess,
    F: Fn(u32, u32) -> u8,
{
    let mut wrong = Vec::new();
    for &(x, y) in points {
        let want = expected(x, y);
        let got = gpu.read_pixel(x, y)?;
        if got != want {
            wrong.push(format!("({}, {}) = {:#04x}, expected {:#04x}", x, y, got, want));
        }
    }
    if wrong.is_empty() {
        Ok((true, format!("{} samples match", points.len())))
    } else {
        Ok((false, wrong.join("; ")))
    }
}
