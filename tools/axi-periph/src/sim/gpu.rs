use crate::config::DEFAULT_MAP_LEN;
use crate::error::{PeriphError, Result};
use crate::gpu::regs::{self, status_bits, unpack_point};
use crate::gpu::{MathOp, Opcode};
use crate::window::{check_offset, RegisterAccess};

/// Escape-time iteration cap for the Mandelbrot render
const MANDELBROT_ITERATIONS: u32 = 32;

/// Register-level GPU model with an in-memory framebuffer
#[derive(Debug, Clone)]
pub struct SimGpu {
    width: u32,
    height: u32,
    id: u32,
    regs: Vec<u32>,
    framebuffer: Vec<u8>,
    busy_polls: u32,
    busy_remaining: u32,
    stuck_busy: bool,
    status_reads: usize,
    writes: Vec<(usize, u32)>,
    writes_left: Option<usize>,
    closed: bool,
}

impl SimGpu {
    /// Idle GPU with a black `width` x `height` framebuffer
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            id: regs::EXPECTED_ID,
            regs: vec![0; DEFAULT_MAP_LEN / 4],
            framebuffer: vec![0; width as usize * height as usize],
            busy_polls: 0,
            busy_remaining: 0,
            stuck_busy: false,
            status_reads: 0,
            writes: Vec::new(),
            writes_left: None,
            closed: false,
        }
    }

    /// Override the identity register
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    /// Report BUSY for the next `polls` STATUS reads after each command
    pub fn set_busy_polls(&mut self, polls: u32) {
        self.busy_polls = polls;
    }

    /// Keep BUSY set forever
    pub fn set_stuck_busy(&mut self, stuck: bool) {
        self.stuck_busy = stuck;
    }

    /// Accept `count` more writes; the next one closes the window
    pub fn fail_after_writes(&mut self, count: usize) {
        self.writes_left = Some(count);
    }

    /// STATUS reads since construction
    pub fn status_reads(&self) -> usize {
        self.status_reads
    }

    /// Drain the write log
    pub fn take_writes(&mut self) -> Vec<(usize, u32)> {
        std::mem::take(&mut self.writes)
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    fn reg(&self, offset: usize) -> u32 {
        self.regs[offset / 4]
    }

    fn put_pixel(&mut self, x: i64, y: i64, color: u8) {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.framebuffer[index] = color;
    }

    fn execute(&mut self, code: u32) {
        let color = (self.reg(regs::COLOR) & 0xFF) as u8;
        let (x0, y0) = unpack_point(self.reg(regs::ARG0));
        let (x1, y1) = unpack_point(self.reg(regs::ARG1));
        match Opcode::from_code(code) {
            Some(Opcode::Clear) => self.framebuffer.fill(color),
            Some(Opcode::FillRect) => self.fill_rect(x0, y0, x1, y1, color),
            Some(Opcode::DrawLine) => self.line(x0 as i64, y0 as i64, x1 as i64, y1 as i64, color),
            Some(Opcode::DrawPixel) => self.put_pixel(x0 as i64, y0 as i64, color),
            Some(Opcode::Mandelbrot) => self.mandelbrot(),
            Some(Opcode::MathOp) => self.math(),
            Some(Opcode::Nop) | None => {}
        }
    }

    fn fill_rect(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: u8) {
        let (left, right) = (x0.min(x1) as i64, x0.max(x1) as i64);
        let (top, bottom) = (y0.min(y1) as i64, y0.max(y1) as i64);
        for y in top..=bottom.min(self.height as i64 - 1) {
            for x in left..=right.min(self.width as i64 - 1) {
                self.put_pixel(x, y, color);
            }
        }
    }

    fn line(&mut self, mut x0: i64, mut y0: i64, x1: i64, y1: i64, color: u8) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.put_pixel(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn mandelbrot(&mut self) {
        let (w, h) = (self.width.max(1) as f64, self.height.max(1) as f64);
        for py in 0..self.height {
            for px in 0..self.width {
                let cr = -2.5 + 3.5 * (px as f64) / w;
                let ci = -1.0 + 2.0 * (py as f64) / h;
                let (mut zr, mut zi) = (0.0f64, 0.0f64);
                let mut n = 0;
                while n < MANDELBROT_ITERATIONS && zr * zr + zi * zi <= 4.0 {
                    let t = zr * zr - zi * zi + cr;
                    zi = 2.0 * zr * zi + ci;
                    zr = t;
                    n += 1;
                }
                let shade = if n == MANDELBROT_ITERATIONS {
                    0
                } else {
                    (n * 255 / MANDELBROT_ITERATIONS) as u8
                };
                self.put_pixel(px as i64, py as i64, shade);
            }
        }
    }

    fn math(&mut self) {
        let a = self.reg(regs::MATH_A) as i32;
        let b = self.reg(regs::MATH_B) as i32;
        let result = match MathOp::from_code(self.reg(regs::MATH_OP)) {
            Some(MathOp::Add) => a.wrapping_add(b) as u32,
            Some(MathOp::Sub) => a.wrapping_sub(b) as u32,
            Some(MathOp::Mul) => a.wrapping_mul(b) as u32,
            Some(MathOp::Div) if b == 0 => 0xFFFF_FFFF,
            Some(MathOp::Div) => a.wrapping_div(b) as u32,
            None => 0,
        };
        self.regs[regs::MATH_RESULT / 4] = result;
    }

    fn status(&mut self) -> u32 {
        self.status_reads += 1;
        if self.stuck_busy {
            return status_bits::BUSY;
        }
        if self.busy_remaining > 0 {
            self.busy_remaining -= 1;
            return status_bits::BUSY;
        }
        status_bits::DONE
    }
}

impl RegisterAccess for SimGpu {
    fn read32(&mut self, offset: usize) -> Result<u32> {
        if self.closed {
            return Err(PeriphError::UseAfterClose { base: 0 });
        }
        check_offset(offset, self.window_len())?;
        let value = match offset {
            regs::ID => self.id,
            regs::STATUS => self.status(),
            regs::FB_DATA => {
                let index = self.reg(regs::FB_READ) as usize;
                self.framebuffer.get(index).copied().unwrap_or(0) as u32
            }
            _ => self.reg(offset),
        };
        Ok(value)
    }

    fn write32(&mut self, offset: usize, value: u32) -> Result<()> {
        if self.closed || self.writes_left == Some(0) {
            self.closed = true;
            return Err(PeriphError::UseAfterClose { base: 0 });
        }
        check_offset(offset, self.window_len())?;
        if let Some(left) = self.writes_left.as_mut() {
            *left -= 1;
        }
        self.writes.push((offset, value));
        match offset {
            regs::ID | regs::STATUS | regs::FB_DATA | regs::MATH_RESULT => {}
            regs::CMD => {
                self.regs[offset / 4] = value;
                self.execute(value);
                self.busy_remaining = self.busy_polls;
            }
            _ => self.regs[offset / 4] = value,
        }
        Ok(())
    }

    fn window_len(&self) -> usize {
        self.regs.len() * 4
    }
}
