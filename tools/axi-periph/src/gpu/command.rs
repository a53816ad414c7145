//! GPU commands, math operations and status decoding

use super::regs::{self, pack_point, status_bits};
use crate::error::{PeriphError, Result};

/// Command codes written to CMD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    Nop = 0,
    Clear = 1,
    FillRect = 2,
    DrawLine = 3,
    DrawPixel = 4,
    Mandelbrot = 5,
    MathOp = 6,
}

impl Opcode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Opcode::Nop),
            1 => Some(Opcode::Clear),
            2 => Some(Opcode::FillRect),
            3 => Some(Opcode::DrawLine),
            4 => Some(Opcode::DrawPixel),
            5 => Some(Opcode::Mandelbrot),
            6 => Some(Opcode::MathOp),
            _ => None,
        }
    }
}

/// Math coprocessor operations written to MATH_OP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MathOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    /// Division by zero is whatever the hardware makes of it
    Div = 3,
}

impl MathOp {
    pub const ALL: [MathOp; 4] = [MathOp::Add, MathOp::Sub, MathOp::Mul, MathOp::Div];

    pub const fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(MathOp::Add),
            1 => Some(MathOp::Sub),
            2 => Some(MathOp::Mul),
            3 => Some(MathOp::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            MathOp::Add => "+",
            MathOp::Sub => "-",
            MathOp::Mul => "*",
            MathOp::Div => "/",
        }
    }
}

/// Decoded STATUS word
///
/// Rebuilt on every poll; never cache one across a register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuStatus {
    pub raw: u32,
    pub busy: bool,
    pub done: bool,
}

impl GpuStatus {
    pub const fn from_bits(raw: u32) -> Self {
        Self {
            raw,
            busy: raw & status_bits::BUSY != 0,
            done: raw & status_bits::DONE != 0,
        }
    }
}

/// One command ready for dispatch
///
/// Up to four arguments, written to ARG0.. in order, and an optional colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuCommand {
    pub opcode: Opcode,
    args: [u32; 4],
    argc: usize,
    pub color: Option<u8>,
}

impl GpuCommand {
    const fn with(opcode: Opcode, args: [u32; 4], argc: usize, color: Option<u8>) -> Self {
        Self {
            opcode,
            args,
            argc,
            color,
        }
    }

    /// Build a command from arbitrary arguments
    pub fn raw(opcode: Opcode, args: &[u32], color: Option<u8>) -> Result<Self> {
        if args.len() > regs::ARGS.len() {
            return Err(PeriphError::TooManyArguments {
                given: args.len(),
                max: regs::ARGS.len(),
            });
        }
        let mut packed = [0u32; 4];
        packed[..args.len()].copy_from_slice(args);
        Ok(Self::with(opcode, packed, args.len(), color))
    }

    pub const fn nop() -> Self {
        Self::with(Opcode::Nop, [0; 4], 0, None)
    }

    pub const fn clear(color: u8) -> Self {
        Self::with(Opcode::Clear, [0; 4], 0, Some(color))
    }

    /// Rectangle with inclusive corners (x0, y0) and (x1, y1)
    pub const fn fill_rect(x0: u16, y0: u16, x1: u16, y1: u16, color: u8) -> Self {
        Self::with(
            Opcode::FillRect,
            [pack_point(x0, y0), pack_point(x1, y1), 0, 0],
            2,
            Some(color),
        )
    }

    pub const fn line(x0: u16, y0: u16, x1: u16, y1: u16, color: u8) -> Self {
        Self::with(
            Opcode::DrawLine,
            [pack_point(x0, y0), pack_point(x1, y1), 0, 0],
            2,
            Some(color),
        )
    }

    pub const fn pixel(x: u16, y: u16, color: u8) -> Self {
        Self::with(Opcode::DrawPixel, [pack_point(x, y), 0, 0, 0], 1, Some(color))
    }

    pub const fn mandelbrot() -> Self {
        Self::with(Opcode::Mandelbrot, [0; 4], 0, None)
    }

    /// Trigger for the math unit; operands travel in MATH_A/MATH_B/MATH_OP
    pub const fn math() -> Self {
        Self::with(Opcode::MathOp, [0; 4], 0, None)
    }

    /// Arguments actually written at dispatch
    pub fn args(&self) -> &[u32] {
        &self.args[..self.argc]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_codes() {
        assert_eq!(Opcode::Nop.code(), 0);
        assert_eq!(Opcode::MathOp.code(), 6);
        for code in 0..7 {
            assert_eq!(Opcode::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Opcode::from_code(7), None);
    }

    #[test]
    fn test_math_op_codes() {
        assert_eq!(MathOp::Div.code(), 3);
        assert_eq!(MathOp::from_code(1), Some(MathOp::Sub));
        assert_eq!(MathOp::from_code(4), None);
    }

    #[test]
    fn test_status_decode() {
        let idle = GpuStatus::from_bits(0);
        assert!(!idle.busy && !idle.done);
        let busy = GpuStatus::from_bits(0x1);
        assert!(busy.busy && !busy.done);
        let done = GpuStatus::from_bits(0x2);
        assert!(!done.busy && done.done);
        assert_eq!(GpuStatus::from_bits(0xFFFF_FFFF).raw, 0xFFFF_FFFF);
    }

    #[test]
    fn test_fill_rect_packing() {
        let cmd = GpuCommand::fill_rect(50, 50, 100, 100, 0xAA);
        assert_eq!(cmd.opcode, Opcode::FillRect);
        assert_eq!(cmd.args(), &[(50 << 16) | 50, (100 << 16) | 100]);
        assert_eq!(cmd.color, Some(0xAA));
    }

    #[test]
    fn test_pixel_packing() {
        let cmd = GpuCommand::pixel(10, 20, 0xFF);
        assert_eq!(cmd.args(), &[(20 << 16) | 10]);
    }

    #[test]
    fn test_clear_has_no_args() {
        let cmd = GpuCommand::clear(0x42);
        assert!(cmd.args().is_empty());
        assert_eq!(cmd.color, Some(0x42));
    }

    #[test]
    fn test_raw_rejects_five_args() {
        let err = GpuCommand::raw(Opcode::Nop, &[1, 2, 3, 4, 5], None).unwrap_err();
        assert!(matches!(err, PeriphError::TooManyArguments { given: 5, max: 4 }));
        let ok = GpuCommand::raw(Opcode::Mandelbrot, &[1, 2, 3, 4], Some(1)).unwrap();
        assert_eq!(ok.args(), &[1, 2, 3, 4]);
    }
}
