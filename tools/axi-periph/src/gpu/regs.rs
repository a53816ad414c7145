//! GPU register map
//!
//! | Offset | Register    | Access |
//! |--------|-------------|--------|
//! | 0x00   | ID          | R      |
//! | 0x04   | STATUS      | R      |
//! | 0x08   | CONTROL     | R/W    |
//! | 0x0C   | CMD         | W      |
//! | 0x10   | ARG0..ARG3  | R/W    |
//! | 0x20   | COLOR       | R/W    |
//! | 0x40   | FB_READ     | W      |
//! | 0x44   | FB_DATA     | R      |
//! | 0x80   | MATH_A      | R/W    |
//! | 0x84   | MATH_B      | R/W    |
//! | 0x88   | MATH_OP     | R/W    |
//! | 0x8C   | MATH_RESULT | R      |

pub const ID: usize = 0x00;
pub const STATUS: usize = 0x04;
pub const CONTROL: usize = 0x08;
pub const CMD: usize = 0x0C;
pub const ARG0: usize = 0x10;
pub const ARG1: usize = 0x14;
pub const ARG2: usize = 0x18;
pub const ARG3: usize = 0x1C;
pub const COLOR: usize = 0x20;
pub const FB_READ: usize = 0x40;
pub const FB_DATA: usize = 0x44;
pub const MATH_A: usize = 0x80;
pub const MATH_B: usize = 0x84;
pub const MATH_OP: usize = 0x88;
pub const MATH_RESULT: usize = 0x8C;

/// Argument registers in dispatch order
pub const ARGS: [usize; 4] = [ARG0, ARG1, ARG2, ARG3];

/// Value of the ID register on a correctly loaded bitstream
pub const EXPECTED_ID: u32 = 0xABCD_1234;

/// STATUS register bits
pub mod status_bits {
    /// Command in progress
    pub const BUSY: u32 = 1 << 0;
    /// Last command completed
    pub const DONE: u32 = 1 << 1;
}

/// Pack a raster coordinate as `(y << 16) | x`
#[inline]
pub const fn pack_point(x: u16, y: u16) -> u32 {
    ((y as u32) << 16) | x as u32
}

/// Inverse of [`pack_point`]
#[inline]
pub const fn unpack_point(word: u32) -> (u16, u16) {
    ((word & 0xFFFF) as u16, (word >> 16) as u16)
}
