//! GPU command interface, generic over [`RegisterAccess`].
//!
//! The GPU is a small command queue: arguments and colour are latched into
//! their registers, then the write to CMD triggers execution. Nothing is
//! acknowledged; completion shows up as the BUSY status bit clearing.

use std::time::Duration;

use super::command::{GpuCommand, GpuStatus, MathOp};
use super::regs;
use crate::config::{PeriphConfig, RasterConfig};
use crate::error::{PeriphError, Region, Result};
use crate::wait::{settle, PollPolicy};
use crate::window::RegisterAccess;

#[cfg(unix)]
use crate::window::RegisterWindow;

/// Device name used in [`PeriphError::DeviceHung`]
const DEVICE: &str = "gpu";

/// Command-queue GPU behind a register window
pub struct GpuDevice<A: RegisterAccess> {
    bus: A,
    raster: RasterConfig,
    poll: PollPolicy,
    fb_settle: Duration,
}

impl<A: RegisterAccess> GpuDevice<A> {
    /// Wrap a register window without touching the hardware
    pub fn new(bus: A, config: &PeriphConfig) -> Self {
        Self {
            bus,
            raster: config.raster,
            poll: PollPolicy::from(&config.timing),
            fb_settle: config.timing.fb_settle(),
        }
    }

    /// Wrap a register window and verify the identity register
    pub fn detect(bus: A, config: &PeriphConfig) -> Result<Self> {
        let mut gpu = Self::new(bus, config);
        let found = gpu.id()?;
        if found != regs::EXPECTED_ID {
            return Err(PeriphError::GpuNotDetected {
                found,
                expected: regs::EXPECTED_ID,
            });
        }
        log::debug!("GPU detected, ID {:#010x}", found);
        Ok(gpu)
    }

    /// Read the identity register
    pub fn id(&mut self) -> Result<u32> {
        self.bus.read32(regs::ID)
    }

    /// Read and decode the status register
    pub fn status(&mut self) -> Result<GpuStatus> {
        Ok(GpuStatus::from_bits(self.bus.read32(regs::STATUS)?))
    }

    /// Whether a command is still executing
    pub fn is_busy(&mut self) -> Result<bool> {
        Ok(self.status()?.busy)
    }

    pub fn control(&mut self) -> Result<u32> {
        self.bus.read32(regs::CONTROL)
    }

    pub fn set_control(&mut self, value: u32) -> Result<()> {
        self.bus.write32(regs::CONTROL, value)
    }

    /// Poll STATUS until BUSY clears, bounded by the configured timeout
    pub fn await_ready(&mut self) -> Result<()> {
        let poll = self.poll;
        self.await_with(poll)
    }

    /// Poll STATUS until BUSY clears, bounded by `timeout`
    pub fn await_ready_within(&mut self, timeout: Duration) -> Result<()> {
        let poll = self.poll.with_timeout(timeout);
        self.await_with(poll)
    }

    fn await_with(&mut self, poll: PollPolicy) -> Result<()> {
        let bus = &mut self.bus;
        let polls = poll.wait(DEVICE, || {
            Ok(!GpuStatus::from_bits(bus.read32(regs::STATUS)?).busy)
        })?;
        if polls > 1 {
            log::trace!("GPU ready after {} polls", polls);
        }
        Ok(())
    }

    /// Write arguments, then colour, then the CMD trigger
    ///
    /// Does not wait for completion; follow with [`await_ready`](Self::await_ready).
    pub fn dispatch(&mut self, cmd: &GpuCommand) -> Result<()> {
        log::debug!("GPU dispatch {:?} args={:x?} color={:?}", cmd.opcode, cmd.args(), cmd.color);
        for (&reg, &value) in regs::ARGS.iter().zip(cmd.args()) {
            self.bus.write32(reg, value)?;
        }
        if let Some(color) = cmd.color {
            self.bus.write32(regs::COLOR, color as u32)?;
        }
        self.bus.write32(regs::CMD, cmd.opcode.code())
    }

    /// Wait for the queue, then dispatch
    fn submit(&mut self, cmd: &GpuCommand) -> Result<()> {
        self.await_ready()?;
        self.dispatch(cmd)
    }

    /// Fill the whole framebuffer with `color`
    pub fn clear(&mut self, color: u8) -> Result<()> {
        self.submit(&GpuCommand::clear(color))
    }

    /// Fill the rectangle with inclusive corners (x0, y0) and (x1, y1)
    ///
    /// Coordinates go to the hardware unchecked.
    pub fn fill_rect(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: u8) -> Result<()> {
        self.submit(&GpuCommand::fill_rect(x0, y0, x1, y1, color))
    }

    pub fn draw_line(&mut self, x0: u16, y0: u16, x1: u16, y1: u16, color: u8) -> Result<()> {
        self.submit(&GpuCommand::line(x0, y0, x1, y1, color))
    }

    pub fn draw_pixel(&mut self, x: u16, y: u16, color: u8) -> Result<()> {
        self.submit(&GpuCommand::pixel(x, y, color))
    }

    /// Render the built-in Mandelbrot set
    pub fn mandelbrot(&mut self) -> Result<()> {
        self.submit(&GpuCommand::mandelbrot())
    }

    /// Run one operation on the math coprocessor
    ///
    /// Completion is detected by polling BUSY rather than sleeping a fixed
    /// interval. The result register is reinterpreted as signed.
    pub fn math(&mut self, op: MathOp, a: i32, b: i32) -> Result<i32> {
        self.await_ready()?;
        self.bus.write32(regs::MATH_A, a as u32)?;
        self.bus.write32(regs::MATH_B, b as u32)?;
        self.bus.write32(regs::MATH_OP, op.code())?;
        self.dispatch(&GpuCommand::math())?;
        self.await_ready()?;
        let result = self.bus.read32(regs::MATH_RESULT)? as i32;
        log::debug!("GPU math {} {} {} = {}", a, op.symbol(), b, result);
        Ok(result)
    }

    /// Read one framebuffer sample through the FB_READ/FB_DATA channel
    pub fn read_pixel(&mut self, x: u32, y: u32) -> Result<u8> {
        if x >= self.raster.width {
            return Err(PeriphError::OutOfRange {
                region: Region::Raster,
                index: x as usize,
                limit: self.raster.width as usize,
            });
        }
        if y >= self.raster.height {
            return Err(PeriphError::OutOfRange {
                region: Region::Raster,
                index: y as usize,
                limit: self.raster.height as usize,
            });
        }
        // FB_READ is 32 bits wide; larger rasters cannot address their tail
        let address = y
            .checked_mul(self.raster.width)
            .and_then(|row| row.checked_add(x))
            .ok_or(PeriphError::OutOfRange {
                region: Region::Raster,
                index: y as usize,
                limit: (u32::MAX / self.raster.width) as usize,
            })?;
        self.bus.write32(regs::FB_READ, address)?;
        settle(self.fb_settle);
        Ok((self.bus.read32(regs::FB_DATA)? & 0xFF) as u8)
    }

    /// Framebuffer geometry this device was configured with
    pub fn raster(&self) -> RasterConfig {
        self.raster
    }

    /// Raw register access, for diagnostics
    pub fn bus_mut(&mut self) -> &mut A {
        &mut self.bus
    }

    /// Give back the register window
    pub fn into_inner(self) -> A {
        self.bus
    }
}

#[cfg(unix)]
impl GpuDevice<RegisterWindow> {
    /// Map the GPU window described by `config`
    pub fn open(config: &PeriphConfig) -> Result<Self> {
        let window =
            RegisterWindow::open_device(&config.mem_device, config.gpu_base, config.map_len)?;
        Ok(Self::new(window, config))
    }

    /// Unmap the GPU window
    pub fn close(&mut self) -> Result<()> {
        self.bus.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::gpu::command::Opcode;
    use crate::sim::SimGpu;

    fn config() -> PeriphConfig {
        PeriphConfig::default().with_timing(TimingConfig::immediate())
    }

    fn make_gpu() -> GpuDevice<SimGpu> {
        GpuDevice::new(SimGpu::new(320, 200), &config())
    }

    #[test]
    fn test_detect_accepts_expected_id() {
        let gpu = GpuDevice::detect(SimGpu::new(320, 200), &config());
        assert!(gpu.is_ok());
    }

    #[test]
    fn test_detect_rejects_wrong_id() {
        let mut sim = SimGpu::new(320, 200);
        sim.set_id(0xDEAD_BEEF);
        match GpuDevice::detect(sim, &config()) {
            Err(PeriphError::GpuNotDetected { found, expected }) => {
                assert_eq!(found, 0xDEAD_BEEF);
                assert_eq!(expected, 0xABCD_1234);
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_dispatch_writes_cmd_last() {
        let mut gpu = make_gpu();
        gpu.dispatch(&GpuCommand::fill_rect(1, 2, 3, 4, 0x55)).unwrap();
        let writes = gpu.bus_mut().take_writes();
        assert_eq!(
            writes,
            vec![
                (regs::ARG0, (2 << 16) | 1),
                (regs::ARG1, (4 << 16) | 3),
                (regs::COLOR, 0x55),
                (regs::CMD, Opcode::FillRect.code()),
            ]
        );
    }

    #[test]
    fn test_clear_writes_color_then_cmd() {
        let mut gpu = make_gpu();
        gpu.clear(0x12).unwrap();
        let writes = gpu.bus_mut().take_writes();
        assert_eq!(writes, vec![(regs::COLOR, 0x12), (regs::CMD, Opcode::Clear.code())]);
    }

    #[test]
    fn test_drawing_waits_for_ready_first() {
        let mut gpu = make_gpu();
        gpu.bus_mut().set_busy_polls(3);
        gpu.dispatch(&GpuCommand::nop()).unwrap();
        gpu.draw_pixel(5, 5, 0xFF).unwrap();
        // The pixel command could only be issued once the NOP drained
        assert!(gpu.bus_mut().status_reads() >= 4);
        gpu.await_ready().unwrap();
        assert_eq!(gpu.read_pixel(5, 5).unwrap(), 0xFF);
    }

    #[test]
    fn test_await_ready_returns_only_when_idle() {
        let mut gpu = make_gpu();
        gpu.bus_mut().set_busy_polls(5);
        gpu.dispatch(&GpuCommand::nop()).unwrap();
        gpu.await_ready().unwrap();
        assert!(!gpu.is_busy().unwrap());
    }

    #[test]
    fn test_await_ready_times_out_when_hung() {
        let mut gpu = make_gpu();
        gpu.bus_mut().set_stuck_busy(true);
        let err = gpu.await_ready_within(Duration::from_millis(5)).unwrap_err();
        assert!(matches!(err, PeriphError::DeviceHung { device: "gpu", .. }));
    }

    #[test]
    fn test_math_cases() {
        let mut gpu = make_gpu();
        assert_eq!(gpu.math(MathOp::Add, 100, 50).unwrap(), 150);
        assert_eq!(gpu.math(MathOp::Sub, 100, 50).unwrap(), 50);
        assert_eq!(gpu.math(MathOp::Mul, 12, 5).unwrap(), 60);
        assert_eq!(gpu.math(MathOp::Div, 100, 4).unwrap(), 25);
    }

    #[test]
    fn test_math_result_is_signed() {
        let mut gpu = make_gpu();
        assert_eq!(gpu.math(MathOp::Sub, 5, 12).unwrap(), -7);
        assert_eq!(gpu.math(MathOp::Mul, -3, 4).unwrap(), -12);
    }

    #[test]
    fn test_math_write_order() {
        let mut gpu = make_gpu();
        gpu.math(MathOp::Mul, 12, 5).unwrap();
        let writes = gpu.bus_mut().take_writes();
        assert_eq!(
            writes,
            vec![
                (regs::MATH_A, 12),
                (regs::MATH_B, 5),
                (regs::MATH_OP, MathOp::Mul.code()),
                (regs::CMD, Opcode::MathOp.code()),
            ]
        );
    }

    #[test]
    fn test_read_pixel_linear_address() {
        let mut gpu = make_gpu();
        gpu.read_pixel(10, 20).unwrap();
        assert_eq!(gpu.bus_mut().take_writes(), vec![(regs::FB_READ, 20 * 320 + 10)]);
    }

    #[test]
    fn test_read_pixel_bounds() {
        let mut gpu = make_gpu();
        assert!(matches!(
            gpu.read_pixel(320, 0),
            Err(PeriphError::OutOfRange { region: Region::Raster, index: 320, limit: 320 })
        ));
        assert!(matches!(
            gpu.read_pixel(0, 200),
            Err(PeriphError::OutOfRange { region: Region::Raster, index: 200, limit: 200 })
        ));
        assert!(gpu.bus_mut().take_writes().is_empty());
    }

    #[test]
    fn test_read_pixel_beyond_address_register() {
        let config = config().with_raster(70_000, 70_000);
        let mut gpu = GpuDevice::new(SimGpu::new(4, 4), &config);
        assert!(matches!(
            gpu.read_pixel(0, 69_999),
            Err(PeriphError::OutOfRange { region: Region::Raster, index: 69_999, .. })
        ));
        assert!(gpu.bus_mut().take_writes().is_empty());
        // Rows low enough to address still go out
        gpu.read_pixel(5, 1).unwrap();
        assert_eq!(gpu.bus_mut().take_writes(), vec![(regs::FB_READ, 70_005)]);
    }

    #[test]
    fn test_fill_rect_then_read_back() {
        let mut gpu = make_gpu();
        gpu.clear(0x00).unwrap();
        gpu.fill_rect(50, 50, 100, 100, 0xAA).unwrap();
        gpu.await_ready().unwrap();
        assert_eq!(gpu.read_pixel(75, 75).unwrap(), 0xAA);
        assert_eq!(gpu.read_pixel(50, 100).unwrap(), 0xAA);
        assert_eq!(gpu.read_pixel(49, 75).unwrap(), 0x00);
        assert_eq!(gpu.read_pixel(101, 101).unwrap(), 0x00);
    }

    #[test]
    fn test_control_register_round_trip() {
        let mut gpu = make_gpu();
        gpu.set_control(0x1234_5678).unwrap();
        assert_eq!(gpu.control().unwrap(), 0x1234_5678);
    }
}
