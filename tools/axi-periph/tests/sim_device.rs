//! End-to-end behaviour of the drivers against the software models and
//! against file-backed register windows.

use std::time::Duration;

use axi_periph::config::TimingConfig;
use axi_periph::cpu::regs as cpu_regs;
use axi_periph::diag;
use axi_periph::gpu::patterns;
use axi_periph::sim::{SimCpu, SimGpu};
use axi_periph::{
    capture, CpuDevice, GpuDevice, MathOp, PeriphConfig, PeriphError, RegisterAccess,
    RegisterWindow,
};
use tempfile::NamedTempFile;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn fast_config() -> PeriphConfig {
    PeriphConfig::default().with_timing(TimingConfig::immediate())
}

fn sim_gpu() -> GpuDevice<SimGpu> {
    GpuDevice::detect(SimGpu::new(320, 200), &fast_config()).unwrap()
}

/// Config whose two windows live side by side in one temporary file
fn file_backed_config() -> (NamedTempFile, PeriphConfig) {
    let file = NamedTempFile::new().unwrap();
    let mut config = fast_config().with_mem_device(file.path());
    config.gpu_base = 0;
    config.cpu_base = config.map_len as u64;
    file.as_file().set_len(2 * config.map_len as u64).unwrap();
    (file, config)
}

#[test]
fn test_math_reference_cases() {
    init_logging();
    let mut gpu = sim_gpu();
    assert_eq!(gpu.math(MathOp::Add, 100, 50).unwrap(), 150);
    assert_eq!(gpu.math(MathOp::Sub, 100, 50).unwrap(), 50);
    assert_eq!(gpu.math(MathOp::Mul, 12, 5).unwrap(), 60);
    assert_eq!(gpu.math(MathOp::Div, 100, 4).unwrap(), 25);
}

#[test]
fn test_math_waits_out_a_slow_unit() {
    init_logging();
    let mut gpu = sim_gpu();
    gpu.bus_mut().set_busy_polls(10);
    assert_eq!(gpu.math(MathOp::Mul, -6, 7).unwrap(), -42);
    assert!(!gpu.is_busy().unwrap());
}

#[test]
fn test_fill_rect_interior_and_exterior() {
    init_logging();
    let mut gpu = sim_gpu();
    gpu.bus_mut().set_busy_polls(2);
    gpu.clear(0x00).unwrap();
    gpu.fill_rect(50, 50, 100, 100, 0xAA).unwrap();
    gpu.await_ready().unwrap();

    for &(x, y) in &[(50, 50), (75, 75), (100, 100), (50, 100)] {
        assert_eq!(gpu.read_pixel(x, y).unwrap(), 0xAA, "inside ({}, {})", x, y);
    }
    for &(x, y) in &[(49, 50), (101, 75), (75, 49), (75, 101), (0, 0), (319, 199)] {
        assert_eq!(gpu.read_pixel(x, y).unwrap(), 0x00, "outside ({}, {})", x, y);
    }
}

#[test]
fn test_capture_of_cleared_frame_is_uniform() {
    init_logging();
    let mut gpu = sim_gpu();
    gpu.clear(0x37).unwrap();
    gpu.await_ready().unwrap();
    let frame = capture(&mut gpu, 320, 200).unwrap();
    assert_eq!(frame.as_bytes().len(), 320 * 200);
    assert!(frame.as_bytes().iter().all(|&p| p == 0x37));
}

#[test]
fn test_capture_matches_test_pattern() {
    init_logging();
    let mut gpu = sim_gpu();
    patterns::test_pattern(&mut gpu).unwrap();
    let raster = gpu.raster();
    let frame = gpu.capture_frame().unwrap();
    for (y, row) in frame.rows().enumerate() {
        for (x, &p) in row.iter().enumerate() {
            assert_eq!(p, patterns::test_pattern_pixel(raster, x as u32, y as u32));
        }
    }
}

#[test]
fn test_hung_gpu_reports_device_hung() {
    init_logging();
    let mut gpu = sim_gpu();
    gpu.bus_mut().set_stuck_busy(true);
    let err = gpu.clear(0).unwrap_err();
    assert!(matches!(err, PeriphError::DeviceHung { device: "gpu", .. }));
}

#[test]
fn test_cpu_program_load_and_run() {
    init_logging();
    let config = fast_config();
    let mut cpu = CpuDevice::new(SimCpu::new(config.map_len), &config);
    cpu.reset().unwrap();
    cpu.load_program(&[cpu_regs::NOP; 16]).unwrap();
    assert_eq!(cpu.read_instruction(15).unwrap(), cpu_regs::NOP);
    cpu.set_pc(0).unwrap();
    cpu.run().unwrap();
    let first = cpu.get_pc().unwrap();
    let second = cpu.get_pc().unwrap();
    assert!(second > first);
    cpu.stop().unwrap();
    assert_eq!(cpu.get_debug_state().unwrap().state, 0);
}

#[test]
fn test_diagnostics_pass_on_models() {
    init_logging();
    let config = fast_config();
    let mut gpu = sim_gpu();
    let mut cpu = CpuDevice::new(SimCpu::new(config.map_len), &config);

    let axi = diag::axi::write_ordering(cpu.bus_mut(), Duration::ZERO).unwrap();
    let gpu_report = diag::gpu::run(&mut gpu).unwrap();
    let cpu_report = diag::cpu::run(&mut cpu, Duration::ZERO).unwrap();

    for report in [&axi, &gpu_report, &cpu_report] {
        assert!(report.passed(), "{}", report);
    }
}

#[test]
fn test_file_backed_windows_round_trip() {
    init_logging();
    let (_file, config) = file_backed_config();
    let mut gpu = GpuDevice::open(&config).unwrap();
    let mut cpu = CpuDevice::open(&config).unwrap();

    gpu.set_control(0xCAFE_F00D).unwrap();
    cpu.write_data(0, 0x0BAD_F00D).unwrap();

    // Independent windows over distinct ranges
    assert_eq!(gpu.control().unwrap(), 0xCAFE_F00D);
    assert_eq!(cpu.read_data(0).unwrap(), 0x0BAD_F00D);
    assert_eq!(cpu.control().unwrap(), 0);

    gpu.close().unwrap();
    cpu.close().unwrap();
}

#[test]
fn test_write_ordering_on_file_backed_window() {
    init_logging();
    let (_file, config) = file_backed_config();
    let mut window =
        RegisterWindow::open_device(&config.mem_device, config.cpu_base, config.map_len).unwrap();
    let report = diag::axi::write_ordering(&mut window, config.timing.diag_delay()).unwrap();
    assert!(report.passed(), "{}", report);
    assert_eq!(window.read32(cpu_regs::INSTR_BASE + 0x30).unwrap(), 0x5555_5555);
}

#[test]
fn test_closed_window_rejects_everything() {
    init_logging();
    let (_file, config) = file_backed_config();
    let mut gpu = GpuDevice::open(&config).unwrap();
    gpu.close().unwrap();

    assert!(matches!(gpu.id(), Err(PeriphError::UseAfterClose { .. })));
    assert!(matches!(gpu.set_control(1), Err(PeriphError::UseAfterClose { .. })));
    assert!(matches!(gpu.read_pixel(0, 0), Err(PeriphError::UseAfterClose { .. })));
    assert!(matches!(gpu.close(), Err(PeriphError::UseAfterClose { .. })));

    // Window faults end a diagnostic run instead of failing every check
    assert!(matches!(diag::gpu::run(&mut gpu), Err(PeriphError::UseAfterClose { .. })));
}

#[test]
fn test_config_file_drives_geometry() {
    init_logging();
    let mut file = NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"[raster]\nwidth = 64\nheight = 48\n").unwrap();
    let config = PeriphConfig::load(file.path()).unwrap();
    let config = config.with_timing(TimingConfig::immediate());

    let mut gpu = GpuDevice::new(SimGpu::new(64, 48), &config);
    gpu.clear(9).unwrap();
    let frame = gpu.capture_frame().unwrap();
    assert_eq!((frame.width(), frame.height()), (64, 48));
    assert!(matches!(
        gpu.read_pixel(64, 0),
        Err(PeriphError::OutOfRange { limit: 64, .. })
    ));
}
