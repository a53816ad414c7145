//! Peripheral configuration
//!
//! Physical addresses, window size, raster geometry, memory sizes and the
//! timing knobs of the poll loops. Every field has a default matching the
//! reference bitstream, so an empty TOML file is a valid configuration.
//!
//! ```toml
//! gpu_base = 0x43000000
//! map_len = 0x10000
//!
//! [raster]
//! width = 320
//! height = 200
//!
//! [timing]
//! ready_timeout_ms = 500
//! ```

use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cpu::regs as cpu_reg;

/// GPU peripheral physical base
pub const DEFAULT_GPU_BASE: u64 = 0x4300_0000;

/// CPU peripheral physical base
pub const DEFAULT_CPU_BASE: u64 = 0x4400_0000;

/// Largest window size used by any of the bring-up programs
pub const DEFAULT_MAP_LEN: usize = 0x1_0000;

/// Device node exposing physical memory
pub const DEFAULT_MEM_DEVICE: &str = "/dev/mem";

/// Framebuffer geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 200,
        }
    }
}

impl RasterConfig {
    /// Number of pixels in the raster
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// CPU memory sizes, in 32-bit words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuMemoryConfig {
    pub instr_words: usize,
    pub data_words: usize,
}

impl Default for CpuMemoryConfig {
    fn default() -> Self {
        Self {
            // Instruction memory ends where data memory starts
            instr_words: (cpu_reg::DATA_BASE - cpu_reg::INSTR_BASE) / 4,
            data_words: 16,
        }
    }
}

/// Poll and settle timings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Sleep between two status polls
    pub poll_interval_us: u64,
    /// Upper bound on any ready-wait
    pub ready_timeout_ms: u64,
    /// How long RESET is held asserted
    pub reset_hold_us: u64,
    /// Delay between FB_READ and FB_DATA
    pub fb_settle_us: u64,
    /// Delay the diagnostics insert for their "delayed write" checks
    pub diag_delay_us: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval_us: 100,
            ready_timeout_ms: 1000,
            reset_hold_us: 1000,
            fb_settle_us: 10,
            diag_delay_us: 10_000,
        }
    }
}

impl TimingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn reset_hold(&self) -> Duration {
        Duration::from_micros(self.reset_hold_us)
    }

    pub fn fb_settle(&self) -> Duration {
        Duration::from_micros(self.fb_settle_us)
    }

    pub fn diag_delay(&self) -> Duration {
        Duration::from_micros(self.diag_delay_us)
    }

    /// All sleeps zeroed, for software models
    pub fn immediate() -> Self {
        Self {
            poll_interval_us: 0,
            ready_timeout_ms: 50,
            reset_hold_us: 0,
            fb_settle_us: 0,
            diag_delay_us: 0,
        }
    }
}

/// Full driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriphConfig {
    /// Device node to map (normally /dev/mem)
    pub mem_device: PathBuf,
    pub gpu_base: u64,
    pub cpu_base: u64,
    /// Size of each register window in bytes
    pub map_len: usize,
    pub raster: RasterConfig,
    pub cpu: CpuMemoryConfig,
    pub timing: TimingConfig,
}

impl Default for PeriphConfig {
    fn default() -> Self {
        Self {
            mem_device: PathBuf::from(DEFAULT_MEM_DEVICE),
            gpu_base: DEFAULT_GPU_BASE,
            cpu_base: DEFAULT_CPU_BASE,
            map_len: DEFAULT_MAP_LEN,
            raster: RasterConfig::default(),
            cpu: CpuMemoryConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

impl PeriphConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))
    }

    /// Parse and validate TOML content
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Check that every region fits in the window and the timings are usable
    pub fn validate(&self) -> Result<()> {
        ensure!(self.map_len > 0, "map_len must be non-zero");
        ensure!(
            self.map_len % 4 == 0,
            "map_len {:#x} is not a multiple of 4",
            self.map_len
        );
        ensure!(
            self.raster.width > 0 && self.raster.height > 0,
            "raster {}x{} is empty",
            self.raster.width,
            self.raster.height
        );
        ensure!(
            self.raster.width.checked_mul(self.raster.height).is_some(),
            "raster {}x{} cannot be addressed through the 32-bit FB_READ register",
            self.raster.width,
            self.raster.height
        );
        let instr_end = word_span_end(cpu_reg::INSTR_BASE, self.cpu.instr_words);
        ensure!(
            instr_end.map_or(false, |end| end <= cpu_reg::DATA_BASE),
            "{} instruction words overlap data memory at {:#x}",
            self.cpu.instr_words,
            cpu_reg::DATA_BASE
        );
        let data_end = word_span_end(cpu_reg::DATA_BASE, self.cpu.data_words);
        ensure!(
            data_end.map_or(false, |end| end <= self.map_len),
            "{} data words do not fit in a {:#x}-byte window",
            self.cpu.data_words,
            self.map_len
        );
        ensure!(
            self.timing.ready_timeout_ms > 0,
            "ready_timeout_ms must be non-zero"
        );
        Ok(())
    }

    /// Set the device node to map
    pub fn with_mem_device(mut self, path: impl Into<PathBuf>) -> Self {
        self.mem_device = path.into();
        self
    }

    /// Set the window size
    pub fn with_map_len(mut self, map_len: usize) -> Self {
        self.map_len = map_len;
        self
    }

    /// Set the ready-wait bound
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timing.ready_timeout_ms = timeout.as_millis().max(1) as u64;
        self
    }

    /// Replace all timings
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Set the raster geometry
    pub fn with_raster(mut self, width: u32, height: u32) -> Self {
        self.raster = RasterConfig { width, height };
        self
    }
}

/// Byte offset just past `words` 32-bit words starting at `base`
fn word_span_end(base: usize, words: usize) -> Option<usize> {
    words.checked_mul(4)?.checked_add(base)
}
