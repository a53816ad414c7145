//! # Hardware Diagnostics
//!
//! Bring-up checks for the register windows and both peripherals. Every check
//! is recorded as a [`DiagCheck`] and the run carries on after a failure, so
//! one report shows everything that is wrong with a board. Nothing here prints;
//! presenting a [`DiagReport`] is left to the caller.
//!
//! ## Suites
//!
//! | Function                  | Exercises                                     |
//! |---------------------------|-----------------------------------------------|
//! | [`axi::write_ordering`]   | single, paired, repeated, delayed, burst writes |
//! | [`gpu::run`]              | identity, registers, math, drawing, read-back |
//! | [`cpu::run`]              | reset, PC, memories, telemetry, execution     |
//!
//! ## Failures
//!
//! Device errors (a hung GPU, an index out of range) fail the check that hit
//! them. Window faults
//! ([`is_window_fault`](crate::error::PeriphError::is_window_fault)) end the
//! run and are returned as the error, since every later check would fail the
//! same way.

pub mod axi;
pub mod cpu;
pub mod gpu;

use std::fmt;

use crate::error::Result;

/// How much a failed check matters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSeverity {
    /// The device cannot be trusted
    Critical,
    /// Unexpected, but the device may still work
    Warning,
    /// Observation only; always passes
    Info,
}

/// Outcome of one check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagCheck {
    pub name: String,
    pub passed: bool,
    pub message: String,
    pub severity: CheckSeverity,
}

impl fmt::Display for DiagCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = match (self.passed, self.severity) {
            (_, CheckSeverity::Info) => "INFO",
            (true, _) => "PASS",
            (false, CheckSeverity::Warning) => "WARN",
            (false, CheckSeverity::Critical) => "FAIL",
        };
        write!(f, "[{}] {}: {}", verdict, self.name, self.message)
    }
}

/// Checks collected by one diagnostic suite
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagReport {
    pub suite: String,
    pub checks: Vec<DiagCheck>,
}

impl DiagReport {
    pub fn new(suite: &str) -> Self {
        Self {
            suite: suite.to_string(),
            checks: Vec::new(),
        }
    }

    /// True when no critical check failed
    pub fn passed(&self) -> bool {
        !self
            .checks
            .iter()
            .any(|c| !c.passed && c.severity == CheckSeverity::Critical)
    }

    /// Failed checks of any severity
    pub fn failures(&self) -> impl Iterator<Item = &DiagCheck> {
        self.checks.iter().filter(|c| !c.passed)
    }

    pub fn check(&self, name: &str) -> Option<&DiagCheck> {
        self.checks.iter().find(|c| c.name == name)
    }

    /// Add a check, logging it if it failed
    pub fn push(&mut self, check: DiagCheck) {
        if !check.passed {
            log::warn!("{}: {}", self.suite, check);
        } else {
            log::debug!("{}: {}", self.suite, check);
        }
        self.checks.push(check);
    }

    /// Record `outcome` as a pass/fail check
    ///
    /// Device errors fail the check; window faults are handed back.
    pub(crate) fn judge(
        &mut self,
        name: &str,
        severity: CheckSeverity,
        outcome: Result<(bool, String)>,
    ) -> Result<()> {
        let (passed, message) = match outcome {
            Ok(verdict) => verdict,
            Err(e) if e.is_window_fault() => return Err(e),
            Err(e) => (false, e.to_string()),
        };
        self.push(DiagCheck {
            name: name.to_string(),
            passed,
            message,
            severity,
        });
        Ok(())
    }

    /// Critical check that a register read returned `expected`
    pub(crate) fn expect_word(
        &mut self,
        name: &str,
        expected: u32,
        read: Result<u32>,
    ) -> Result<()> {
        let outcome = read.map(|found| {
            if found == expected {
                (true, format!("{:#010x}", found))
            } else {
                (false, format!("read {:#010x}, expected {:#010x}", found, expected))
            }
        });
        self.judge(name, CheckSeverity::Critical, outcome)
    }

    /// Informational observation
    pub(crate) fn info(&mut self, name: &str, observed: Result<String>) -> Result<()> {
        self.judge(name, CheckSeverity::Info, observed.map(|message| (true, message)))
    }
}

impl fmt::Display for DiagReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        writeln!(f, "{} ({} checks, {} failed)", self.suite, self.checks.len(), failed)?;
        for check in &self.checks {
            writeln!(f, "  {}", check)?;
        }
        Ok(())
    }
}
