//! Bounded busy-wait
//!
//! The peripherals report completion only through a status bit. Waiting is a
//! poll loop on the calling thread: check, sleep one interval, check again,
//! until the condition holds or the deadline passes.

use std::thread;
use std::time::{Duration, Instant};

use crate::config::TimingConfig;
use crate::error::{PeriphError, Result};

/// Poll interval and overall bound for a ready-wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Same interval, different bound
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    /// Poll `ready` until it returns true or the timeout elapses
    ///
    /// Returns the number of polls taken. The condition is always evaluated at
    /// least once, and success is only reported straight after a poll that
    /// observed it, so the caller never proceeds on a stale reading.
    pub fn wait<F>(&self, device: &'static str, ready: F) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
    {
        let start = Instant::now();
        self.poll(device, start, start + self.timeout, ready)
    }

    /// Poll `ready` until it returns true or `deadline` passes
    pub fn wait_until<F>(&self, device: &'static str, deadline: Instant, ready: F) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
    {
        self.poll(device, Instant::now(), deadline, ready)
    }

    // `waited` in DeviceHung is measured from `start`
    fn poll<F>(
        &self,
        device: &'static str,
        start: Instant,
        deadline: Instant,
        mut ready: F,
    ) -> Result<u32>
    where
        F: FnMut() -> Result<bool>,
    {
        let mut polls = 0u32;
        loop {
            polls = polls.saturating_add(1);
            if ready()? {
                return Ok(polls);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(PeriphError::DeviceHung {
                    device,
                    waited: now - start,
                });
            }

            let pause = self.interval.min(deadline - now);
            if pause.is_zero() {
                std::hint::spin_loop();
            } else {
                thread::sleep(pause);
            }
        }
    }
}

impl From<&TimingConfig> for PollPolicy {
    fn from(timing: &TimingConfig) -> Self {
        Self::new(timing.poll_interval(), timing.ready_timeout())
    }
}

/// Sleep unless the duration is zero
pub(crate) fn settle(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
