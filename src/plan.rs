//! What to send, where, and for how long

use std::fmt;
use std::time::Duration;

use crate::error::EmitError;
use crate::pacing::Pacing;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 2023;

/// When the send loop stops on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCondition {
    /// Stop after this many packets
    Count(u64),
    /// Stop once this much time has elapsed since the first send
    Duration(Duration),
}

impl StopCondition {
    pub fn validate(&self) -> Result<(), EmitError> {
        match *self {
            StopCondition::Count(0) => Err(EmitError::InvalidPlan(
                "packet count must be greater than zero".to_string(),
            )),
            StopCondition::Duration(d) if d.is_zero() => Err(EmitError::InvalidPlan(
                "duration must be greater than zero".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Requested packet total, if the run is count-bounded
    pub fn total(&self) -> Option<u64> {
        match *self {
            StopCondition::Count(n) => Some(n),
            StopCondition::Duration(_) => None,
        }
    }
}

impl fmt::Display for StopCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopCondition::Count(n) => write!(f, "{} packets", n),
            StopCondition::Duration(d) => write!(f, "{} seconds", d.as_secs_f64()),
        }
    }
}

/// A fully specified emission run
#[derive(Debug, Clone, PartialEq)]
pub struct EmitPlan {
    pub host: String,
    pub port: u16,
    pub pacing: Pacing,
    pub stop: StopCondition,
    /// Report progress every this many packets (0 disables progress lines)
    pub progress_every: u64,
}

impl EmitPlan {
    /// Count-bounded plan with a fixed inter-packet delay
    pub fn fixed(host: impl Into<String>, port: u16, count: u64, interval: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            pacing: Pacing::Fixed(interval),
            stop: StopCondition::Count(count),
            progress_every: 1,
        }
    }

    /// Duration-bounded plan paced to a target bitrate
    pub fn bitrate(host: impl Into<String>, port: u16, rate_mbps: f64, duration: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            pacing: Pacing::from_mbps(rate_mbps),
            stop: StopCondition::Duration(duration),
            progress_every: 1000,
        }
    }

    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_stop(mut self, stop: StopCondition) -> Self {
        self.stop = stop;
        self
    }

    /// `host:port` as handed to the resolver
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Reject plans that cannot run, before any socket is opened
    pub fn validate(&self) -> Result<(), EmitError> {
        if self.host.trim().is_empty() {
            return Err(EmitError::InvalidPlan("host must not be empty".to_string()));
        }
        self.stop.validate()?;
        self.pacing.validate()?;
        Ok(())
    }
}

impl Default for EmitPlan {
    fn default() -> Self {
        Self::fixed(DEFAULT_HOST, DEFAULT_PORT, 100, Duration::from_millis(100))
    }
}
