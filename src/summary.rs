//! Run statistics and console formatting

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::packet::PAYLOAD_BITS;
use crate::pacing::BITS_PER_MEGABIT;

/// Point-in-time view of a run, handed to observers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub packets_sent: u64,
    /// Counter value carried by the most recent packet
    pub last_sequence: u64,
    pub elapsed: Duration,
    /// Requested packet total for count-bounded runs
    pub total: Option<u64>,
}

impl Progress {
    pub fn achieved_mbps(&self) -> f64 {
        mbps(self.packets_sent, self.elapsed)
    }

    pub fn packets_per_second(&self) -> f64 {
        per_second(self.packets_sent, self.elapsed)
    }
}

/// Outcome of one emission run
#[derive(Debug, Clone, PartialEq)]
pub struct EmitSummary {
    pub started_at: DateTime<Local>,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub elapsed: Duration,
    /// Requested packet total for count-bounded runs
    pub requested: Option<u64>,
    /// True if the run ended because of an interrupt
    pub interrupted: bool,
}

impl EmitSummary {
    pub fn achieved_mbps(&self) -> f64 {
        mbps(self.packets_sent, self.elapsed)
    }

    pub fn packets_per_second(&self) -> f64 {
        per_second(self.packets_sent, self.elapsed)
    }

    /// True if every requested packet was sent
    pub fn is_complete(&self) -> bool {
        !self.interrupted && self.requested.map_or(true, |n| self.packets_sent == n)
    }
}

impl fmt::Display for EmitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packets in {:.2}s ({:.2} Mbps, {:.0} packets/sec)",
            group_thousands(self.packets_sent),
            self.elapsed.as_secs_f64(),
            self.achieved_mbps(),
            self.packets_per_second()
        )?;
        if self.interrupted {
            write!(f, " [interrupted]")?;
        }
        Ok(())
    }
}

fn mbps(packets: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    packets as f64 * PAYLOAD_BITS as f64 / (secs * BITS_PER_MEGABIT)
}

fn per_second(packets: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    packets as f64 / secs
}

/// Format an integer with comma thousands separators (1234567 -> "1,234,567")
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
