//! Inter-packet cadence
//!
//! The emitter never sleeps "a delay after each send". Instead every packet
//! `n` has an absolute deadline `start + n * interval`; if the loop falls
//! behind (timer granularity, slow sends) the overdue packets go out
//! back-to-back until the schedule is caught up.

use std::fmt;
use std::time::Duration;

use crate::error::EmitError;
use crate::packet::PAYLOAD_BITS;

/// Bits per second in one megabit per second
pub const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// How packets are spaced in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pacing {
    /// Fixed delay between consecutive packets
    Fixed(Duration),
    /// Delay derived from a target bitrate and the fixed payload size
    Bitrate { bits_per_sec: f64 },
    /// Send as fast as the socket accepts
    Unpaced,
}

impl Pacing {
    pub fn from_mbps(rate_mbps: f64) -> Self {
        Pacing::Bitrate {
            bits_per_sec: rate_mbps * BITS_PER_MEGABIT,
        }
    }

    pub fn validate(&self) -> Result<(), EmitError> {
        match *self {
            Pacing::Fixed(interval) if interval.is_zero() => Err(EmitError::InvalidPlan(
                "fixed interval must be greater than zero".to_string(),
            )),
            Pacing::Bitrate { bits_per_sec } => {
                if !bits_per_sec.is_finite() || bits_per_sec <= 0.0 {
                    return Err(EmitError::InvalidPlan(format!(
                        "bitrate must be positive, got {} bit/s",
                        bits_per_sec
                    )));
                }
                if packets_per_second(bits_per_sec) == 0 {
                    return Err(EmitError::InvalidPlan(format!(
                        "bitrate of {} bit/s is below one {}-bit packet per second",
                        bits_per_sec, PAYLOAD_BITS
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Time between consecutive packets, `None` when unpaced
    pub fn interval(&self) -> Option<Duration> {
        match *self {
            Pacing::Fixed(interval) => Some(interval),
            Pacing::Bitrate { bits_per_sec } => {
                let pps = packets_per_second(bits_per_sec);
                if pps == 0 {
                    None
                } else {
                    Some(Duration::from_secs_f64(1.0 / pps as f64))
                }
            }
            Pacing::Unpaced => None,
        }
    }

    /// Target packet rate, `None` when unpaced
    pub fn packets_per_second(&self) -> Option<f64> {
        match *self {
            Pacing::Fixed(interval) => Some(1.0 / interval.as_secs_f64()),
            Pacing::Bitrate { bits_per_sec } => Some(packets_per_second(bits_per_sec) as f64),
            Pacing::Unpaced => None,
        }
    }

    /// Offset from the start of the run at which packet `index` is due
    ///
    /// Computed from the rate rather than by repeated addition so rounding of
    /// sub-microsecond intervals does not accumulate. Offsets too large for a
    /// `Duration` saturate to `Duration::MAX`.
    pub fn deadline_offset(&self, index: u64) -> Option<Duration> {
        match *self {
            Pacing::Fixed(interval) => Some(saturating_secs(interval.as_secs_f64() * index as f64)),
            Pacing::Bitrate { bits_per_sec } => {
                let pps = packets_per_second(bits_per_sec);
                if pps == 0 {
                    return None;
                }
                Some(saturating_secs(index as f64 / pps as f64))
            }
            Pacing::Unpaced => None,
        }
    }
}

impl fmt::Display for Pacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pacing::Fixed(interval) => write!(f, "fixed {:.3} ms", interval.as_secs_f64() * 1000.0),
            Pacing::Bitrate { bits_per_sec } => {
                write!(f, "{} Mbps", bits_per_sec / BITS_PER_MEGABIT)
            }
            Pacing::Unpaced => write!(f, "unpaced"),
        }
    }
}

fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}

/// Whole packets per second needed to carry `bits_per_sec` with 8-byte payloads
pub fn packets_per_second(bits_per_sec: f64) -> u64 {
    if !bits_per_sec.is_finite() || bits_per_sec <= 0.0 {
        return 0;
    }
    (bits_per_sec / PAYLOAD_BITS as f64).floor() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packets_per_second_from_bitrate() {
        assert_eq!(packets_per_second(1_000_000.0), 15_625);
        assert_eq!(packets_per_second(10_000_000.0), 156_250);
        assert_eq!(packets_per_second(64.0), 1);
        // Partial packets are dropped
        assert_eq!(packets_per_second(100.0), 1);
        assert_eq!(packets_per_second(63.0), 0);
        assert_eq!(packets_per_second(0.0), 0);
        assert_eq!(packets_per_second(-5.0), 0);
        assert_eq!(packets_per_second(f64::NAN), 0);
    }

    #[test]
    fn test_bitrate_interval() {
        let pacing = Pacing::from_mbps(1.0);
        let interval = pacing.interval().unwrap();
        // 1 / 15_625 s = 64 us
        let nanos = interval.as_nanos() as i128;
        assert!((nanos - 64_000).abs() <= 1, "interval was {:?}", interval);
    }

    #[test]
    fn test_fixed_interval() {
        let pacing = Pacing::Fixed(Duration::from_millis(100));
        assert_eq!(pacing.interval(), Some(Duration::from_millis(100)));
        assert_eq!(pacing.packets_per_second(), Some(10.0));
    }

    #[test]
    fn test_unpaced_has_no_schedule() {
        assert_eq!(Pacing::Unpaced.interval(), None);
        assert_eq!(Pacing::Unpaced.deadline_offset(10), None);
        assert_eq!(Pacing::Unpaced.packets_per_second(), None);
    }

    #[test]
    fn test_deadline_offset_does_not_drift() {
        let pacing = Pacing::from_mbps(1.0);
        // 15_625 packets per second means packet 15_625 is due exactly one second in
        assert_eq!(pacing.deadline_offset(0), Some(Duration::ZERO));
        assert_eq!(pacing.deadline_offset(15_625), Some(Duration::from_secs(1)));
        assert_eq!(
            pacing.deadline_offset(156_250),
            Some(Duration::from_secs(10))
        );

        let fixed = Pacing::Fixed(Duration::from_millis(1));
        assert_eq!(fixed.deadline_offset(1000), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_deadline_offset_saturates() {
        let huge = Pacing::Fixed(Duration::from_secs(u64::MAX / 2));
        assert_eq!(huge.deadline_offset(0), Some(Duration::ZERO));
        assert_eq!(huge.deadline_offset(3), Some(Duration::MAX));
    }

    #[test]
    fn test_validate() {
        assert!(Pacing::Unpaced.validate().is_ok());
        assert!(Pacing::Fixed(Duration::from_millis(1)).validate().is_ok());
        assert!(Pacing::from_mbps(0.5).validate().is_ok());

        assert!(matches!(
            Pacing::Fixed(Duration::ZERO).validate(),
            Err(EmitError::InvalidPlan(_))
        ));
        assert!(matches!(
            Pacing::from_mbps(0.0).validate(),
            Err(EmitError::InvalidPlan(_))
        ));
        assert!(matches!(
            Pacing::from_mbps(-1.0).validate(),
            Err(EmitError::InvalidPlan(_))
        ));
        assert!(matches!(
            Pacing::Bitrate { bits_per_sec: 32.0 }.validate(),
            Err(EmitError::InvalidPlan(_))
        ));
    }

    #[test]
    fn test_display() {
        assert_eq!(Pacing::from_mbps(1.0).to_string(), "1 Mbps");
        assert_eq!(Pacing::Fixed(Duration::from_millis(100)).to_string(), "fixed 100.000 ms");
        assert_eq!(Pacing::Unpaced.to_string(), "unpaced");
    }
}
