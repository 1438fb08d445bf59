//! Named emission profiles
//!
//! The built-ins reproduce the SpectraDAQ bench scripts: a slow 100-packet
//! smoke test, a bitrate soak, and the two operator-driven binary logging
//! walkthroughs that wait for Enter before sending.

use std::fmt;
use std::time::Duration;

use crate::pacing::Pacing;
use crate::plan::{EmitPlan, StopCondition};

#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub description: String,
    /// Steps printed for the operator before sending
    pub instructions: Vec<String>,
    pub stop: StopCondition,
    pub pacing: Pacing,
    pub progress_every: u64,
    pub wait_for_enter: bool,
}

impl Preset {
    pub fn to_plan(&self, host: impl Into<String>, port: u16) -> EmitPlan {
        EmitPlan {
            host: host.into(),
            port,
            pacing: self.pacing,
            stop: self.stop,
            progress_every: self.progress_every,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<16} {} | {} | progress every {}{}",
            self.name,
            self.stop,
            self.pacing,
            self.progress_every,
            if self.wait_for_enter { " | waits for Enter" } else { "" }
        )
    }
}

fn lines(steps: &[&str]) -> Vec<String> {
    steps.iter().map(|s| s.to_string()).collect()
}

pub fn basic() -> Preset {
    Preset {
        name: "basic".to_string(),
        description: "Send 100 counters, one every 100 ms".to_string(),
        instructions: Vec::new(),
        stop: StopCondition::Count(100),
        pacing: Pacing::Fixed(Duration::from_millis(100)),
        progress_every: 1,
        wait_for_enter: false,
    }
}

pub fn high_rate() -> Preset {
    Preset {
        name: "high-rate".to_string(),
        description: "Sustain 1 Mbps of counters for 10 seconds".to_string(),
        instructions: Vec::new(),
        stop: StopCondition::Duration(Duration::from_secs(10)),
        pacing: Pacing::from_mbps(1.0),
        progress_every: 1000,
        wait_for_enter: false,
    }
}

pub fn binary_logging() -> Preset {
    Preset {
        name: "binary-logging".to_string(),
        description: "Send 1000 counters at 1 ms spacing to verify binary logging".to_string(),
        instructions: lines(&[
            "1. Start SpectraDAQ",
            "2. Set struct: uint64_t data;",
            "3. Check 'Binary Logging' checkbox",
            "4. Click 'Log to CSV' and set duration to 5 seconds",
            "5. Press Enter here to send test data",
            "Afterwards, check that a .bin file was created next to the CSV file.",
        ]),
        stop: StopCondition::Count(1000),
        pacing: Pacing::Fixed(Duration::from_millis(1)),
        progress_every: 100,
        wait_for_enter: true,
    }
}

pub fn workflow() -> Preset {
    Preset {
        name: "workflow".to_string(),
        description: "Send for 8 seconds at ~1000 packets/sec, leaving time for CSV conversion"
            .to_string(),
        instructions: lines(&[
            "1. Start SpectraDAQ",
            "2. Set struct: uint64_t data;",
            "3. Check 'Binary Logging' checkbox",
            "4. Click 'Log to CSV' and set duration to 10 seconds",
            "5. Press Enter here to start the test",
            "6. Wait for logging to finish and the binary to CSV conversion to complete",
            "Expected files: test.bin (binary data) and test.csv (converted CSV data)",
        ]),
        stop: StopCondition::Duration(Duration::from_secs(8)),
        pacing: Pacing::Fixed(Duration::from_millis(1)),
        progress_every: 1000,
        wait_for_enter: true,
    }
}

/// All built-in presets, in display order
pub fn builtin() -> Vec<Preset> {
    vec![basic(), high_rate(), binary_logging(), workflow()]
}

/// Look up a preset by name in `presets`
pub fn find<'a>(presets: &'a [Preset], name: &str) -> Option<&'a Preset> {
    presets.iter().find(|p| p.name == name)
}
