use std::net::SocketAddr;

use tracing::{info, warn};

use crate::packet::PAYLOAD_LEN;
use crate::plan::EmitPlan;
use crate::summary::{group_thousands, EmitSummary, Progress};

/// Trait for observing an emission run - allows console output in the CLI and recording in tests
pub trait EmitObserver {
    /// Called once, after the socket is ready and before the first packet
    fn on_start(&mut self, _plan: &EmitPlan, _target: SocketAddr) {}

    /// Called every `progress_every` packets
    fn on_progress(&mut self, progress: &Progress);

    /// Called once when the loop ends, whether finished or interrupted
    fn on_complete(&mut self, _summary: &EmitSummary) {}
}

/// Observer that writes progress and the final summary to the log
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl LoggingObserver {
    pub fn new() -> Self {
        Self
    }
}

impl EmitObserver for LoggingObserver {
    fn on_start(&mut self, plan: &EmitPlan, target: SocketAddr) {
        info!(target: "emitter", "Sending to {} ({})", plan.address(), target);
        info!(target: "emitter", "Each packet contains: struct {{ uint64_t data; }} ({} bytes)", PAYLOAD_LEN);
        info!(target: "emitter", "Pacing: {}", plan.pacing);
        if let Some(pps) = plan.pacing.packets_per_second() {
            info!(target: "emitter", "Packets per second: {}", group_thousands(pps.round() as u64));
        }
        if let Some(interval) = plan.pacing.interval() {
            info!(target: "emitter", "Delay between packets: {:.3} ms", interval.as_secs_f64() * 1000.0);
        }
        info!(target: "emitter", "Stop after: {}", plan.stop);
        info!(target: "emitter", "Press Ctrl+C to stop");
        info!(target: "emitter", "{}", "-".repeat(50));
    }

    fn on_progress(&mut self, progress: &Progress) {
        match progress.total {
            Some(total) => info!(
                target: "emitter",
                "Sent packet {}/{}: data={}",
                progress.packets_sent, total, progress.last_sequence
            ),
            None => info!(
                target: "emitter",
                "Sent {} packets, Rate: {:.2} Mbps ({:.0} packets/sec)",
                group_thousands(progress.packets_sent),
                progress.achieved_mbps(),
                progress.packets_per_second()
            ),
        }
    }

    fn on_complete(&mut self, summary: &EmitSummary) {
        info!(target: "emitter", "{}", "-".repeat(50));
        if summary.interrupted {
            warn!(target: "emitter", "Stopped by user");
        } else {
            info!(target: "emitter", "Test completed!");
        }
        info!(target: "emitter", "Started at: {}", summary.started_at.format("%Y-%m-%d %H:%M:%S"));
        match summary.requested {
            Some(requested) => info!(
                target: "emitter",
                "Total packets sent: {} of {}",
                group_thousands(summary.packets_sent),
                group_thousands(requested)
            ),
            None => info!(target: "emitter", "Total packets sent: {}", group_thousands(summary.packets_sent)),
        }
        info!(target: "emitter", "Total bytes sent: {}", group_thousands(summary.bytes_sent));
        info!(target: "emitter", "Total time: {:.2} seconds", summary.elapsed.as_secs_f64());
        info!(target: "emitter", "Average rate: {:.2} Mbps", summary.achieved_mbps());
        info!(target: "emitter", "Packets per second: {:.0}", summary.packets_per_second());
    }
}
