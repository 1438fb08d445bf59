//! The send loop
//!
//! One socket, one counter, one loop. Packets are numbered from zero and sent
//! in order; there is no retry and no acknowledgement. The loop ends when the
//! stop condition is met or the shutdown flag flips, and always hands the
//! observer a summary.

use std::io;
use std::net::SocketAddr;

use chrono::Local;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::error::EmitError;
use crate::observer::EmitObserver;
use crate::packet::{CounterPacket, PAYLOAD_LEN};
use crate::plan::{EmitPlan, StopCondition};
use crate::summary::{EmitSummary, Progress};
use crate::target::{bind_addr_for, resolve};

/// Sends without an intervening sleep yield to the runtime after this many packets
const YIELD_EVERY: u64 = 1024;

pub struct Emitter {
    socket: UdpSocket,
    target: SocketAddr,
    plan: EmitPlan,
}

impl Emitter {
    /// Validate the plan, resolve the destination and bind a local socket
    pub async fn bind(plan: EmitPlan) -> Result<Self, EmitError> {
        plan.validate()?;
        let target = resolve(&plan.host, plan.port).await?;
        let socket = UdpSocket::bind(bind_addr_for(&target))
            .await
            .map_err(EmitError::Bind)?;

        debug!(
            target: "net",
            "Bound {} for {}",
            socket.local_addr().map_err(EmitError::Bind)?,
            target
        );

        Ok(Self {
            socket,
            target,
            plan,
        })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn plan(&self) -> &EmitPlan {
        &self.plan
    }

    /// Run the plan to completion or until `shutdown` becomes `true`.
    ///
    /// The socket is closed when this returns. Any send failure aborts the run.
    pub async fn run(
        self,
        shutdown: Option<watch::Receiver<bool>>,
        observer: &mut dyn EmitObserver,
    ) -> Result<EmitSummary, EmitError> {
        // Keeps the fallback channel open so `changed()` never resolves
        let (_idle_tx, idle_rx) = watch::channel(false);
        let mut shutdown = shutdown.unwrap_or(idle_rx);

        observer.on_start(&self.plan, self.target);

        let pacing = self.plan.pacing;
        let total = self.plan.stop.total();
        let started_at = Local::now();
        let start = Instant::now();
        // A window past the end of representable time never closes
        let end = match self.plan.stop {
            StopCondition::Duration(d) => start.checked_add(d),
            StopCondition::Count(_) => None,
        };

        let mut sent: u64 = 0;
        let mut since_yield: u64 = 0;
        let mut interrupted = false;

        loop {
            if *shutdown.borrow() {
                interrupted = true;
                break;
            }
            if total.is_some_and(|n| sent >= n) {
                break;
            }
            if end.is_some_and(|end| Instant::now() >= end) {
                break;
            }

            if let Some(offset) = pacing.deadline_offset(sent) {
                let Some(deadline) = start.checked_add(offset) else {
                    warn!(
                        target: "emitter",
                        "Packet {} would be due {:?} after start, which is never; stopping",
                        sent, offset
                    );
                    break;
                };
                if end.is_some_and(|end| deadline >= end) {
                    break;
                }
                if deadline > Instant::now() {
                    if wait_until(deadline, &mut shutdown).await {
                        interrupted = true;
                        break;
                    }
                    since_yield = 0;
                }
            }

            let packet = CounterPacket::new(sent);
            self.socket
                .send_to(&packet.encode(), self.target)
                .await
                .map_err(|source| EmitError::Send {
                    sequence: packet.sequence,
                    source,
                })?;
            sent += 1;

            if self.plan.progress_every > 0 && sent % self.plan.progress_every == 0 {
                observer.on_progress(&Progress {
                    packets_sent: sent,
                    last_sequence: packet.sequence,
                    elapsed: start.elapsed(),
                    total,
                });
            }

            since_yield += 1;
            if since_yield >= YIELD_EVERY {
                tokio::task::yield_now().await;
                since_yield = 0;
            }
        }

        let summary = EmitSummary {
            started_at,
            packets_sent: sent,
            bytes_sent: sent * PAYLOAD_LEN as u64,
            elapsed: start.elapsed(),
            requested: total,
            interrupted,
        };

        debug!(target: "net", "Closing socket to {}", self.target);
        drop(self.socket);

        observer.on_complete(&summary);
        Ok(summary)
    }
}

/// Sleep until `deadline`. Returns `true` if shutdown was requested first.
async fn wait_until(deadline: Instant, shutdown: &mut watch::Receiver<bool>) -> bool {
    loop {
        tokio::select! {
            _ = sleep_until(deadline) => return false,
            changed = shutdown.changed() => match changed {
                Ok(()) => {
                    if *shutdown.borrow_and_update() {
                        return true;
                    }
                }
                Err(_) => {
                    // Sender is gone; nobody can interrupt us anymore
                    sleep_until(deadline).await;
                    return false;
                }
            }
        }
    }
}

/// Bind and run a plan in one step
pub async fn emit(
    plan: EmitPlan,
    shutdown: Option<watch::Receiver<bool>>,
    observer: &mut dyn EmitObserver,
) -> Result<EmitSummary, EmitError> {
    Emitter::bind(plan).await?.run(shutdown, observer).await
}
