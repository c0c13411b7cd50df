//! Module `broadcaster`
//!
//! Owns the fixed-period fan-out: each tick pulls one sample, encodes it once,
//! and queues the same payload for every open session in the registry.

use log::{info, trace, warn};
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::broadcast::BroadcastReport;
use crate::client::{ClientRegistry, Session};
use crate::error::{BroadcastError, SendError, ServerError, handle_error};
use crate::pose::{BroadcastMessage, PoseSource};

pub struct Broadcaster {
    source: Box<dyn PoseSource>,
    registry: Arc<ClientRegistry>,
    period: Duration,
    max_consecutive_failures: u32,
    ticks: u64,
}

impl Broadcaster {
    pub fn new(
        source: Box<dyn PoseSource>,
        registry: Arc<ClientRegistry>,
        period: Duration,
        max_consecutive_failures: u32,
    ) -> Self {
        Self {
            source,
            registry,
            period,
            max_consecutive_failures: max_consecutive_failures.max(1),
            ticks: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of ticks attempted so far, including aborted ones.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Runs one broadcast round.
    ///
    /// A failure to produce or encode the sample aborts the whole round
    /// before anything is sent. Per-session send failures never abort it.
    pub async fn tick(&mut self) -> Result<BroadcastReport, BroadcastError> {
        self.ticks += 1;

        let source = &mut self.source;
        let sample = panic::catch_unwind(AssertUnwindSafe(|| source.generate_sample()))
            .map_err(|payload| BroadcastError::SourcePanicked(panic_message(payload.as_ref())))?;
        let payload = Utf8Bytes::from(BroadcastMessage::new(sample).encode()?);

        let sessions = self.registry.snapshot().await;
        Ok(self.fan_out(&payload, sessions).await)
    }

    /// Queues `payload` for every open session of a registry snapshot.
    ///
    /// Members removed after the snapshot was taken are already closed, so
    /// the readiness check skips them.
    async fn fan_out(&mut self, payload: &Utf8Bytes, sessions: Vec<Arc<Session>>) -> BroadcastReport {
        let mut report = BroadcastReport::new(self.ticks);
        for session in sessions {
            if !session.is_open() {
                report.skipped += 1;
                continue;
            }

            match session.try_send(payload.clone()) {
                Ok(()) => {
                    session.reset_failures();
                    report.delivered += 1;
                }
                Err(SendError::NotOpen) => report.skipped += 1,
                Err(e) => {
                    let streak = session.record_failure();
                    warn!(
                        "Failed to send to {} ({}): {} [{} in a row]",
                        session.peer_addr(),
                        session.id(),
                        e,
                        streak
                    );
                    report.failures.push((session.id(), e));

                    if e == SendError::Closed || streak >= self.max_consecutive_failures {
                        self.registry.remove(session.id()).await;
                        warn!(
                            "Dropping unresponsive viewer {} ({})",
                            session.peer_addr(),
                            session.id()
                        );
                        report.evicted.push(session.id());
                    }
                }
            }
        }
        report
    }

    /// Broadcasts forever.
    pub async fn run(self) {
        self.run_until(std::future::pending()).await
    }

    /// Broadcasts until `shutdown` resolves. Tick errors are logged and the
    /// schedule carries on.
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!("Broadcasting every {:?}", self.period);

        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }

            match self.tick().await {
                Ok(report) if report.is_clean() => trace!(
                    "Tick {}: {} delivered, {} skipped",
                    report.tick,
                    report.delivered,
                    report.skipped
                ),
                Ok(report) => warn!(
                    "Tick {}: {} delivered, {} skipped, {} failed, {} evicted",
                    report.tick,
                    report.delivered,
                    report.skipped,
                    report.failures.len(),
                    report.evicted.len()
                ),
                Err(e) => handle_error(&ServerError::from(e)),
            }
        }

        info!("Broadcaster stopped after {} ticks", self.ticks);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
