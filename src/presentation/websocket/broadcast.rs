//! Broadcast Loop
//!
//! Periodically pushes one random content record to every live
//! connection. Delivery is best-effort: a failed write is counted and the
//! loop moves on to the next connection.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::connection::OutboundFrame;
use super::registry::ConnectionRegistry;
use crate::domain::ContentRepository;
use crate::infrastructure::metrics;
use crate::infrastructure::network::{BufferPool, PacketStager, CONTENT_PACKET_ID};

/// Outcome of one broadcast tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub attempted: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Timer task fanning content out to the registry
pub struct BroadcastLoop {
    registry: Arc<ConnectionRegistry>,
    content: Arc<dyn ContentRepository>,
    stager: PacketStager,
    interval: Duration,
    locale: watch::Receiver<String>,
    shutdown: CancellationToken,
}

impl BroadcastLoop {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        content: Arc<dyn ContentRepository>,
        pool: Arc<BufferPool>,
        block_size: usize,
        interval: Duration,
        locale: watch::Receiver<String>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry,
            content,
            stager: PacketStager::new(pool, block_size),
            interval,
            locale,
            shutdown,
        }
    }

    /// Run the loop on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Tick until the shutdown token is cancelled.
    pub async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // Skip first immediate tick

        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Broadcast loop started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = ticker.tick() => {
                    let report = self.tick().await;
                    if report.attempted > 0 {
                        tracing::debug!(
                            attempted = report.attempted,
                            delivered = report.delivered,
                            failed = report.failed,
                            "Broadcast tick"
                        );
                    }
                }
            }
        }

        self.stager.clear();
        tracing::info!("Broadcast loop stopped");
    }

    /// Fetch one record and write it to every registered connection.
    pub async fn tick(&mut self) -> TickReport {
        if self.registry.is_empty() {
            return TickReport::default();
        }

        let locale = self.locale.borrow().clone();
        let record = match self.content.fetch_random(1, &locale).await {
            Ok(mut records) => match records.pop() {
                Some(record) => record,
                None => {
                    tracing::trace!(locale = %locale, "No content to broadcast");
                    return TickReport::default();
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "Broadcast content fetch failed");
                return TickReport::default();
            }
        };

        let payload = match serde_json::to_vec(&record) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(record_id = record.id, error = %e, "Broadcast encoding failed");
                return TickReport::default();
            }
        };

        if let Err(e) = self.stager.stage(CONTENT_PACKET_ID, &payload) {
            tracing::warn!(record_id = record.id, error = %e, "Broadcast staging failed");
            self.stager.clear();
            return TickReport::default();
        }

        let Some(frame) = self.stager.next_packet() else {
            return TickReport::default();
        };

        let targets = self.registry.snapshot();
        let mut report = TickReport {
            attempted: targets.len(),
            ..TickReport::default()
        };

        for (session_id, connection) in targets {
            match connection.send(OutboundFrame::Binary(frame.clone())).await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::debug!(session_id = %session_id, error = %e, "Broadcast write failed");
                }
            }
        }

        metrics::record_broadcast_tick(report.delivered, report.failed);
        report
    }
}
