//! Periodic maintenance of bulk operations.
//!
//! Each pass closes undo windows that have expired (dropping their
//! snapshots) and runs scheduled operations whose time has come.

use std::time::Duration;

use chrono::Utc;
use kartparts_db::repositories::BulkOperationRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::engine::bulk;

/// Maximum scheduled operations started per pass.
const DUE_BATCH_SIZE: i64 = 10;

/// Background sweeper for bulk operations.
pub struct BulkSweeper {
    pool: PgPool,
    interval: Duration,
}

impl BulkSweeper {
    pub fn new(pool: PgPool, interval: Duration) -> Self {
        Self { pool, interval }
    }

    /// Run the sweep loop until `cancel` is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            "Bulk sweeper started"
        );

        let mut interval = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Bulk sweeper stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.sweep().await {
                        tracing::error!(error = %e, "Bulk sweeper: pass failed");
                    }
                }
            }
        }
    }

    /// One pass: expire undo windows, then start due scheduled operations.
    ///
    /// A due operation that cannot start (e.g. the bulk lock is held) stays
    /// pending and is retried on the next pass.
    pub async fn sweep(&self) -> Result<(), sqlx::Error> {
        let now = Utc::now();

        let expired = BulkOperationRepo::expire_undo_windows(&self.pool, now).await?;
        if expired > 0 {
            tracing::info!(expired, "Bulk sweeper: undo windows closed");
        }

        let due = BulkOperationRepo::list_due(&self.pool, now, DUE_BATCH_SIZE).await?;
        for id in due {
            match bulk::execute(&self.pool, id).await {
                Ok(op) => {
                    tracing::info!(id, status = %op.status, "Bulk sweeper: scheduled operation ran");
                }
                Err(e) => {
                    tracing::warn!(id, error = %e, "Bulk sweeper: scheduled operation not started");
                }
            }
        }

        Ok(())
    }
}
