use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::email::Mailer;
use crate::error::AppError;
use crate::services::lectures::flush_email_queue;
use crate::services::teacher::{TeacherService, next_check};

/// Daily booking summary for teachers.
/// Wakes at 23:59 UTC, mails each teacher the booking count of the lectures
/// whose bookings just closed, then retries any queued notice left behind.
pub struct DailySummaryScheduler {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DailyStats {
    pub summaries_sent: usize,
    pub queued_sent: usize,
}

impl DailySummaryScheduler {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub async fn start(self) {
        info!("Starting daily summary scheduler");

        loop {
            let wait = next_check(Utc::now());
            info!("Next booking summary in {:?}", wait);
            tokio::time::sleep(wait).await;

            match self.run_once().await {
                Ok(stats) => {
                    info!(
                        "Daily summary completed - {} summaries, {} queued notices sent",
                        stats.summaries_sent, stats.queued_sent
                    );
                }
                Err(e) => {
                    // the loop keeps going; tomorrow's run picks up again
                    warn!("Daily summary failed: {:?}", e);
                }
            }
        }
    }

    pub async fn run_once(&self) -> Result<DailyStats, AppError> {
        let today = Utc::now().date_naive();
        let service = TeacherService::new(self.db.clone(), self.mailer.clone());
        let summaries_sent = service.check_for_expired_lectures(today).await?;
        let queued_sent = flush_email_queue(&self.db, self.mailer.as_ref(), None).await?;

        Ok(DailyStats {
            summaries_sent,
            queued_sent,
        })
    }
}
