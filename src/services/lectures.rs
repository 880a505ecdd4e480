//! Lecture changes shared by teachers and support officers.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::repository;
use crate::email::{self, Mailer, OutgoingEmail, templates};
use crate::error::{AppError, Errno, ResponseError};
use crate::models::{DeliveryMode, EmailType, Lecture, QueuedEmail};
use crate::services::eligibility::is_lecture_cancellable;

/// A claimed queue entry not delivered or released within this window is
/// handed out again.
const CLAIM_TIMEOUT_MINUTES: i64 = 10;

/// Deletes a lecture together with its bookings and notifies every student
/// who had booked it.
///
/// The notices are queued in the same transaction as the delete and sent by
/// a background task, so a crash or an SMTP outage after commit leaves them
/// for [`flush_email_queue`].
pub async fn cancel_lecture(
    db: &SqlitePool,
    mailer: &Arc<dyn Mailer>,
    module: &'static str,
    lecture: &Lecture,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if !is_lecture_cancellable(lecture, now) {
        return Err(ResponseError::new(
            module,
            Errno::LectureNotCancellable,
            json!({ "lectureId": lecture.id }),
        )
        .into());
    }

    let mut tx = db.begin().await?;
    let queued = repository::queue_cancellation_emails(&mut *tx, lecture.id, now).await?;
    repository::delete_lecture(&mut *tx, lecture.id).await?;
    tx.commit().await?;

    info!(lecture_id = lecture.id, queued, "lecture cancelled");

    let db = db.clone();
    let mailer = mailer.clone();
    let lecture_id = lecture.id;
    tokio::spawn(async move {
        if let Err(e) = flush_email_queue(&db, mailer.as_ref(), Some(lecture_id)).await {
            warn!("failed to flush cancellation emails for lecture {}: {}", lecture_id, e);
        }
    });
    Ok(())
}

/// Sends queued notices, optionally only those of one lecture. Entries are
/// claimed first so concurrent flushes never send the same notice twice.
/// Delivered entries are removed; failed ones go back to the queue.
pub async fn flush_email_queue(
    db: &SqlitePool,
    mailer: &dyn Mailer,
    lecture_id: Option<i64>,
) -> Result<usize, AppError> {
    let now = Utc::now();
    let stale_before = now - Duration::minutes(CLAIM_TIMEOUT_MINUTES);
    let claimed = repository::claim_queued_emails(db, lecture_id, now, stale_before).await?;
    let mut sent = 0;

    for entry in claimed {
        let email = render_queued(&entry);
        match mailer.send(&email).await {
            Ok(()) => {
                repository::delete_queued_email(db, entry.id).await?;
                sent += 1;
            }
            Err(e) => {
                warn!("queued email {} to {} not sent: {}", entry.id, entry.recipient, e);
                repository::release_queued_email(db, entry.id).await?;
            }
        }
    }

    Ok(sent)
}

fn render_queued(entry: &QueuedEmail) -> OutgoingEmail {
    match entry.email_type {
        EmailType::LessonCancelled => {
            templates::lesson_cancelled(&entry.recipient, &entry.course_name, &entry.starting_date)
        }
        // Only cancellations are queued today.
        kind => OutgoingEmail {
            recipient: entry.recipient.clone(),
            kind,
            subject: format!("Lecture update - {}", entry.course_name),
            body: format!(
                "There is an update about the lecture of {} scheduled for {}.",
                entry.course_name,
                templates::format_date(&entry.starting_date)
            ),
        },
    }
}

/// Stores the new delivery mode and tells the booked students about it in
/// the background.
pub async fn switch_delivery(
    db: &SqlitePool,
    mailer: &Arc<dyn Mailer>,
    lecture: &Lecture,
    switch_to: DeliveryMode,
) -> Result<(), AppError> {
    repository::update_delivery(db, lecture.id, switch_to).await?;
    info!(lecture_id = lecture.id, mode = switch_to.as_str(), "delivery mode changed");

    let course = repository::find_course(db, lecture.course_id).await?;
    let course_name = course.map(|c| c.description).unwrap_or_default();

    let emails: Vec<OutgoingEmail> = repository::booked_students(db, lecture.id)
        .await?
        .iter()
        .map(|b| {
            templates::delivery_changed(&b.student.email, &course_name, &lecture.starting_date, switch_to)
        })
        .collect();

    email::dispatch(mailer.clone(), emails);
    Ok(())
}

pub fn parse_mode(module: &'static str, value: &str) -> Result<DeliveryMode, ResponseError> {
    DeliveryMode::parse(value).ok_or_else(|| {
        ResponseError::new(
            module,
            Errno::LectureInvalidDeliveryMode,
            json!({ "switchTo": value }),
        )
    })
}

pub fn lecture_not_found(module: &'static str, course_id: i64, lecture_id: i64) -> ResponseError {
    ResponseError::new(
        module,
        Errno::CourseLectureMismatch,
        json!({ "courseId": course_id, "lectureId": lecture_id }),
    )
}
