#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;

use pulsebs::db::{self, repository};
use pulsebs::email::{Mailer, OutgoingEmail};
use pulsebs::error::AppError;
use pulsebs::models::{DeliveryMode, EmailType, NewLecture};
use pulsebs::services::UploadOptions;

pub const STUDENT: i64 = 1;
pub const OTHER_STUDENT: i64 = 2;
pub const NOT_ENROLLED: i64 = 3;
pub const TEACHER: i64 = 4;
pub const OTHER_TEACHER: i64 = 5;
pub const SUPPORT: i64 = 6;
pub const COURSE: i64 = 1;
pub const OTHER_COURSE: i64 = 2;

/// Captures every email instead of delivering it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_of(&self, kind: EmailType) -> Vec<OutgoingEmail> {
        self.sent().into_iter().filter(|e| e.kind == kind).collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
    }

    /// Waits for background deliveries until at least `count` emails arrived.
    pub async fn wait_for(&self, count: usize) -> Vec<OutgoingEmail> {
        for _ in 0..300 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        panic!("expected {} emails, got {}", count, self.sent().len());
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Rejects every email, as an unreachable SMTP server would.
#[derive(Default)]
pub struct FailingMailer {
    attempts: AtomicUsize,
}

impl FailingMailer {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _email: &OutgoingEmail) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Email("connection refused".to_string()))
    }
}

/// Records every email after a fixed delay, like a slow SMTP server.
pub struct SlowMailer {
    pub delay: StdDuration,
    pub inner: RecordingMailer,
}

impl SlowMailer {
    pub fn new(delay: StdDuration) -> Self {
        Self {
            delay,
            inner: RecordingMailer::default(),
        }
    }
}

#[async_trait]
impl Mailer for SlowMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), AppError> {
        tokio::time::sleep(self.delay).await;
        self.inner.send(email).await
    }
}

pub fn upload_options() -> UploadOptions {
    UploadOptions {
        academic_year: 2026,
        default_password: "changeme".to_string(),
    }
}

/// Users, courses and enrollments shared by the integration tests.
pub async fn setup_db() -> SqlitePool {
    let pool = db::connect_in_memory()
        .await
        .expect("Failed to create database");

    sqlx::raw_sql(
        r#"
        INSERT INTO users (id, type, first_name, last_name, email, serial_number) VALUES
            (1, 'STUDENT', 'Mario', 'Rossi', 's1@example.com', '900000'),
            (2, 'STUDENT', 'Anna', 'Bianchi', 's2@example.com', '900001'),
            (3, 'STUDENT', 'Luca', 'Verdi', 's3@example.com', '900002'),
            (4, 'TEACHER', 'Marco', 'Torchiano', 't1@example.com', 'd9000'),
            (5, 'TEACHER', 'Maurizio', 'Morisio', 't2@example.com', 'd9001'),
            (6, 'SUPPORT', 'Sara', 'Neri', 'support@example.com', NULL);
        INSERT INTO courses (id, description, year, code, semester) VALUES
            (1, 'Software Engineering II', 1, 'XY1211', 1),
            (2, 'Web Applications I', 1, 'XY4911', 2);
        INSERT INTO teacher_courses (teacher_id, course_id, is_valid) VALUES (4, 1, 1), (5, 2, 1);
        INSERT INTO enrollments (student_id, course_id, year) VALUES (1, 1, 2026), (2, 1, 2026), (1, 2, 2026);
        INSERT INTO rooms (id, description, seats) VALUES (1, 'Aula 1', 120);
        "#,
    )
    .execute(&pool)
    .await
    .expect("Failed to seed database");

    pool
}

/// Adds a lecture of `course_id` starting at `start` whose bookings close at
/// `deadline`.
pub async fn add_lecture(
    pool: &SqlitePool,
    course_id: i64,
    start: DateTime<Utc>,
    deadline: DateTime<Utc>,
) -> i64 {
    repository::insert_lecture(
        pool,
        &NewLecture {
            course_id,
            class_id: 1,
            schedule_id: None,
            starting_date: start,
            duration: 90,
            booking_deadline: deadline,
            delivery: DeliveryMode::Presence,
        },
    )
    .await
    .expect("Failed to insert lecture")
}

/// A lecture three days away, still open for bookings.
pub async fn upcoming_lecture(pool: &SqlitePool, course_id: i64) -> i64 {
    let start = Utc::now() + Duration::days(3);
    add_lecture(pool, course_id, start, start - Duration::days(1)).await
}

/// A lecture starting in twenty minutes; bookings already closed.
pub async fn imminent_lecture(pool: &SqlitePool, course_id: i64) -> i64 {
    let start = Utc::now() + Duration::minutes(20);
    add_lecture(pool, course_id, start, Utc::now() - Duration::hours(1)).await
}

pub fn mailers() -> (Arc<RecordingMailer>, Arc<dyn Mailer>) {
    let recorder = Arc::new(RecordingMailer::default());
    let mailer: Arc<dyn Mailer> = recorder.clone();
    (recorder, mailer)
}

/// `(total, unclaimed)` rows of the email queue.
pub async fn queue_counts(pool: &SqlitePool) -> (i64, i64) {
    sqlx::query_as("SELECT COUNT(*), COUNT(*) - COUNT(claimed_at) FROM email_queue")
        .fetch_one(pool)
        .await
        .expect("Failed to count queued emails")
}

/// Waits until background flushes leave the queue with `total` rows, none
/// of them claimed.
pub async fn wait_for_queue(pool: &SqlitePool, total: i64) {
    for _ in 0..300 {
        if queue_counts(pool).await == (total, total) {
            return;
        }
        tokio::time::sleep(StdDuration::from_millis(10)).await;
    }
    panic!("email queue never settled at {} rows: {:?}", total, queue_counts(pool).await);
}
