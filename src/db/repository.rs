use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqliteConnection, SqliteExecutor, SqlitePool};

use crate::models::{
    BookedStudent, BookingStatus, Course, DeliveryMode, Lecture, NewLecture,
    QueuedEmail, Room, Schedule, User, UserKind,
};

const LECTURE_COLUMNS: &str = "id, course_id, class_id, schedule_id, starting_date, duration, booking_deadline, delivery";
const SCHEDULE_COLUMNS: &str = "id, code, aa_year, semester, room_id, seats, day_of_week, starting_time, ending_time";

/// Per-lecture booking counters of one course.
#[derive(Debug, Clone, FromRow)]
pub struct BookingCount {
    pub lecture_id: i64,
    pub bookings: i64,
    pub attendances: i64,
}

/// A lecture whose bookings close today, with the teacher to notify.
#[derive(Debug, Clone, FromRow)]
pub struct ClosingLecture {
    pub lecture_id: i64,
    pub course_name: String,
    pub starting_date: DateTime<Utc>,
    pub teacher_email: String,
    pub booked: i64,
}

/// A value bound into a dynamically built INSERT.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

// ---- users ----

pub async fn find_user(db: &SqlitePool, id: i64) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, type, first_name, last_name, email, ssn, birthday, city, serial_number FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    Ok(user.map(User::sanitized))
}

/// `(serial_number, id)` pairs of one kind of user, sorted by serial.
pub async fn user_serials(
    db: impl SqliteExecutor<'_>,
    kind: UserKind,
) -> Result<Vec<(String, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64)>(
        "SELECT serial_number, id FROM users WHERE type = ? AND serial_number IS NOT NULL ORDER BY serial_number",
    )
    .bind(kind.as_str())
    .fetch_all(db)
    .await
}

// ---- courses ----

pub async fn fetch_courses(db: &SqlitePool) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, description, year, code, semester FROM courses ORDER BY id",
    )
    .fetch_all(db)
    .await
}

pub async fn find_course(db: &SqlitePool, id: i64) -> Result<Option<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        "SELECT id, description, year, code, semester FROM courses WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn student_courses(db: &SqlitePool, student_id: i64) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT c.id, c.description, c.year, c.code, c.semester
        FROM courses c
        JOIN enrollments e ON e.course_id = c.id
        WHERE e.student_id = ?
        ORDER BY c.id
        "#,
    )
    .bind(student_id)
    .fetch_all(db)
    .await
}

pub async fn teacher_courses(db: &SqlitePool, teacher_id: i64) -> Result<Vec<Course>, sqlx::Error> {
    sqlx::query_as::<_, Course>(
        r#"
        SELECT c.id, c.description, c.year, c.code, c.semester
        FROM courses c
        JOIN teacher_courses tc ON tc.course_id = c.id
        WHERE tc.teacher_id = ? AND tc.is_valid = 1
        ORDER BY c.id
        "#,
    )
    .bind(teacher_id)
    .fetch_all(db)
    .await
}

pub async fn is_student_enrolled(
    db: &SqlitePool,
    student_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT 1 FROM enrollments WHERE student_id = ? AND course_id = ?")
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(db)
            .await?;
    Ok(row.is_some())
}

pub async fn is_teacher_of_course(
    db: &SqlitePool,
    teacher_id: i64,
    course_id: i64,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM teacher_courses WHERE teacher_id = ? AND course_id = ? AND is_valid = 1",
    )
    .bind(teacher_id)
    .bind(course_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

/// `(code, id, semester)` of every coded course, sorted by code.
pub async fn course_codes(
    db: impl SqliteExecutor<'_>,
) -> Result<Vec<(String, i64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT code, id, semester FROM courses WHERE code IS NOT NULL ORDER BY code",
    )
    .fetch_all(db)
    .await
}

// ---- lectures ----

pub async fn course_lectures(db: &SqlitePool, course_id: i64) -> Result<Vec<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!(
        "SELECT {LECTURE_COLUMNS} FROM lectures WHERE course_id = ? ORDER BY starting_date, id"
    ))
    .bind(course_id)
    .fetch_all(db)
    .await
}

pub async fn find_lecture(db: &SqlitePool, id: i64) -> Result<Option<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!("SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = ?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_course_lecture(
    db: &SqlitePool,
    course_id: i64,
    lecture_id: i64,
) -> Result<Option<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!(
        "SELECT {LECTURE_COLUMNS} FROM lectures WHERE id = ? AND course_id = ?"
    ))
    .bind(lecture_id)
    .bind(course_id)
    .fetch_optional(db)
    .await
}

pub async fn schedule_lectures(
    db: impl SqliteExecutor<'_>,
    schedule_id: i64,
) -> Result<Vec<Lecture>, sqlx::Error> {
    sqlx::query_as::<_, Lecture>(&format!(
        "SELECT {LECTURE_COLUMNS} FROM lectures WHERE schedule_id = ? ORDER BY starting_date"
    ))
    .bind(schedule_id)
    .fetch_all(db)
    .await
}

pub async fn insert_lecture(
    db: impl SqliteExecutor<'_>,
    lecture: &NewLecture,
) -> Result<i64, sqlx::Error> {
    let id = sqlx::query(
        r#"
        INSERT INTO lectures
            (course_id, class_id, schedule_id, starting_date, duration, booking_deadline, delivery)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(lecture.course_id)
    .bind(lecture.class_id)
    .bind(lecture.schedule_id)
    .bind(lecture.starting_date)
    .bind(lecture.duration)
    .bind(lecture.booking_deadline)
    .bind(lecture.delivery.as_str())
    .execute(db)
    .await?
    .last_insert_rowid();

    Ok(id)
}

pub async fn delete_lecture(db: impl SqliteExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM lectures WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn update_delivery(
    db: &SqlitePool,
    id: i64,
    mode: DeliveryMode,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE lectures SET delivery = ? WHERE id = ?")
        .bind(mode.as_str())
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

/// Moves a lecture to another room or time slot.
pub async fn update_lecture_slot(
    db: impl SqliteExecutor<'_>,
    lecture: &Lecture,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE lectures
        SET class_id = ?1,
            starting_date = ?2,
            duration = ?3,
            booking_deadline = ?4
        WHERE id = ?5
        "#,
    )
    .bind(lecture.class_id)
    .bind(lecture.starting_date)
    .bind(lecture.duration)
    .bind(lecture.booking_deadline)
    .bind(lecture.id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn booking_counts(
    db: &SqlitePool,
    course_id: i64,
) -> Result<Vec<BookingCount>, sqlx::Error> {
    sqlx::query_as::<_, BookingCount>(
        r#"
        SELECT l.id AS lecture_id,
               COUNT(b.student_id) AS bookings,
               COALESCE(SUM(CASE WHEN b.status = 'PRESENT' THEN 1 ELSE 0 END), 0) AS attendances
        FROM lectures l
        LEFT JOIN bookings b ON b.lecture_id = l.id
        WHERE l.course_id = ?
        GROUP BY l.id
        "#,
    )
    .bind(course_id)
    .fetch_all(db)
    .await
}

/// Lectures whose booking deadline falls on `day`, one row per valid teacher.
pub async fn lectures_closing_on(
    db: &SqlitePool,
    day: NaiveDate,
) -> Result<Vec<ClosingLecture>, sqlx::Error> {
    sqlx::query_as::<_, ClosingLecture>(
        r#"
        SELECT l.id AS lecture_id,
               c.description AS course_name,
               l.starting_date,
               u.email AS teacher_email,
               (SELECT COUNT(*) FROM bookings b WHERE b.lecture_id = l.id) AS booked
        FROM lectures l
        JOIN courses c ON c.id = l.course_id
        JOIN teacher_courses tc ON tc.course_id = c.id AND tc.is_valid = 1
        JOIN users u ON u.id = tc.teacher_id
        WHERE date(l.booking_deadline) = ?
        ORDER BY l.starting_date, l.id
        "#,
    )
    .bind(day.format("%Y-%m-%d").to_string())
    .fetch_all(db)
    .await
}

// ---- bookings ----

pub async fn insert_booking(
    db: &SqlitePool,
    student_id: i64,
    lecture_id: i64,
    booked_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO bookings (student_id, lecture_id, status, booked_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(student_id)
    .bind(lecture_id)
    .bind(BookingStatus::Booked.as_str())
    .bind(booked_at)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn delete_booking(
    db: &SqlitePool,
    student_id: i64,
    lecture_id: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM bookings WHERE student_id = ? AND lecture_id = ?")
        .bind(student_id)
        .bind(lecture_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn update_booking_status(
    db: &SqlitePool,
    student_id: i64,
    lecture_id: i64,
    status: BookingStatus,
) -> Result<bool, sqlx::Error> {
    let result =
        sqlx::query("UPDATE bookings SET status = ? WHERE student_id = ? AND lecture_id = ?")
            .bind(status.as_str())
            .bind(student_id)
            .bind(lecture_id)
            .execute(db)
            .await?
            .rows_affected();

    Ok(result > 0)
}

pub async fn booked_students(
    db: &SqlitePool,
    lecture_id: i64,
) -> Result<Vec<BookedStudent>, sqlx::Error> {
    sqlx::query_as::<_, BookedStudent>(
        r#"
        SELECT u.id, u.type, u.first_name, u.last_name, u.email,
               u.ssn, u.birthday, u.city, u.serial_number,
               b.status AS booking_status
        FROM bookings b
        JOIN users u ON u.id = b.student_id
        WHERE b.lecture_id = ?
        ORDER BY u.last_name, u.first_name, u.id
        "#,
    )
    .bind(lecture_id)
    .fetch_all(db)
    .await
}

// ---- email queue ----

/// Queues one cancellation notice per student booked for the lecture.
pub async fn queue_cancellation_emails(
    db: impl SqliteExecutor<'_>,
    lecture_id: i64,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let queued = sqlx::query(
        r#"
        INSERT INTO email_queue (lecture_id, recipient, email_type, course_name, starting_date, created_at)
        SELECT l.id, u.email, 'LESSON_CANCELLED', c.description, l.starting_date, ?2
        FROM lectures l
        JOIN courses c ON c.id = l.course_id
        JOIN bookings b ON b.lecture_id = l.id
        JOIN users u ON u.id = b.student_id
        WHERE l.id = ?1
        "#,
    )
    .bind(lecture_id)
    .bind(now)
    .execute(db)
    .await?
    .rows_affected();

    Ok(queued)
}

pub async fn queued_emails(
    db: &SqlitePool,
    lecture_id: Option<i64>,
) -> Result<Vec<QueuedEmail>, sqlx::Error> {
    sqlx::query_as::<_, QueuedEmail>(
        r#"
        SELECT id, lecture_id, recipient, email_type, course_name, starting_date
        FROM email_queue
        WHERE ?1 IS NULL OR lecture_id = ?1
        ORDER BY id
        "#,
    )
    .bind(lecture_id)
    .fetch_all(db)
    .await
}

/// Marks queued notices as taken by one flush and returns them. Rows claimed
/// before `stale_before` are assumed abandoned and handed out again.
pub async fn claim_queued_emails(
    db: &SqlitePool,
    lecture_id: Option<i64>,
    now: DateTime<Utc>,
    stale_before: DateTime<Utc>,
) -> Result<Vec<QueuedEmail>, sqlx::Error> {
    let mut claimed = sqlx::query_as::<_, QueuedEmail>(
        r#"
        UPDATE email_queue
        SET claimed_at = ?2
        WHERE (?1 IS NULL OR lecture_id = ?1)
          AND (claimed_at IS NULL OR claimed_at < ?3)
        RETURNING id, lecture_id, recipient, email_type, course_name, starting_date
        "#,
    )
    .bind(lecture_id)
    .bind(now)
    .bind(stale_before)
    .fetch_all(db)
    .await?;

    claimed.sort_by_key(|e| e.id);
    Ok(claimed)
}

/// Hands a claimed notice back to the queue.
pub async fn release_queued_email(db: &SqlitePool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE email_queue SET claimed_at = NULL WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete_queued_email(db: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM email_queue WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

// ---- schedules & rooms ----

pub async fn fetch_schedules(db: &SqlitePool) -> Result<Vec<Schedule>, sqlx::Error> {
    sqlx::query_as::<_, Schedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules ORDER BY id"
    ))
    .fetch_all(db)
    .await
}

pub async fn find_schedule(
    db: impl SqliteExecutor<'_>,
    id: i64,
) -> Result<Option<Schedule>, sqlx::Error> {
    sqlx::query_as::<_, Schedule>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM schedules WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn update_schedule(
    db: impl SqliteExecutor<'_>,
    schedule: &Schedule,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE schedules
        SET room_id = ?1,
            seats = ?2,
            day_of_week = ?3,
            starting_time = ?4,
            ending_time = ?5
        WHERE id = ?6
        "#,
    )
    .bind(schedule.room_id)
    .bind(schedule.seats)
    .bind(&schedule.day_of_week)
    .bind(&schedule.starting_time)
    .bind(&schedule.ending_time)
    .bind(schedule.id)
    .execute(db)
    .await?;

    Ok(())
}

pub async fn fetch_rooms(db: &SqlitePool) -> Result<Vec<Room>, sqlx::Error> {
    sqlx::query_as::<_, Room>("SELECT id, description, seats FROM rooms ORDER BY id")
        .fetch_all(db)
        .await
}

/// Registers a room named in a schedule upload unless it is already known.
pub async fn ensure_room(
    db: impl SqliteExecutor<'_>,
    id: i64,
    seats: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT OR IGNORE INTO rooms (id, description, seats) VALUES (?1, ?2, ?3)")
        .bind(id)
        .bind(format!("Room {}", id))
        .bind(seats)
        .execute(db)
        .await?;

    Ok(())
}

// ---- bulk upload ----

/// Inserts one row into `table`. Table and column names come from the
/// upload field tables, never from the request.
pub async fn insert_row(
    conn: &mut SqliteConnection,
    table: &str,
    columns: &[&str],
    values: Vec<SqlValue>,
) -> Result<i64, sqlx::Error> {
    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );

    let mut query = sqlx::query(&sql);
    for value in values {
        query = match value {
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
        };
    }

    let id = query.execute(&mut *conn).await?.last_insert_rowid();
    Ok(id)
}
