use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::repository;
use crate::email::{self, Mailer, OutgoingEmail, templates};
use crate::error::{AppError, Errno, ResponseError};
use crate::models::{BookedStudent, BookingStatus, Course, Lecture, LectureStats};
use crate::services::eligibility::is_lecture_switchable;
use crate::services::lectures::{self, lecture_not_found, parse_mode};

const MODULE: &str = "TeacherService";

/// Options accepted by the lecture listing of a course.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LectureQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub bookings: bool,
    pub attendances: bool,
}

impl LectureQuery {
    pub fn parse(params: &HashMap<String, String>) -> Result<Self, ResponseError> {
        let mut query = LectureQuery::default();

        for (key, value) in params {
            match key.as_str() {
                "from" => query.from = parse_bound(value, false)?,
                "to" => query.to = parse_bound(value, true)?,
                "bookings" => query.bookings = parse_flag(key, value)?,
                "attendances" => query.attendances = parse_flag(key, value)?,
                _ => {
                    return Err(ResponseError::new(
                        MODULE,
                        Errno::QueryParamNotAccepted,
                        json!({ "query": { key: value } }),
                    ));
                }
            }
        }

        Ok(query)
    }

    fn contains(&self, lecture: &Lecture) -> bool {
        self.from.is_none_or(|from| lecture.starting_date >= from)
            && self.to.is_none_or(|to| lecture.starting_date <= to)
    }
}

/// RFC 3339 timestamps or plain `YYYY-MM-DD` dates; `inf` leaves the side
/// open. A plain `to` date includes the whole day.
fn parse_bound(value: &str, end_of_day: bool) -> Result<Option<DateTime<Utc>>, ResponseError> {
    let trimmed = value.trim();
    if matches!(trimmed.to_lowercase().as_str(), "inf" | "-inf" | "+inf") {
        return Ok(None);
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    let day = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
        ResponseError::new(MODULE, Errno::ParamNotDate, json!({ "date": value }))
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(Some(Utc.from_utc_datetime(&day.and_time(time))))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ResponseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ResponseError::new(
            MODULE,
            Errno::ParamNotBoolean,
            json!({ key: value }),
        )),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CourseLectures {
    Plain(Vec<Lecture>),
    WithStats(Vec<LectureStats>),
}

impl CourseLectures {
    pub fn len(&self) -> usize {
        match self {
            CourseLectures::Plain(l) => l.len(),
            CourseLectures::WithStats(l) => l.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Time left until the next 23:59:00 UTC. At or past today's mark the
/// next one is tomorrow's, so the result is always in `(0, 1 day]`.
pub fn next_check(now: DateTime<Utc>) -> std::time::Duration {
    let mark = NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN);
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(mark));
    let next = if now < today { today } else { today + Duration::days(1) };
    (next - now).to_std().unwrap_or_default()
}

pub struct TeacherService {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
}

impl TeacherService {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub async fn get_courses(&self, teacher_id: i64) -> Result<Vec<Course>, AppError> {
        Ok(repository::teacher_courses(&self.db, teacher_id).await?)
    }

    pub async fn get_course_lectures(
        &self,
        teacher_id: i64,
        course_id: i64,
        query: &LectureQuery,
    ) -> Result<CourseLectures, AppError> {
        self.ensure_teaches(teacher_id, course_id).await?;
        debug!(?query, "listing course lectures");

        let lectures: Vec<Lecture> = repository::course_lectures(&self.db, course_id)
            .await?
            .into_iter()
            .filter(|l| query.contains(l))
            .collect();

        if !query.bookings {
            return Ok(CourseLectures::Plain(lectures));
        }

        let counts: HashMap<i64, (i64, i64)> = repository::booking_counts(&self.db, course_id)
            .await?
            .into_iter()
            .map(|c| (c.lecture_id, (c.bookings, c.attendances)))
            .collect();

        let stats = lectures
            .into_iter()
            .map(|lecture| {
                let (bookings, attendances) = counts.get(&lecture.id).copied().unwrap_or((0, 0));
                LectureStats {
                    lecture,
                    bookings,
                    attendances: query.attendances.then_some(attendances),
                }
            })
            .collect();

        Ok(CourseLectures::WithStats(stats))
    }

    pub async fn get_course_lecture(
        &self,
        teacher_id: i64,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<Lecture, AppError> {
        self.ensure_teaches(teacher_id, course_id).await?;
        self.course_lecture(course_id, lecture_id).await
    }

    pub async fn get_course_lecture_students(
        &self,
        teacher_id: i64,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<Vec<BookedStudent>, AppError> {
        self.get_course_lecture(teacher_id, course_id, lecture_id).await?;
        Ok(repository::booked_students(&self.db, lecture_id).await?)
    }

    pub async fn delete_course_lecture(
        &self,
        teacher_id: i64,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<(), AppError> {
        let lecture = self.get_course_lecture(teacher_id, course_id, lecture_id).await?;
        lectures::cancel_lecture(&self.db, &self.mailer, MODULE, &lecture, Utc::now()).await
    }

    pub async fn update_delivery_mode(
        &self,
        teacher_id: i64,
        course_id: i64,
        lecture_id: i64,
        switch_to: &str,
    ) -> Result<(), AppError> {
        let mode = parse_mode(MODULE, switch_to)?;
        let lecture = self.get_course_lecture(teacher_id, course_id, lecture_id).await?;

        if !is_lecture_switchable(&lecture, Utc::now(), mode) {
            return Err(ResponseError::new(
                MODULE,
                Errno::LectureNotSwitchable,
                json!({ "lectureId": lecture_id, "delivery": lecture.delivery, "switchTo": mode }),
            )
            .into());
        }

        lectures::switch_delivery(&self.db, &self.mailer, &lecture, mode).await
    }

    pub async fn update_student_status(
        &self,
        teacher_id: i64,
        course_id: i64,
        lecture_id: i64,
        student_id: i64,
        status: &str,
    ) -> Result<(), AppError> {
        let status = BookingStatus::parse_attendance(status).ok_or_else(|| {
            ResponseError::new(MODULE, Errno::BookingInvalidStatus, json!({ "status": status }))
        })?;
        self.get_course_lecture(teacher_id, course_id, lecture_id).await?;

        if !repository::update_booking_status(&self.db, student_id, lecture_id, status).await? {
            return Err(ResponseError::new(
                MODULE,
                Errno::BookingNotPresent,
                json!({ "studentId": student_id, "lectureId": lecture_id }),
            )
            .into());
        }

        info!(student_id, lecture_id, status = status.as_str(), "attendance recorded");
        Ok(())
    }

    /// Emails each teacher the number of bookings of their lectures whose
    /// booking window closes on `today`. Returns how many emails went out.
    pub async fn check_for_expired_lectures(&self, today: NaiveDate) -> Result<usize, AppError> {
        let closing = repository::lectures_closing_on(&self.db, today).await?;
        info!("{} lecture(s) close their bookings on {}", closing.len(), today);

        let emails: Vec<OutgoingEmail> = closing
            .iter()
            .map(|l| {
                templates::students_number(&l.teacher_email, &l.course_name, &l.starting_date, l.booked)
            })
            .collect();

        Ok(email::send_to_all(self.mailer.as_ref(), &emails).await)
    }

    async fn ensure_teaches(&self, teacher_id: i64, course_id: i64) -> Result<(), AppError> {
        if repository::is_teacher_of_course(&self.db, teacher_id, course_id).await? {
            Ok(())
        } else {
            Err(ResponseError::new(
                MODULE,
                Errno::TeacherCourseMismatch,
                json!({ "teacherId": teacher_id, "courseId": course_id }),
            )
            .into())
        }
    }

    async fn course_lecture(&self, course_id: i64, lecture_id: i64) -> Result<Lecture, AppError> {
        repository::find_course_lecture(&self.db, course_id, lecture_id)
            .await?
            .ok_or_else(|| lecture_not_found(MODULE, course_id, lecture_id).into())
    }
}
