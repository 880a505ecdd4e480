use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::info;

use crate::db::repository;
use crate::email::{self, Mailer, templates};
use crate::error::{AppError, Errno, ResponseError};
use crate::models::{Course, Lecture};
use crate::services::eligibility::is_booking_open;
use crate::services::lectures::lecture_not_found;

const MODULE: &str = "StudentService";

pub struct StudentService {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
}

impl StudentService {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>) -> Self {
        Self { db, mailer }
    }

    pub async fn get_courses(&self, student_id: i64) -> Result<Vec<Course>, AppError> {
        Ok(repository::student_courses(&self.db, student_id).await?)
    }

    pub async fn get_course_lectures(
        &self,
        student_id: i64,
        course_id: i64,
    ) -> Result<Vec<Lecture>, AppError> {
        self.ensure_enrolled(student_id, course_id).await?;
        Ok(repository::course_lectures(&self.db, course_id).await?)
    }

    /// Books a seat. Checks run in a fixed order so the caller always sees
    /// the first rule that fails: course/lecture correlation, deadline,
    /// enrollment, then duplicate booking. The confirmation email is sent in
    /// the background.
    pub async fn book_lecture(
        &self,
        student_id: i64,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<(), AppError> {
        let lecture = repository::find_course_lecture(&self.db, course_id, lecture_id)
            .await?
            .ok_or_else(|| lecture_not_found(MODULE, course_id, lecture_id))?;

        let now = Utc::now();
        if !is_booking_open(&lecture, now) {
            return Err(ResponseError::new(
                MODULE,
                Errno::BookingDeadlineExpired,
                json!({ "lectureId": lecture_id, "bookingDeadline": lecture.booking_deadline }),
            )
            .into());
        }

        self.ensure_enrolled(student_id, course_id).await?;

        // the primary key on (student, lecture) settles concurrent duplicates
        match repository::insert_booking(&self.db, student_id, lecture_id, now).await {
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(ResponseError::new(
                    MODULE,
                    Errno::BookingAlreadyPresent,
                    json!({ "studentId": student_id, "lectureId": lecture_id }),
                )
                .into());
            }
            result => result?,
        }
        info!(student_id, lecture_id, "lecture booked");

        if let Some(student) = repository::find_user(&self.db, student_id).await? {
            let course = repository::find_course(&self.db, course_id).await?;
            let course_name = course.map(|c| c.description).unwrap_or_default();
            let email =
                templates::booking_confirmed(&student.email, &course_name, &lecture.starting_date);
            email::dispatch(self.mailer.clone(), vec![email]);
        }

        Ok(())
    }

    pub async fn unbook_lecture(
        &self,
        student_id: i64,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<(), AppError> {
        repository::find_course_lecture(&self.db, course_id, lecture_id)
            .await?
            .ok_or_else(|| lecture_not_found(MODULE, course_id, lecture_id))?;

        if !repository::delete_booking(&self.db, student_id, lecture_id).await? {
            return Err(ResponseError::new(
                MODULE,
                Errno::BookingNotPresent,
                json!({ "studentId": student_id, "lectureId": lecture_id }),
            )
            .into());
        }

        info!(student_id, lecture_id, "booking removed");
        Ok(())
    }

    async fn ensure_enrolled(&self, student_id: i64, course_id: i64) -> Result<(), AppError> {
        if repository::is_student_enrolled(&self.db, student_id, course_id).await? {
            Ok(())
        } else {
            Err(ResponseError::new(
                MODULE,
                Errno::StudentCourseMismatch,
                json!({ "studentId": student_id, "courseId": course_id }),
            )
            .into())
        }
    }
}
