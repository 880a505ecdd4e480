use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::repository;
use crate::email::Mailer;
use crate::error::{AppError, Errno, ResponseError};
use crate::models::{Course, Lecture, Room, Schedule, UpdateScheduleRequest};
use crate::services::eligibility::is_lecture_switchable_by_officer;
use crate::services::lectures::{self, lecture_not_found, parse_mode};
use crate::services::timetable;
use crate::services::upload::{self, Entity, Row, UploadOptions, UploadReport};

const MODULE: &str = "SupportOfficerService";

/// Who asked for a lecture to be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requester {
    Teacher(i64),
    Support(i64),
}

pub struct SupportOfficerService {
    db: SqlitePool,
    mailer: Arc<dyn Mailer>,
    upload_options: UploadOptions,
}

impl SupportOfficerService {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>, upload_options: UploadOptions) -> Self {
        Self {
            db,
            mailer,
            upload_options,
        }
    }

    pub async fn get_courses(&self, _support_id: i64) -> Result<Vec<Course>, AppError> {
        Ok(repository::fetch_courses(&self.db).await?)
    }

    pub async fn get_course_lectures(
        &self,
        _support_id: i64,
        course_id: i64,
    ) -> Result<Vec<Lecture>, AppError> {
        Ok(repository::course_lectures(&self.db, course_id).await?)
    }

    pub async fn delete_course_lecture(
        &self,
        requester: Requester,
        course_id: i64,
        lecture_id: i64,
    ) -> Result<(), AppError> {
        if let Requester::Teacher(teacher_id) = requester {
            if !repository::is_teacher_of_course(&self.db, teacher_id, course_id).await? {
                return Err(ResponseError::new(
                    MODULE,
                    Errno::TeacherCourseMismatch,
                    json!({ "teacherId": teacher_id, "courseId": course_id }),
                )
                .into());
            }
        }

        let lecture = self.course_lecture(course_id, lecture_id).await?;
        lectures::cancel_lecture(&self.db, &self.mailer, MODULE, &lecture, Utc::now()).await
    }

    /// Officers may switch in either direction. Asking for the mode the
    /// lecture already has succeeds without touching anything.
    pub async fn update_course_lecture(
        &self,
        _support_id: i64,
        course_id: i64,
        lecture_id: i64,
        switch_to: &str,
    ) -> Result<(), AppError> {
        let mode = parse_mode(MODULE, switch_to)?;
        let lecture = self.course_lecture(course_id, lecture_id).await?;

        if !is_lecture_switchable_by_officer(&lecture, Utc::now()) {
            return Err(ResponseError::new(
                MODULE,
                Errno::LectureNotSwitchable,
                json!({ "lectureId": lecture_id }),
            )
            .into());
        }

        if lecture.delivery == mode {
            return Ok(());
        }

        lectures::switch_delivery(&self.db, &self.mailer, &lecture, mode).await
    }

    pub async fn manage_entities_upload(
        &self,
        entity: &str,
        rows: &[Row],
    ) -> Result<UploadReport, AppError> {
        let entity = Entity::parse(entity).ok_or_else(|| {
            ResponseError::new(MODULE, Errno::EntityTypeNotValid, json!({ "type": entity }))
        })?;

        upload::upload(&self.db, entity, rows, &self.upload_options).await
    }

    pub async fn get_schedules(&self, _support_id: i64) -> Result<Vec<Schedule>, AppError> {
        Ok(repository::fetch_schedules(&self.db).await?)
    }

    /// Applies the changes and moves the schedule's upcoming lectures to
    /// the new room and slot, never earlier than their current date. Past
    /// lectures are left as they happened.
    pub async fn update_schedule(
        &self,
        _support_id: i64,
        schedule_id: i64,
        changes: UpdateScheduleRequest,
    ) -> Result<Schedule, AppError> {
        let mut tx = self.db.begin().await?;

        let mut schedule = repository::find_schedule(&mut *tx, schedule_id)
            .await?
            .ok_or_else(|| {
                ResponseError::new(
                    MODULE,
                    Errno::ScheduleNotFound,
                    json!({ "scheduleId": schedule_id }),
                )
            })?;

        apply_changes(&mut schedule, changes)?;
        repository::update_schedule(&mut *tx, &schedule).await?;

        let now = Utc::now();
        let upcoming: Vec<Lecture> = repository::schedule_lectures(&mut *tx, schedule_id)
            .await?
            .into_iter()
            .filter(|l| l.starting_date > now)
            .collect();

        let mut moved = 0;
        for lecture in &upcoming {
            let reslotted = timetable::reslot(lecture, &schedule, now).map_err(|e| {
                ResponseError::new(
                    MODULE,
                    Errno::EntityFieldInvalid,
                    json!({ "scheduleId": schedule_id, "msg": e.to_string() }),
                )
            })?;
            match reslotted {
                Some(lecture) => {
                    repository::update_lecture_slot(&mut *tx, &lecture).await?;
                    moved += 1;
                }
                None => debug!(lecture_id = lecture.id, "lecture keeps its slot"),
            }
        }

        tx.commit().await?;
        info!(schedule_id, moved, kept = upcoming.len() - moved, "schedule updated");
        Ok(schedule)
    }

    pub async fn get_rooms(&self, _support_id: i64) -> Result<Vec<Room>, AppError> {
        Ok(repository::fetch_rooms(&self.db).await?)
    }

    async fn course_lecture(&self, course_id: i64, lecture_id: i64) -> Result<Lecture, AppError> {
        repository::find_course_lecture(&self.db, course_id, lecture_id)
            .await?
            .ok_or_else(|| lecture_not_found(MODULE, course_id, lecture_id).into())
    }
}

fn apply_changes(schedule: &mut Schedule, changes: UpdateScheduleRequest) -> Result<(), ResponseError> {
    let invalid = |field: &str, value: &str| {
        ResponseError::new(
            MODULE,
            Errno::EntityFieldInvalid,
            json!({ "field": field, "value": value }),
        )
    };

    if let Some(room_id) = changes.room_id {
        schedule.room_id = room_id;
    }
    if let Some(seats) = changes.seats {
        if seats < 0 {
            return Err(invalid("seats", &seats.to_string()));
        }
        schedule.seats = seats;
    }
    if let Some(day) = changes.day_of_week {
        let parsed = timetable::parse_weekday(&day).ok_or_else(|| invalid("dayOfWeek", &day))?;
        schedule.day_of_week = timetable::weekday_name(parsed).to_string();
    }
    if let Some(start) = changes.starting_time {
        let parsed = timetable::parse_time(&start).ok_or_else(|| invalid("startingTime", &start))?;
        schedule.starting_time = timetable::format_time(parsed);
    }
    if let Some(end) = changes.ending_time {
        let parsed = timetable::parse_time(&end).ok_or_else(|| invalid("endingTime", &end))?;
        schedule.ending_time = timetable::format_time(parsed);
    }

    let slot = format!("{}-{}", schedule.starting_time, schedule.ending_time);
    if timetable::parse_time_range(&slot).is_none() {
        return Err(invalid("time", &slot));
    }

    Ok(())
}
