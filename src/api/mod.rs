pub mod logging;

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, Query};
use axum::middleware;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use serde_json::json;
use tracing::info;

use crate::error::{AppError, Errno, ResponseError};
use crate::models::*;
use crate::services::upload::Row;
use crate::services::{CourseLectures, LectureQuery, Requester};
use crate::state::AppState;

const STUDENT: &str = "StudentService";
const TEACHER: &str = "TeacherService";
const SUPPORT: &str = "SupportOfficerService";

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/students/{student_id}/courses", get(student_courses))
        .route(
            "/students/{student_id}/courses/{course_id}/lectures",
            get(student_lectures),
        )
        .route(
            "/students/{student_id}/courses/{course_id}/lectures/{lecture_id}",
            post(book_lecture).delete(unbook_lecture),
        )
        .route("/teachers/{teacher_id}/courses", get(teacher_courses))
        .route(
            "/teachers/{teacher_id}/courses/{course_id}/lectures",
            get(teacher_lectures),
        )
        .route(
            "/teachers/{teacher_id}/courses/{course_id}/lectures/{lecture_id}",
            get(teacher_lecture)
                .delete(teacher_cancel_lecture)
                .put(teacher_switch_delivery),
        )
        .route(
            "/teachers/{teacher_id}/courses/{course_id}/lectures/{lecture_id}/students",
            get(lecture_students),
        )
        .route(
            "/teachers/{teacher_id}/courses/{course_id}/lectures/{lecture_id}/students/{student_id}",
            put(update_student_status),
        )
        .route("/supports/{support_id}/courses", get(support_courses))
        .route(
            "/supports/{support_id}/courses/{course_id}/lectures",
            get(support_lectures),
        )
        .route(
            "/supports/{support_id}/courses/{course_id}/lectures/{lecture_id}",
            put(support_switch_delivery).delete(support_cancel_lecture),
        )
        .route("/supports/{support_id}/uploads/{entity}", post(upload_entities))
        .route("/supports/{support_id}/schedules", get(schedules))
        .route("/supports/{support_id}/schedules/{schedule_id}", put(update_schedule))
        .route("/supports/{support_id}/rooms", get(rooms))
        .layer(middleware::from_fn(logging::logging_middleware))
        .with_state(state)
}

/// Parses path segments as integer ids, naming the first one that is not.
fn parse_ids<const N: usize>(
    module: &'static str,
    raw: [(&'static str, &str); N],
) -> Result<[i64; N], ResponseError> {
    let mut ids = [0; N];
    for (slot, (name, value)) in ids.iter_mut().zip(raw) {
        *slot = value
            .parse()
            .map_err(|_| ResponseError::new(module, Errno::ParamNotInt, json!({ name: value })))?;
    }
    Ok(ids)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

// ---- students ----

async fn student_courses(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<Course>>, AppError> {
    let [student_id] = parse_ids(STUDENT, [("studentId", student_id.as_str())])?;
    Ok(Json(state.students().get_courses(student_id).await?))
}

async fn student_lectures(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(String, String)>,
) -> Result<Json<Vec<Lecture>>, AppError> {
    let [student_id, course_id] =
        parse_ids(STUDENT, [("studentId", student_id.as_str()), ("courseId", course_id.as_str())])?;
    let lectures = state.students().get_course_lectures(student_id, course_id).await?;
    Ok(Json(lectures))
}

async fn book_lecture(
    State(state): State<AppState>,
    Path((student_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let [student_id, course_id, lecture_id] = parse_ids(
        STUDENT,
        [("studentId", student_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state.students().book_lecture(student_id, course_id, lecture_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn unbook_lecture(
    State(state): State<AppState>,
    Path((student_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let [student_id, course_id, lecture_id] = parse_ids(
        STUDENT,
        [("studentId", student_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state.students().unbook_lecture(student_id, course_id, lecture_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- teachers ----

async fn teacher_courses(
    State(state): State<AppState>,
    Path(teacher_id): Path<String>,
) -> Result<Json<Vec<Course>>, AppError> {
    let [teacher_id] = parse_ids(TEACHER, [("teacherId", teacher_id.as_str())])?;
    Ok(Json(state.teachers().get_courses(teacher_id).await?))
}

async fn teacher_lectures(
    State(state): State<AppState>,
    Path((teacher_id, course_id)): Path<(String, String)>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<CourseLectures>, AppError> {
    let [teacher_id, course_id] =
        parse_ids(TEACHER, [("teacherId", teacher_id.as_str()), ("courseId", course_id.as_str())])?;
    let query = LectureQuery::parse(&params)?;
    let lectures = state
        .teachers()
        .get_course_lectures(teacher_id, course_id, &query)
        .await?;
    Ok(Json(lectures))
}

async fn teacher_lecture(
    State(state): State<AppState>,
    Path((teacher_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<Json<Lecture>, AppError> {
    let [teacher_id, course_id, lecture_id] = parse_ids(
        TEACHER,
        [("teacherId", teacher_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    let lecture = state
        .teachers()
        .get_course_lecture(teacher_id, course_id, lecture_id)
        .await?;
    Ok(Json(lecture))
}

async fn teacher_cancel_lecture(
    State(state): State<AppState>,
    Path((teacher_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let [teacher_id, course_id, lecture_id] = parse_ids(
        TEACHER,
        [("teacherId", teacher_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state
        .teachers()
        .delete_course_lecture(teacher_id, course_id, lecture_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn teacher_switch_delivery(
    State(state): State<AppState>,
    Path((teacher_id, course_id, lecture_id)): Path<(String, String, String)>,
    Json(req): Json<UpdateDeliveryRequest>,
) -> Result<StatusCode, AppError> {
    let [teacher_id, course_id, lecture_id] = parse_ids(
        TEACHER,
        [("teacherId", teacher_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state
        .teachers()
        .update_delivery_mode(teacher_id, course_id, lecture_id, &req.mode)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn lecture_students(
    State(state): State<AppState>,
    Path((teacher_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<Json<Vec<BookedStudent>>, AppError> {
    let [teacher_id, course_id, lecture_id] = parse_ids(
        TEACHER,
        [("teacherId", teacher_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    let students = state
        .teachers()
        .get_course_lecture_students(teacher_id, course_id, lecture_id)
        .await?;
    Ok(Json(students))
}

async fn update_student_status(
    State(state): State<AppState>,
    Path((teacher_id, course_id, lecture_id, student_id)): Path<(String, String, String, String)>,
    Json(req): Json<UpdateBookingStatusRequest>,
) -> Result<StatusCode, AppError> {
    let [teacher_id, course_id, lecture_id, student_id] = parse_ids(
        TEACHER,
        [
            ("teacherId", teacher_id.as_str()),
            ("courseId", course_id.as_str()),
            ("lectureId", lecture_id.as_str()),
            ("studentId", student_id.as_str()),
        ],
    )?;
    state
        .teachers()
        .update_student_status(teacher_id, course_id, lecture_id, student_id, &req.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- support officers ----

async fn support_courses(
    State(state): State<AppState>,
    Path(support_id): Path<String>,
) -> Result<Json<Vec<Course>>, AppError> {
    let [support_id] = parse_ids(SUPPORT, [("supportId", support_id.as_str())])?;
    Ok(Json(state.support_officers().get_courses(support_id).await?))
}

async fn support_lectures(
    State(state): State<AppState>,
    Path((support_id, course_id)): Path<(String, String)>,
) -> Result<Json<Vec<Lecture>>, AppError> {
    let [support_id, course_id] =
        parse_ids(SUPPORT, [("supportId", support_id.as_str()), ("courseId", course_id.as_str())])?;
    let lectures = state
        .support_officers()
        .get_course_lectures(support_id, course_id)
        .await?;
    Ok(Json(lectures))
}

async fn support_cancel_lecture(
    State(state): State<AppState>,
    Path((support_id, course_id, lecture_id)): Path<(String, String, String)>,
) -> Result<StatusCode, AppError> {
    let [support_id, course_id, lecture_id] = parse_ids(
        SUPPORT,
        [("supportId", support_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state
        .support_officers()
        .delete_course_lecture(Requester::Support(support_id), course_id, lecture_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn support_switch_delivery(
    State(state): State<AppState>,
    Path((support_id, course_id, lecture_id)): Path<(String, String, String)>,
    Json(req): Json<UpdateDeliveryRequest>,
) -> Result<StatusCode, AppError> {
    let [support_id, course_id, lecture_id] = parse_ids(
        SUPPORT,
        [("supportId", support_id.as_str()), ("courseId", course_id.as_str()), ("lectureId", lecture_id.as_str())],
    )?;
    state
        .support_officers()
        .update_course_lecture(support_id, course_id, lecture_id, &req.mode)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn upload_entities(
    State(state): State<AppState>,
    Path((support_id, entity)): Path<(String, String)>,
    Json(rows): Json<Vec<Row>>,
) -> Result<StatusCode, AppError> {
    let [support_id] = parse_ids(SUPPORT, [("supportId", support_id.as_str())])?;
    let report = state
        .support_officers()
        .manage_entities_upload(&entity, &rows)
        .await?;
    info!(support_id, entity = %entity, ?report, "entities uploaded");
    Ok(StatusCode::NO_CONTENT)
}

async fn schedules(
    State(state): State<AppState>,
    Path(support_id): Path<String>,
) -> Result<Json<Vec<Schedule>>, AppError> {
    let [support_id] = parse_ids(SUPPORT, [("supportId", support_id.as_str())])?;
    Ok(Json(state.support_officers().get_schedules(support_id).await?))
}

async fn update_schedule(
    State(state): State<AppState>,
    Path((support_id, schedule_id)): Path<(String, String)>,
    Json(changes): Json<UpdateScheduleRequest>,
) -> Result<StatusCode, AppError> {
    let [support_id, schedule_id] =
        parse_ids(SUPPORT, [("supportId", support_id.as_str()), ("scheduleId", schedule_id.as_str())])?;
    state
        .support_officers()
        .update_schedule(support_id, schedule_id, changes)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rooms(
    State(state): State<AppState>,
    Path(support_id): Path<String>,
) -> Result<Json<Vec<Room>>, AppError> {
    let [support_id] = parse_ids(SUPPORT, [("supportId", support_id.as_str())])?;
    Ok(Json(state.support_officers().get_rooms(support_id).await?))
}
