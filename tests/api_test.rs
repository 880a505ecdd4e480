mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use common::*;
use pulsebs::api::router;
use pulsebs::state::AppState;

async fn app() -> (Router, SqlitePool) {
    let pool = setup_db().await;
    let (_recorder, mailer) = mailers();
    let state = AppState {
        db: pool.clone(),
        mailer,
        upload: upload_options(),
    };
    (router(state), pool)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn health_check() {
    let (app, _pool) = app().await;
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn non_integer_ids_are_rejected() {
    let (app, _pool) = app().await;

    let (status, body) = send(&app, "GET", "/students/abc/courses", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errno"], 1);
    assert_eq!(body["source"], "StudentService");
    assert_eq!(body["details"], json!({ "studentId": "abc" }));

    let (status, body) = send(&app, "GET", "/teachers/4/courses/x1/lectures", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"], json!({ "courseId": "x1" }));
}

#[tokio::test]
async fn student_books_and_unbooks() {
    let (app, pool) = app().await;
    let lecture_id = upcoming_lecture(&pool, COURSE).await;

    let (status, courses) = send(&app, "GET", "/students/1/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().unwrap().len(), 2);
    assert_eq!(courses[0]["courseId"], 1);

    let (status, lectures) = send(&app, "GET", "/students/1/courses/1/lectures", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(lectures[0]["lectureId"], lecture_id);
    assert_eq!(lectures[0]["delivery"], "PRESENCE");

    let uri = format!("/students/1/courses/1/lectures/{}", lecture_id);
    let (status, _) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errno"], 32);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errno"], 31);

    let (status, body) = send(&app, "GET", "/students/3/courses/1/lectures", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errno"], 12);
}

#[tokio::test]
async fn teacher_lecture_endpoints() {
    let (app, pool) = app().await;
    let lecture_id = upcoming_lecture(&pool, COURSE).await;
    send(&app, "POST", &format!("/students/1/courses/1/lectures/{}", lecture_id), None).await;

    let (status, body) = send(&app, "GET", "/teachers/4/courses/1/lectures?bookings=true", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["lecture"]["lectureId"], lecture_id);
    assert_eq!(body[0]["bookings"], 1);
    assert!(body[0].get("attendances").is_none());

    let (status, body) = send(&app, "GET", "/teachers/4/courses/1/lectures?sort=asc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errno"], 4);

    let base = format!("/teachers/4/courses/1/lectures/{}", lecture_id);

    let (status, students) = send(&app, "GET", &format!("{}/students", base), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(students[0]["userId"], 1);
    assert_eq!(students[0]["bookingStatus"], "BOOKED");
    assert!(students[0].get("password").is_none());

    let (status, _) = send(&app, "PUT", &format!("{}/students/1", base), Some(json!({ "status": "present" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "PUT", &base, Some(json!({ "mode": "hybrid" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errno"], 23);

    let (status, _) = send(&app, "PUT", &base, Some(json!({ "mode": "remote" }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "PUT", &base, Some(json!({ "mode": "remote" }))).await;
    assert_eq!(status, StatusCode::NOT_ACCEPTABLE);
    assert_eq!(body["errno"], 22);

    let (status, body) = send(&app, "DELETE", &format!("/teachers/5/courses/1/lectures/{}", lecture_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errno"], 10);

    let (status, _) = send(&app, "DELETE", &base, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", &base, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errno"], 11);
}

#[tokio::test]
async fn support_officer_endpoints() {
    let (app, pool) = app().await;
    let soon = imminent_lecture(&pool, COURSE).await;

    let (status, courses) = send(&app, "GET", "/supports/6/courses", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(courses.as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "DELETE", &format!("/supports/6/courses/1/lectures/{}", soon), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errno"], 21);

    let (status, body) = send(&app, "POST", "/supports/6/uploads/rooms", Some(json!([]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errno"], 40);

    let (status, _) = send(
        &app,
        "POST",
        "/supports/6/uploads/schedules",
        Some(json!([{ "Code": "XY4911", "Room": 2, "Seats": 40, "Day": "Tue", "Time": "10:00-11:30" }])),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, schedules) = send(&app, "GET", "/supports/6/schedules", None).await;
    assert_eq!(status, StatusCode::OK);
    let schedule = &schedules[0];
    assert_eq!(schedule["AAyear"], 2026);
    assert_eq!(schedule["semester"], 2);
    assert_eq!(schedule["startingTime"], "10:00:00");

    let uri = format!("/supports/6/schedules/{}", schedule["scheduleId"]);
    let (status, _) = send(&app, "PUT", &uri, Some(json!({ "seats": 35 }))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "PUT", "/supports/6/schedules/404", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errno"], 50);

    let (status, rooms) = send(&app, "GET", "/supports/6/rooms", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rooms.as_array().unwrap().len(), 2);
}
