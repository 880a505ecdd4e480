use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;
use tracing::error;

/// Numeric error codes shared with the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Errno {
    ParamNotInt = 1,
    ParamNotDate = 2,
    ParamNotBoolean = 3,
    QueryParamNotAccepted = 4,
    TeacherCourseMismatch = 10,
    CourseLectureMismatch = 11,
    StudentCourseMismatch = 12,
    LectureNotFound = 20,
    LectureNotCancellable = 21,
    LectureNotSwitchable = 22,
    LectureInvalidDeliveryMode = 23,
    BookingInvalidStatus = 30,
    BookingNotPresent = 31,
    BookingAlreadyPresent = 32,
    BookingDeadlineExpired = 33,
    EntityTypeNotValid = 40,
    EntityNotFound = 41,
    EntityFieldMissing = 42,
    EntityFieldInvalid = 43,
    ScheduleNotFound = 50,
    DbGenericError = 90,
}

impl Errno {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn status(self) -> StatusCode {
        use Errno::*;
        match self {
            ParamNotInt
            | ParamNotDate
            | ParamNotBoolean
            | QueryParamNotAccepted
            | LectureInvalidDeliveryMode
            | BookingInvalidStatus
            | EntityTypeNotValid
            | EntityFieldMissing
            | EntityFieldInvalid => StatusCode::BAD_REQUEST,
            TeacherCourseMismatch
            | CourseLectureMismatch
            | StudentCourseMismatch
            | LectureNotFound
            | BookingNotPresent
            | EntityNotFound
            | ScheduleNotFound => StatusCode::NOT_FOUND,
            LectureNotSwitchable => StatusCode::NOT_ACCEPTABLE,
            LectureNotCancellable | BookingAlreadyPresent | BookingDeadlineExpired => {
                StatusCode::CONFLICT
            }
            DbGenericError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(self) -> &'static str {
        use Errno::*;
        match self {
            ParamNotInt => "Parameter is not an integer",
            ParamNotDate => "Parameter is not a valid date",
            ParamNotBoolean => "Parameter is not a boolean",
            QueryParamNotAccepted => "Query parameter not accepted",
            TeacherCourseMismatch => "The teacher is not in charge of this course",
            CourseLectureMismatch => "The lecture is not related to this course",
            StudentCourseMismatch => "The student is not enrolled in this course",
            LectureNotFound => "Lecture not found",
            LectureNotCancellable => "The lecture can no longer be cancelled",
            LectureNotSwitchable => "The lecture delivery mode can no longer be changed",
            LectureInvalidDeliveryMode => "Invalid delivery mode",
            BookingInvalidStatus => "Invalid booking status",
            BookingNotPresent => "The student has not booked this lecture",
            BookingAlreadyPresent => "The student has already booked this lecture",
            BookingDeadlineExpired => "The booking time is expired",
            EntityTypeNotValid => "Entity type not valid",
            EntityNotFound => "Entity not found",
            EntityFieldMissing => "Missing field in uploaded entity",
            EntityFieldInvalid => "Invalid field in uploaded entity",
            ScheduleNotFound => "This schedule does not exist",
            DbGenericError => "Database error",
        }
    }
}

impl Serialize for Errno {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.code())
    }
}

/// Tagged error raised by the domain services.
///
/// Carries the module that rejected the request, the error code and a
/// payload naming the offending values. The HTTP status follows the code.
#[derive(Debug, Clone, Error)]
#[error("{module}: {msg} {details}", msg = .errno.message())]
pub struct ResponseError {
    pub module: &'static str,
    pub errno: Errno,
    pub details: Value,
}

impl ResponseError {
    pub fn new(module: &'static str, errno: Errno, details: Value) -> Self {
        Self {
            module,
            errno,
            details,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.errno.status()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Internal server error")]
    InternalServerError,
}

impl AppError {
    /// The errno carried by a domain rejection, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            AppError::Response(e) => Some(e.errno),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub source: String,
    pub errno: Option<Errno>,
    pub error: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub details: Value,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Response(e) => (
                e.status(),
                ErrorResponse {
                    source: e.module.to_string(),
                    errno: Some(e.errno),
                    error: e.errno.message().to_string(),
                    details: e.details,
                },
            ),
            AppError::Database(e) => {
                error!("database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        source: "Database".to_string(),
                        errno: Some(Errno::DbGenericError),
                        error: "Database error occurred".to_string(),
                        details: Value::Null,
                    },
                )
            }
            AppError::Email(msg) => {
                error!("email error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        source: "EmailService".to_string(),
                        errno: None,
                        error: "Email delivery failed".to_string(),
                        details: Value::Null,
                    },
                )
            }
            AppError::InternalServerError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    source: "Server".to_string(),
                    errno: None,
                    error: "Internal server error".to_string(),
                    details: Value::Null,
                },
            ),
        };

        (status, Json(body)).into_response()
    }
}
