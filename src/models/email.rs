use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailType {
    BookingConfirmed,
    LessonCancelled,
    LessonUpdateDelivery,
    StudentsNumber,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailType::BookingConfirmed => "BOOKING_CONFIRMED",
            EmailType::LessonCancelled => "LESSON_CANCELLED",
            EmailType::LessonUpdateDelivery => "LESSON_UPDATE_DELIVERY",
            EmailType::StudentsNumber => "STUDENTS_NUMBER",
        }
    }
}

impl TryFrom<String> for EmailType {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "BOOKING_CONFIRMED" => Ok(EmailType::BookingConfirmed),
            "LESSON_CANCELLED" => Ok(EmailType::LessonCancelled),
            "LESSON_UPDATE_DELIVERY" => Ok(EmailType::LessonUpdateDelivery),
            "STUDENTS_NUMBER" => Ok(EmailType::StudentsNumber),
            _ => Err(InvalidValue::new("email type", value)),
        }
    }
}

/// A notification persisted until it has been delivered.
#[derive(Debug, Clone, FromRow)]
pub struct QueuedEmail {
    pub id: i64,
    pub lecture_id: i64,
    pub recipient: String,
    #[sqlx(try_from = "String")]
    pub email_type: EmailType,
    pub course_name: String,
    pub starting_date: DateTime<Utc>,
}
