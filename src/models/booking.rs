use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{InvalidValue, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Present,
    NotPresent,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Booked => "BOOKED",
            BookingStatus::Present => "PRESENT",
            BookingStatus::NotPresent => "NOT_PRESENT",
        }
    }

    /// Statuses a teacher may record while taking attendance.
    /// `ABSENT` is kept as an alias of `NOT_PRESENT`.
    pub fn parse_attendance(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PRESENT" => Some(BookingStatus::Present),
            "NOT_PRESENT" | "ABSENT" => Some(BookingStatus::NotPresent),
            _ => None,
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "BOOKED" => Ok(BookingStatus::Booked),
            "PRESENT" => Ok(BookingStatus::Present),
            "NOT_PRESENT" => Ok(BookingStatus::NotPresent),
            _ => Err(InvalidValue::new("booking status", value)),
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BookedStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub student: User,
    #[sqlx(try_from = "String")]
    pub booking_status: BookingStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}
