use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeliveryMode {
    Presence,
    Remote,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Presence => "PRESENCE",
            DeliveryMode::Remote => "REMOTE",
        }
    }

    /// Accepts `presence`/`remote` in any letter case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "PRESENCE" => Some(DeliveryMode::Presence),
            "REMOTE" => Some(DeliveryMode::Remote),
            _ => None,
        }
    }
}

impl TryFrom<String> for DeliveryMode {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeliveryMode::parse(&value).ok_or_else(|| InvalidValue::new("delivery mode", value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
    #[serde(rename = "lectureId")]
    pub id: i64,
    pub course_id: i64,
    pub class_id: i64,
    pub schedule_id: Option<i64>,
    pub starting_date: DateTime<Utc>,
    /// Minutes.
    pub duration: i64,
    pub booking_deadline: DateTime<Utc>,
    #[sqlx(try_from = "String")]
    pub delivery: DeliveryMode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLecture {
    pub course_id: i64,
    pub class_id: i64,
    pub schedule_id: Option<i64>,
    pub starting_date: DateTime<Utc>,
    pub duration: i64,
    pub booking_deadline: DateTime<Utc>,
    pub delivery: DeliveryMode,
}

/// A lecture together with the counters a teacher asked for.
#[derive(Debug, Clone, Serialize)]
pub struct LectureStats {
    pub lecture: Lecture,
    pub bookings: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendances: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDeliveryRequest {
    #[serde(alias = "switchTo", alias = "delivery")]
    pub mode: String,
}
