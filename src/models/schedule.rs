use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "scheduleId")]
    pub id: i64,
    pub code: String,
    #[serde(rename = "AAyear")]
    pub aa_year: i64,
    pub semester: i64,
    pub room_id: i64,
    pub seats: i64,
    pub day_of_week: String,
    /// `HH:MM:SS`
    pub starting_time: String,
    /// `HH:MM:SS`
    pub ending_time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleRequest {
    pub room_id: Option<i64>,
    pub seats: Option<i64>,
    pub day_of_week: Option<String>,
    pub starting_time: Option<String>,
    pub ending_time: Option<String>,
}
