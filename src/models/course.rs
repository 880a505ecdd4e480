use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "courseId")]
    pub id: i64,
    pub description: String,
    pub year: i64,
    pub code: Option<String>,
    pub semester: i64,
}
