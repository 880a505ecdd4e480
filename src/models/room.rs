use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "roomId")]
    pub id: i64,
    pub description: String,
    pub seats: i64,
}
