use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::InvalidValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserKind {
    Student,
    Teacher,
    Support,
    Manager,
}

impl UserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserKind::Student => "STUDENT",
            UserKind::Teacher => "TEACHER",
            UserKind::Support => "SUPPORT",
            UserKind::Manager => "MANAGER",
        }
    }
}

impl TryFrom<String> for UserKind {
    type Error = InvalidValue;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_uppercase().as_str() {
            "STUDENT" => Ok(UserKind::Student),
            "TEACHER" => Ok(UserKind::Teacher),
            "SUPPORT" => Ok(UserKind::Support),
            "MANAGER" => Ok(UserKind::Manager),
            _ => Err(InvalidValue::new("user type", value)),
        }
    }
}

/// A student, teacher or staff member.
///
/// The password hash is never serialized; rows hydrated through
/// [`User::sanitized`] drop it altogether.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "userId")]
    pub id: i64,
    #[sqlx(rename = "type", try_from = "String")]
    #[serde(rename = "type")]
    pub kind: UserKind,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[sqlx(default)]
    #[serde(skip_serializing, default)]
    pub password: Option<String>,
    pub ssn: Option<String>,
    pub birthday: Option<String>,
    pub city: Option<String>,
    pub serial_number: Option<String>,
}

impl User {
    pub fn sanitized(mut self) -> Self {
        self.password = None;
        self
    }
}
