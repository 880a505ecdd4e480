pub mod booking;
pub mod course;
pub mod email;
pub mod lecture;
pub mod room;
pub mod schedule;
pub mod user;

use thiserror::Error;

pub use booking::{BookedStudent, BookingStatus, UpdateBookingStatusRequest};
pub use course::Course;
pub use email::{EmailType, QueuedEmail};
pub use lecture::{DeliveryMode, Lecture, LectureStats, NewLecture, UpdateDeliveryRequest};
pub use room::Room;
pub use schedule::{Schedule, UpdateScheduleRequest};
pub use user::{User, UserKind};

/// Raised when a TEXT column or request field does not name a known variant.
#[derive(Debug, Error)]
#[error("invalid {kind}: {value}")]
pub struct InvalidValue {
    pub kind: &'static str,
    pub value: String,
}

impl InvalidValue {
    pub fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}
