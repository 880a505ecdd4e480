//! Time-window rules for changing a lecture once it has been scheduled.

use chrono::{DateTime, Duration, Utc};

use crate::models::{DeliveryMode, Lecture};

pub const CANCEL_CUTOFF_MINUTES: i64 = 60;
pub const SWITCH_CUTOFF_MINUTES: i64 = 30;

/// A lecture can be cancelled up to one hour before it starts.
pub fn is_lecture_cancellable(lecture: &Lecture, now: DateTime<Utc>) -> bool {
    lecture.starting_date - now > Duration::minutes(CANCEL_CUTOFF_MINUTES)
}

/// Teachers may only move an in-presence lecture online, and only up to
/// half an hour before it starts.
pub fn is_lecture_switchable(lecture: &Lecture, now: DateTime<Utc>, switch_to: DeliveryMode) -> bool {
    switch_to == DeliveryMode::Remote
        && lecture.delivery == DeliveryMode::Presence
        && lecture.starting_date - now > Duration::minutes(SWITCH_CUTOFF_MINUTES)
}

pub fn is_lecture_switchable_by_officer(lecture: &Lecture, now: DateTime<Utc>) -> bool {
    lecture.starting_date - now > Duration::minutes(SWITCH_CUTOFF_MINUTES)
}

pub fn is_booking_open(lecture: &Lecture, now: DateTime<Utc>) -> bool {
    now <= lecture.booking_deadline
}
