use chrono::{DateTime, Utc};

use crate::models::{DeliveryMode, EmailType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub recipient: String,
    pub kind: EmailType,
    pub subject: String,
    pub body: String,
}

pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d/%m/%Y %H:%M").to_string()
}

pub fn booking_confirmed(recipient: &str, course: &str, starting_date: &DateTime<Utc>) -> OutgoingEmail {
    OutgoingEmail {
        recipient: recipient.to_string(),
        kind: EmailType::BookingConfirmed,
        subject: format!("Booking confirmation - {}", course),
        body: format!(
            "Your seat for the lecture of {} scheduled for {} has been booked.",
            course,
            format_date(starting_date)
        ),
    }
}

pub fn lesson_cancelled(recipient: &str, course: &str, starting_date: &DateTime<Utc>) -> OutgoingEmail {
    OutgoingEmail {
        recipient: recipient.to_string(),
        kind: EmailType::LessonCancelled,
        subject: format!("Lecture cancelled - {}", course),
        body: format!(
            "The lecture of {} scheduled for {} has been cancelled.",
            course,
            format_date(starting_date)
        ),
    }
}

pub fn delivery_changed(
    recipient: &str,
    course: &str,
    starting_date: &DateTime<Utc>,
    mode: DeliveryMode,
) -> OutgoingEmail {
    OutgoingEmail {
        recipient: recipient.to_string(),
        kind: EmailType::LessonUpdateDelivery,
        subject: format!("Lecture update - {}", course),
        body: format!(
            "The lecture of {} scheduled for {} will be held in {} mode.",
            course,
            format_date(starting_date),
            mode.as_str()
        ),
    }
}

pub fn students_number(
    recipient: &str,
    course: &str,
    starting_date: &DateTime<Utc>,
    booked: i64,
) -> OutgoingEmail {
    OutgoingEmail {
        recipient: recipient.to_string(),
        kind: EmailType::StudentsNumber,
        subject: format!("Bookings summary - {}", course),
        body: format!(
            "Bookings are closed for the lecture of {} scheduled for {}: {} student(s) booked.",
            course,
            format_date(starting_date),
            booked
        ),
    }
}
