//! Expands weekly schedules into dated lectures.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};

use crate::models::{DeliveryMode, InvalidValue, Lecture, NewLecture, Schedule};

/// First and last day of a semester. Semester 1 runs October to January,
/// semester 2 March to June; both end in the year after `aa_year`.
pub fn term_bounds(aa_year: i64, semester: i64) -> Option<(NaiveDate, NaiveDate)> {
    let year = i32::try_from(aa_year).ok()?;
    match semester {
        1 => Some((
            NaiveDate::from_ymd_opt(year, 10, 1)?,
            NaiveDate::from_ymd_opt(year + 1, 1, 31)?,
        )),
        2 => Some((
            NaiveDate::from_ymd_opt(year + 1, 3, 1)?,
            NaiveDate::from_ymd_opt(year + 1, 6, 30)?,
        )),
        _ => None,
    }
}

/// `Mon`, `monday`, `MONDAY`...
pub fn parse_weekday(value: &str) -> Option<Weekday> {
    value.trim().parse().ok()
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Accepts `H:MM`, `HH:MM` and `HH:MM:SS`.
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Splits a slot such as `8:30-11:30` into its start and end.
pub fn parse_time_range(value: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = value.split_once('-')?;
    let start = parse_time(start)?;
    let end = parse_time(end)?;
    (start < end).then_some((start, end))
}

/// Bookings close at 23:59 of the day before the lecture.
pub fn booking_deadline(starting_date: DateTime<Utc>) -> DateTime<Utc> {
    let day_before = starting_date.date_naive() - Duration::days(1);
    Utc.from_utc_datetime(&day_before.and_hms_opt(23, 59, 0).unwrap_or_default())
}

fn slot(schedule: &Schedule) -> Result<(Weekday, NaiveTime, NaiveTime), InvalidValue> {
    let day = parse_weekday(&schedule.day_of_week)
        .ok_or_else(|| InvalidValue::new("day of week", schedule.day_of_week.clone()))?;
    let start = parse_time(&schedule.starting_time)
        .ok_or_else(|| InvalidValue::new("starting time", schedule.starting_time.clone()))?;
    let end = parse_time(&schedule.ending_time)
        .ok_or_else(|| InvalidValue::new("ending time", schedule.ending_time.clone()))?;
    if end <= start {
        return Err(InvalidValue::new(
            "time slot",
            format!("{}-{}", schedule.starting_time, schedule.ending_time),
        ));
    }
    Ok((day, start, end))
}

fn lecture_on(
    day: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    course_id: i64,
    schedule: &Schedule,
) -> NewLecture {
    let starting_date = Utc.from_utc_datetime(&day.and_time(start));
    NewLecture {
        course_id,
        class_id: schedule.room_id,
        schedule_id: Some(schedule.id),
        starting_date,
        duration: (end - start).num_minutes(),
        booking_deadline: booking_deadline(starting_date),
        delivery: DeliveryMode::Presence,
    }
}

/// One lecture for every occurrence of the schedule's weekday in its term.
pub fn lectures_for(schedule: &Schedule, course_id: i64) -> Result<Vec<NewLecture>, InvalidValue> {
    let (weekday, start, end) = slot(schedule)?;
    let (first, last) = term_bounds(schedule.aa_year, schedule.semester).ok_or_else(|| {
        InvalidValue::new("semester", format!("{}/{}", schedule.aa_year, schedule.semester))
    })?;

    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    let mut day = first + Duration::days(i64::from(offset));

    let mut lectures = Vec::new();
    while day <= last {
        lectures.push(lecture_on(day, start, end, course_id, schedule));
        day += Duration::weeks(1);
    }
    Ok(lectures)
}

/// Moves a lecture to the schedule's current room and slot, on the first
/// matching weekday on or after its current date. Lectures only ever move
/// forward, by less than a week, so a weekly series stays one per week.
///
/// Returns `None` when the new slot has already started by `now` or falls
/// after the end of the term; such a lecture keeps its current slot.
pub fn reslot(
    lecture: &Lecture,
    schedule: &Schedule,
    now: DateTime<Utc>,
) -> Result<Option<Lecture>, InvalidValue> {
    let (weekday, start, end) = slot(schedule)?;
    let (_, last) = term_bounds(schedule.aa_year, schedule.semester).ok_or_else(|| {
        InvalidValue::new("semester", format!("{}/{}", schedule.aa_year, schedule.semester))
    })?;

    let current = lecture.starting_date.date_naive();
    let ahead = (7 + weekday.num_days_from_monday() - current.weekday().num_days_from_monday()) % 7;
    let day = current + Duration::days(i64::from(ahead));
    let moved = lecture_on(day, start, end, lecture.course_id, schedule);

    if day > last || moved.starting_date <= now {
        return Ok(None);
    }

    Ok(Some(Lecture {
        class_id: moved.class_id,
        starting_date: moved.starting_date,
        duration: moved.duration,
        booking_deadline: moved.booking_deadline,
        ..lecture.clone()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(day: &str, semester: i64) -> Schedule {
        Schedule {
            id: 4,
            code: "XY1211".to_string(),
            aa_year: 2026,
            semester,
            room_id: 12,
            seats: 80,
            day_of_week: day.to_string(),
            starting_time: "08:30:00".to_string(),
            ending_time: "11:30:00".to_string(),
        }
    }

    #[test]
    fn parses_slots_and_days() {
        let (start, end) = parse_time_range("8:30-11:30").unwrap();
        assert_eq!(format_time(start), "08:30:00");
        assert_eq!(format_time(end), "11:30:00");
        assert!(parse_time_range("11:30-8:30").is_none());
        assert!(parse_time_range("8:30").is_none());
        assert_eq!(parse_weekday("Mon"), Some(Weekday::Mon));
        assert_eq!(parse_weekday("thursday"), Some(Weekday::Thu));
        assert_eq!(parse_weekday("Funday"), None);
    }

    #[test]
    fn first_semester_mondays() {
        let lectures = lectures_for(&schedule("Mon", 1), 1).unwrap();
        // 2026-10-05 is the first Monday of the term, 2027-01-25 the last.
        assert_eq!(lectures.len(), 17);
        let first = &lectures[0];
        assert_eq!(first.starting_date, Utc.with_ymd_and_hms(2026, 10, 5, 8, 30, 0).unwrap());
        assert_eq!(first.booking_deadline, Utc.with_ymd_and_hms(2026, 10, 4, 23, 59, 0).unwrap());
        assert_eq!(first.duration, 180);
        assert_eq!(first.class_id, 12);
        assert_eq!(first.schedule_id, Some(4));
        assert_eq!(first.delivery, DeliveryMode::Presence);
        assert_eq!(
            lectures.last().unwrap().starting_date.date_naive(),
            NaiveDate::from_ymd_opt(2027, 1, 25).unwrap()
        );
    }

    #[test]
    fn second_semester_starts_in_march() {
        let lectures = lectures_for(&schedule("Wed", 2), 1).unwrap();
        assert_eq!(
            lectures[0].starting_date.date_naive(),
            NaiveDate::from_ymd_opt(2027, 3, 3).unwrap()
        );
        assert!(lectures.iter().all(|l| l.starting_date.weekday() == Weekday::Wed));
    }

    #[test]
    fn unknown_semester_is_rejected() {
        assert!(lectures_for(&schedule("Mon", 3), 1).is_err());
    }

    fn lecture_from(new: NewLecture) -> Lecture {
        Lecture {
            id: 9,
            course_id: new.course_id,
            class_id: new.class_id,
            schedule_id: new.schedule_id,
            starting_date: new.starting_date,
            duration: new.duration,
            booking_deadline: new.booking_deadline,
            delivery: DeliveryMode::Remote,
        }
    }

    fn early() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn reslot_moves_forward_to_the_new_day() {
        // Wed 2026-10-07
        let lecture = lecture_from(lectures_for(&schedule("Wed", 1), 1).unwrap().remove(0));

        let mut changed = schedule("Mon", 1);
        changed.room_id = 3;
        changed.starting_time = "14:00:00".to_string();
        changed.ending_time = "15:30:00".to_string();

        let moved = reslot(&lecture, &changed, early()).unwrap().unwrap();
        assert_eq!(moved.id, 9);
        assert_eq!(moved.class_id, 3);
        assert_eq!(moved.starting_date, Utc.with_ymd_and_hms(2026, 10, 12, 14, 0, 0).unwrap());
        assert_eq!(moved.booking_deadline, Utc.with_ymd_and_hms(2026, 10, 11, 23, 59, 0).unwrap());
        assert_eq!(moved.duration, 90);
        assert_eq!(moved.delivery, DeliveryMode::Remote);

        let later = reslot(&lecture, &schedule("Fri", 1), early()).unwrap().unwrap();
        assert_eq!(later.starting_date, Utc.with_ymd_and_hms(2026, 10, 9, 8, 30, 0).unwrap());
    }

    #[test]
    fn reslot_never_lands_in_the_past() {
        // Sat 2026-10-17 20:00, checked that same morning
        let start = Utc.with_ymd_and_hms(2026, 10, 17, 20, 0, 0).unwrap();
        let mut lecture = lecture_from(lectures_for(&schedule("Sat", 1), 1).unwrap().remove(0));
        lecture.starting_date = start;
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 6, 40, 0).unwrap();

        let moved = reslot(&lecture, &schedule("Mon", 1), now).unwrap().unwrap();
        assert_eq!(moved.starting_date, Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap());
        assert!(moved.starting_date > now);

        // same day, but the new time has already gone by
        let late = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();
        assert!(reslot(&lecture, &schedule("Sat", 1), late).unwrap().is_none());
    }

    #[test]
    fn reslot_stays_inside_the_term() {
        // Fri 2027-01-29 is the last Friday of the first semester
        let mut lecture = lecture_from(lectures_for(&schedule("Fri", 1), 1).unwrap().pop().unwrap());
        assert_eq!(lecture.starting_date.date_naive(), NaiveDate::from_ymd_opt(2027, 1, 29).unwrap());
        assert!(reslot(&lecture, &schedule("Mon", 1), early()).unwrap().is_none());

        lecture.starting_date = Utc.with_ymd_and_hms(2027, 1, 22, 8, 30, 0).unwrap();
        assert!(reslot(&lecture, &schedule("Mon", 1), early()).unwrap().is_some());
    }
}
