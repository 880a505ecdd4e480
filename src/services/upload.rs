//! Bulk import of master data.
//!
//! Each entity is described by a [`Table`]: the target table and, for every
//! column, where its value comes from. A value is either read from a named
//! CSV column of the uploaded row or derived by a function that may consult
//! the request-local [`Lookups`].

use serde_json::{Map, Value, json};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::db::repository::{self, SqlValue};
use crate::error::{AppError, Errno, ResponseError};
use crate::models::{Schedule, UserKind};
use crate::services::timetable;

const MODULE: &str = "SupportOfficerService";

/// One uploaded CSV record, keyed by header.
pub type Row = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Students,
    Teachers,
    Courses,
    Enrollments,
    Schedules,
    TeacherCourse,
}

impl Entity {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "STUDENTS" => Some(Entity::Students),
            "TEACHERS" => Some(Entity::Teachers),
            "COURSES" => Some(Entity::Courses),
            "ENROLLMENTS" => Some(Entity::Enrollments),
            "SCHEDULES" => Some(Entity::Schedules),
            "TEACHERCOURSE" => Some(Entity::TeacherCourse),
            _ => None,
        }
    }

    fn table(self) -> &'static Table {
        match self {
            Entity::Students => &STUDENTS,
            Entity::Teachers => &TEACHERS,
            Entity::Courses => &COURSES,
            Entity::Enrollments => &ENROLLMENTS,
            Entity::Schedules => &SCHEDULES,
            Entity::TeacherCourse => &TEACHER_COURSE,
        }
    }
}

type Derive = fn(&Row, &Lookups) -> Result<SqlValue, ResponseError>;

enum Source {
    Text(&'static str),
    Int(&'static str),
    Derived(Derive),
}

struct Field {
    column: &'static str,
    source: Source,
}

struct Table {
    name: &'static str,
    fields: &'static [Field],
}

impl Table {
    fn columns(&self) -> Vec<&'static str> {
        self.fields.iter().map(|f| f.column).collect()
    }

    fn map_row(&self, row: &Row, lookups: &Lookups) -> Result<Vec<SqlValue>, ResponseError> {
        self.fields
            .iter()
            .map(|field| match &field.source {
                Source::Text(name) => text(row, name).map(SqlValue::Text),
                Source::Int(name) => int(row, name).map(SqlValue::Int),
                Source::Derived(derive) => derive(row, lookups),
            })
            .collect()
    }
}

const fn field(column: &'static str, source: Source) -> Field {
    Field { column, source }
}

static STUDENTS: Table = Table {
    name: "users",
    fields: &[
        field("type", Source::Derived(|_, _| Ok(SqlValue::Text(UserKind::Student.as_str().to_string())))),
        field("first_name", Source::Text("Name")),
        field("last_name", Source::Text("Surname")),
        field("email", Source::Text("OfficialEmail")),
        field("ssn", Source::Text("SSN")),
        field("birthday", Source::Text("Birthday")),
        field("city", Source::Text("City")),
        field("serial_number", Source::Text("Id")),
        field("password", Source::Derived(default_password)),
    ],
};

static TEACHERS: Table = Table {
    name: "users",
    fields: &[
        field("type", Source::Derived(|_, _| Ok(SqlValue::Text(UserKind::Teacher.as_str().to_string())))),
        field("first_name", Source::Text("GivenName")),
        field("last_name", Source::Text("Surname")),
        field("email", Source::Text("OfficialEmail")),
        field("ssn", Source::Text("SSN")),
        field("serial_number", Source::Text("Number")),
        field("password", Source::Derived(default_password)),
    ],
};

static COURSES: Table = Table {
    name: "courses",
    fields: &[
        field("description", Source::Text("Course")),
        field("year", Source::Int("Year")),
        field("code", Source::Text("Code")),
        field("semester", Source::Int("Semester")),
    ],
};

static TEACHER_COURSE: Table = Table {
    name: "teacher_courses",
    fields: &[
        field("teacher_id", Source::Derived(|row, l| l.teacher_id(&text(row, "Teacher")?))),
        field("course_id", Source::Derived(|row, l| l.course_id(&text(row, "Code")?))),
        field("is_valid", Source::Derived(|_, _| Ok(SqlValue::Int(1)))),
    ],
};

static ENROLLMENTS: Table = Table {
    name: "enrollments",
    fields: &[
        field("student_id", Source::Derived(|row, l| l.student_id(&text(row, "Student")?))),
        field("course_id", Source::Derived(|row, l| l.course_id(&text(row, "Code")?))),
        field("year", Source::Derived(|_, l| Ok(SqlValue::Int(l.academic_year)))),
    ],
};

static SCHEDULES: Table = Table {
    name: "schedules",
    fields: &[
        field("code", Source::Text("Code")),
        field("aa_year", Source::Derived(|_, l| Ok(SqlValue::Int(l.academic_year)))),
        field("semester", Source::Derived(|row, l| l.course_semester(&text(row, "Code")?))),
        field("room_id", Source::Int("Room")),
        field("seats", Source::Int("Seats")),
        field("day_of_week", Source::Derived(day_of_week)),
        field("starting_time", Source::Derived(|row, _| slot(row).map(|(s, _)| s))),
        field("ending_time", Source::Derived(|row, _| slot(row).map(|(_, e)| e))),
    ],
};

fn missing(name: &str) -> ResponseError {
    ResponseError::new(MODULE, Errno::EntityFieldMissing, json!({ "field": name }))
}

fn invalid(name: &str, value: &str) -> ResponseError {
    ResponseError::new(
        MODULE,
        Errno::EntityFieldInvalid,
        json!({ "field": name, "value": value }),
    )
}

fn text(row: &Row, name: &str) -> Result<String, ResponseError> {
    match row.get(name) {
        Some(Value::String(s)) => Ok(s.trim().to_string()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Err(missing(name)),
        Some(other) => Err(invalid(name, &other.to_string())),
    }
}

fn int(row: &Row, name: &str) -> Result<i64, ResponseError> {
    let value = text(row, name)?;
    value.parse().map_err(|_| invalid(name, &value))
}

fn default_password(_: &Row, lookups: &Lookups) -> Result<SqlValue, ResponseError> {
    lookups
        .password_hash
        .clone()
        .map(SqlValue::Text)
        .ok_or_else(|| ResponseError::new(MODULE, Errno::DbGenericError, json!({ "field": "password" })))
}

fn day_of_week(row: &Row, _: &Lookups) -> Result<SqlValue, ResponseError> {
    let value = text(row, "Day")?;
    let day = timetable::parse_weekday(&value).ok_or_else(|| invalid("Day", &value))?;
    Ok(SqlValue::Text(timetable::weekday_name(day).to_string()))
}

fn slot(row: &Row) -> Result<(SqlValue, SqlValue), ResponseError> {
    let value = text(row, "Time")?;
    let (start, end) = timetable::parse_time_range(&value).ok_or_else(|| invalid("Time", &value))?;
    Ok((
        SqlValue::Text(timetable::format_time(start)),
        SqlValue::Text(timetable::format_time(end)),
    ))
}

/// Snapshots the derived fields resolve against. Every list is sorted by
/// its key so lookups are binary searches.
#[derive(Debug, Default)]
pub struct Lookups {
    students: Vec<(String, i64)>,
    teachers: Vec<(String, i64)>,
    /// `(code, id, semester)`
    courses: Vec<(String, i64, i64)>,
    password_hash: Option<String>,
    academic_year: i64,
}

impl Lookups {
    async fn load(
        conn: &mut SqliteConnection,
        entity: Entity,
        options: &UploadOptions,
    ) -> Result<Self, AppError> {
        let mut lookups = Lookups {
            academic_year: options.academic_year,
            ..Default::default()
        };

        match entity {
            Entity::Students | Entity::Teachers => {
                lookups.password_hash = Some(hash_password(&options.default_password).await?);
            }
            Entity::Enrollments => {
                lookups.students = repository::user_serials(&mut *conn, UserKind::Student).await?;
                lookups.courses = repository::course_codes(&mut *conn).await?;
            }
            Entity::TeacherCourse => {
                lookups.teachers = repository::user_serials(&mut *conn, UserKind::Teacher).await?;
                lookups.courses = repository::course_codes(&mut *conn).await?;
            }
            Entity::Schedules => {
                lookups.courses = repository::course_codes(&mut *conn).await?;
            }
            Entity::Courses => {}
        }

        Ok(lookups)
    }

    fn find_user(list: &[(String, i64)], serial: &str) -> Result<SqlValue, ResponseError> {
        list.binary_search_by(|(s, _)| s.as_str().cmp(serial))
            .map(|i| SqlValue::Int(list[i].1))
            .map_err(|_| not_found(serial))
    }

    fn course(&self, code: &str) -> Result<&(String, i64, i64), ResponseError> {
        self.courses
            .binary_search_by(|(c, _, _)| c.as_str().cmp(code))
            .map(|i| &self.courses[i])
            .map_err(|_| not_found(code))
    }

    fn student_id(&self, serial: &str) -> Result<SqlValue, ResponseError> {
        Self::find_user(&self.students, serial)
    }

    fn teacher_id(&self, serial: &str) -> Result<SqlValue, ResponseError> {
        Self::find_user(&self.teachers, serial)
    }

    fn course_id(&self, code: &str) -> Result<SqlValue, ResponseError> {
        self.course(code).map(|c| SqlValue::Int(c.1))
    }

    fn course_semester(&self, code: &str) -> Result<SqlValue, ResponseError> {
        self.course(code).map(|c| SqlValue::Int(c.2))
    }
}

fn not_found(key: &str) -> ResponseError {
    ResponseError::new(MODULE, Errno::EntityNotFound, json!({ "type": key }))
}

async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|_| AppError::InternalServerError)?
        .map_err(|_| AppError::InternalServerError)
}

#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub academic_year: i64,
    pub default_password: String,
}

/// What an upload wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub rows: usize,
    pub teacher_courses: usize,
    pub lectures: usize,
}

/// Maps and inserts every row in one transaction. The first failing row
/// aborts the whole batch.
pub async fn upload(
    db: &SqlitePool,
    entity: Entity,
    rows: &[Row],
    options: &UploadOptions,
) -> Result<UploadReport, AppError> {
    let mut tx = db.begin().await?;

    let mut report = UploadReport::default();
    let ids = insert_rows(&mut *tx, entity, rows, options).await?;
    report.rows = ids.len();

    match entity {
        Entity::Courses => {
            let with_teacher: Vec<Row> = rows
                .iter()
                .filter(|r| matches!(r.get("Teacher"), Some(v) if !v.is_null()))
                .cloned()
                .collect();
            report.teacher_courses =
                insert_rows(&mut *tx, Entity::TeacherCourse, &with_teacher, options)
                    .await?
                    .len();
        }
        Entity::Schedules => {
            report.lectures = generate_lectures(&mut *tx, &ids).await?;
        }
        _ => {}
    }

    tx.commit().await?;
    info!(?entity, ?report, "upload committed");
    Ok(report)
}

async fn insert_rows(
    conn: &mut SqliteConnection,
    entity: Entity,
    rows: &[Row],
    options: &UploadOptions,
) -> Result<Vec<i64>, AppError> {
    let table = entity.table();
    let columns = table.columns();
    let lookups = Lookups::load(conn, entity, options).await?;

    let mut ids = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let values = table.map_row(row, &lookups)?;
        if entity == Entity::Schedules {
            // Rooms named by a timetable may not have been registered yet.
            let room = int(row, "Room")?;
            let seats = int(row, "Seats")?;
            repository::ensure_room(&mut *conn, room, seats).await?;
        }

        let id = repository::insert_row(conn, table.name, &columns, values)
            .await
            .map_err(|e| {
                ResponseError::new(
                    MODULE,
                    Errno::DbGenericError,
                    json!({ "row": index, "msg": e.to_string() }),
                )
            })?;
        ids.push(id);
    }

    debug!(table = table.name, rows = ids.len(), "rows inserted");
    Ok(ids)
}

/// Creates the lectures of every freshly inserted schedule.
async fn generate_lectures(conn: &mut SqliteConnection, schedule_ids: &[i64]) -> Result<usize, AppError> {
    let courses = repository::course_codes(&mut *conn).await?;
    let mut generated = 0;

    for &id in schedule_ids {
        let Some(schedule) = repository::find_schedule(&mut *conn, id).await? else {
            continue;
        };
        let course_id = course_for(&courses, &schedule)?;
        let lectures = timetable::lectures_for(&schedule, course_id).map_err(|e| {
            ResponseError::new(
                MODULE,
                Errno::EntityFieldInvalid,
                json!({ "scheduleId": id, "msg": e.to_string() }),
            )
        })?;

        for lecture in &lectures {
            repository::insert_lecture(&mut *conn, lecture).await?;
        }
        generated += lectures.len();
    }

    Ok(generated)
}

fn course_for(courses: &[(String, i64, i64)], schedule: &Schedule) -> Result<i64, ResponseError> {
    courses
        .binary_search_by(|(code, _, _)| code.as_str().cmp(&schedule.code))
        .map(|i| courses[i].1)
        .map_err(|_| not_found(&schedule.code))
}
