pub mod eligibility;
pub mod lectures;
pub mod scheduler;
pub mod student;
pub mod support_officer;
pub mod teacher;
pub mod timetable;
pub mod upload;

pub use scheduler::{DailyStats, DailySummaryScheduler};
pub use student::StudentService;
pub use support_officer::{Requester, SupportOfficerService};
pub use teacher::{CourseLectures, LectureQuery, TeacherService};
pub use upload::{Entity, UploadOptions, UploadReport};
