use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::email::Mailer;
use crate::services::{StudentService, SupportOfficerService, TeacherService, UploadOptions};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub mailer: Arc<dyn Mailer>,
    pub upload: UploadOptions,
}

impl AppState {
    pub fn new(db: SqlitePool, mailer: Arc<dyn Mailer>, config: &AppConfig) -> Self {
        Self {
            db,
            mailer,
            upload: UploadOptions {
                academic_year: config.academic_year,
                default_password: config.default_password.clone(),
            },
        }
    }

    pub fn students(&self) -> StudentService {
        StudentService::new(self.db.clone(), self.mailer.clone())
    }

    pub fn teachers(&self) -> TeacherService {
        TeacherService::new(self.db.clone(), self.mailer.clone())
    }

    pub fn support_officers(&self) -> SupportOfficerService {
        SupportOfficerService::new(self.db.clone(), self.mailer.clone(), self.upload.clone())
    }
}
