//! PULSeBS: lecture booking and attendance backend.
//!
//! Students book seats in the lectures of their courses, teachers follow
//! bookings and take attendance, and support officers import master data
//! and maintain the timetable. Notifications go out by email.

pub mod api;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
