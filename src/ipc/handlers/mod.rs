pub mod core;
pub mod courses;
pub mod groups;
pub mod performance;
pub mod persons;
pub mod schedule;
pub mod sessions;
pub mod subjects;
pub mod topics;
