pub mod config;
pub mod context;
pub mod course_paths;
pub mod logging;
