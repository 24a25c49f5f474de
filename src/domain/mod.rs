pub mod analytics;
pub mod models;
pub mod task_query;
pub mod timer;
