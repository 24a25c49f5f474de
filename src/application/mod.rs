pub mod bootstrap;
pub mod commands;
pub mod journal_commands;
pub mod task_commands;
pub mod ticker;
