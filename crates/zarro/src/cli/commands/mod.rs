//! CLI commands

pub mod create_task;
pub mod init;
pub mod list;
pub mod run;
pub mod sequence;
pub mod show_env;
