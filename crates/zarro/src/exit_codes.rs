//! Exit codes for the CLI

use zarro_core::{ConfigError, EnvError, ZarroError};
use zarro_tasks::{DagError, DiscoveryError, SequencerError};

use crate::cli::CliError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// A task module or package.json could not be loaded
pub const DISCOVERY_ERROR: i32 = 3;

/// One or more tasks failed
pub const TASK_FAILED: i32 = 4;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Exit code for an error that ended the run
pub fn for_error(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return match cli {
            CliError::TasksFailed(_) => TASK_FAILED,
            CliError::Cancelled => CANCELLED,
        };
    }
    if err.downcast_ref::<DiscoveryError>().is_some() {
        return DISCOVERY_ERROR;
    }
    if err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<EnvError>().is_some()
        || matches!(err.downcast_ref::<ZarroError>(), Some(ZarroError::Config(_)))
    {
        return CONFIG_ERROR;
    }
    ERROR
}

/// Whether the error comes from zarro itself rather than the OS or a
/// library
pub fn is_internal(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CliError>().is_some()
        || err.downcast_ref::<ZarroError>().is_some()
        || err.downcast_ref::<ConfigError>().is_some()
        || err.downcast_ref::<EnvError>().is_some()
        || err.downcast_ref::<DiscoveryError>().is_some()
        || err.downcast_ref::<DagError>().is_some()
        || err.downcast_ref::<SequencerError>().is_some()
}
