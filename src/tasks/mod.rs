//! Download task entity and its lifecycle state machine
//!
//! `Pending -> Processing -> (Completed | Failed)`. Terminal states are
//! absorbing; the only way back to `Pending` is [`DownloadTask::reset_for_restore`],
//! used when unfinished work is reloaded after a restart.

mod model;
mod validation;

pub use model::{DownloadTask, FileResult, TaskId, TaskStatus, TransitionError};
pub use validation::{ValidationError, validate_urls};
