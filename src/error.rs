use std::io;
use thiserror::Error;

use crate::runner::RunOutcome;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Job killed due to timeout/ExitCode != 0 ({0})")]
    ProcessAbort(RunOutcome),

    #[error("Interrupted waiting for workunit completion")]
    Interrupted,

    #[error("Timeout exceeded for workunit completion")]
    TimeoutExceeded,

    #[error("Job {job_id} was not successful")]
    RemoteJobFailure { job_id: String },

    #[error("WUID is blank")]
    BlankJobId,

    #[error("No WUID found in dfuplus submission output")]
    MissingJobId,

    #[error("Errors executing dfuplus while listing [{mask}]")]
    ListErrors { mask: String },

    #[error("Invalid file mask [{mask}]: {source}")]
    InvalidMask {
        mask: String,
        #[source]
        source: regex::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Worker pool is shut down")]
    PoolShutDown,

    #[error("Worker task ended without a result")]
    TaskLost,

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
