use thiserror::Error;

/// A failure reported by the remote service.
///
/// Structured server errors are surfaced verbatim to the operator, so the
/// `Display` output of each variant is the operator-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The server raised an error while computing the result.
    #[error("{message}")]
    Python { message: String },

    /// The addressed object (job, partition set, partition) does not exist.
    #[error("{message}")]
    NotFound { message: String },

    /// The server returned a result shape other than the expected one.
    #[error("{message}")]
    Unexpected { typename: String, message: String },

    /// The request never produced a decodable response.
    #[error("{0}")]
    Transport(String),
}

impl RemoteError {
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// The partition set addressing a launch could not be located.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unable to find partition set on {job_name}: {message}")]
pub struct ResolutionFailure {
    pub job_name: String,
    pub message: String,
}

impl ResolutionFailure {
    pub const NO_DETAILS: &'static str = "No details provided.";

    pub fn no_details(job_name: &str) -> Self {
        Self {
            job_name: job_name.to_string(),
            message: Self::NO_DETAILS.to_string(),
        }
    }
}

/// Caller-side programming errors. These are never shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionViolation {
    #[error("asset '{asset}' has no op name and cannot be launched")]
    MissingStepKey { asset: String },

    #[error("partition key '{key}' is not part of the primary asset's partition space")]
    UnknownPartition { key: String },
}
