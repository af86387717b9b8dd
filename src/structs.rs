use std::{
    fmt,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

/// A zip archive found during the directory scan, waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTarget(PathBuf);

impl UploadTarget {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Patient resource the PACS attached an uploaded archive to.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PatientId(String);

impl PatientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle of an asynchronous job running on the PACS.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a PACS job as seen by a single status request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Success,
    Failure,
}

impl JobState {
    /// Maps the `State` field of a job. Only `Success` and `Failure` are terminal,
    /// every other value (or no value at all) means the job is still running.
    pub fn from_state(state: Option<&str>) -> Self {
        match state {
            Some("Success") => JobState::Success,
            Some("Failure") => JobState::Failure,
            _ => JobState::Pending,
        }
    }
}

/// How often and how many times a forwarding job is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_attempts: 40,
        }
    }
}

/// Settings shared read-only by every pipeline of a batch.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base URL of the PACS, without trailing slash.
    pub server: String,
    /// Modality to forward every uploaded patient to. `None` disables forwarding.
    pub modality: Option<String>,
    /// Number of archives processed at the same time.
    pub workers: NonZeroUsize,
    /// Delete the patient from the PACS once forwarding succeeded.
    pub delete_after_send: bool,
    pub poll: PollPolicy,
}

impl UploadConfig {
    pub fn new(server: &str) -> Self {
        Self {
            server: server.trim_end_matches('/').to_string(),
            modality: None,
            workers: NonZeroUsize::new(3).unwrap_or(NonZeroUsize::MIN),
            delete_after_send: false,
            poll: PollPolicy::default(),
        }
    }
}

/// Body of `POST /modalities/{name}/store`.
#[derive(Serialize, Debug)]
pub struct StoreRequest<'a> {
    #[serde(rename = "Resources")]
    pub resources: Vec<&'a str>,
    #[serde(rename = "Asynchronous")]
    pub asynchronous: bool,
}
