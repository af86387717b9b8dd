use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

use crate::{JobId, PatientId};

/// Low-level cause of a failed PACS request.
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("could not read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned status {0}")]
    Status(StatusCode),
    #[error("could not decode response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no \"{0}\" field in response")]
    MissingField(&'static str),
    #[error("{0} is not a valid server URL")]
    InvalidUrl(String),
}

/// Errors that stop the whole run before any archive is uploaded.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("PACS server check on {endpoint} failed: {source}")]
    Unreachable {
        endpoint: String,
        source: RequestError,
    },
    #[error("modality {name} check failed: {source}")]
    UnknownModality { name: String, source: RequestError },
    #[error("could not list .zip files in {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("could not open log file {}: {source}", .path.display())]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that stop the pipeline of a single archive.
#[derive(Error, Debug)]
pub enum PacsError {
    #[error("upload of {} failed: {source}", .path.display())]
    Upload {
        path: PathBuf,
        source: RequestError,
    },
    #[error("sending patient {patient} to modality {modality} failed: {source}")]
    Dispatch {
        patient: PatientId,
        modality: String,
        source: RequestError,
    },
    #[error("{}: status check of job {job} for patient {patient} failed: {source}", .path.display())]
    Poll {
        path: PathBuf,
        patient: PatientId,
        job: JobId,
        source: RequestError,
    },
    #[error("deleting patient {patient} from the PACS failed: {source}")]
    Delete {
        patient: PatientId,
        source: RequestError,
    },
}
