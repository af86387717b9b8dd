//! # pacs_upload_rs
//! ## Description
//! **pacs_upload_rs** uploads zip archives of DICOM images to a PACS exposing an
//! Orthanc-style REST API, and can forward every uploaded patient to a modality
//! declared on that PACS.
//!
//! Each archive goes through the same steps, independently of the others:
//!
//! 1. Upload with [upload_archive()], which yields the [PatientId] of the archive.
//! 2. If a modality is configured, start a store job with [trigger_modality_send()].
//! 3. Follow the job with [poll_job()] until it succeeds, fails, or the
//!    [PollPolicy] budget runs out.
//! 4. If the job succeeded and deletion is enabled, remove the patient with
//!    [delete_study()].
//!
//! [process_file()] chains these steps for one archive and [run_batch()] runs it
//! for a whole directory with a fixed number of workers. [preflight()] checks the
//! server, and the modality, before anything is uploaded.
//!
//! ## Example
//! ```rust no_run
//! use std::{path::Path, sync::Arc};
//!
//! #[tokio::main]
//! pub async fn main() {
//!     let mut config = pacs_upload_rs::UploadConfig::new("http://localhost:8042");
//!     config.modality = Some("ARCHIVE".to_string());
//!
//!     let client = pacs_upload_rs::PacsClient::new(&config.server).unwrap();
//!     pacs_upload_rs::preflight(&client, &config).await.unwrap();
//!
//!     let archives = pacs_upload_rs::find_archives(Path::new("./images")).unwrap();
//!     pacs_upload_rs::run_batch(Arc::new(client), Arc::new(config), archives).await;
//! }
//! ```

mod client;
mod delete;
mod error;
mod get;
mod pipeline;
mod pool;
mod post;
mod scan;
mod structs;

#[cfg(test)]
mod fake;

pub use client::{PacsApi, PacsClient};
pub use delete::delete_study;
pub use error::{PacsError, RequestError, StartupError};
pub use get::{check_modality, health_check, poll_job};
pub use pipeline::{process_file, wait_for_job, JobOutcome, Outcome};
pub use pool::{preflight, run_batch};
pub use post::{trigger_modality_send, upload_archive};
pub use scan::find_archives;
pub use structs::{JobId, JobState, PatientId, PollPolicy, UploadConfig, UploadTarget};
