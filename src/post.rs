use std::path::Path;

use reqwest::{header, Client};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    error::RequestError,
    get::{endpoint, read_json},
    structs::StoreRequest,
    JobId, PatientId,
};

/// Uploads a zip archive of DICOM instances to the PACS.
///
/// The PACS answers with one JSON object per stored instance. The patient id
/// is taken from the first of them carrying a `ParentPatient` field.
///
/// # Arguments
///
/// * `client` - The HTTP client to send the request with.
/// * `server` - Base URL of the PACS.
/// * `path` - Path of the zip archive.
///
/// # Returns
///
/// * The [PatientId] the archive was attached to.
///
/// # Errors
///
/// This function will return an error if the file cannot be read, if the POST
/// request fails, if the server returns a non-success status, if the response
/// is not a JSON array of objects, or if none of them names a patient.
pub async fn upload_archive(
    client: &Client,
    server: &str,
    path: &Path,
) -> Result<PatientId, RequestError> {
    let archive = tokio::fs::read(path)
        .await
        .map_err(|source| RequestError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let start = std::time::Instant::now();

    let response = client
        .post(endpoint(server, &["instances"])?)
        .header(header::CONTENT_TYPE, "application/zip")
        .body(archive)
        .send()
        .await?;

    debug!("Time to post {} : {:?}", path.display(), start.elapsed());

    let instances: Vec<Map<String, Value>> = read_json(response).await?;
    parent_patient(&instances).ok_or(RequestError::MissingField("ParentPatient"))
}

fn parent_patient(instances: &[Map<String, Value>]) -> Option<PatientId> {
    instances
        .iter()
        .find_map(|instance| instance.get("ParentPatient")?.as_str())
        .map(PatientId::new)
}

/// Asks the PACS to forward a patient to a modality, asynchronously.
///
/// # Returns
///
/// * The [JobId] of the store job, to be followed with [crate::poll_job].
pub async fn trigger_modality_send(
    client: &Client,
    server: &str,
    modality: &str,
    patient: &PatientId,
) -> Result<JobId, RequestError> {
    let payload = serde_json::to_vec(&StoreRequest {
        resources: vec![patient.as_str()],
        asynchronous: true,
    })?;

    let response = client
        .post(endpoint(server, &["modalities", modality, "store"])?)
        .header(header::CONTENT_TYPE, "application/json")
        .body(payload)
        .send()
        .await?;

    let job: Map<String, Value> = read_json(response).await?;
    job.get("ID")
        .and_then(Value::as_str)
        .map(JobId::new)
        .ok_or(RequestError::MissingField("ID"))
}
