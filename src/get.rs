use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::{error::RequestError, JobId, JobState};

/// Checks that the PACS answers `GET /system` with a JSON document.
///
/// # Arguments
///
/// * `client` - The HTTP client to send the request with.
/// * `server` - Base URL of the PACS.
pub async fn health_check(client: &Client, server: &str) -> Result<(), RequestError> {
    get_json::<Value>(client, endpoint(server, &["system"])?).await?;
    debug!("PACS server {} is reachable.", server);
    Ok(())
}

/// Checks that the modality `name` is declared on the PACS.
pub async fn check_modality(client: &Client, server: &str, name: &str) -> Result<(), RequestError> {
    get_json::<Value>(client, endpoint(server, &["modalities", name])?).await?;
    debug!("Modality {} exists on {}.", name, server);
    Ok(())
}

/// Fetches the current state of a job.
///
/// A missing `State` field, or any value other than `Success` and `Failure`,
/// is reported as [JobState::Pending].
///
/// # Errors
///
/// Returns an error on transport failure, on a non-success status, or if the
/// body is not a JSON object.
pub async fn poll_job(client: &Client, server: &str, job: &JobId) -> Result<JobState, RequestError> {
    let body: Map<String, Value> =
        get_json(client, endpoint(server, &["jobs", job.as_str()])?).await?;
    let state = body.get("State").and_then(Value::as_str);
    debug!("Job {} state: {:?}", job, state);
    Ok(JobState::from_state(state))
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: Url) -> Result<T, RequestError> {
    let response = client.get(url).send().await?;
    read_json(response).await
}

/// Appends `segments` to the path of `server`, percent-encoding each of them.
pub(crate) fn endpoint(server: &str, segments: &[&str]) -> Result<Url, RequestError> {
    let invalid = || RequestError::InvalidUrl(server.to_string());
    let mut url = Url::parse(server).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Rejects non-success responses, then decodes the body as JSON.
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RequestError> {
    let status = response.status();
    if !status.is_success() {
        return Err(RequestError::Status(status));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}
