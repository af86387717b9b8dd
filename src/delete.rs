use reqwest::Client;
use tracing::debug;

use crate::{error::RequestError, get::endpoint, PatientId};

/// Deletes a patient, with all its studies, from the PACS.
///
/// Any 2xx status is a success. The response body is ignored.
pub async fn delete_study(
    client: &Client,
    server: &str,
    patient: &PatientId,
) -> Result<(), RequestError> {
    let response = client
        .delete(endpoint(server, &["patients", patient.as_str()])?)
        .send()
        .await?;

    match response.status() {
        status if status.is_success() => {
            debug!("Patient {} deleted from {}.", patient, server);
            Ok(())
        }
        status => Err(RequestError::Status(status)),
    }
}
