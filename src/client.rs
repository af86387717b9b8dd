use std::path::Path;

use async_trait::async_trait;
use reqwest::Client;

use crate::{
    check_modality, delete_study, error::RequestError, health_check, poll_job, trigger_modality_send,
    upload_archive, JobId, JobState, PatientId,
};

/// The PACS operations a pipeline relies on.
#[async_trait]
pub trait PacsApi: Send + Sync {
    async fn health_check(&self) -> Result<(), RequestError>;

    async fn check_modality(&self, name: &str) -> Result<(), RequestError>;

    async fn upload_archive(&self, path: &Path) -> Result<PatientId, RequestError>;

    async fn trigger_modality_send(
        &self,
        modality: &str,
        patient: &PatientId,
    ) -> Result<JobId, RequestError>;

    async fn poll_job(&self, job: &JobId) -> Result<JobState, RequestError>;

    async fn delete_study(&self, patient: &PatientId) -> Result<(), RequestError>;
}

/// [PacsApi] over HTTP, sharing one connection pool between all pipelines.
#[derive(Debug, Clone)]
pub struct PacsClient {
    client: Client,
    server: String,
}

impl PacsClient {
    pub fn new(server: &str) -> Result<Self, RequestError> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, server))
    }

    pub fn with_client(client: Client, server: &str) -> Self {
        Self {
            client,
            server: server.trim_end_matches('/').to_string(),
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

#[async_trait]
impl PacsApi for PacsClient {
    async fn health_check(&self) -> Result<(), RequestError> {
        health_check(&self.client, &self.server).await
    }

    async fn check_modality(&self, name: &str) -> Result<(), RequestError> {
        check_modality(&self.client, &self.server, name).await
    }

    async fn upload_archive(&self, path: &Path) -> Result<PatientId, RequestError> {
        upload_archive(&self.client, &self.server, path).await
    }

    async fn trigger_modality_send(
        &self,
        modality: &str,
        patient: &PatientId,
    ) -> Result<JobId, RequestError> {
        trigger_modality_send(&self.client, &self.server, modality, patient).await
    }

    async fn poll_job(&self, job: &JobId) -> Result<JobState, RequestError> {
        poll_job(&self.client, &self.server, job).await
    }

    async fn delete_study(&self, patient: &PatientId) -> Result<(), RequestError> {
        delete_study(&self.client, &self.server, patient).await
    }
}
