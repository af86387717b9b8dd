//! Scripted in-memory [PacsApi] used by the pipeline and pool tests.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{client::PacsApi, error::RequestError, JobId, JobState, PatientId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Health,
    Modality(String),
    Upload(PathBuf),
    Send(String, PatientId),
    Poll(JobId),
    Delete(PatientId),
}

pub(crate) struct FakePacs {
    failing_health: bool,
    failing_modality: bool,
    failing_uploads: Vec<String>,
    failing_dispatch: bool,
    failing_delete: bool,
    /// `None` entries fail the status request.
    poll_script: Mutex<VecDeque<Option<JobState>>>,
    default_state: JobState,
    upload_delay: Duration,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl FakePacs {
    pub(crate) fn new() -> Self {
        Self {
            failing_health: false,
            failing_modality: false,
            failing_uploads: Vec::new(),
            failing_dispatch: false,
            failing_delete: false,
            poll_script: Mutex::new(VecDeque::new()),
            default_state: JobState::Success,
            upload_delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_health(mut self) -> Self {
        self.failing_health = true;
        self
    }

    pub(crate) fn failing_modality(mut self) -> Self {
        self.failing_modality = true;
        self
    }

    pub(crate) fn failing_upload(mut self, file_name: &str) -> Self {
        self.failing_uploads.push(file_name.to_string());
        self
    }

    pub(crate) fn failing_dispatch(mut self) -> Self {
        self.failing_dispatch = true;
        self
    }

    pub(crate) fn failing_delete(mut self) -> Self {
        self.failing_delete = true;
        self
    }

    /// States returned by successive polls, before falling back to `always`.
    pub(crate) fn poll_script(self, script: Vec<Option<JobState>>) -> Self {
        *self.poll_script.lock().unwrap() = script.into();
        self
    }

    pub(crate) fn always(mut self, state: JobState) -> Self {
        self.default_state = state;
        self
    }

    pub(crate) fn upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn polls(&self) -> usize {
        self.count(|c| matches!(c, Call::Poll(_)))
    }

    pub(crate) fn deletes(&self) -> usize {
        self.count(|c| matches!(c, Call::Delete(_)))
    }

    /// Highest number of uploads observed running at the same time.
    pub(crate) fn peak_uploads(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn refused() -> RequestError {
    RequestError::Status(StatusCode::BAD_GATEWAY)
}

#[async_trait]
impl PacsApi for FakePacs {
    async fn health_check(&self) -> Result<(), RequestError> {
        self.record(Call::Health);
        if self.failing_health {
            return Err(refused());
        }
        Ok(())
    }

    async fn check_modality(&self, name: &str) -> Result<(), RequestError> {
        self.record(Call::Modality(name.to_string()));
        if self.failing_modality {
            return Err(RequestError::Status(StatusCode::NOT_FOUND));
        }
        Ok(())
    }

    async fn upload_archive(&self, path: &Path) -> Result<PatientId, RequestError> {
        self.record(Call::Upload(path.to_path_buf()));

        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        if !self.upload_delay.is_zero() {
            tokio::time::sleep(self.upload_delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.failing_uploads.contains(&name) {
            return Err(RequestError::MissingField("ParentPatient"));
        }
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(PatientId::new(format!("P-{}", stem)))
    }

    async fn trigger_modality_send(
        &self,
        modality: &str,
        patient: &PatientId,
    ) -> Result<JobId, RequestError> {
        self.record(Call::Send(modality.to_string(), patient.clone()));
        if self.failing_dispatch {
            return Err(refused());
        }
        Ok(JobId::new(format!("J-{}", patient)))
    }

    async fn poll_job(&self, job: &JobId) -> Result<JobState, RequestError> {
        self.record(Call::Poll(job.clone()));
        let next = self.poll_script.lock().unwrap().pop_front();
        match next {
            Some(Some(state)) => Ok(state),
            Some(None) => Err(refused()),
            None => Ok(self.default_state),
        }
    }

    async fn delete_study(&self, patient: &PatientId) -> Result<(), RequestError> {
        self.record(Call::Delete(patient.clone()));
        if self.failing_delete {
            return Err(refused());
        }
        Ok(())
    }
}
