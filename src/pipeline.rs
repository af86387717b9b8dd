use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::{
    client::PacsApi, error::PacsError, JobId, JobState, PatientId, PollPolicy, UploadConfig,
    UploadTarget,
};

/// Where the pipeline of one archive stopped.
#[derive(Debug)]
pub enum Outcome {
    /// Uploaded, no modality configured.
    Stored(PatientId),
    /// Uploaded and forwarded, the patient is kept on the PACS.
    Forwarded { patient: PatientId, job: JobId },
    /// Uploaded, forwarded, then removed from the PACS.
    Deleted { patient: PatientId, job: JobId },
    /// The forwarding job reported `Failure`.
    JobFailed { patient: PatientId, job: JobId },
    /// The forwarding job was still running after the last poll.
    TimedOut { patient: PatientId, job: JobId },
    /// A request failed, nothing after it was attempted.
    Halted(PacsError),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Stored(_) | Outcome::Forwarded { .. } | Outcome::Deleted { .. }
        )
    }
}

/// Terminal state of a forwarding job, as far as the pipeline is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

/// Runs upload, forward, poll and delete for a single archive.
///
/// Every failure is logged here and ends the pipeline of this archive only.
pub async fn process_file<A>(api: &A, config: &UploadConfig, target: &UploadTarget) -> Outcome
where
    A: PacsApi + ?Sized,
{
    info!("{} upload started.", target);
    let patient = match api.upload_archive(target.path()).await {
        Ok(patient) => patient,
        Err(source) => {
            return halt(
                target,
                PacsError::Upload {
                    path: target.path().to_path_buf(),
                    source,
                },
            )
        }
    };
    info!("{} uploaded, patient {}.", target, patient);

    let Some(modality) = config.modality.as_deref() else {
        return Outcome::Stored(patient);
    };

    info!(
        "Sending patient {} of {} to modality {}.",
        patient, target, modality
    );
    let job = match api.trigger_modality_send(modality, &patient).await {
        Ok(job) => job,
        Err(source) => {
            return halt(
                target,
                PacsError::Dispatch {
                    patient,
                    modality: modality.to_string(),
                    source,
                },
            )
        }
    };
    info!("Patient {} of {} is being sent by job {}.", patient, target, job);

    match wait_for_job(api, &config.poll, target, &patient, &job).await {
        JobOutcome::Succeeded => {}
        JobOutcome::Failed => {
            error!(
                "{}: job {} sending patient {} to {} reported a failure.",
                target, job, patient, modality
            );
            return Outcome::JobFailed { patient, job };
        }
        JobOutcome::TimedOut => {
            error!(
                "{}: job {} sending patient {} to {} not done after {} checks, giving up.",
                target, job, patient, modality, config.poll.max_attempts
            );
            return Outcome::TimedOut { patient, job };
        }
    }
    info!(
        "Patient {} of {} sent to modality {}.",
        patient, target, modality
    );

    if !config.delete_after_send {
        return Outcome::Forwarded { patient, job };
    }

    info!("Deleting patient {} of {} from the PACS.", patient, target);
    if let Err(source) = api.delete_study(&patient).await {
        return halt(target, PacsError::Delete { patient, source });
    }
    info!("Patient {} of {} deleted from the PACS.", patient, target);

    Outcome::Deleted { patient, job }
}

/// Polls `job` until it succeeds, fails, or the attempt budget runs out.
///
/// A failed status request counts as an attempt and is otherwise handled like
/// a job that is still running. `target` and `patient` only appear in the logs.
pub async fn wait_for_job<A>(
    api: &A,
    policy: &PollPolicy,
    target: &UploadTarget,
    patient: &PatientId,
    job: &JobId,
) -> JobOutcome
where
    A: PacsApi + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        match api.poll_job(job).await {
            Ok(JobState::Success) => return JobOutcome::Succeeded,
            Ok(JobState::Failure) => return JobOutcome::Failed,
            Ok(JobState::Pending) => debug!(
                "Job {} still running ({}/{}).",
                job, attempt, policy.max_attempts
            ),
            Err(source) => {
                let err = PacsError::Poll {
                    path: target.path().to_path_buf(),
                    patient: patient.clone(),
                    job: job.clone(),
                    source,
                };
                error!("{} ({}/{})", err, attempt, policy.max_attempts);
            }
        }

        if attempt < policy.max_attempts {
            sleep(policy.interval).await;
        }
    }
    JobOutcome::TimedOut
}

fn halt(target: &UploadTarget, err: PacsError) -> Outcome {
    error!("{}: {}", target, err);
    Outcome::Halted(err)
}
