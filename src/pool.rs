use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::{
    mpsc::{self, Receiver},
    Mutex,
};
use tracing::{debug, error, info, warn};

use crate::{
    client::PacsApi, error::StartupError, pipeline::process_file, UploadConfig, UploadTarget,
};

/// Checks the PACS, and the configured modality if any, before any upload.
pub async fn preflight<A>(api: &A, config: &UploadConfig) -> Result<(), StartupError>
where
    A: PacsApi + ?Sized,
{
    api.health_check()
        .await
        .map_err(|source| StartupError::Unreachable {
            endpoint: format!("{}/system", config.server),
            source,
        })?;
    info!("PACS server {} is reachable.", config.server);

    if let Some(name) = &config.modality {
        api.check_modality(name)
            .await
            .map_err(|source| StartupError::UnknownModality {
                name: name.clone(),
                source,
            })?;
        info!("Modality {} found on the PACS.", name);
    }
    Ok(())
}

/// Processes every archive, with at most `config.workers` pipelines running at
/// once, and returns when all of them are done.
///
/// Failures are logged by the pipelines and never reach the caller.
pub async fn run_batch<A>(api: Arc<A>, config: Arc<UploadConfig>, targets: Vec<UploadTarget>)
where
    A: PacsApi + ?Sized + 'static,
{
    if targets.is_empty() {
        info!("No .zip file to upload.");
        return;
    }

    let total = targets.len();
    let workers = config.workers.get().min(total);
    info!("Uploading {} archive(s) with {} worker(s).", total, workers);

    // The queue holds the whole batch so filling it never waits.
    let (tx, rx) = mpsc::channel(total);
    for target in targets {
        if tx.send(target).await.is_err() {
            break;
        }
    }
    drop(tx);

    let queue = Arc::new(Mutex::new(rx));
    let handles: Vec<_> = (0..workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                Arc::clone(&api),
                Arc::clone(&config),
                Arc::clone(&queue),
            ))
        })
        .collect();

    for res in join_all(handles).await {
        if let Err(e) = res {
            error!("Upload worker stopped unexpectedly: {}", e);
        }
    }
    info!("All {} archive(s) processed.", total);
}

async fn worker<A>(
    id: usize,
    api: Arc<A>,
    config: Arc<UploadConfig>,
    queue: Arc<Mutex<Receiver<UploadTarget>>>,
) where
    A: PacsApi + ?Sized + 'static,
{
    loop {
        let next = queue.lock().await.recv().await;
        let Some(target) = next else {
            break;
        };
        debug!("Worker {} picked {}.", id, target);

        // Spawned so that a panic stays inside this archive's pipeline.
        let pipeline = {
            let api = Arc::clone(&api);
            let config = Arc::clone(&config);
            let target = target.clone();
            tokio::spawn(async move { process_file(api.as_ref(), &config, &target).await })
        };
        match pipeline.await {
            Ok(outcome) if outcome.is_success() => {
                debug!("Worker {} finished {}: {:?}", id, target, outcome)
            }
            Ok(outcome) => warn!("{} stopped early: {:?}", target, outcome),
            Err(e) => error!("{}: pipeline aborted: {}", target, e),
        }
    }
    debug!("Worker {} has no archive left.", id);
}
