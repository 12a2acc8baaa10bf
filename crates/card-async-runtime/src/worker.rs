use crate::{BatchCommand, BatchUpdate, WorkerHandle, handlers};
use card_impose::{BatchControl, CardRenderer, ImageFetcher, RenderConfig};
use card_template::PhotoIndex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// Where the worker's renderers get their images from
#[derive(Clone)]
pub struct WorkerSources {
    pub fetcher: Arc<dyn ImageFetcher>,
    pub photo_index: PhotoIndex,
}

impl WorkerSources {
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            photo_index: PhotoIndex::default(),
        }
    }

    pub fn with_photo_index(mut self, index: PhotoIndex) -> Self {
        self.photo_index = index;
        self
    }

    /// A fresh renderer per job so each batch gets its own surface and config
    pub(crate) async fn renderer(&self, config: &RenderConfig) -> card_impose::Result<CardRenderer> {
        CardRenderer::new(config.clone(), Arc::clone(&self.fetcher))
            .with_photo_index(self.photo_index.clone())
            .with_configured_font()
            .await
    }
}

/// Spawn a worker on the current tokio runtime
pub fn spawn_worker(sources: WorkerSources) -> (WorkerHandle, mpsc::UnboundedReceiver<BatchUpdate>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (update_tx, update_rx) = mpsc::unbounded_channel();
    let stop = Arc::new(AtomicBool::new(false));

    tokio::spawn(worker_task(
        sources,
        command_rx,
        update_tx,
        Arc::clone(&stop),
    ));

    (WorkerHandle::new(command_tx, stop), update_rx)
}

/// Async worker task that processes batch commands and sends updates
pub async fn worker_task(
    sources: WorkerSources,
    mut command_rx: mpsc::UnboundedReceiver<BatchCommand>,
    update_tx: mpsc::UnboundedSender<BatchUpdate>,
    stop: Arc<AtomicBool>,
) {
    while let Some(cmd) = command_rx.recv().await {
        process_command(cmd, &sources, &stop, &mut command_rx, &update_tx).await;
    }
    log::debug!("Command channel closed, worker exiting");
}

async fn process_command(
    cmd: BatchCommand,
    sources: &WorkerSources,
    stop: &Arc<AtomicBool>,
    command_rx: &mut mpsc::UnboundedReceiver<BatchCommand>,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    match cmd {
        BatchCommand::LoadConfig { path } => {
            handlers::handle_load_config(path, update_tx).await;
        }
        BatchCommand::LoadRecords { path, resolver } => {
            handlers::handle_load_records(path, &resolver, update_tx).await;
        }
        BatchCommand::CalculateStats {
            template,
            record_count,
            options,
        } => {
            handlers::handle_calculate_stats(&template, record_count, &options, update_tx);
        }
        BatchCommand::GeneratePreview { mut job } => {
            // Drain any queued preview commands, keeping only the most recent
            while let Ok(next_cmd) = command_rx.try_recv() {
                if let BatchCommand::GeneratePreview { job: newer } = next_cmd {
                    log::debug!("Discarding queued preview generation, using newer request");
                    job = newer;
                } else {
                    // Can't put it back, so it runs ahead of the preview
                    Box::pin(process_command(
                        next_cmd, sources, stop, command_rx, update_tx,
                    ))
                    .await;
                }
            }

            handlers::handle_generate_preview(job, sources, update_tx).await;
        }
        BatchCommand::Generate { job, output_path } => {
            let control = BatchControl::new().with_stop_flag(Arc::clone(stop));
            handlers::handle_generate(job, output_path, sources, control, update_tx).await;
            stop.store(false, Ordering::SeqCst);
        }
    }
}
