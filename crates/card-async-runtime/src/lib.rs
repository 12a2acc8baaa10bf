use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;

mod handlers;
mod worker;

pub use worker::{WorkerSources, spawn_worker, worker_task};

// Re-export types from library crates
pub use card_impose::{
    BatchOptions, BatchProgress, BatchState, BatchStatistics, BatchSummary, ImageFetcher,
};
pub use card_records::RecordSet;
pub use card_template::{PhotoIndex, PhotoResolver, Record, Template};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Worker is no longer running")]
    WorkerStopped,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Everything a batch run needs besides its options
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub template: Arc<Template>,
    pub records: Arc<Vec<Record>>,
    pub options: BatchOptions,
}

impl BatchJob {
    pub fn new(template: Template, records: Vec<Record>, options: BatchOptions) -> Self {
        Self {
            template: Arc::new(template),
            records: Arc::new(records),
            options,
        }
    }
}

/// Commands sent from the caller to the worker
#[derive(Debug)]
pub enum BatchCommand {
    LoadConfig {
        path: PathBuf,
    },
    /// CSV exports, or stored records when the file ends in `.json`
    LoadRecords {
        path: PathBuf,
        resolver: PhotoResolver,
    },
    CalculateStats {
        template: Arc<Template>,
        record_count: usize,
        options: BatchOptions,
    },
    /// Only the newest queued preview is rendered
    GeneratePreview {
        job: BatchJob,
    },
    Generate {
        job: BatchJob,
        output_path: PathBuf,
    },
}

/// Updates sent from the worker back to the caller
#[derive(Debug, Clone)]
pub enum BatchUpdate {
    Progress(BatchProgress),
    ConfigLoaded {
        options: BatchOptions,
    },
    RecordsLoaded {
        records: RecordSet,
    },
    StatsCalculated {
        stats: BatchStatistics,
    },
    PreviewGenerated {
        path: PathBuf,
        summary: BatchSummary,
    },
    Complete {
        path: PathBuf,
        summary: BatchSummary,
    },
    Error {
        message: String,
    },
}

/// Sending side of a running worker
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    commands: mpsc::UnboundedSender<BatchCommand>,
    stop: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub fn new(commands: mpsc::UnboundedSender<BatchCommand>, stop: Arc<AtomicBool>) -> Self {
        Self { commands, stop }
    }

    pub fn send(&self, command: BatchCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| RuntimeError::WorkerStopped)
    }

    /// Stop the running batch after the record being rendered is placed.
    /// The flag clears once that batch finishes.
    pub fn stop(&self) {
        log::info!("Stop requested");
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}
