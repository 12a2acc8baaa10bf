use crate::worker::WorkerSources;
use crate::{BatchJob, BatchUpdate};
use card_impose::{
    BatchControl, BatchOptions, BatchProgress, calculate_statistics, generate_batch,
    generate_preview, save_pdf, save_temp_pdf,
};
use card_records::{load_from_csv, load_stored_records};
use card_template::{PhotoResolver, Template};
use std::path::PathBuf;
use tokio::sync::mpsc;

fn send_error(update_tx: &mpsc::UnboundedSender<BatchUpdate>, message: String) {
    log::error!("{}", message);
    let _ = update_tx.send(BatchUpdate::Error { message });
}

pub async fn handle_load_config(path: PathBuf, update_tx: &mpsc::UnboundedSender<BatchUpdate>) {
    match BatchOptions::load(&path).await {
        Ok(options) => {
            let _ = update_tx.send(BatchUpdate::ConfigLoaded { options });
        }
        Err(e) => send_error(update_tx, format!("Failed to load configuration: {}", e)),
    }
}

pub async fn handle_load_records(
    path: PathBuf,
    resolver: &PhotoResolver,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    let stored = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let loaded = if stored {
        load_stored_records(&path, resolver).await
    } else {
        load_from_csv(&path).await
    };

    match loaded {
        Ok(records) => {
            let _ = update_tx.send(BatchUpdate::RecordsLoaded { records });
        }
        Err(e) => send_error(
            update_tx,
            format!("Failed to load records from {}: {}", path.display(), e),
        ),
    }
}

pub fn handle_calculate_stats(
    template: &Template,
    record_count: usize,
    options: &BatchOptions,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    match calculate_statistics(template, options, record_count) {
        Ok(stats) => {
            let _ = update_tx.send(BatchUpdate::StatsCalculated { stats });
        }
        Err(e) => send_error(update_tx, format!("Failed to calculate statistics: {}", e)),
    }
}

pub async fn handle_generate_preview(
    job: BatchJob,
    sources: &WorkerSources,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    if let Ok(stats) = calculate_statistics(&job.template, &job.options, job.records.len()) {
        let _ = update_tx.send(BatchUpdate::StatsCalculated { stats });
    }

    let mut renderer = match sources.renderer(&job.options.render).await {
        Ok(renderer) => renderer,
        Err(e) => return send_error(update_tx, format!("Failed to set up renderer: {}", e)),
    };

    let output =
        match generate_preview(&job.template, &job.records, &job.options, &mut renderer).await {
            Ok(output) => output,
            Err(e) => return send_error(update_tx, format!("Failed to generate preview: {}", e)),
        };

    match save_temp_pdf(output.document, "card_preview").await {
        Ok(path) => {
            let _ = update_tx.send(BatchUpdate::PreviewGenerated {
                path,
                summary: output.summary,
            });
        }
        Err(e) => send_error(update_tx, format!("Failed to write preview: {}", e)),
    }
}

pub async fn handle_generate(
    job: BatchJob,
    output_path: PathBuf,
    sources: &WorkerSources,
    control: BatchControl,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    let mut renderer = match sources.renderer(&job.options.render).await {
        Ok(renderer) => renderer,
        Err(e) => return send_error(update_tx, format!("Failed to set up renderer: {}", e)),
    };

    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let control = control.with_progress(progress_tx);

    let batch = async move {
        let result =
            generate_batch(&job.template, &job.records, &job.options, &mut renderer, &control)
                .await;
        // Closes the progress channel so the forwarding loop ends
        drop(control);
        result
    };
    let (result, ()) = tokio::join!(batch, forward_progress(progress_rx, update_tx));

    let output = match result {
        Ok(output) => output,
        Err(e) => return send_error(update_tx, format!("Failed to generate batch: {}", e)),
    };

    if let Err(e) = save_pdf(output.document, &output_path).await {
        return send_error(update_tx, format!("Failed to save PDF: {}", e));
    }

    let _ = update_tx.send(BatchUpdate::Complete {
        path: output_path,
        summary: output.summary,
    });
}

async fn forward_progress(
    mut progress_rx: mpsc::UnboundedReceiver<BatchProgress>,
    update_tx: &mpsc::UnboundedSender<BatchUpdate>,
) {
    while let Some(progress) = progress_rx.recv().await {
        let _ = update_tx.send(BatchUpdate::Progress(progress));
    }
}
