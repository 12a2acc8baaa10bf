use card_async_runtime::*;
use card_impose::MemoryFetcher;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn sources() -> WorkerSources {
    WorkerSources::new(Arc::new(MemoryFetcher::new()))
}

fn job(count: usize) -> BatchJob {
    let mut options = BatchOptions::default();
    options.render.export_dpi = 24.0;
    let records = (0..count)
        .map(|i| [("name", format!("Member {}", i))].into_iter().collect())
        .collect();
    BatchJob::new(Template::new(85.6, 54.0), records, options)
}

/// Drop the handle and gather everything the worker sent before exiting
async fn drain(
    handle: WorkerHandle,
    mut updates: tokio::sync::mpsc::UnboundedReceiver<BatchUpdate>,
) -> Vec<BatchUpdate> {
    drop(handle);
    let mut all = Vec::new();
    while let Some(update) = updates.recv().await {
        all.push(update);
    }
    all
}

#[tokio::test]
async fn test_queued_previews_collapse_to_newest() {
    let (handle, updates) = spawn_worker(sources());
    for count in 1..=3 {
        handle
            .send(BatchCommand::GeneratePreview { job: job(count) })
            .unwrap();
    }

    let updates = drain(handle, updates).await;
    let previews: Vec<_> = updates
        .iter()
        .filter_map(|u| match u {
            BatchUpdate::PreviewGenerated { path, summary } => Some((path.clone(), summary.total)),
            _ => None,
        })
        .collect();

    assert_eq!(previews.len(), 1);
    assert_eq!(previews[0].1, 3);
    assert!(previews[0].0.exists());
    let _ = std::fs::remove_file(&previews[0].0);
}

#[tokio::test]
async fn test_generate_reports_progress_and_completes() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("batch.pdf");
    let (handle, updates) = spawn_worker(sources());
    handle
        .send(BatchCommand::Generate {
            job: job(3),
            output_path: output_path.clone(),
        })
        .unwrap();

    let updates = drain(handle, updates).await;
    let states: Vec<BatchState> = updates
        .iter()
        .filter_map(|u| match u {
            BatchUpdate::Progress(p) => Some(p.state),
            _ => None,
        })
        .collect();
    assert_eq!(states.first(), Some(&BatchState::Idle));
    assert!(states.contains(&BatchState::Rendering(2)));
    assert_eq!(states.last(), Some(&BatchState::Done));

    match updates.last() {
        Some(BatchUpdate::Complete { path, summary }) => {
            assert_eq!(path, &output_path);
            assert_eq!(summary.produced, 3);
            assert!(!summary.cancelled);
        }
        other => panic!("expected Complete, got {:?}", other),
    }
    assert!(output_path.exists());
}

#[tokio::test]
async fn test_stop_applies_to_one_batch() {
    let dir = tempfile::tempdir().unwrap();
    let (handle, mut updates) = spawn_worker(sources());
    handle.stop();
    handle
        .send(BatchCommand::Generate {
            job: job(4),
            output_path: dir.path().join("stopped.pdf"),
        })
        .unwrap();

    let summary = loop {
        match updates.recv().await {
            Some(BatchUpdate::Complete { summary, .. }) => break summary,
            Some(BatchUpdate::Error { message }) => panic!("{}", message),
            Some(_) => continue,
            None => panic!("worker exited early"),
        }
    };
    assert!(summary.cancelled);
    assert_eq!(summary.produced, 0);
    assert!(!handle.stop_requested());
}

#[tokio::test]
async fn test_load_records_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("people.csv");
    tokio::fs::write(&path, "name,class\nAda,7B\nGrace,8A\n")
        .await
        .unwrap();

    let (handle, updates) = spawn_worker(sources());
    handle
        .send(BatchCommand::LoadRecords {
            path,
            resolver: PhotoResolver::default(),
        })
        .unwrap();

    match drain(handle, updates).await.as_slice() {
        [BatchUpdate::RecordsLoaded { records }] => {
            assert_eq!(records.headers, vec!["name", "class"]);
            assert_eq!(records.len(), 2);
        }
        other => panic!("unexpected updates {:?}", other),
    }
}

#[tokio::test]
async fn test_bad_config_reports_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    tokio::fs::write(&path, "{ nope").await.unwrap();

    let (handle, updates) = spawn_worker(sources());
    handle.send(BatchCommand::LoadConfig { path }).unwrap();

    match drain(handle, updates).await.as_slice() {
        [BatchUpdate::Error { message }] => {
            assert!(message.starts_with("Failed to load configuration"), "{}", message)
        }
        other => panic!("unexpected updates {:?}", other),
    }
}

#[tokio::test]
async fn test_statistics_command() {
    let job = job(0);
    let (handle, updates) = spawn_worker(sources());
    handle
        .send(BatchCommand::CalculateStats {
            template: Arc::clone(&job.template),
            record_count: 17,
            options: job.options.clone(),
        })
        .unwrap();

    match drain(handle, updates).await.as_slice() {
        [BatchUpdate::StatsCalculated { stats }] => {
            assert_eq!(stats.cards_per_page, 8);
            assert_eq!(stats.total_pages, 3);
        }
        other => panic!("unexpected updates {:?}", other),
    }
}

#[tokio::test]
async fn test_send_after_worker_exit_fails() {
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
    drop(command_rx);
    let handle = WorkerHandle::new(command_tx, Default::default());
    assert!(matches!(
        handle.send(BatchCommand::LoadConfig {
            path: "x.json".into()
        }),
        Err(RuntimeError::WorkerStopped)
    ));
}
