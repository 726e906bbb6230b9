//! Integration tests for complete select / process / download workflows
//!
//! The removal capability is replaced by mock backends so every race can be
//! replayed in a fixed order.

use bgremove_workflow::{
    backends::{GatedPreviewDecoder, GatedRemover, MemoryDownloadSink, MockRemover},
    services::{DroppedFiles, FileSource},
    BlobStore, DownloadStatus, FailureKind, FileCandidate, ImageWorkflow, InMemoryBlobStore,
    PreviewOutcome, RecordingObserver, SelectionOutcome, WorkflowConfig, WorkflowEvent,
    WorkflowPhase,
};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use tempfile::TempDir;

/// Encode a small gradient as PNG
fn create_png(width: u32, height: u32) -> Vec<u8> {
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let intensity = ((x + y) % 100) as u8;
        *pixel = image::Rgba([intensity, 128, 255 - intensity, 255]);
    }
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn index_of(events: &[WorkflowEvent], wanted: impl Fn(&WorkflowEvent) -> bool) -> usize {
    events
        .iter()
        .position(wanted)
        .expect("event should have been recorded")
}

fn cat() -> FileCandidate {
    FileCandidate::new("cat.png", "image/png", create_png(8, 6))
}

fn dog() -> FileCandidate {
    FileCandidate::new("dog.png", "image/png", create_png(4, 4))
}

#[tokio::test]
async fn scenario_valid_image_completes_with_result() {
    let sink = Arc::new(MemoryDownloadSink::new());
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::succeeding(b"P1".to_vec())))
        .download_sink(sink.clone())
        .build()
        .unwrap();

    let (outcome, preview) = workflow
        .select_file(Some(cat()))
        .unwrap()
        .wait_with_preview()
        .await;

    let SelectionOutcome::Completed(handle) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(preview, PreviewOutcome::Attached);
    assert_eq!(handle.media_type(), "image/png");
    assert!(handle.url().starts_with("blob:"));

    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.phase, WorkflowPhase::Completed);
    assert!(snapshot.can_download());
    assert_eq!(snapshot.source_name.as_deref(), Some("cat.png"));
    assert_eq!(snapshot.preview_dimensions, Some((8, 6)));
    assert_eq!(snapshot.result.as_ref(), Some(&handle));
    assert!(snapshot.error.is_none());
    assert_eq!(workflow.read_result().as_deref(), Some(&b"P1"[..]));

    let status = workflow.request_download().await.unwrap();
    assert_eq!(
        status,
        DownloadStatus::Saved {
            file_name: "processed-image.png".to_string(),
            location: "memory://processed-image.png".to_string(),
        }
    );
    assert_eq!(sink.saves()[0].bytes, b"P1");
    assert_eq!(sink.saves()[0].media_type, "image/png");
}

#[tokio::test]
async fn scenario_non_image_is_rejected_without_capability_call() {
    let remover = MockRemover::echoing();
    let workflow = ImageWorkflow::new(Arc::new(remover.clone())).unwrap();

    let pdf = FileCandidate::new("document.pdf", "application/pdf", b"%PDF-1.7".to_vec());
    let err = workflow.select_file(Some(pdf)).unwrap_err();
    assert_eq!(err.to_string(), "Invalid input: No file selected");

    let snapshot = workflow.snapshot();
    assert_eq!(snapshot.phase, WorkflowPhase::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("No file selected"));
    assert!(!snapshot.is_processing);
    assert!(snapshot.source_name.is_none());

    tokio::task::yield_now().await;
    assert_eq!(remover.call_count(), 0);
}

#[tokio::test]
async fn scenario_capability_failure_keeps_source_preview() {
    let sink = Arc::new(MemoryDownloadSink::new());
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::failing("model exploded")))
        .download_sink(sink.clone())
        .build()
        .unwrap();

    let (outcome, preview) = workflow
        .select_file(Some(cat()))
        .unwrap()
        .wait_with_preview()
        .await;
    assert_eq!(outcome, SelectionOutcome::Failed);
    assert_eq!(preview, PreviewOutcome::Attached);

    let state = workflow.state();
    assert_eq!(state.phase(), WorkflowPhase::Failed);
    let error = state.error().unwrap();
    assert_eq!(error.kind, FailureKind::ProcessingFailure);
    // The internal cause never reaches the presentation layer
    assert_eq!(error.message, "Error processing image");
    let source = state.source().unwrap();
    assert_eq!(source.name(), "cat.png");
    assert!(source
        .preview()
        .unwrap()
        .data_uri
        .starts_with("data:image/png;base64,"));

    assert_eq!(workflow.request_download().await.unwrap(), DownloadStatus::NotReady);
    assert!(sink.saves().is_empty());
    assert_eq!(workflow.phase(), WorkflowPhase::Failed);
    assert_eq!(workflow.blob_stats().created, 0);
}

#[tokio::test]
async fn scenario_new_selection_releases_previous_result_first() {
    let remover = Arc::new(GatedRemover::new());
    let observer = Arc::new(RecordingObserver::new());
    let workflow = ImageWorkflow::builder(remover.clone())
        .observer(observer.clone())
        .build()
        .unwrap();

    let first = workflow.select_file(Some(cat())).unwrap();
    remover.wait_for_calls(1).await;
    assert!(remover.succeed(0, b"P1".to_vec()));
    let SelectionOutcome::Completed(p1) = first.wait().await else {
        panic!("first selection should complete");
    };
    assert_eq!(workflow.read_result().as_deref(), Some(&b"P1"[..]));

    let second = workflow.select_file(Some(dog())).unwrap();

    // Before the new result arrives the old one is gone
    let state = workflow.state();
    assert_eq!(state.phase(), WorkflowPhase::Processing);
    assert!(state.result().is_none());
    assert_eq!(observer.released_handles(), vec![p1.clone()]);
    assert_eq!(workflow.blob_stats().live, 0);
    assert!(workflow.read_result().is_none());

    remover.wait_for_calls(2).await;
    assert!(remover.succeed(1, b"P2".to_vec()));
    let SelectionOutcome::Completed(p2) = second.wait().await else {
        panic!("second selection should complete");
    };
    assert_ne!(p1, p2);
    assert_eq!(workflow.read_result().as_deref(), Some(&b"P2"[..]));
    assert_eq!(workflow.state().source().unwrap().name(), "dog.png");

    let stats = workflow.blob_stats();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.released, 1);
    assert_eq!(stats.live, 1);
}

#[tokio::test]
async fn test_processing_is_entered_before_any_result() {
    let observer = Arc::new(RecordingObserver::new());
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::succeeding(b"P1".to_vec())))
        .observer(observer.clone())
        .build()
        .unwrap();

    workflow
        .select_file(Some(cat()))
        .unwrap()
        .wait_with_preview()
        .await;

    assert_eq!(
        observer.phases(),
        vec![WorkflowPhase::Processing, WorkflowPhase::Completed]
    );

    let events = observer.events();
    let entered_processing = index_of(&events, |e| {
        matches!(
            e,
            WorkflowEvent::StateChanged {
                to: WorkflowPhase::Processing,
                ..
            }
        )
    });
    let preview_ready = index_of(&events, |e| matches!(e, WorkflowEvent::PreviewReady { .. }));
    let result_ready = index_of(&events, |e| matches!(e, WorkflowEvent::ResultReady { .. }));
    assert!(entered_processing < preview_ready);
    assert!(entered_processing < result_ready);
}

#[tokio::test]
async fn test_superseded_result_is_discarded() {
    let remover = Arc::new(GatedRemover::new());
    let workflow = ImageWorkflow::new(remover.clone()).unwrap();

    let first = workflow.select_file(Some(cat())).unwrap();
    remover.wait_for_calls(1).await;
    let second = workflow.select_file(Some(dog())).unwrap();
    remover.wait_for_calls(2).await;
    assert_eq!(remover.call_names(), vec!["cat.png", "dog.png"]);

    // B resolves first, A afterwards
    assert!(remover.succeed(1, b"B".to_vec()));
    assert!(matches!(second.wait().await, SelectionOutcome::Completed(_)));
    assert!(remover.succeed(0, b"A".to_vec()));
    assert_eq!(first.wait().await, SelectionOutcome::Superseded);

    assert_eq!(workflow.phase(), WorkflowPhase::Completed);
    assert_eq!(workflow.read_result().as_deref(), Some(&b"B"[..]));
    assert_eq!(workflow.state().source().unwrap().name(), "dog.png");
    // The stale outcome never became a handle
    assert_eq!(workflow.blob_stats().created, 1);
}

#[tokio::test]
async fn test_stale_failure_does_not_overwrite_newer_run() {
    let remover = Arc::new(GatedRemover::new());
    let workflow = ImageWorkflow::new(remover.clone()).unwrap();

    let first = workflow.select_file(Some(cat())).unwrap();
    let second = workflow.select_file(Some(dog())).unwrap();
    remover.wait_for_calls(2).await;

    assert!(remover.fail(0, "late failure for cat"));
    assert_eq!(first.wait().await, SelectionOutcome::Superseded);
    assert_eq!(workflow.phase(), WorkflowPhase::Processing);
    assert!(workflow.snapshot().error.is_none());

    assert!(remover.succeed(1, b"B".to_vec()));
    assert!(matches!(second.wait().await, SelectionOutcome::Completed(_)));
}

#[tokio::test]
async fn test_stale_preview_is_discarded() {
    let decoder = Arc::new(GatedPreviewDecoder::new());
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::succeeding(b"P".to_vec())))
        .preview_decoder(decoder.clone())
        .build()
        .unwrap();

    let first = workflow.select_file(Some(cat())).unwrap();
    let second = workflow.select_file(Some(dog())).unwrap();
    decoder.release(2);

    let (first_outcome, first_preview) = first.wait_with_preview().await;
    let (second_outcome, second_preview) = second.wait_with_preview().await;
    assert_eq!(first_outcome, SelectionOutcome::Superseded);
    assert_eq!(first_preview, PreviewOutcome::Discarded);
    assert!(matches!(second_outcome, SelectionOutcome::Completed(_)));
    assert_eq!(second_preview, PreviewOutcome::Attached);

    let state = workflow.state();
    let source = state.source().unwrap();
    assert_eq!(source.name(), "dog.png");
    assert!(source.preview().is_some());
}

#[tokio::test]
async fn test_result_can_land_before_preview() {
    let decoder = Arc::new(GatedPreviewDecoder::new());
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::succeeding(b"P".to_vec())))
        .preview_decoder(decoder.clone())
        .build()
        .unwrap();

    let pending = workflow.select_file(Some(cat())).unwrap();
    let mut snapshots = workflow.subscribe();
    snapshots.borrow_and_update();

    snapshots.changed().await.unwrap();
    let snapshot = snapshots.borrow_and_update().clone();
    assert_eq!(snapshot.phase, WorkflowPhase::Completed);
    assert!(!snapshot.is_processing);
    assert!(snapshot.preview.is_none());

    decoder.release(1);
    let (_, preview) = pending.wait_with_preview().await;
    assert_eq!(preview, PreviewOutcome::Attached);
    assert!(workflow.snapshot().preview.is_some());
    assert_eq!(workflow.phase(), WorkflowPhase::Completed);
}

#[tokio::test]
async fn test_reset_supersedes_in_flight_work() {
    let remover = Arc::new(GatedRemover::new());
    let observer = Arc::new(RecordingObserver::new());
    let workflow = ImageWorkflow::builder(remover.clone())
        .observer(observer.clone())
        .build()
        .unwrap();

    let pending = workflow.select_file(Some(cat())).unwrap();
    remover.wait_for_calls(1).await;
    workflow.reset();
    assert_eq!(workflow.phase(), WorkflowPhase::Idle);

    assert!(remover.succeed(0, b"late".to_vec()));
    assert_eq!(pending.wait().await, SelectionOutcome::Superseded);
    assert_eq!(workflow.phase(), WorkflowPhase::Idle);
    assert!(workflow.state().source().is_none());
    assert_eq!(workflow.blob_stats().created, 0);
    assert!(observer
        .events()
        .iter()
        .any(|e| matches!(e, WorkflowEvent::ResultDiscarded { .. })));
}

#[tokio::test]
async fn test_manual_processing_and_retry() {
    let remover = Arc::new(GatedRemover::new());
    let config = WorkflowConfig::builder().auto_process(false).build().unwrap();
    let workflow = ImageWorkflow::builder(remover.clone())
        .config(config)
        .build()
        .unwrap();

    let (outcome, preview) = workflow
        .select_file(Some(cat()))
        .unwrap()
        .wait_with_preview()
        .await;
    assert_eq!(outcome, SelectionOutcome::Loaded);
    assert_eq!(preview, PreviewOutcome::Attached);
    assert_eq!(workflow.phase(), WorkflowPhase::Loaded);
    assert_eq!(remover.call_count(), 0);

    let attempt = workflow.process().unwrap();
    assert_eq!(workflow.phase(), WorkflowPhase::Processing);
    remover.wait_for_calls(1).await;
    assert!(remover.fail(0, "transient"));
    assert_eq!(attempt.wait().await, SelectionOutcome::Failed);

    // Retry the same source after the failure
    let retry = workflow.process().unwrap();
    remover.wait_for_calls(2).await;
    assert!(remover.succeed(1, b"cutout".to_vec()));
    assert!(matches!(retry.wait().await, SelectionOutcome::Completed(_)));
    assert_eq!(workflow.read_result().as_deref(), Some(&b"cutout"[..]));
    assert_eq!(remover.call_names(), vec!["cat.png", "cat.png"]);
}

#[tokio::test]
async fn test_drop_and_picker_share_validation() {
    let temp = TempDir::new().unwrap();
    let pdf = temp.path().join("document.pdf");
    let png = temp.path().join("cat.png");
    std::fs::write(&pdf, b"%PDF-1.7").unwrap();
    std::fs::write(&png, create_png(2, 2)).unwrap();

    let remover = MockRemover::succeeding(b"P1".to_vec());
    let workflow = ImageWorkflow::new(Arc::new(remover.clone())).unwrap();

    // A drop whose first item is a PDF is rejected like a picked PDF
    let dropped = FileSource::from_drop(&DroppedFiles::new([&pdf, &png]))
        .await
        .unwrap();
    assert!(workflow.select_file(dropped).is_err());
    let picked = FileSource::from_path(&pdf).await.unwrap();
    assert!(workflow.select_file(Some(picked)).is_err());

    // An empty drop is "no file selected"
    let empty = FileSource::from_drop(&DroppedFiles::default()).await.unwrap();
    let err = workflow.select_file(empty).unwrap_err();
    assert!(err.to_string().contains("No file selected"));
    assert_eq!(remover.call_count(), 0);

    let dropped = FileSource::from_drop(&DroppedFiles::new([&png, &pdf]))
        .await
        .unwrap();
    let outcome = workflow.select_file(dropped).unwrap().wait().await;
    assert!(matches!(outcome, SelectionOutcome::Completed(_)));
    assert_eq!(remover.get_call_history(), vec!["cat.png".to_string()]);
}

#[tokio::test]
async fn test_download_to_filesystem() {
    let temp = TempDir::new().unwrap();
    let config = WorkflowConfig::builder()
        .download_dir(temp.path().join("downloads"))
        .build()
        .unwrap();
    let workflow = ImageWorkflow::builder(Arc::new(MockRemover::succeeding(b"P1".to_vec())))
        .config(config)
        .build()
        .unwrap();

    workflow.select_file(Some(cat())).unwrap().wait().await;
    let DownloadStatus::Saved { location, .. } = workflow.request_download().await.unwrap() else {
        panic!("download should be saved");
    };

    let expected = temp.path().join("downloads").join("processed-image.png");
    assert_eq!(location, expected.display().to_string());
    assert_eq!(std::fs::read(expected).unwrap(), b"P1");

    // Downloading twice is allowed and keeps the result
    assert!(matches!(
        workflow.request_download().await.unwrap(),
        DownloadStatus::Saved { .. }
    ));
    assert_eq!(workflow.phase(), WorkflowPhase::Completed);
}

#[tokio::test]
async fn test_shared_blob_store_across_workflows() {
    let store = Arc::new(InMemoryBlobStore::new());
    let first = ImageWorkflow::builder(Arc::new(MockRemover::echoing()))
        .blob_store(store.clone())
        .build()
        .unwrap();
    let second = ImageWorkflow::builder(Arc::new(MockRemover::echoing()))
        .blob_store(store.clone())
        .build()
        .unwrap();

    first.select_file(Some(cat())).unwrap().wait().await;
    second.select_file(Some(dog())).unwrap().wait().await;
    assert_eq!(store.stats().live, 2);

    first.reset();
    assert_eq!(store.stats().live, 1);
    assert!(second.read_result().is_some());
}

#[cfg(unix)]
#[tokio::test]
async fn test_command_remover_end_to_end() {
    use bgremove_workflow::CommandRemover;

    let remover = CommandRemover::new("sh", ["-c", "tr a-z A-Z"]);
    let workflow = ImageWorkflow::new(Arc::new(remover)).unwrap();

    let file = FileCandidate::new("cat.png", "image/png", b"cat".to_vec());
    let outcome = workflow.select_file(Some(file)).unwrap().wait().await;

    assert!(matches!(outcome, SelectionOutcome::Completed(_)));
    assert_eq!(workflow.read_result().as_deref(), Some(&b"CAT"[..]));
}
