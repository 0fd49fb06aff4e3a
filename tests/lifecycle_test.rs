//! End-to-end controller scenarios against a recording runtime.

mod common;

use common::{Call, RecordingRuntime};
use devloop::lifecycle::{Interrupts, LifecycleController, LifecycleSettings, RunOutcome, RunRequest};
use devloop::runtime::OutputMode;
use devloop::Error;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Time for the watch set to be seeded once create has returned.
const SETTLE: Duration = Duration::from_millis(300);

fn request(work_dir: &Path, source: &str) -> RunRequest {
    RunRequest {
        source: source.to_string(),
        work_dir: work_dir.to_path_buf(),
        ..Default::default()
    }
}

fn settings(window: Duration) -> LifecycleSettings {
    LifecycleSettings {
        window,
        ..Default::default()
    }
}

fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("svc")).unwrap();
    fs::write(temp.path().join("svc/main.go"), "package main\n").unwrap();
    temp
}

#[tokio::test]
async fn local_source_updates_on_write_and_deletes_on_interrupt() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local"));
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::from_millis(200)));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "./svc");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });

    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join("svc/main.go"), "package main\n\nfunc main() {}\n").unwrap();
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.updates() == 1).await);

    // The burst from one save collapses into a single update.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(runtime.updates(), 1);

    assert!(sender.interrupt());
    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, RunOutcome::Deleted);

    let calls = runtime.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::Create(..)));
    assert!(matches!(calls[1], Call::Update(_)));
    assert!(matches!(calls[2], Call::Delete(_)));

    let service = calls[0].service();
    assert_eq!(service.name, "svc");
    assert!(Path::new(&service.source).exists());
    assert!(calls.iter().all(|c| c.service() == service));
}

#[tokio::test]
async fn create_options_carry_retries_and_output() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local"));
    let controller = LifecycleController::new(
        runtime.clone(),
        LifecycleSettings {
            retries: 0,
            output: OutputMode::Quiet,
            watch: false,
            ..Default::default()
        },
    );
    let (sender, interrupts) = Interrupts::channel();
    sender.interrupt();

    controller.run(request(temp.path(), "./svc"), interrupts).await.unwrap();

    match &runtime.calls()[0] {
        Call::Create(_, options) => {
            assert_eq!(options.retries, 0);
            assert_eq!(options.attempts(), 1);
            assert_eq!(options.output, OutputMode::Quiet);
        }
        other => panic!("expected create, got {:?}", other),
    }
}

#[tokio::test]
async fn remote_source_on_remote_runtime_returns_after_create() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(RecordingRuntime::new("kubernetes"));
    let controller = LifecycleController::new(runtime.clone(), LifecycleSettings::default());
    let (_sender, interrupts) = Interrupts::channel();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        controller.run(request(temp.path(), "github.com/acme/svc"), interrupts),
    )
    .await
    .expect("remote run should not wait for an interrupt")
    .unwrap();

    assert_eq!(outcome, RunOutcome::Detached);
    let calls = runtime.calls();
    assert_eq!(calls.len(), 1);
    let service = calls[0].service();
    assert_eq!(service.name, "svc");
    assert_eq!(service.source, "github.com/acme/svc");
    assert_eq!(service.version, "latest");
}

#[tokio::test]
async fn remote_source_on_local_runtime_waits_for_interrupt_without_watching() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(RecordingRuntime::new("local"));
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::ZERO));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "acme/svc@v2");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join("notes.txt"), "edit").unwrap();
    tokio::time::sleep(SETTLE).await;

    sender.interrupt();
    assert_eq!(task.await.unwrap().unwrap(), RunOutcome::Deleted);
    assert_eq!(runtime.updates(), 0);
    assert_eq!(runtime.deletes(), 1);
    assert_eq!(runtime.calls()[0].service().version, "v2");
}

#[tokio::test]
async fn create_failure_is_fatal_and_nothing_else_happens() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local").failing_create());
    let controller = LifecycleController::new(runtime.clone(), LifecycleSettings::default());
    let (_sender, interrupts) = Interrupts::channel();

    let err = controller
        .run(request(temp.path(), "./svc"), interrupts)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::CreateFailed { attempts: 3, .. }));
    assert_eq!(runtime.calls().len(), 1);
}

#[tokio::test]
async fn resolution_failure_makes_no_runtime_calls() {
    let temp = TempDir::new().unwrap();
    let runtime = Arc::new(RecordingRuntime::new("local"));
    let controller = LifecycleController::new(runtime.clone(), LifecycleSettings::default());

    for source in ["", "   ", "acme//svc", "./missing", "acme/svc@"] {
        let (_sender, interrupts) = Interrupts::channel();
        let err = controller
            .run(request(temp.path(), source), interrupts)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Resolution { .. }), "{source:?}: {err}");
    }

    assert!(runtime.calls().is_empty());
}

#[tokio::test]
async fn second_interrupt_has_no_effect() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local").slow_delete(Duration::from_millis(200)));
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::ZERO));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "./svc");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);

    sender.interrupt();
    tokio::time::sleep(Duration::from_millis(50)).await;
    sender.interrupt();

    assert_eq!(task.await.unwrap().unwrap(), RunOutcome::Deleted);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(runtime.deletes(), 1);
}

#[tokio::test]
async fn failed_update_does_not_stop_the_loop() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local").failing_update());
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::from_millis(100)));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "./svc");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join("svc/main.go"), "broken").unwrap();
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.updates() == 1).await);
    tokio::time::sleep(SETTLE).await;

    fs::write(temp.path().join("svc/main.go"), "package main\n").unwrap();
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.updates() == 2).await);

    sender.interrupt();
    assert_eq!(task.await.unwrap().unwrap(), RunOutcome::Deleted);
    assert_eq!(runtime.deletes(), 1);
}

#[tokio::test]
async fn no_updates_after_delete() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local"));
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::ZERO));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "./svc");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);

    sender.interrupt();
    task.await.unwrap().unwrap();

    fs::write(temp.path().join("svc/main.go"), "changed").unwrap();
    tokio::time::sleep(SETTLE).await;
    assert_eq!(runtime.updates(), 0);
}

#[tokio::test]
async fn write_during_delete_does_not_redeploy() {
    let temp = project();
    let runtime = Arc::new(RecordingRuntime::new("local").slow_delete(Duration::from_millis(600)));
    let controller = LifecycleController::new(runtime.clone(), settings(Duration::ZERO));
    let (sender, interrupts) = Interrupts::channel();

    let req = request(temp.path(), "./svc");
    let task = tokio::spawn(async move { controller.run(req, interrupts).await });
    assert!(runtime.wait_for(Duration::from_secs(5), |r| r.creates() == 1).await);
    tokio::time::sleep(SETTLE).await;

    assert!(sender.interrupt());
    tokio::time::sleep(Duration::from_millis(100)).await;
    fs::write(temp.path().join("svc/main.go"), "package main\n\n// edited\n").unwrap();

    assert_eq!(task.await.unwrap().unwrap(), RunOutcome::Deleted);
    assert_eq!(runtime.updates(), 0);

    let calls = runtime.calls();
    assert_eq!(calls.len(), 2);
    assert!(matches!(calls[0], Call::Create(..)));
    assert!(matches!(calls[1], Call::Delete(_)));
}
