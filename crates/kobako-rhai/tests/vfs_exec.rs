//! Running Rhai scripts stored in a kobako filesystem.

use std::sync::Arc;

use kobako_rhai::{RhaiConfig, RhaiEngine};
use kobako_vfs::{FileSystem, SharedFileSystem, VfsError};

// ============================================================================
// Shared test setup
// ============================================================================

fn fs_with_rhai() -> FileSystem {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    FileSystem::new().with_engine(Arc::new(RhaiEngine::new()))
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn executable_script_runs() {
    let mut fs = fs_with_rhai();
    fs.create_dir("bin").unwrap();
    fs.create_file_with_content(
        "bin/sum",
        r#"
        let total = 0;
        for i in 1..=10 { total += i; }
        print("summing");
        total
    "#,
    )
    .unwrap();
    fs.chmod("bin/sum", "7").unwrap();

    let result = fs.exec("bin/sum").await.unwrap();
    assert!(result.success);
    assert_eq!(result.stdout, "summing\n55");
}

#[tokio::test]
async fn non_executable_script_is_denied() {
    let mut fs = fs_with_rhai();
    fs.create_file_with_content("s", "40 + 2").unwrap();
    assert!(matches!(fs.exec("s").await, Err(VfsError::PermissionDenied(_))));
}

#[tokio::test]
async fn script_errors_surface_as_execution_failed() {
    let mut fs = fs_with_rhai();
    fs.create_file_with_content("broken", "let x = ;").unwrap();
    fs.chmod("broken", "5").unwrap();

    let err = fs.exec("broken").await.unwrap_err();
    assert!(err.is_execution_failure());
}

#[tokio::test]
async fn appended_script_runs_whole() {
    let mut fs = fs_with_rhai();
    fs.create_file_with_content("s", "let a = 40;\n").unwrap();
    fs.append_file("s", "a + 2").unwrap();
    fs.chmod("s", "7").unwrap();
    assert_eq!(fs.exec("s").await.unwrap().stdout, "42");
}

#[tokio::test]
async fn runaway_script_hits_limit() {
    let engine = RhaiEngine::with_config(RhaiConfig::new().with_max_operations(5_000));
    let mut fs = FileSystem::new().with_engine(Arc::new(engine));
    fs.create_file_with_content("spin", "loop { }").unwrap();
    fs.chmod("spin", "7").unwrap();

    let shared = SharedFileSystem::new(fs);
    let err = shared.exec("spin").await.unwrap_err();
    assert!(matches!(err, VfsError::ExecutionFailed { .. }));
    // The lock is free again after the run.
    assert!(shared.lock().exists("spin"));
}
