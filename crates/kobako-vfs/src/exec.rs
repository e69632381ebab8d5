//! Executor gate and the execution collaborator interface.
//!
//! A file is run only if its permission grants execute. The gate checks
//! that before the content is read, then hands the content to whatever
//! [`ExecutionEngine`] the filesystem was built with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{VfsError, VfsResult};
use crate::filesystem::FileSystem;

/// Result of executing code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResult {
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
    /// Exit code (0 = success).
    pub exit_code: i32,
    /// Whether execution succeeded.
    pub success: bool,
}

impl ExecResult {
    /// Create a successful result.
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
            success: true,
        }
    }

    /// Create a failure result.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
            success: false,
        }
    }

    /// Create a result with both stdout and stderr.
    pub fn with_output(
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
            success: exit_code == 0,
        }
    }

    /// Text describing why a failed run failed.
    fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("exit code {}", self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}

/// Trait for execution engines.
///
/// An engine receives the text of an executable file and runs it.
#[async_trait]
pub trait ExecutionEngine: Send + Sync {
    /// Get the engine name.
    fn name(&self) -> &str;

    /// Get the engine description.
    fn description(&self) -> &str;

    /// Execute code and return the result.
    ///
    /// `code` is the file's content decoded as UTF-8. The gate rejects a
    /// file whose bytes are not valid UTF-8 with an execution failure
    /// before any engine is called, so engines never see binary content.
    async fn execute(&self, code: &str) -> anyhow::Result<ExecResult>;

    /// Check if this engine is available/ready.
    async fn is_available(&self) -> bool;

    /// Interrupt a running execution.
    async fn interrupt(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A no-op execution engine for testing.
#[derive(Debug)]
pub struct NoopEngine;

#[async_trait]
impl ExecutionEngine for NoopEngine {
    fn name(&self) -> &str {
        "noop"
    }

    fn description(&self) -> &str {
        "No-op engine for testing"
    }

    async fn execute(&self, code: &str) -> anyhow::Result<ExecResult> {
        Ok(ExecResult::success(format!("noop: {}", code)))
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Content of a file that passed the gate, ready to hand to an engine.
#[derive(Debug, Clone)]
pub(crate) struct GatedSource {
    pub(crate) path: String,
    pub(crate) code: String,
}

impl FileSystem {
    /// Run the file at `path` through the configured engine.
    ///
    /// Fails with `PermissionDenied` if the file lacks the execute bit; the
    /// engine is never called in that case. Engine errors and unsuccessful
    /// runs come back as [`VfsError::ExecutionFailed`].
    #[tracing::instrument(skip(self), name = "vfs.exec")]
    pub async fn exec(&self, path: &str) -> VfsResult<ExecResult> {
        let source = self.gate(path)?;
        dispatch(self.engine.clone(), source).await
    }

    /// Check the execute bit and extract the file's text.
    pub(crate) fn gate(&self, path: &str) -> VfsResult<GatedSource> {
        let id = self.resolve_file(path)?;
        let node = self.store.node(id)?;
        let abs = self.store.path_of(id);
        if !node.permission().can_execute() {
            warn!(path = %abs, mode = %node.permission(), "execution denied");
            return Err(VfsError::permission_denied(abs));
        }
        let bytes = node.content().cloned().unwrap_or_default();
        let code = String::from_utf8(bytes)
            .map_err(|e| VfsError::execution_failed(&abs, format!("content is not UTF-8: {e}")))?;
        Ok(GatedSource { path: abs, code })
    }
}

/// Hand gated source to `engine`, mapping every failure to `ExecutionFailed`.
pub(crate) async fn dispatch(
    engine: Option<Arc<dyn ExecutionEngine>>,
    source: GatedSource,
) -> VfsResult<ExecResult> {
    let Some(engine) = engine else {
        return Err(VfsError::execution_failed(
            source.path,
            "no execution engine configured",
        ));
    };

    debug!(path = %source.path, engine = engine.name(), len = source.code.len(), "executing");
    match engine.execute(&source.code).await {
        Ok(result) if result.success => Ok(result),
        Ok(result) => {
            let diagnostic = result.diagnostic();
            warn!(path = %source.path, exit_code = result.exit_code, %diagnostic, "execution failed");
            Err(VfsError::execution_failed(source.path, diagnostic))
        }
        Err(e) => {
            warn!(path = %source.path, error = %e, "engine error");
            Err(VfsError::execution_failed(source.path, format!("{e:#}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts calls and replies with a fixed result.
    struct RecordingEngine {
        calls: AtomicUsize,
        reply: anyhow::Result<ExecResult>,
    }

    impl RecordingEngine {
        fn new(reply: anyhow::Result<ExecResult>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExecutionEngine for RecordingEngine {
        fn name(&self) -> &str {
            "recording"
        }

        fn description(&self) -> &str {
            "Records calls"
        }

        async fn execute(&self, _code: &str) -> anyhow::Result<ExecResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(r) => Ok(r.clone()),
                Err(e) => Err(anyhow::anyhow!("{e}")),
            }
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn fs_with(engine: Arc<dyn ExecutionEngine>) -> FileSystem {
        let mut fs = FileSystem::new().with_engine(engine);
        fs.create_file_with_content("script", "print(1)").unwrap();
        fs
    }

    #[test]
    fn test_exec_result() {
        let success = ExecResult::success("output");
        assert!(success.success);
        assert_eq!(success.exit_code, 0);

        let failure = ExecResult::failure(1, "error");
        assert!(!failure.success);
        assert_eq!(failure.exit_code, 1);

        assert!(ExecResult::with_output("o", "", 0).success);
        assert!(!ExecResult::with_output("o", "e", 2).success);
    }

    #[tokio::test]
    async fn test_noop_engine() {
        let engine = NoopEngine;
        assert!(engine.is_available().await);
        let result = engine.execute("hello").await.unwrap();
        assert_eq!(result.stdout, "noop: hello");
    }

    #[tokio::test]
    async fn test_exec_requires_execute_bit() {
        let engine = RecordingEngine::new(Ok(ExecResult::success("ran")));
        let mut fs = fs_with(engine.clone());

        let err = fs.exec("script").await.unwrap_err();
        assert!(matches!(err, VfsError::PermissionDenied(p) if p == "/script"));
        assert_eq!(engine.calls(), 0);

        fs.chmod("script", "7").unwrap();
        let result = fs.exec("script").await.unwrap();
        assert_eq!(result.stdout, "ran");
        assert_eq!(engine.calls(), 1);

        fs.chmod("script", "6").unwrap();
        assert!(matches!(fs.exec("script").await, Err(VfsError::PermissionDenied(_))));
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_exec_passes_content_unmodified() {
        let mut fs = FileSystem::new().with_engine(Arc::new(NoopEngine));
        fs.create_file_with_content("s", "let x = 1;\n  x + 1\n").unwrap();
        fs.chmod("s", "1").unwrap();
        let result = fs.exec("/s").await.unwrap();
        assert_eq!(result.stdout, "noop: let x = 1;\n  x + 1\n");
    }

    #[tokio::test]
    async fn test_exec_wrong_kind_and_missing() {
        let mut fs = FileSystem::new().with_engine(Arc::new(NoopEngine));
        fs.create_dir("d").unwrap();
        fs.chmod("d", "7").unwrap();
        assert!(matches!(fs.exec("d").await, Err(VfsError::WrongKind { .. })));
        assert!(matches!(fs.exec("nope").await, Err(VfsError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_engine_failures_are_execution_failed() {
        let engine = RecordingEngine::new(Ok(ExecResult::failure(3, "boom")));
        let mut fs = fs_with(engine.clone());
        fs.chmod("script", "7").unwrap();
        let err = fs.exec("script").await.unwrap_err();
        assert!(matches!(
            &err,
            VfsError::ExecutionFailed { path, diagnostic } if path == "/script" && diagnostic == "boom"
        ));
        assert!(err.is_execution_failure());

        let engine = RecordingEngine::new(Err(anyhow::anyhow!("engine crashed")));
        let mut fs = fs_with(engine.clone());
        fs.chmod("script", "7").unwrap();
        let err = fs.exec("script").await.unwrap_err();
        assert!(matches!(
            err,
            VfsError::ExecutionFailed { diagnostic, .. } if diagnostic.contains("engine crashed")
        ));
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_exec_without_engine() {
        let mut fs = FileSystem::new();
        fs.create_file("s").unwrap();
        // The gate still runs first.
        assert!(matches!(fs.exec("s").await, Err(VfsError::PermissionDenied(_))));

        fs.chmod("s", "7").unwrap();
        let err = fs.exec("s").await.unwrap_err();
        assert!(matches!(
            err,
            VfsError::ExecutionFailed { diagnostic, .. } if diagnostic == "no execution engine configured"
        ));
    }

    #[tokio::test]
    async fn test_exec_rejects_non_utf8() {
        let engine = RecordingEngine::new(Ok(ExecResult::success("")));
        let mut fs = FileSystem::new().with_engine(engine.clone());
        fs.create_file_with_content("bin", vec![0xff, 0xfe, 0x00]).unwrap();
        fs.chmod("bin", "7").unwrap();
        assert!(matches!(
            fs.exec("bin").await,
            Err(VfsError::ExecutionFailed { .. })
        ));
        assert_eq!(engine.calls(), 0);
    }
}
