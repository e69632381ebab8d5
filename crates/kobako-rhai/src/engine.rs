//! Async-safe Rhai execution engine.
//!
//! - Wraps synchronous Rhai evaluation in `spawn_blocking`
//! - Applies the limits from [`RhaiConfig`] to every run
//! - Captures `print`/`debug` output into the result's stdout
//! - Supports interruption through [`ExecutionEngine::interrupt`]
//!
//! Every run gets its own interrupt flag. `interrupt` raises the flags of
//! the runs in flight when it is called; runs started afterwards are not
//! affected, and starting a run never clears another run's flag.
//!
//! Scripts are compiled fresh on each execution.
//!
//! # Example
//!
//! ```ignore
//! let engine = RhaiEngine::new();
//! let result = engine.execute(r#"print("hi"); 40 + 2"#).await?;
//! assert_eq!(result.stdout, "hi\n42");
//! ```

use async_trait::async_trait;
use kobako_vfs::{ExecResult, ExecutionEngine};
use parking_lot::Mutex;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};
use std::sync::Arc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::config::RhaiConfig;

/// Lines written by `print`/`debug` during one run.
type OutputBuffer = Arc<Mutex<Vec<String>>>;

/// Interrupt flags of the runs in flight, by run number.
type ActiveRuns = Mutex<HashMap<u64, Arc<AtomicBool>>>;

/// Async-safe Rhai execution engine implementing ExecutionEngine.
pub struct RhaiEngine {
    config: RhaiConfig,
    runs: ActiveRuns,
    next_run: AtomicU64,
}

/// Drops a run's flag from the active set when the run ends or its
/// future is dropped.
struct RunGuard<'a> {
    runs: &'a ActiveRuns,
    id: u64,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.runs.lock().remove(&self.id);
    }
}

impl Default for RhaiEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RhaiEngine {
    /// Create an engine with default limits.
    pub fn new() -> Self {
        Self::with_config(RhaiConfig::default())
    }

    pub fn with_config(config: RhaiConfig) -> Self {
        Self {
            config,
            runs: Mutex::default(),
            next_run: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &RhaiConfig {
        &self.config
    }

    /// Number of runs currently executing.
    pub fn active_runs(&self) -> usize {
        self.runs.lock().len()
    }

    /// Register a fresh interrupt flag for a new run.
    fn begin_run(&self) -> (RunGuard<'_>, Arc<AtomicBool>) {
        let id = self.next_run.fetch_add(1, Ordering::Relaxed);
        let flag = Arc::new(AtomicBool::new(false));
        self.runs.lock().insert(id, Arc::clone(&flag));
        (RunGuard { runs: &self.runs, id }, flag)
    }

    /// Create a configured Rhai engine with all functions registered.
    fn create_engine(config: &RhaiConfig, interrupted: Arc<AtomicBool>, output: OutputBuffer) -> Engine {
        let mut engine = Engine::new();

        // Safety limits
        engine.set_max_expr_depths(config.max_expr_depth, config.max_function_expr_depth);
        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_modules(config.max_modules);
        engine.set_max_string_size(config.max_string_size);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);

        let int_progress = interrupted.clone();
        engine.on_progress(move |_ops| {
            if int_progress.load(Ordering::SeqCst) {
                Some(Dynamic::from("interrupted"))
            } else {
                None
            }
        });

        Self::register_output_capture(&mut engine, output);
        Self::register_utility_functions(&mut engine, interrupted);

        engine
    }

    /// Route `print` and `debug` into the output buffer.
    fn register_output_capture(engine: &mut Engine, output: OutputBuffer) {
        let out_print = output.clone();
        engine.on_print(move |text| {
            debug!("[rhai] {}", text);
            out_print.lock().push(text.to_string());
        });

        let out_debug = output;
        engine.on_debug(move |text, source, pos| {
            debug!(source = ?source, position = %pos, "[rhai] {}", text);
            out_debug.lock().push(text.to_string());
        });
    }

    /// Register utility functions.
    fn register_utility_functions(engine: &mut Engine, interrupted: Arc<AtomicBool>) {
        // println(msg) - log without capturing
        engine.register_fn("println", |msg: String| {
            info!("[rhai] {}", msg);
        });

        // log(level, msg)
        engine.register_fn("log", |level: String, msg: String| {
            match level.as_str() {
                "debug" => debug!("[rhai] {}", msg),
                "info" => info!("[rhai] {}", msg),
                "warn" => warn!("[rhai] {}", msg),
                "error" => tracing::error!("[rhai] {}", msg),
                _ => info!("[rhai] {}", msg),
            }
        });

        let int_check = interrupted.clone();
        engine.register_fn("is_interrupted", move || -> bool {
            int_check.load(Ordering::SeqCst)
        });

        // sleep_ms(ms) - sleeps in chunks so an interrupt cuts it short
        let int_sleep = interrupted;
        engine.register_fn("sleep_ms", move |ms: i64| {
            if ms <= 0 {
                return;
            }
            let remaining = ms as u64;
            let chunk = 100u64;
            let mut slept = 0u64;
            while slept < remaining {
                if int_sleep.load(Ordering::SeqCst) {
                    return;
                }
                let to_sleep = (remaining - slept).min(chunk);
                std::thread::sleep(std::time::Duration::from_millis(to_sleep));
                slept += to_sleep;
            }
        });
    }

    /// Execute a script synchronously (called from spawn_blocking).
    fn execute_sync(config: &RhaiConfig, code: &str, interrupted: Arc<AtomicBool>) -> ExecResult {
        let output: OutputBuffer = Arc::default();
        let engine = Self::create_engine(config, interrupted, output.clone());
        let mut scope = Scope::new();

        let result = engine.eval_with_scope::<Dynamic>(&mut scope, code);
        let mut stdout = output.lock().join("\n");

        match result {
            Ok(value) => {
                if !value.is_unit() {
                    if !stdout.is_empty() {
                        stdout.push('\n');
                    }
                    stdout.push_str(&value.to_string());
                }
                debug!("Rhai execution success: {} bytes of output", stdout.len());
                ExecResult::success(stdout)
            }
            Err(e) => {
                let error_msg = if matches!(*e, EvalAltResult::ErrorTerminated(..)) {
                    "script interrupted".to_string()
                } else {
                    e.to_string()
                };
                warn!("Rhai execution error: {}", error_msg);
                ExecResult::with_output(stdout, error_msg, 1)
            }
        }
    }
}

impl std::fmt::Debug for RhaiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RhaiEngine")
            .field("config", &self.config)
            .field("active_runs", &self.active_runs())
            .finish()
    }
}

#[async_trait]
impl ExecutionEngine for RhaiEngine {
    fn name(&self) -> &str {
        "rhai"
    }

    fn description(&self) -> &str {
        "Sandboxed Rhai scripting engine"
    }

    #[tracing::instrument(skip(self, code), name = "engine.rhai")]
    async fn execute(&self, code: &str) -> anyhow::Result<ExecResult> {
        let (_run, interrupted) = self.begin_run();
        let config = self.config.clone();
        let code = code.to_string();

        let result =
            tokio::task::spawn_blocking(move || Self::execute_sync(&config, &code, interrupted))
                .await?;

        Ok(result)
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn interrupt(&self) -> anyhow::Result<()> {
        let runs = self.runs.lock();
        for flag in runs.values() {
            flag.store(true, Ordering::SeqCst);
        }
        debug!(runs = runs.len(), "Rhai engine interrupted");
        Ok(())
    }
}
