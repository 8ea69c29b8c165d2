use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::eval::summary::enhance_output;
use crate::io::{StoreError, TaskStore};
use crate::model::validate::sanitize_project_name;
use crate::model::EvaluationConfig;
use crate::ops::{auto_update_task_statuses, tasks_needing_attention, AttentionItem};
use crate::tools::{ToolCall, ToolError, ToolHandler, ToolOutput};

/// Operations that never trigger an evaluation while `skip_read_only` is set
pub const READ_ONLY_OPERATIONS: [&str; 7] = [
    "get_next_task",
    "get_task_dependencies",
    "get_tasks_needing_attention",
    "suggest_next_actions",
    "list_projects",
    "project_summary",
    "debug_info",
];

/// Shortest sweep period, used when the TTL is zero
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("evaluation cancelled while waiting for a slot")]
    Cancelled,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("evaluation task failed: {0}")]
    Join(#[from] JoinError),
}

/// Outcome of one evaluation pass over a project
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub project_name: String,
    pub updates_applied: Vec<String>,
    pub attention_items: Vec<AttentionItem>,
    /// When the pass that produced this result started
    pub evaluation_time: DateTime<Utc>,
    pub processing_time: Duration,
    pub cache_hit: bool,
}

#[derive(Debug, Clone)]
struct CachedEvaluation {
    evaluation: Evaluation,
    stored_at: Instant,
}

type Cache = Arc<RwLock<HashMap<String, CachedEvaluation>>>;

/// Per-project evaluation cache with bounded concurrency.
///
/// The cache lock and the store lock are never held together: the cache is
/// read before and written after the store work, which runs on the blocking
/// pool while holding a semaphore permit.
pub struct EvaluationMiddleware {
    store: Arc<TaskStore>,
    config: EvaluationConfig,
    ttl: Duration,
    cache: Cache,
    permits: Semaphore,
    read_only: HashSet<&'static str>,
    shutdown: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl EvaluationMiddleware {
    /// Build the middleware and start its expiry sweep. Must be called from
    /// within a tokio runtime.
    pub fn new(store: Arc<TaskStore>, config: EvaluationConfig) -> Arc<Self> {
        let ttl = config.cache_ttl();
        let cache: Cache = Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();
        let sweeper = tokio::spawn(sweep_loop(
            Arc::clone(&cache),
            ttl,
            shutdown.clone(),
        ));
        Arc::new(EvaluationMiddleware {
            store,
            permits: Semaphore::new(config.max_concurrent.max(1)),
            config,
            ttl,
            cache,
            read_only: READ_ONLY_OPERATIONS.into_iter().collect(),
            shutdown,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    pub fn config(&self) -> &EvaluationConfig {
        &self.config
    }

    pub fn is_read_only(&self, operation: &str) -> bool {
        self.read_only.contains(operation)
    }

    /// Whether a call to `operation` should evaluate first
    pub fn should_evaluate(&self, operation: &str) -> bool {
        self.config.enabled && !(self.config.skip_read_only && self.is_read_only(operation))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.read().len()
    }

    /// Evaluate `name`, serving a memoized result when one is younger than
    /// the TTL. Only the wait for a concurrency slot observes `cancel`.
    /// Entries are keyed by document, so names that sanitize alike share one.
    pub async fn evaluate_project(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Evaluation, EvalError> {
        let key = sanitize_project_name(name);
        if let Some(hit) = self.cached(&key, name) {
            debug!(project = name, "evaluation cache hit");
            return Ok(hit);
        }

        let _permit = tokio::select! {
            _ = cancel.cancelled() => return Err(EvalError::Cancelled),
            permit = self.permits.acquire() => permit.map_err(|_| EvalError::Cancelled)?,
        };

        let started = Utc::now();
        let clock = Instant::now();
        let store = Arc::clone(&self.store);
        let owned = name.to_string();
        let (updates_applied, attention_items) =
            tokio::task::spawn_blocking(move || evaluate_blocking(&store, &owned)).await??;

        let evaluation = Evaluation {
            project_name: name.to_string(),
            updates_applied,
            attention_items,
            evaluation_time: started,
            processing_time: clock.elapsed(),
            cache_hit: false,
        };
        self.cache.write().insert(
            key,
            CachedEvaluation {
                evaluation: evaluation.clone(),
                stored_at: Instant::now(),
            },
        );
        debug!(
            project = name,
            updates = evaluation.updates_applied.len(),
            attention = evaluation.attention_items.len(),
            "evaluated project"
        );
        Ok(evaluation)
    }

    fn cached(&self, key: &str, name: &str) -> Option<Evaluation> {
        let cache = self.cache.read();
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            let mut hit = entry.evaluation.clone();
            hit.project_name = name.to_string();
            hit.cache_hit = true;
            Some(hit)
        } else {
            None
        }
    }

    /// Evict entries older than the TTL. Returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        sweep(&self.cache, self.ttl)
    }

    /// Stop the expiry sweep and wait for it to exit
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.sweeper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Wrap `inner` so its calls run through this middleware
    pub fn wrap<H: ToolHandler>(self: &Arc<Self>, inner: H) -> EvaluatedTools<H> {
        EvaluatedTools {
            inner,
            middleware: Arc::clone(self),
        }
    }
}

impl Drop for EvaluationMiddleware {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for EvaluationMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluationMiddleware")
            .field("config", &self.config)
            .field("cached", &self.cache_len())
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

/// Load, reconcile, persist if changed, and scan. Runs on the blocking pool.
fn evaluate_blocking(
    store: &TaskStore,
    name: &str,
) -> Result<(Vec<String>, Vec<AttentionItem>), StoreError> {
    if !store.project_exists(name) {
        return Err(StoreError::ProjectNotFound(name.to_string()));
    }
    let mut project = store.load_project(name)?;
    let (updates, changed) = auto_update_task_statuses(&mut project);
    if changed {
        store.save_project(&mut project)?;
        info!(project = name, updates = updates.len(), "evaluation applied updates");
    }
    let attention = tasks_needing_attention(&project, Utc::now());
    Ok((updates, attention))
}

fn sweep(cache: &RwLock<HashMap<String, CachedEvaluation>>, ttl: Duration) -> usize {
    let mut cache = cache.write();
    let before = cache.len();
    cache.retain(|_, entry| entry.stored_at.elapsed() <= ttl);
    before - cache.len()
}

async fn sweep_loop(cache: Cache, ttl: Duration, shutdown: CancellationToken) {
    let mut ticker = time::interval(ttl.max(MIN_SWEEP_PERIOD));
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = sweep(&cache, ttl);
                if evicted > 0 {
                    debug!(evicted, "swept expired evaluations");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatcher wrapper
// ---------------------------------------------------------------------------

/// A [`ToolHandler`] that evaluates the target project before delegating
#[derive(Debug)]
pub struct EvaluatedTools<H> {
    inner: H,
    middleware: Arc<EvaluationMiddleware>,
}

impl<H> EvaluatedTools<H> {
    pub fn middleware(&self) -> &Arc<EvaluationMiddleware> {
        &self.middleware
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

#[async_trait]
impl<H: ToolHandler> ToolHandler for EvaluatedTools<H> {
    async fn call(
        &self,
        call: &ToolCall,
        cancel: &CancellationToken,
    ) -> Result<ToolOutput, ToolError> {
        let mw = &self.middleware;
        if !mw.should_evaluate(&call.name) {
            return self.inner.call(call, cancel).await;
        }
        let Some(project) = call.project_name() else {
            return self.inner.call(call, cancel).await;
        };

        let evaluation = match mw.evaluate_project(project, cancel).await {
            Ok(evaluation) => Some(evaluation),
            Err(e) => {
                if mw.config.verbose_logging {
                    warn!(project, operation = %call.name, error = %e, "auto-evaluation failed");
                }
                None
            }
        };

        let output = self.inner.call(call, cancel).await?;
        Ok(match evaluation {
            Some(evaluation) => enhance_output(output, &evaluation),
            None => output,
        })
    }
}
