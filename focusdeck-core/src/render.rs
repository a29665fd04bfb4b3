//! Render task scheduler.
//!
//! Producing main-panel content can be slow (formatting, spawning git), so
//! every request runs on its own background task. Each request bumps the
//! generation counter of its display target and captures the new value. On
//! completion the worker compares its captured generation with the current
//! one and silently drops its result if a newer request was issued. The UI
//! thread re-checks in [`RenderScheduler::accept`] before publishing, so a
//! request issued between the worker's check and the UI's drain is also
//! covered.
//!
//! There is no cancellation: superseded workers always run to completion.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::context::ContextKey;
use crate::error::RenderError;

pub type ProduceFuture = Pin<Box<dyn Future<Output = Result<String, RenderError>> + Send>>;

/// What to show in a display context.
pub enum UpdateTask {
    /// Literal text, no external work.
    RenderString(String),
    /// Run a process and show its stdout.
    RunCommand {
        program: String,
        args: Vec<String>,
        cwd: Option<PathBuf>,
    },
    /// Arbitrary asynchronous producer.
    Produce(ProduceFuture),
}

impl UpdateTask {
    pub fn render_string(text: impl Into<String>) -> Self {
        UpdateTask::RenderString(text.into())
    }

    pub fn command<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        UpdateTask::RunCommand {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: None,
        }
    }

    pub fn produce(fut: impl Future<Output = Result<String, RenderError>> + Send + 'static) -> Self {
        UpdateTask::Produce(Box::pin(fut))
    }

    pub fn in_dir(self, dir: impl Into<PathBuf>) -> Self {
        match self {
            UpdateTask::RunCommand { program, args, .. } => UpdateTask::RunCommand {
                program,
                args,
                cwd: Some(dir.into()),
            },
            other => other,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            UpdateTask::RenderString(_) => "string",
            UpdateTask::RunCommand { .. } => "command",
            UpdateTask::Produce(_) => "produce",
        }
    }
}

pub struct RenderRequest {
    /// Display context that will show the result (usually `main`).
    pub target: ContextKey,
    pub title: Option<String>,
    pub task: UpdateTask,
}

impl RenderRequest {
    pub fn new(target: impl Into<ContextKey>, task: UpdateTask) -> Self {
        Self {
            target: target.into(),
            title: None,
            task,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedContent {
    pub title: Option<String>,
    pub body: String,
    pub is_error: bool,
    pub generation: u64,
}

#[derive(Clone, Debug)]
pub struct RenderCompletion {
    pub target: ContextKey,
    pub content: RenderedContent,
}

/// Receiving end of finished renders, drained on the UI thread.
pub struct RenderReceiver {
    rx: mpsc::UnboundedReceiver<RenderCompletion>,
}

impl RenderReceiver {
    pub async fn recv(&mut self) -> Option<RenderCompletion> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<RenderCompletion> {
        self.rx.try_recv().ok()
    }
}

struct Inner {
    generations: Mutex<BTreeMap<ContextKey, Arc<AtomicU64>>>,
    tx: mpsc::UnboundedSender<RenderCompletion>,
    runtime: Handle,
}

#[derive(Clone)]
pub struct RenderScheduler {
    inner: Arc<Inner>,
}

impl RenderScheduler {
    pub fn new(runtime: Handle) -> (Self, RenderReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            inner: Arc::new(Inner {
                generations: Mutex::new(BTreeMap::new()),
                tx,
                runtime,
            }),
        };
        (scheduler, RenderReceiver { rx })
    }

    /// Starts producing `request` in the background and returns its
    /// generation.
    pub fn enqueue(&self, request: RenderRequest) -> u64 {
        let RenderRequest { target, title, task } = request;
        let counter = self.counter(&target);
        let generation = counter.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(view = %target, generation, kind = task.label(), "render enqueued");

        let tx = self.inner.tx.clone();
        self.inner.runtime.spawn(async move {
            let result = produce(task).await;

            if counter.load(Ordering::SeqCst) != generation {
                debug!(view = %target, generation, "discarding superseded render");
                return;
            }

            let content = match result {
                Ok(body) => RenderedContent {
                    title,
                    body,
                    is_error: false,
                    generation,
                },
                Err(e) => {
                    warn!(view = %target, generation, error = %e, "render task failed");
                    RenderedContent {
                        title,
                        body: e.to_string(),
                        is_error: true,
                        generation,
                    }
                }
            };
            // receiver gone means the UI is shutting down
            let _ = tx.send(RenderCompletion { target, content });
        });

        generation
    }

    /// Latest generation issued for `target` (0 if none).
    pub fn current_generation(&self, target: &ContextKey) -> u64 {
        self.inner
            .generations
            .lock()
            .get(target)
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_current(&self, target: &ContextKey, generation: u64) -> bool {
        self.current_generation(target) == generation
    }

    /// Publication-time staleness check, run on the UI thread.
    pub fn accept(&self, completion: RenderCompletion) -> Option<RenderCompletion> {
        if self.is_current(&completion.target, completion.content.generation) {
            Some(completion)
        } else {
            debug!(
                view = %completion.target,
                generation = completion.content.generation,
                "dropping stale completion"
            );
            None
        }
    }

    /// Applies every completion that is ready without waiting. Returns how
    /// many were published.
    pub fn drain_into(&self, rx: &mut RenderReceiver, views: &mut MainViews) -> usize {
        let mut published = 0;
        while let Some(completion) = rx.try_recv() {
            if let Some(completion) = self.accept(completion) {
                views.publish(completion);
                published += 1;
            }
        }
        published
    }

    fn counter(&self, target: &ContextKey) -> Arc<AtomicU64> {
        self.inner
            .generations
            .lock()
            .entry(target.clone())
            .or_default()
            .clone()
    }
}

async fn produce(task: UpdateTask) -> Result<String, RenderError> {
    match task {
        UpdateTask::RenderString(text) => Ok(text),
        UpdateTask::Produce(fut) => fut.await,
        UpdateTask::RunCommand { program, args, cwd } => {
            let mut cmd = tokio::process::Command::new(&program);
            cmd.args(&args);
            if let Some(cwd) = cwd {
                cmd.current_dir(cwd);
            }
            let output = cmd.output().await.map_err(|e| RenderError::Spawn {
                program: program.clone(),
                reason: e.to_string(),
            })?;
            if !output.status.success() {
                return Err(RenderError::Exit {
                    program,
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        }
    }
}

/// Latest published content per display context.
#[derive(Clone, Debug, Default)]
pub struct MainViews {
    views: BTreeMap<ContextKey, RenderedContent>,
}

impl MainViews {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, completion: RenderCompletion) {
        self.views.insert(completion.target, completion.content);
    }

    pub fn get(&self, target: &ContextKey) -> Option<&RenderedContent> {
        self.views.get(target)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    const MAIN: &str = "main";

    async fn next(rx: &mut RenderReceiver) -> RenderCompletion {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("render timed out")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_render_string_is_published() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        let generation = scheduler.enqueue(
            RenderRequest::new(MAIN, UpdateTask::render_string("hello")).with_title("Worktree"),
        );
        assert_eq!(generation, 1);

        let completion = next(&mut rx).await;
        assert_eq!(completion.content.body, "hello");
        assert_eq!(completion.content.title.as_deref(), Some("Worktree"));
        assert!(!completion.content.is_error);
        assert!(scheduler.accept(completion).is_some());
    }

    #[tokio::test]
    async fn test_superseded_render_is_never_published() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        let (release, gate) = oneshot::channel::<()>();

        let g1 = scheduler.enqueue(RenderRequest::new(
            MAIN,
            UpdateTask::produce(async move {
                let _ = gate.await;
                Ok("old".to_string())
            }),
        ));
        let g2 = scheduler.enqueue(RenderRequest::new(MAIN, UpdateTask::render_string("new")));
        assert!(g2 > g1);

        let mut views = MainViews::new();
        let completion = next(&mut rx).await;
        assert_eq!(completion.content.generation, g2);
        views.publish(scheduler.accept(completion).unwrap());

        release.send(()).unwrap();
        let late = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(late.is_err(), "stale render reached the channel");
        assert_eq!(views.get(&MAIN.into()).map(|c| c.body.as_str()), Some("new"));
    }

    #[tokio::test]
    async fn test_accept_rejects_completion_overtaken_after_worker_check() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        scheduler.enqueue(RenderRequest::new(MAIN, UpdateTask::render_string("first")));
        let completion = next(&mut rx).await;

        // a newer request lands before the UI thread drains the first one
        let (release, gate) = oneshot::channel::<()>();
        scheduler.enqueue(RenderRequest::new(
            MAIN,
            UpdateTask::produce(async move {
                let _ = gate.await;
                Ok("second".to_string())
            }),
        ));
        assert!(scheduler.accept(completion).is_none());

        release.send(()).unwrap();
        let mut views = MainViews::new();
        let completion = next(&mut rx).await;
        views.publish(scheduler.accept(completion).unwrap());
        assert_eq!(views.get(&MAIN.into()).unwrap().body, "second");
    }

    #[tokio::test]
    async fn test_failed_producer_renders_error() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        scheduler.enqueue(RenderRequest::new(
            MAIN,
            UpdateTask::produce(async { Err(RenderError::Producer("git exploded".into())) }),
        ));
        let completion = next(&mut rx).await;
        assert!(completion.content.is_error);
        assert_eq!(completion.content.body, "git exploded");
    }

    #[tokio::test]
    async fn test_targets_have_independent_generations() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        scheduler.enqueue(RenderRequest::new("main", UpdateTask::render_string("a")));
        scheduler.enqueue(RenderRequest::new("secondary", UpdateTask::render_string("b")));
        assert_eq!(scheduler.current_generation(&"main".into()), 1);
        assert_eq!(scheduler.current_generation(&"secondary".into()), 1);
        assert_eq!(scheduler.current_generation(&"other".into()), 0);

        let mut views = MainViews::new();
        next(&mut rx).await;
        next(&mut rx).await;
        assert_eq!(scheduler.drain_into(&mut rx, &mut views), 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_output_and_exit_code() {
        let (scheduler, mut rx) = RenderScheduler::new(Handle::current());
        scheduler.enqueue(RenderRequest::new(MAIN, UpdateTask::command("echo", ["hello"])));
        assert_eq!(next(&mut rx).await.content.body, "hello\n");

        scheduler.enqueue(RenderRequest::new(
            MAIN,
            UpdateTask::command("sh", ["-c", "echo boom >&2; exit 3"]),
        ));
        let completion = next(&mut rx).await;
        assert!(completion.content.is_error);
        assert!(completion.content.body.contains("boom"));
    }
}
