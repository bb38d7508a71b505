//! Concurrent blame driver.
//!
//! One batch:
//! 1. resolve the annotate executable (extracting it into a temp dir if needed)
//! 2. spawn one task per file, at most `pool_size` running at a time
//! 3. join the tasks in submission order and surface the first failure
//!
//! Every task is joined even after a failure. If the caller interrupts the
//! join, the batch returns `Interrupted` and children already started are
//! left to finish on their own.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Runtime;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::annotate::command::{annotate, skip_warning, Annotation};
use crate::annotate::provision::{self, AnnotateTool, BundledPayload, EmbeddedPayload};
use crate::blame::sink::{BlameOutput, SinkAdapter};
use crate::config::{BlameOptions, TfsConfiguration};
use crate::error::{BlameError, Result};
use crate::models::{BlameInput, InputFile};

const TEMP_PREFIX: &str = "tfs-blame";

pub struct BlameCommand {
    configuration: TfsConfiguration,
    options: BlameOptions,
    payload: Arc<dyn BundledPayload>,
}

enum Failure {
    Error(BlameError),
    Panic(Box<dyn Any + Send + 'static>),
}

impl BlameCommand {
    pub fn new(configuration: TfsConfiguration) -> Self {
        Self {
            configuration,
            options: BlameOptions::default(),
            payload: Arc::new(EmbeddedPayload),
        }
    }

    pub fn with_options(mut self, options: BlameOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the embedded annotate executable.
    pub fn with_payload(mut self, payload: Arc<dyn BundledPayload>) -> Self {
        self.payload = payload;
        self
    }

    /// Multi-thread runtime with one worker per pool slot.
    pub fn runtime(&self) -> Result<Runtime> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.options.effective_pool_size())
            .thread_name("tfs-blame-worker")
            .enable_all()
            .build()
            .map_err(BlameError::WorkerPool)
    }

    /// Blocking entry point. Inside a tokio runtime use `blame_async` instead.
    pub fn blame(&self, input: &dyn BlameInput, output: Arc<dyn BlameOutput>) -> Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(BlameError::NestedRuntime);
        }
        let runtime = self.runtime()?;
        let result = runtime.block_on(self.blame_async(input, output));
        runtime.shutdown_background();
        result
    }

    pub async fn blame_async(&self, input: &dyn BlameInput, output: Arc<dyn BlameOutput>) -> Result<()> {
        self.blame_until(input, output, std::future::pending::<()>()).await
    }

    /// Like `blame_async`, but gives up with `Interrupted` once `interrupt` resolves.
    pub async fn blame_until<F>(
        &self,
        input: &dyn BlameInput,
        output: Arc<dyn BlameOutput>,
        interrupt: F,
    ) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let scope = self.temp_scope()?;
        let tool = Arc::new(provision::resolve(&self.configuration, self.payload.as_ref(), &scope)?);
        tracing::debug!("Working directory: {}", input.base_dir().display());

        let files = input.files_to_blame();
        let file_count = files.len();
        let pool_size = self.options.effective_pool_size();
        let pool = Arc::new(Semaphore::new(pool_size));
        let sink = SinkAdapter::new(output);

        let tasks: Vec<JoinHandle<Result<()>>> = files
            .into_iter()
            .map(|file| self.submit(&pool, &tool, &sink, file))
            .collect();

        let result = join_in_order(tasks, interrupt).await;
        pool.close();

        match &result {
            Ok(()) => tracing::info!(
                "Blamed {} files with {} workers in {:?}",
                file_count,
                pool_size,
                start.elapsed()
            ),
            Err(e) => tracing::debug!("Blame batch failed after {:?}: {}", start.elapsed(), e),
        }
        result
    }

    fn temp_scope(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX);
        let scope = match &self.options.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        };
        scope.map_err(|source| BlameError::Provision {
            resource: provision::ANNOTATE_RESOURCE.to_string(),
            source,
        })
    }

    fn submit(
        &self,
        pool: &Arc<Semaphore>,
        tool: &Arc<AnnotateTool>,
        sink: &SinkAdapter,
        file: InputFile,
    ) -> JoinHandle<Result<()>> {
        let pool = pool.clone();
        let tool = tool.clone();
        let sink = sink.clone();
        let timeout = self.options.timeout;

        tokio::spawn(async move {
            // A closed pool means the batch was abandoned before this file started.
            let _permit = pool
                .acquire_owned()
                .await
                .map_err(|_| BlameError::Interrupted { pending: 1 })?;

            let annotation = annotate(tool.path(), &file, timeout).await?;
            if let Annotation::Skipped { command, stderr, .. } = &annotation {
                let warning = skip_warning(file.relative_path(), command, stderr);
                eprintln!("{}", warning);
                tracing::debug!("{}", warning);
            }
            sink.forward(&file, annotation.into_lines());
            Ok(())
        })
    }
}

async fn join_in_order<F>(tasks: Vec<JoinHandle<Result<()>>>, interrupt: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    tokio::pin!(interrupt);
    let mut tasks = tasks;
    let mut first_failure: Option<Failure> = None;

    for joined in 0..tasks.len() {
        let outcome = tokio::select! {
            outcome = &mut tasks[joined] => Some(outcome),
            _ = &mut interrupt => None,
        };
        let Some(outcome) = outcome else {
            return Err(BlameError::Interrupted {
                pending: still_running(&tasks[joined..]),
            });
        };

        let failure = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => Failure::Error(e),
            Err(join_error) if join_error.is_panic() => Failure::Panic(join_error.into_panic()),
            Err(_) => Failure::Error(BlameError::Interrupted {
                pending: still_running(&tasks[joined + 1..]),
            }),
        };
        if first_failure.is_none() {
            first_failure = Some(failure);
        }
    }

    match first_failure {
        None => Ok(()),
        Some(Failure::Error(e)) => Err(e),
        Some(Failure::Panic(payload)) => std::panic::resume_unwind(payload),
    }
}

fn still_running(tasks: &[JoinHandle<Result<()>>]) -> usize {
    tasks.iter().filter(|task| !task.is_finished()).count()
}
