use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sitepipe::errors::SitepipeError;
use sitepipe::exec::{Task, TaskExecutor, TaskFuture, TaskReport};
use sitepipe::fs::FileSystem;

/// A fake executor that:
/// - records which tasks were "run", in start order
/// - fails the tasks named with `fail_on` with `TransformFailed`
/// - optionally sleeps before settling, to widen concurrency windows
/// - optionally writes `<out_dir>/<task>.out` on success
#[derive(Clone, Default)]
pub struct FakeExecutor {
    executed: Arc<Mutex<Vec<String>>>,
    failing: Arc<Mutex<HashSet<String>>>,
    delay: Option<Duration>,
    output: Option<(Arc<dyn FileSystem>, PathBuf)>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_on(self, task: &str) -> Self {
        self.failing.lock().unwrap().insert(task.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn writing_to(mut self, fs: Arc<dyn FileSystem>, out_dir: impl Into<PathBuf>) -> Self {
        self.output = Some((fs, out_dir.into()));
        self
    }

    /// Task names in the order they started.
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn count(&self, task: &str) -> usize {
        self.executed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.as_str() == task)
            .count()
    }
}

impl TaskExecutor for FakeExecutor {
    fn execute(&self, task: Arc<Task>) -> TaskFuture<'_> {
        Box::pin(async move {
            self.executed.lock().unwrap().push(task.name.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.lock().unwrap().contains(&task.name) {
                return Err(SitepipeError::TransformFailed {
                    task: task.name.clone(),
                    message: "injected failure".to_string(),
                });
            }

            let mut report = TaskReport {
                task: task.name.clone(),
                inputs: 1,
                ..TaskReport::default()
            };

            if let Some((fs, out_dir)) = &self.output {
                let path = out_dir.join(format!("{}.out", task.name));
                fs.write(&path, task.name.as_bytes())
                    .map_err(SitepipeError::FileSystem)?;
                report.outputs.push(path);
            }

            Ok(report)
        })
    }
}
