use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::process::Command;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::error::{GrabError, Result};
use crate::types::{CloneEvent, CloneOutcome, CloneReport, RepoRecord};

/// The version-control clone operation.
#[async_trait]
pub trait Cloner: Send + Sync {
    async fn clone_repo(&self, url: &str, branch: &str, destination: &Path) -> Result<()>;
}

/// Clones with the `git` executable on `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

#[async_trait]
impl Cloner for GitCli {
    async fn clone_repo(&self, url: &str, branch: &str, destination: &Path) -> Result<()> {
        let output = Command::new("git")
            .arg("clone")
            .arg("--branch")
            .arg(branch)
            .arg("--")
            .arg(url)
            .arg(destination)
            // A credential prompt would hang with no terminal to answer it.
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = stderr
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("git clone failed")
            .to_string();
        Err(GrabError::CloneTask(message))
    }
}

/// Fans a selection out into one clone task per record.
pub struct CloneDispatcher {
    cloner: Arc<dyn Cloner>,
    concurrency: Option<usize>,
}

impl std::fmt::Debug for CloneDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneDispatcher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

/// Fail fast when there is nothing to clone, before asking for a destination.
pub fn ensure_selection(records: &[RepoRecord]) -> Result<()> {
    if records.is_empty() {
        return Err(GrabError::NoSelection);
    }
    Ok(())
}

impl CloneDispatcher {
    pub fn new(cloner: Arc<dyn Cloner>) -> Self {
        Self {
            cloner,
            concurrency: None,
        }
    }

    /// Bound the number of clones running at once. `None` or `Some(0)` means
    /// one concurrent task per record.
    pub fn with_concurrency(mut self, limit: Option<usize>) -> Self {
        self.concurrency = limit.filter(|n| *n > 0);
        self
    }

    /// Start cloning `records` into `destination`.
    ///
    /// Each record is cloned independently into `<destination>/<owner>-<name>`.
    /// The receiver yields a [`CloneEvent::Progress`] after every terminal
    /// outcome, in completion order, followed by exactly one
    /// [`CloneEvent::AllDone`]; then the channel closes. Must be called from
    /// within a Tokio runtime.
    pub fn dispatch(
        &self,
        records: Vec<RepoRecord>,
        destination: PathBuf,
    ) -> Result<mpsc::UnboundedReceiver<CloneEvent>> {
        ensure_selection(&records)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let cloner = Arc::clone(&self.cloner);
        let semaphore = self.concurrency.map(|n| Arc::new(Semaphore::new(n)));

        tracing::info!(
            count = records.len(),
            destination = %destination.display(),
            concurrency = ?self.concurrency,
            "starting clone batch"
        );

        tokio::spawn(run_batch(records, destination, cloner, semaphore, tx));
        Ok(rx)
    }
}

struct BatchProgress {
    report: CloneReport,
    tx: mpsc::UnboundedSender<CloneEvent>,
}

impl BatchProgress {
    fn finish(&mut self, outcome: CloneOutcome) {
        self.report.record(&outcome);
        let finished = self.report.finished();
        tracing::debug!(%outcome, finished, total = self.report.total, "clone task finished");
        self.tx
            .send(CloneEvent::Progress {
                outcome,
                finished,
                total: self.report.total,
            })
            .ok();
    }

    fn done(self) {
        tracing::info!(
            succeeded = self.report.succeeded,
            skipped = self.report.skipped,
            failed = self.report.failed.len(),
            "clone batch complete"
        );
        self.tx.send(CloneEvent::AllDone(self.report)).ok();
    }
}

async fn run_batch(
    records: Vec<RepoRecord>,
    destination: PathBuf,
    cloner: Arc<dyn Cloner>,
    semaphore: Option<Arc<Semaphore>>,
    tx: mpsc::UnboundedSender<CloneEvent>,
) {
    let mut progress = BatchProgress {
        report: CloneReport {
            total: records.len(),
            ..CloneReport::default()
        },
        tx,
    };
    let mut tasks = JoinSet::new();
    let mut claimed = HashSet::new();

    for record in records {
        let target = destination.join(record.target_dir_name());

        // The same repository can surface on two pages; clone it once.
        if !claimed.insert(target.clone()) {
            progress.finish(CloneOutcome::Skipped(record.full_name()));
            continue;
        }

        let cloner = Arc::clone(&cloner);
        let semaphore = semaphore.clone();
        tasks.spawn(async move {
            let repo = record.full_name();
            let _permit = match semaphore {
                Some(semaphore) => match semaphore.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        return CloneOutcome::Failed(repo, "worker pool closed".to_string())
                    }
                },
                None => None,
            };

            match AssertUnwindSafe(clone_one(cloner.as_ref(), &record, &target))
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => CloneOutcome::Failed(repo, "clone task panicked".to_string()),
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined
            .unwrap_or_else(|e| CloneOutcome::Failed("<unknown>".to_string(), e.to_string()));
        progress.finish(outcome);
    }

    progress.done();
}

async fn clone_one(cloner: &dyn Cloner, record: &RepoRecord, target: &Path) -> CloneOutcome {
    let repo = record.full_name();

    match tokio::fs::try_exists(target).await {
        Ok(true) => {
            tracing::info!(repo, target = %target.display(), "target exists, skipping");
            return CloneOutcome::Skipped(repo);
        }
        Ok(false) => {}
        Err(e) => return CloneOutcome::Failed(repo, e.to_string()),
    }

    match cloner
        .clone_repo(&record.url, &record.chosen_branch, target)
        .await
    {
        Ok(()) => CloneOutcome::Succeeded(repo),
        Err(e) => {
            tracing::warn!(repo, branch = %record.chosen_branch, error = %e, "clone failed");
            CloneOutcome::Failed(repo, e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::types::RemoteRepo;

    #[derive(Default)]
    struct FakeCloner {
        failing: HashSet<String>,
        panicking: HashSet<String>,
        calls: Mutex<Vec<(String, String, PathBuf)>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Cloner for FakeCloner {
        async fn clone_repo(&self, url: &str, branch: &str, destination: &Path) -> Result<()> {
            self.calls.lock().unwrap().push((
                url.to_string(),
                branch.to_string(),
                destination.to_path_buf(),
            ));
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if self.panicking.contains(url) {
                panic!("cloner blew up");
            }
            if self.failing.contains(url) {
                return Err(GrabError::CloneTask("remote hung up".into()));
            }
            tokio::fs::create_dir_all(destination).await?;
            Ok(())
        }
    }

    fn record(owner: &str, name: &str) -> RepoRecord {
        let mut record = RepoRecord::new(
            RemoteRepo {
                name: name.to_string(),
                owner: owner.to_string(),
                stars: 0,
                html_url: format!("https://github.com/{}/{}", owner, name),
            },
            vec!["main".into(), "dev".into()],
        );
        record.selected = true;
        record
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<CloneEvent>) -> Vec<CloneEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn outcomes(events: &[CloneEvent]) -> Vec<CloneOutcome> {
        events
            .iter()
            .filter_map(|e| match e {
                CloneEvent::Progress { outcome, .. } => Some(outcome.clone()),
                CloneEvent::AllDone(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_selection_fails_fast() {
        let dispatcher = CloneDispatcher::new(Arc::new(FakeCloner::default()));
        let err = dispatcher
            .dispatch(Vec::new(), PathBuf::from("/nonexistent"))
            .unwrap_err();
        assert!(matches!(err, GrabError::NoSelection));
        assert!(matches!(ensure_selection(&[]), Err(GrabError::NoSelection)));
    }

    #[tokio::test]
    async fn failures_are_isolated_and_counted() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..5).map(|i| record("alice", &format!("r{}", i))).collect();
        let cloner = FakeCloner {
            failing: ["https://github.com/alice/r1", "https://github.com/alice/r3"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..FakeCloner::default()
        };
        let dispatcher = CloneDispatcher::new(Arc::new(cloner));

        let events = drain(dispatcher.dispatch(records, dir.path().to_path_buf()).unwrap()).await;

        let outcomes = outcomes(&events);
        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes
                .iter()
                .filter(|o| matches!(o, CloneOutcome::Failed(..)))
                .count(), 2);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, CloneOutcome::Succeeded(_)))
                .count(),
            3
        );

        let finished: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                CloneEvent::Progress { finished, total, .. } => Some((*finished, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(finished, (1..=5).map(|n| (n, 5)).collect::<Vec<_>>());

        let all_done: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, CloneEvent::AllDone(_)))
            .collect();
        assert_eq!(all_done.len(), 1);
        let Some(CloneEvent::AllDone(report)) = events.last() else {
            panic!("AllDone must be the final event");
        };
        assert_eq!(report.total, 5);
        assert_eq!(report.succeeded, 3);
        let mut failed: Vec<_> = report.failed.iter().map(|(r, _)| r.as_str()).collect();
        failed.sort();
        assert_eq!(failed, vec!["alice/r1", "alice/r3"]);
    }

    #[tokio::test]
    async fn existing_target_is_skipped_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("alice-kept");
        std::fs::create_dir(&existing).unwrap();
        std::fs::write(existing.join("marker"), "original").unwrap();

        let cloner = Arc::new(FakeCloner::default());
        let dispatcher = CloneDispatcher::new(cloner.clone());
        let events = drain(
            dispatcher
                .dispatch(vec![record("alice", "kept.git")], dir.path().to_path_buf())
                .unwrap(),
        )
        .await;

        assert_eq!(
            outcomes(&events),
            vec![CloneOutcome::Skipped("alice/kept.git".into())]
        );
        assert!(cloner.calls.lock().unwrap().is_empty());
        assert_eq!(
            std::fs::read_to_string(existing.join("marker")).unwrap(),
            "original"
        );
    }

    #[tokio::test]
    async fn clone_uses_url_branch_and_derived_target() {
        let dir = tempfile::tempdir().unwrap();
        let mut rec = record("bob", "lib");
        rec.chosen_branch = "dev".into();

        let cloner = Arc::new(FakeCloner::default());
        let dispatcher = CloneDispatcher::new(cloner.clone());
        drain(dispatcher.dispatch(vec![rec], dir.path().to_path_buf()).unwrap()).await;

        let calls = cloner.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![(
                "https://github.com/bob/lib".to_string(),
                "dev".to_string(),
                dir.path().join("bob-lib"),
            )]
        );
    }

    #[tokio::test]
    async fn duplicate_targets_clone_once() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = Arc::new(FakeCloner::default());
        let dispatcher = CloneDispatcher::new(cloner.clone());

        let events = drain(
            dispatcher
                .dispatch(
                    vec![record("alice", "x"), record("alice", "x")],
                    dir.path().to_path_buf(),
                )
                .unwrap(),
        )
        .await;

        let outcomes = outcomes(&events);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&CloneOutcome::Skipped("alice/x".into())));
        assert!(outcomes.contains(&CloneOutcome::Succeeded("alice/x".into())));
        assert_eq!(cloner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn bounded_pool_limits_parallel_clones() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..6).map(|i| record("carol", &format!("p{}", i))).collect();
        let cloner = Arc::new(FakeCloner::default());
        let dispatcher = CloneDispatcher::new(cloner.clone()).with_concurrency(Some(2));

        let events = drain(dispatcher.dispatch(records, dir.path().to_path_buf()).unwrap()).await;

        assert_eq!(outcomes(&events).len(), 6);
        assert!(cloner.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(cloner.calls.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn unbounded_pool_runs_everything_at_once() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..4).map(|i| record("dave", &format!("q{}", i))).collect();
        let cloner = Arc::new(FakeCloner::default());
        let dispatcher = CloneDispatcher::new(cloner.clone()).with_concurrency(Some(0));

        drain(dispatcher.dispatch(records, dir.path().to_path_buf()).unwrap()).await;

        assert_eq!(cloner.peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn panicking_task_becomes_failure() {
        let dir = tempfile::tempdir().unwrap();
        let cloner = FakeCloner {
            panicking: ["https://github.com/erin/bad".to_string()].into_iter().collect(),
            ..FakeCloner::default()
        };
        let dispatcher = CloneDispatcher::new(Arc::new(cloner));

        let events = drain(
            dispatcher
                .dispatch(
                    vec![record("erin", "bad"), record("erin", "good")],
                    dir.path().to_path_buf(),
                )
                .unwrap(),
        )
        .await;

        let outcomes = outcomes(&events);
        assert!(outcomes.contains(&CloneOutcome::Failed(
            "erin/bad".into(),
            "clone task panicked".into()
        )));
        assert!(outcomes.contains(&CloneOutcome::Succeeded("erin/good".into())));
        assert!(matches!(events.last(), Some(CloneEvent::AllDone(_))));
    }

    #[tokio::test]
    async fn git_cli_reports_failure_for_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitCli
            .clone_repo(
                &dir.path().join("no-such-repo").display().to_string(),
                "main",
                &dir.path().join("out"),
            )
            .await;
        assert!(result.is_err());
    }
}
