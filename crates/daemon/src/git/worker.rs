// Git subprocess worker bound to a single repository path.
//
// Every command goes through a `CommandExecutor` so tests can script git's
// responses, and every command runs under a timeout.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, trace};

use super::status::RepositoryStatus;

/// Upper bound on a single git invocation (network operations included).
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitWorkerError {
    #[error("failed to run `{command}`: {message}")]
    SpawnFailed { command: String, message: String },

    #[error("`{command}` failed with code {code:?}: {}", .stderr.trim())]
    CommandFailed { command: String, code: Option<i32>, stderr: String },

    #[error("`{command}` timed out after {timeout:?}")]
    TimedOut { command: String, timeout: Duration },

    #[error("`{command}` returned unexpected output: {output}")]
    UnexpectedOutput { command: String, output: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external program. Trait-based so the worker can be driven by
/// scripted responses in tests.
pub trait CommandExecutor: Send + Sync + 'static {
    fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> impl Future<Output = Result<CommandResult, std::io::Error>> + Send;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessCommandExecutor;

impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(
        &self,
        program: &str,
        args: &[String],
        cwd: &Path,
    ) -> Result<CommandResult, std::io::Error> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(CommandResult {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct GitWorker<E = ProcessCommandExecutor> {
    repo_path: PathBuf,
    executor: E,
    timeout: Duration,
}

impl GitWorker<ProcessCommandExecutor> {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self::with_executor(repo_path, ProcessCommandExecutor)
    }
}

impl<E: CommandExecutor> GitWorker<E> {
    pub fn with_executor(repo_path: impl Into<PathBuf>, executor: E) -> Self {
        Self { repo_path: repo_path.into(), executor, timeout: DEFAULT_GIT_TIMEOUT }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// `git rev-parse <args>`, trimmed.
    pub async fn rev_parse(&self, args: &[&str]) -> Result<String, GitWorkerError> {
        let mut argv = vec!["rev-parse".to_string()];
        argv.extend(args.iter().map(|a| a.to_string()));
        Ok(self.run(argv).await?.stdout.trim().to_string())
    }

    /// Top-level directory of the repository containing the bound path.
    pub async fn show_toplevel(&self) -> Result<PathBuf, GitWorkerError> {
        self.rev_parse(&["--show-toplevel"]).await.map(PathBuf::from)
    }

    /// Create a repository at the bound path with `master` as initial branch.
    pub async fn init(&self) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(args(&["init", "--initial-branch=master"])).await
    }

    pub async fn status(&self) -> Result<RepositoryStatus, GitWorkerError> {
        let output = self.run(args(&["status", "--porcelain=v2", "--branch"])).await?;
        Ok(RepositoryStatus::parse(&output.stdout))
    }

    /// Stage every change in the working tree.
    pub async fn add_all(&self) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(args(&["add", "."])).await
    }

    pub async fn commit(&self, message: &str) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(vec!["commit".to_string(), "-m".to_string(), message.to_string()]).await
    }

    pub async fn stash_push(&self, message: &str) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(vec![
            "stash".to_string(),
            "push".to_string(),
            "-m".to_string(),
            message.to_string(),
        ])
        .await
    }

    pub async fn stash_pop(&self) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(args(&["stash", "pop"])).await
    }

    pub async fn fetch(&self, remote: &str) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(args(&["fetch", remote])).await
    }

    /// Merge `remote/branch` into the current branch (no rebase).
    pub async fn pull(&self, remote: &str, branch: &str) -> Result<GitCommandOutput, GitWorkerError> {
        self.run(args(&["pull", "--no-rebase", "--no-edit", remote, branch])).await
    }

    /// Push the current branch to `remote/branch`.
    pub async fn push(&self, remote: &str, branch: &str) -> Result<GitCommandOutput, GitWorkerError> {
        let refspec = format!("HEAD:{branch}");
        self.run(args(&["push", remote, &refspec])).await
    }

    /// Names of the configured remotes.
    pub async fn remotes(&self) -> Result<Vec<String>, GitWorkerError> {
        let output = self.run(args(&["remote"])).await?;
        Ok(output.stdout.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect())
    }

    /// Number of commits reachable from HEAD but not from `base`.
    pub async fn count_ahead_of(&self, base: &str) -> Result<u32, GitWorkerError> {
        let range = format!("{base}..HEAD");
        let argv = args(&["rev-list", "--count", &range]);
        let command = render_command(&argv);
        let output = self.run(argv).await?;
        output
            .stdout
            .trim()
            .parse()
            .map_err(|_| GitWorkerError::UnexpectedOutput { command, output: output.stdout })
    }

    async fn run(&self, args: Vec<String>) -> Result<GitCommandOutput, GitWorkerError> {
        let command = render_command(&args);
        trace!(%command, repo = %self.repo_path.display(), "running git");

        let execution = self.executor.execute("git", &args, &self.repo_path);
        let result = match tokio::time::timeout(self.timeout, execution).await {
            Ok(result) => result.map_err(|error| GitWorkerError::SpawnFailed {
                command: command.clone(),
                message: error.to_string(),
            })?,
            Err(_) => {
                return Err(GitWorkerError::TimedOut { command, timeout: self.timeout });
            }
        };

        if result.success {
            return Ok(GitCommandOutput { stdout: result.stdout, stderr: result.stderr });
        }

        let stderr = if result.stderr.trim().is_empty() { result.stdout } else { result.stderr };
        debug!(%command, code = ?result.code, "git command failed");

        Err(GitWorkerError::CommandFailed { command, code: result.code, stderr })
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

fn render_command(args: &[String]) -> String {
    format!("git {}", args.join(" "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Invocation {
        pub program: String,
        pub args: Vec<String>,
        pub cwd: PathBuf,
    }

    /// Executor that records invocations and replays queued responses.
    #[derive(Clone, Default)]
    pub(crate) struct MockExecutor {
        calls: Arc<Mutex<Vec<Invocation>>>,
        responses: Arc<Mutex<VecDeque<Result<CommandResult, std::io::Error>>>>,
    }

    impl MockExecutor {
        pub(crate) fn new(responses: Vec<Result<CommandResult, std::io::Error>>) -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            }
        }

        pub(crate) fn push(&self, response: Result<CommandResult, std::io::Error>) {
            self.responses.lock().expect("mock responses lock poisoned").push_back(response);
        }

        pub(crate) fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().expect("mock calls lock poisoned").clone()
        }

        /// The argument lists of every call, joined with spaces.
        pub(crate) fn commands(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.args.join(" ")).collect()
        }
    }

    impl CommandExecutor for MockExecutor {
        async fn execute(
            &self,
            program: &str,
            args: &[String],
            cwd: &Path,
        ) -> Result<CommandResult, std::io::Error> {
            self.calls.lock().expect("mock calls lock poisoned").push(Invocation {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.to_path_buf(),
            });

            self.responses
                .lock()
                .expect("mock responses lock poisoned")
                .pop_front()
                .expect("missing mock response")
        }
    }

    pub(crate) fn ok(stdout: &str) -> Result<CommandResult, std::io::Error> {
        Ok(CommandResult {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub(crate) fn fail(stderr: &str) -> Result<CommandResult, std::io::Error> {
        Ok(CommandResult {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        })
    }

    /// Executor that never answers.
    struct HangingExecutor;

    impl CommandExecutor for HangingExecutor {
        async fn execute(
            &self,
            _program: &str,
            _args: &[String],
            _cwd: &Path,
        ) -> Result<CommandResult, std::io::Error> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn status_runs_porcelain_v2_with_branch() {
        let mock = MockExecutor::new(vec![ok("# branch.oid abc\n# branch.head master\n")]);

        let worker = GitWorker::with_executor("/tmp/nb", mock.clone());
        let status = worker.status().await.expect("status should succeed");

        assert!(status.is_clean);
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "git");
        assert_eq!(calls[0].args, vec!["status", "--porcelain=v2", "--branch"]);
        assert_eq!(calls[0].cwd, PathBuf::from("/tmp/nb"));
    }

    #[tokio::test]
    async fn commit_passes_message_as_single_argument() {
        let mock = MockExecutor::new(vec![ok("[master abc123] notes\n")]);
        let worker = GitWorker::with_executor("/tmp/nb", mock.clone());

        worker.commit("Auto committed by daybook at 2024-01-01 10:00:00").await.unwrap();

        assert_eq!(
            mock.calls()[0].args,
            vec!["commit", "-m", "Auto committed by daybook at 2024-01-01 10:00:00"]
        );
    }

    #[tokio::test]
    async fn pull_and_push_target_remote_branch() {
        let mock = MockExecutor::new(vec![ok(""), ok("")]);
        let worker = GitWorker::with_executor("/tmp/nb", mock.clone());

        worker.pull("origin", "master").await.unwrap();
        worker.push("origin", "master").await.unwrap();

        assert_eq!(
            mock.commands(),
            vec!["pull --no-rebase --no-edit origin master", "push origin HEAD:master"]
        );
    }

    #[tokio::test]
    async fn failure_prefers_stderr_and_falls_back_to_stdout() {
        let mock = MockExecutor::new(vec![
            fail("fatal: couldn't find remote ref master\n"),
            Ok(CommandResult {
                success: false,
                code: Some(1),
                stdout: "nothing added to commit\n".into(),
                stderr: "  ".into(),
            }),
        ]);
        let worker = GitWorker::with_executor("/tmp/nb", mock);

        let error = worker.fetch("origin").await.expect_err("fetch should fail");
        assert_eq!(
            error,
            GitWorkerError::CommandFailed {
                command: "git fetch origin".into(),
                code: Some(1),
                stderr: "fatal: couldn't find remote ref master\n".into(),
            }
        );
        assert_eq!(
            error.to_string(),
            "`git fetch origin` failed with code Some(1): fatal: couldn't find remote ref master"
        );

        let error = worker.commit("x").await.expect_err("commit should fail");
        assert!(matches!(error, GitWorkerError::CommandFailed { stderr, .. } if stderr.contains("nothing added")));
    }

    #[tokio::test]
    async fn spawn_error_is_reported() {
        let mock = MockExecutor::new(vec![Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "git not found",
        ))]);
        let worker = GitWorker::with_executor("/tmp/nb", mock);

        let error = worker.init().await.expect_err("init should fail");
        assert_eq!(
            error,
            GitWorkerError::SpawnFailed {
                command: "git init --initial-branch=master".into(),
                message: "git not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn remotes_and_ahead_count_parse_output() {
        let mock = MockExecutor::new(vec![ok("origin\nbackup\n\n"), ok("3\n"), ok("lots\n")]);
        let worker = GitWorker::with_executor("/tmp/nb", mock.clone());

        assert_eq!(worker.remotes().await.unwrap(), vec!["origin", "backup"]);
        assert_eq!(worker.count_ahead_of("origin/master").await.unwrap(), 3);
        assert!(matches!(
            worker.count_ahead_of("origin/master").await,
            Err(GitWorkerError::UnexpectedOutput { .. })
        ));
        assert_eq!(mock.commands()[1], "rev-list --count origin/master..HEAD");
    }

    #[tokio::test]
    async fn rev_parse_trims_output() {
        let mock = MockExecutor::new(vec![ok("/tmp/nb\n")]);
        let worker = GitWorker::with_executor("/tmp/nb", mock);
        assert_eq!(worker.show_toplevel().await.unwrap(), PathBuf::from("/tmp/nb"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_command_times_out() {
        let worker = GitWorker::with_executor("/tmp/nb", HangingExecutor)
            .with_timeout(Duration::from_secs(5));

        let error = worker.fetch("origin").await.expect_err("fetch should time out");
        assert_eq!(
            error,
            GitWorkerError::TimedOut {
                command: "git fetch origin".into(),
                timeout: Duration::from_secs(5),
            }
        );
    }
}
