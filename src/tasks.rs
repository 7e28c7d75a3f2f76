//! Project task runner
//!
//! Named targets (`run`, `lint`) are fixed sequences of external commands.
//! Steps run one at a time with inherited stdio; the first step that exits
//! unsuccessfully stops the sequence and its exit status is surfaced
//! unchanged. Selected variables from the local env file are exported to
//! every step unless the inherited environment already defines them.

use crate::config::TasksConfig;
use crate::env_file::{defined_in_process, EnvFile};
use crate::error::{EditorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// A single external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStep {
    /// Program to execute, resolved through `PATH`
    pub program: String,
    /// Arguments passed verbatim
    #[serde(default)]
    pub args: Vec<String>,
}

impl TaskStep {
    /// Create a step from a program and its arguments
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Render the step as a shell-like command line for logs and dry runs
    ///
    /// # Examples
    ///
    /// ```
    /// use qiita_editor::tasks::TaskStep;
    ///
    /// let step = TaskStep::new("cargo", ["fmt", "--all"]);
    /// assert_eq!(step.command_line(), "cargo fmt --all");
    /// ```
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(quote_arg)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote_arg(arg: &str) -> String {
    if !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c))
    {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

/// A named, ordered sequence of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Target name
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<TaskStep>,
}

impl TaskSpec {
    /// Create a task from its name and steps
    pub fn new(name: impl Into<String>, steps: Vec<TaskStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Built-in targets
    ///
    /// - `run` launches the web editor
    /// - `lint` runs the formatter check, clippy, and the doc build
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "run" => Some(Self::new(
                "run",
                vec![TaskStep::new("cargo", ["run", "--release", "--", "serve"])],
            )),
            "lint" => Some(Self::new(
                "lint",
                vec![
                    TaskStep::new("cargo", ["fmt", "--all", "--", "--check"]),
                    TaskStep::new("cargo", ["clippy", "--all-targets", "--", "-D", "warnings"]),
                    TaskStep::new("cargo", ["doc", "--no-deps"]),
                ],
            )),
            _ => None,
        }
    }

    /// Names of the built-in targets
    pub fn builtin_names() -> &'static [&'static str] {
        &["lint", "run"]
    }
}

/// Resolve a target by name, preferring configured overrides over built-ins
///
/// # Errors
///
/// Returns `EditorError::UnknownTask` listing every known target
pub fn resolve_task(name: &str, overrides: &BTreeMap<String, Vec<TaskStep>>) -> Result<TaskSpec> {
    if let Some(steps) = overrides.get(name) {
        return Ok(TaskSpec::new(name, steps.clone()));
    }

    if let Some(spec) = TaskSpec::builtin(name) {
        return Ok(spec);
    }

    let mut known: Vec<&str> = TaskSpec::builtin_names().to_vec();
    known.extend(overrides.keys().map(String::as_str));
    known.sort_unstable();
    known.dedup();

    Err(EditorError::UnknownTask {
        name: name.to_string(),
        known: known.join(", "),
    }
    .into())
}

/// Load the env file and keep only the exported keys
///
/// A missing env file yields no exports; steps then inherit whatever the
/// parent environment already holds.
pub fn exported_env(env_file: &Path, keys: &[String]) -> Result<Vec<(String, String)>> {
    match EnvFile::load_optional(env_file)? {
        Some(env) => {
            let exports = env.select(keys);
            tracing::debug!(
                "Exporting {} of {} requested variables from {}",
                exports.len(),
                keys.len(),
                env_file.display()
            );
            Ok(exports)
        }
        None => {
            tracing::warn!(
                "Env file {} not found; tasks inherit the current environment",
                env_file.display()
            );
            Ok(Vec::new())
        }
    }
}

/// Outcome of a task run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Target name
    pub task: String,
    /// Command lines that ran (or would run, for a dry run) in order
    pub executed: Vec<String>,
    /// Whether this was a dry run
    pub dry_run: bool,
}

/// Sequential executor for task targets
#[derive(Debug, Clone)]
pub struct TaskRunner {
    exports: Vec<(String, String)>,
    working_dir: Option<PathBuf>,
    dry_run: bool,
}

impl TaskRunner {
    /// Create a runner that exports the given variables to every step
    pub fn new(exports: Vec<(String, String)>) -> Self {
        Self {
            exports,
            working_dir: None,
            dry_run: false,
        }
    }

    /// Build a runner from the task configuration
    pub fn from_config(config: &TasksConfig) -> Result<Self> {
        Ok(Self::new(exported_env(&config.env_file, &config.export)?))
    }

    /// Run steps in the given directory instead of the current one
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Only report the commands, never spawn them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Variables selected from the env file
    ///
    /// A step only receives those the inherited environment leaves unset.
    pub fn exports(&self) -> &[(String, String)] {
        &self.exports
    }

    /// Run every step of the task in order
    ///
    /// # Errors
    ///
    /// - `EditorError::TaskSpawn` if a program cannot be started
    /// - `EditorError::TaskFailed` for the first step with a non-zero exit;
    ///   later steps are not run
    pub async fn run(&self, task: &TaskSpec) -> Result<TaskReport> {
        let mut executed = Vec::with_capacity(task.steps.len());

        if self.dry_run {
            executed.extend(task.steps.iter().map(TaskStep::command_line));
            return Ok(TaskReport {
                task: task.name.clone(),
                executed,
                dry_run: true,
            });
        }

        tracing::info!("Running task '{}' ({} steps)", task.name, task.steps.len());

        let exports: Vec<&(String, String)> = self
            .exports
            .iter()
            .filter(|(key, _)| {
                let inherited = defined_in_process(key);
                if inherited {
                    tracing::debug!("Keeping inherited value for {}", key);
                }
                !inherited
            })
            .collect();

        for (idx, step) in task.steps.iter().enumerate() {
            let line = step.command_line();
            tracing::info!("[{}/{}] {}", idx + 1, task.steps.len(), line);

            let mut command = Command::new(&step.program);
            command.args(&step.args);
            command.envs(exports.iter().map(|(k, v)| (k, v)));
            if let Some(dir) = &self.working_dir {
                command.current_dir(dir);
            }

            let status = command
                .status()
                .await
                .map_err(|e| EditorError::TaskSpawn(format!("{}: {}", line, e)))?;

            if !status.success() {
                tracing::error!("Step '{}' failed with {}", line, status);
                return Err(EditorError::TaskFailed {
                    task: task.name.clone(),
                    step: line,
                    code: status.code(),
                }
                .into());
            }

            executed.push(line);
        }

        tracing::info!("Task '{}' completed", task.name);

        Ok(TaskReport {
            task: task.name.clone(),
            executed,
            dry_run: false,
        })
    }
}
