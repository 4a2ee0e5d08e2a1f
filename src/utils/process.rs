use crate::result::{BuildError, Result};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

/// Operation that issued a command; names the per-task log file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    ExtractArchive,
    RunConfigurationScript,
    RunBuildCommand,
    RunInstallCommand,
    CreateArchive,
    UpdateDylibId,
    ChangeDylibLookup,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::ExtractArchive => "extract_archive",
            Task::RunConfigurationScript => "run_configuration_script",
            Task::RunBuildCommand => "run_build_command",
            Task::RunInstallCommand => "run_install_command",
            Task::CreateArchive => "create_archive",
            Task::UpdateDylibId => "update_dylib_id",
            Task::ChangeDylibLookup => "change_dylib_lookup",
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/** A fully described external command
 *
 * # Fields
 * - `program`: executable name or path
 * - `args`: arguments, in order
 * - `cwd`: working directory, inherited when `None`
 * - `env`: complete child environment, inherited when `None`
 *
 * # Notes
 * - Pure data, so the exact tool and flags can be asserted without running anything
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Option<BTreeMap<String, String>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    pub fn insert_arg(mut self, index: usize, arg: impl Into<String>) -> Self {
        let index = index.min(self.args.len());
        self.args.insert(index, arg.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn envs(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        self.env.as_ref()
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            command.env_clear();
            command.envs(env);
        }
        command
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/** Runs external commands on behalf of one package
 *
 * # Behavior
 * - Combined stdout/stderr is read line by line until the child exits
 * - Every line is echoed to the console and written to
 *   `{logs}/{name}-{version}-{task}.log`
 * - The first command of a task truncates its log, later ones append
 * - A non-zero exit prints the child environment and returns
 *   [`BuildError::CommandFailed`] with the captured output
 */
pub struct CommandRunner {
    log_dir: PathBuf,
    name: String,
    version: String,
    opened: Mutex<HashSet<Task>>,
}

impl CommandRunner {
    pub fn new(log_dir: impl Into<PathBuf>, name: &str, version: &str) -> Self {
        Self {
            log_dir: log_dir.into(),
            name: name.to_string(),
            version: version.to_string(),
            opened: Mutex::new(HashSet::new()),
        }
    }

    pub fn logfile_path(&self, task: Task) -> PathBuf {
        self.log_dir
            .join(format!("{}-{}-{}.log", self.name, self.version, task))
    }

    fn first_use(&self, task: Task) -> bool {
        match self.opened.lock() {
            Ok(mut opened) => opened.insert(task),
            Err(poisoned) => poisoned.into_inner().insert(task),
        }
    }

    pub async fn run(&self, task: Task, spec: &CommandSpec) -> Result<String> {
        println!("{} {}", self.name, task);
        println!("Running {}", spec);
        log::info!("[{}] {}: {}", self.name, task, spec);

        tokio::fs::create_dir_all(&self.log_dir).await?;
        let append = !self.first_use(task);
        let mut log_file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(self.logfile_path(task))
            .await?;

        let mut command = spec.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::not_found(format!("Failed to start `{}`: {}", spec.program, e))
            } else {
                BuildError::Io(e)
            }
        })?;

        let (tx, mut rx) = unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let mut output = String::new();
        while let Some(line) = rx.recv().await {
            let text = String::from_utf8_lossy(&line);
            println!("{}", text.trim_end());
            log_file.write_all(text.as_bytes()).await?;
            output.push_str(&text);
        }
        log_file.flush().await?;

        let status = child.wait().await?;
        if !status.success() {
            println!("Failed process environment was {:?}", spec.env);
            log::error!("[{}] {} failed: {}", self.name, task, status);
            return Err(BuildError::CommandFailed {
                command: spec.to_string(),
                code: status.code().unwrap_or(-1),
                output,
            });
        }

        Ok(output)
    }
}

async fn forward_lines<R>(reader: R, tx: UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
        }
    }
}

/// Run a short query command and return its trimmed stdout, without logging to a task file.
pub async fn capture(spec: &CommandSpec) -> Result<String> {
    let output = spec
        .to_command()
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BuildError::not_found(format!("Executable not found: {}", spec.program))
            } else {
                BuildError::Io(e)
            }
        })?;

    if !output.status.success() {
        return Err(BuildError::CommandFailed {
            command: spec.to_string(),
            code: output.status.code().unwrap_or(-1),
            output: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("tar").args(["zxf", "foo.tar.gz"]);
        assert_eq!(spec.to_string(), "tar zxf foo.tar.gz");
    }

    #[test]
    fn insert_arg_places_flag_after_program() {
        let spec = CommandSpec::new("tar")
            .args(["-zcf", "out.tar.gz", "dir"])
            .insert_arg(0, "--force-local");
        assert_eq!(
            spec.arguments(),
            &["--force-local", "-zcf", "out.tar.gz", "dir"]
        );
    }

    #[test]
    fn logfile_name_combines_identity_and_task() {
        let runner = CommandRunner::new("/logs", "qwt", "6.1.4");
        assert_eq!(
            runner.logfile_path(Task::RunBuildCommand),
            PathBuf::from("/logs/qwt-6.1.4-run_build_command.log")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_streams_output_into_task_log() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(dir.path(), "demo", "1.0");
        let spec = CommandSpec::new("/bin/sh").args(["-c", "echo out; echo err 1>&2"]);

        let output = runner.run(Task::RunBuildCommand, &spec).await.unwrap();
        assert!(output.contains("out\n"));
        assert!(output.contains("err\n"));

        let log = std::fs::read_to_string(runner.logfile_path(Task::RunBuildCommand)).unwrap();
        assert_eq!(log, output);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn second_command_of_a_task_appends() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(dir.path(), "demo", "1.0");

        let first = CommandSpec::new("/bin/sh").args(["-c", "echo first"]);
        let second = CommandSpec::new("/bin/sh").args(["-c", "echo second"]);
        runner.run(Task::ExtractArchive, &first).await.unwrap();
        runner.run(Task::ExtractArchive, &second).await.unwrap();

        let log = std::fs::read_to_string(runner.logfile_path(Task::ExtractArchive)).unwrap();
        assert_eq!(log, "first\nsecond\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failure_carries_exit_code_and_output() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(dir.path(), "demo", "1.0");
        let spec = CommandSpec::new("/bin/sh").args(["-c", "echo broken; exit 3"]);

        match runner.run(Task::RunConfigurationScript, &spec).await {
            Err(BuildError::CommandFailed { code, output, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(output, "broken\n");
            }
            other => panic!("expected command failure, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn explicit_environment_replaces_inherited_one() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(dir.path(), "demo", "1.0");
        let env = BTreeMap::from([("ONLY_VAR".to_string(), "present".to_string())]);
        let spec = CommandSpec::new("/bin/sh")
            .args(["-c", "echo ${ONLY_VAR}-${HOME:-unset}"])
            .envs(env);

        let output = runner.run(Task::RunBuildCommand, &spec).await.unwrap();
        assert_eq!(output, "present-unset\n");
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let runner = CommandRunner::new(dir.path(), "demo", "1.0");
        let spec = CommandSpec::new("definitely_not_a_real_command_12345");

        let err = runner.run(Task::RunBuildCommand, &spec).await.unwrap_err();
        assert!(matches!(err, BuildError::NotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn capture_trims_stdout() {
        let spec = CommandSpec::new("/bin/sh").args(["-c", "echo '  22.04  '"]);
        assert_eq!(capture(&spec).await.unwrap(), "22.04");
    }
}
