//! # Collaborators
//!
//! Things a controller run touches outside the socket.
//!
//! ```text
//! ScenarioSource     *.scenario file ──> Scenario (sent with CMD_FILE_SEND)
//! ResultSink         rows ──> "timeStep col col ..." text file
//! ProcessSupervisor  simulator child process, killed and reaped on stop
//! ```

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::error::{ControlError, ControlResult};

/// File extension a scenario must carry.
pub const SCENARIO_EXTENSION: &str = ".scenario";

/// Name of the index column written by [`DelimitedWriter`].
pub const TIME_STEP_COLUMN: &str = "timeStep";

// ============================================================================
// SCENARIO
// ============================================================================

/// A scenario as uploaded to the simulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Name the simulation stores the scenario under.
    pub name: String,
    /// File content.
    pub content: String,
}

impl Scenario {
    /// Creates a scenario.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Provides scenario files.
pub trait ScenarioSource {
    /// Loads the scenario at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Scenario`] if the scenario cannot be provided.
    fn load(&self, path: &Path) -> ControlResult<Scenario>;
}

/// Reads `*.scenario` files from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScenario;

impl ScenarioSource for FileScenario {
    fn load(&self, path: &Path) -> ControlResult<Scenario> {
        let name = path.to_string_lossy().into_owned();
        if !name.ends_with(SCENARIO_EXTENSION) {
            return Err(ControlError::Scenario(format!(
                "scenario file (*{SCENARIO_EXTENSION}) expected, got {name}"
            )));
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| ControlError::Scenario(format!("cannot read {name}: {e}")))?;
        tracing::debug!(scenario = %name, bytes = content.len(), "scenario loaded");
        Ok(Scenario { name, content })
    }
}

// ============================================================================
// RESULT SINK
// ============================================================================

/// Collects per-step results.
pub trait ResultSink {
    /// Appends the row of `time_step`.
    ///
    /// # Errors
    ///
    /// Fails on a repeated time step, a row of the wrong width or I/O.
    fn append(&mut self, time_step: u64, row: &[String]) -> ControlResult<()>;

    /// Flushes and releases the output.
    ///
    /// # Errors
    ///
    /// Fails on I/O.
    fn finish(&mut self) -> ControlResult<()>;
}

/// Space separated text output with a header row.
///
/// ```text
/// timeStep commandId
/// 5 1
/// 10 2
/// ```
#[derive(Debug)]
pub struct DelimitedWriter<W: Write> {
    out: Option<W>,
    columns: Vec<String>,
    header_written: bool,
    written: BTreeSet<u64>,
}

impl DelimitedWriter<BufWriter<File>> {
    /// Creates (or truncates) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if the file cannot be created.
    pub fn create(path: impl AsRef<Path>, columns: Vec<String>) -> ControlResult<Self> {
        let file = File::create(path.as_ref())?;
        Ok(Self::new(BufWriter::new(file), columns))
    }
}

impl<W: Write> DelimitedWriter<W> {
    /// Writes to `out`. The header is emitted with the first row.
    #[must_use]
    pub fn new(out: W, columns: Vec<String>) -> Self {
        Self {
            out: Some(out),
            columns,
            header_written: false,
            written: BTreeSet::new(),
        }
    }

    /// Column names after the index column.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Releases the inner writer.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if flushing fails.
    pub fn into_inner(mut self) -> ControlResult<Option<W>> {
        if let Some(out) = self.out.as_mut() {
            out.flush()?;
        }
        Ok(self.out.take())
    }

    fn out(&mut self) -> ControlResult<&mut W> {
        self.out.as_mut().ok_or_else(|| {
            ControlError::Io(io::Error::new(io::ErrorKind::BrokenPipe, "result sink finished"))
        })
    }
}

impl<W: Write> ResultSink for DelimitedWriter<W> {
    fn append(&mut self, time_step: u64, row: &[String]) -> ControlResult<()> {
        if row.len() != self.columns.len() {
            return Err(ControlError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("row has {} values, header has {}", row.len(), self.columns.len()),
            )));
        }
        if self.written.contains(&time_step) {
            return Err(ControlError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("duplicate time step {time_step}"),
            )));
        }

        if !self.header_written {
            let header = std::iter::once(TIME_STEP_COLUMN.to_owned())
                .chain(self.columns.iter().cloned())
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(self.out()?, "{header}")?;
            self.header_written = true;
        }
        writeln!(self.out()?, "{time_step} {}", row.join(" "))?;
        self.written.insert(time_step);
        Ok(())
    }

    fn finish(&mut self) -> ControlResult<()> {
        if let Some(mut out) = self.out.take() {
            out.flush()?;
            tracing::debug!(rows = self.written.len(), "result sink finished");
        }
        Ok(())
    }
}

// ============================================================================
// PROCESS SUPERVISOR
// ============================================================================

/// A running child process.
#[derive(Debug)]
pub struct ProcessHandle {
    program: String,
    child: Option<Child>,
}

impl ProcessHandle {
    /// Program the process was started from.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// OS process id.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// Starts and stops external processes.
pub trait ProcessSupervisor {
    /// Starts `command`, program first.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] for an empty command and
    /// [`ControlError::Io`] if spawning fails.
    fn start(&mut self, command: &[String]) -> ControlResult<ProcessHandle>;

    /// Stops the process and waits for it. Returns its exit code, `None`
    /// if it was killed.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Io`] if waiting fails.
    fn stop(&mut self, handle: ProcessHandle) -> ControlResult<Option<i32>>;
}

/// Supervises processes through [`std::process`].
#[derive(Debug, Clone, Default)]
pub struct CommandSupervisor {
    log: Option<PathBuf>,
}

impl CommandSupervisor {
    /// Discards child output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes child stdout and stderr to `path`.
    #[must_use]
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }

    fn output(&self) -> ControlResult<(Stdio, Stdio)> {
        match &self.log {
            Some(path) => {
                let file = File::create(path)?;
                let err = file.try_clone()?;
                Ok((Stdio::from(file), Stdio::from(err)))
            }
            None => Ok((Stdio::null(), Stdio::null())),
        }
    }
}

impl ProcessSupervisor for CommandSupervisor {
    fn start(&mut self, command: &[String]) -> ControlResult<ProcessHandle> {
        let Some((program, args)) = command.split_first() else {
            return Err(ControlError::Config("supervisor command is empty".into()));
        };
        let (stdout, stderr) = self.output()?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()?;
        tracing::info!(program = %program, pid = child.id(), "process started");
        Ok(ProcessHandle {
            program: program.clone(),
            child: Some(child),
        })
    }

    fn stop(&mut self, mut handle: ProcessHandle) -> ControlResult<Option<i32>> {
        let Some(mut child) = handle.child.take() else {
            return Ok(None);
        };
        if child.try_wait()?.is_none() {
            if let Err(e) = child.kill() {
                tracing::debug!(program = %handle.program, error = %e, "kill failed");
            }
        }
        let status = child.wait()?;
        tracing::info!(program = %handle.program, %status, "process stopped");
        Ok(status.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("crowdctl-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_scenario_extension_checked() {
        let err = FileScenario.load(Path::new("corridor.json")).unwrap_err();
        assert!(matches!(err, ControlError::Scenario(ref m) if m.contains("corridor.json")));
    }

    #[test]
    fn test_scenario_loaded() {
        let path = temp_path("corridor.scenario");
        std::fs::write(&path, "{\"name\":\"corridor\"}").unwrap();

        let scenario = FileScenario.load(&path).unwrap();
        assert_eq!(scenario.content, "{\"name\":\"corridor\"}");
        assert!(scenario.name.ends_with("corridor.scenario"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_scenario() {
        let err = FileScenario.load(&temp_path("missing.scenario")).unwrap_err();
        assert!(matches!(err, ControlError::Scenario(_)));
    }

    #[test]
    fn test_writer_header_once() {
        let mut writer = DelimitedWriter::new(Vec::new(), vec!["commandId".into()]);
        writer.append(5, &["1".into()]).unwrap();
        writer.append(10, &["2".into()]).unwrap();

        let out = writer.into_inner().unwrap().unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "timeStep commandId\n5 1\n10 2\n");
    }

    #[test]
    fn test_writer_rejects_bad_rows() {
        let mut writer = DelimitedWriter::new(Vec::new(), vec!["a".into(), "b".into()]);
        assert!(writer.append(1, &["1".into()]).is_err());

        writer.append(1, &["1".into(), "2".into()]).unwrap();
        assert!(writer.append(1, &["3".into(), "4".into()]).is_err());
    }

    #[test]
    fn test_writer_finish() {
        let path = temp_path("density.txt");
        let mut writer = DelimitedWriter::create(&path, vec!["density".into()]).unwrap();
        writer.append(0, &["0.25".into()]).unwrap();
        writer.finish().unwrap();
        assert!(writer.append(1, &["0.5".into()]).is_err());

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "timeStep density\n0 0.25\n");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_supervisor_empty_command() {
        let err = CommandSupervisor::new().start(&[]).unwrap_err();
        assert!(matches!(err, ControlError::Config(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_supervisor_stops_child() {
        let mut supervisor = CommandSupervisor::new();
        let handle = supervisor.start(&["sleep".into(), "30".into()]).unwrap();
        assert_eq!(handle.program(), "sleep");
        assert!(handle.id().is_some());

        // killed, no exit code
        assert_eq!(supervisor.stop(handle).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_supervisor_reaps_finished_child() {
        let mut supervisor = CommandSupervisor::new();
        let handle = supervisor.start(&["true".into()]).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(500));

        assert_eq!(supervisor.stop(handle).unwrap(), Some(0));
    }
}
