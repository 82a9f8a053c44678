//! External conversion engine for word-processor and presentation files.
//!
//! The engine is invoked as
//! `<program> --headless --convert-to pdf --outdir <scratch> <input>` and
//! writes `<input stem>.pdf` into a scratch directory created inside the
//! output directory. The result is then renamed onto its final name, which
//! keeps concurrent conversions of same-named inputs from clobbering each
//! other's intermediate files.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{CancelToken, DelegateOptions};
use crate::error::DelegateError;

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// Longest diagnostic excerpt carried in an error message.
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// Captured result of an engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Exit code, `None` when terminated by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Trimmed stderr, or stdout when stderr is empty.
    pub fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let text = if stderr.trim().is_empty() {
            String::from_utf8_lossy(&self.stdout)
        } else {
            stderr
        };
        let text = text.trim();
        match text.char_indices().nth(MAX_DIAGNOSTIC_CHARS) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!(error = %e, "failed to kill conversion engine");
    }
    // reap; the output pipes may stay open in orphaned grandchildren, so the
    // reader threads are left to finish on their own
    let _ = child.wait();
}

/// Poll `child` until it exits. Every early return kills and reaps it first.
fn supervise(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
    mut poll: impl FnMut(&mut Child) -> io::Result<Option<ExitStatus>>,
) -> Result<ExitStatus, DelegateError> {
    let started = Instant::now();
    loop {
        match poll(child) {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => {
                terminate(child);
                return Err(e.into());
            }
        }
        if cancel.is_some_and(CancelToken::is_cancelled) {
            terminate(child);
            return Err(DelegateError::Cancelled);
        }
        if let Some(limit) = timeout
            && started.elapsed() >= limit
        {
            terminate(child);
            return Err(DelegateError::TimedOut(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Run `command` to completion, capturing its output.
///
/// The child is killed when `timeout` elapses or `cancel` fires. A non-zero
/// exit is not an error here; callers inspect [`ProcessOutput::status`].
pub fn run_engine(
    mut command: Command,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
) -> Result<ProcessOutput, DelegateError> {
    if cancel.is_some_and(CancelToken::is_cancelled) {
        return Err(DelegateError::Cancelled);
    }

    let program = PathBuf::from(command.get_program());
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| DelegateError::Spawn {
            program: program.clone(),
            source,
        })?;
    debug!(program = %program.display(), pid = child.id(), "conversion engine started");

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());
    let started = Instant::now();

    let status = supervise(&mut child, timeout, cancel, Child::try_wait)?;

    let output = ProcessOutput {
        status: status.code(),
        stdout: collect(stdout),
        stderr: collect(stderr),
    };
    debug!(
        status = ?output.status,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "conversion engine finished"
    );
    Ok(output)
}

/// Convert `input` with the external engine and place the PDF at `target`.
///
/// `target` must live in an existing directory; nothing is created under its
/// name unless the engine succeeds and produces a non-empty file.
pub fn convert_with_engine(
    input: &Path,
    target: &Path,
    options: &DelegateOptions,
    cancel: Option<&CancelToken>,
) -> Result<PathBuf, DelegateError> {
    let output_dir = match target.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let scratch = tempfile::Builder::new()
        .prefix(".doc2pdf-")
        .tempdir_in(output_dir)?;

    let mut command = Command::new(&options.program);
    command
        .arg("--headless")
        .arg("--convert-to")
        .arg("pdf")
        .arg("--outdir")
        .arg(scratch.path())
        .arg(input);

    info!(
        program = %options.program.display(),
        input = %input.display(),
        "delegating conversion"
    );
    let output = run_engine(command, options.timeout, cancel)?;
    if !output.success() {
        return Err(DelegateError::ExitStatus(output));
    }

    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut produced = scratch.path().join(stem);
    produced.set_extension("pdf");
    match fs::metadata(&produced) {
        Ok(meta) if meta.len() > 0 => {}
        _ => return Err(DelegateError::MissingOutput(produced)),
    }

    fs::rename(&produced, target)?;
    Ok(target.to_path_buf())
}
