//! FFmpeg child process management.
//!
//! A [`Pipeline`] is an ffmpeg process fed raw bytes on stdin. Closing
//! stdin lets ffmpeg flush and finalize the container; if it hangs, it is
//! interrupted and finally killed.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long ffmpeg gets to finalize after stdin closes.
const FINISH_TIMEOUT: Duration = Duration::from_secs(10);
/// How long ffmpeg gets to exit after SIGINT before it is killed.
const INTERRUPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Errors that can occur during pipeline operations
#[derive(Debug)]
pub enum PipelineError {
    /// FFmpeg executable not found
    FfmpegNotFound(String),
    /// Failed to spawn FFmpeg process
    SpawnFailed(std::io::Error),
    /// FFmpeg process exited with non-zero status
    ProcessFailed { exit_code: Option<i32>, stderr: String },
    /// Writing after stdin was closed, or ffmpeg went away mid-write
    StdinClosed,
    /// I/O error during pipeline operation
    IoError(std::io::Error),
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::FfmpegNotFound(program) => {
                write!(
                    f,
                    "FFmpeg not found ('{}'). Install it (e.g. `brew install ffmpeg` or `apt install ffmpeg`) or set video.ffmpeg in the config file",
                    program
                )
            }
            PipelineError::SpawnFailed(e) => write!(f, "Failed to spawn FFmpeg: {}", e),
            PipelineError::ProcessFailed { exit_code, stderr } => {
                write!(f, "FFmpeg exited with code {:?}\n{}", exit_code, stderr)
            }
            PipelineError::StdinClosed => write!(f, "FFmpeg input is closed"),
            PipelineError::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::SpawnFailed(e) | PipelineError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

/// A running ffmpeg process reading from stdin.
pub struct Pipeline {
    child: Child,
    stdin: Option<ChildStdin>,
    /// Handle for the stderr reader thread
    stderr_thread: Option<JoinHandle<Vec<String>>>,
}

impl Pipeline {
    /// Spawn `program` with `args`, stdin piped, stderr collected.
    pub fn spawn(program: &str, args: &[String]) -> Result<Self, PipelineError> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PipelineError::FfmpegNotFound(program.to_string())
                } else {
                    PipelineError::SpawnFailed(e)
                }
            })?;

        let stdin = child.stdin.take();
        let stderr_thread = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let reader = BufReader::new(stderr);
                let mut lines = Vec::new();
                for line in reader.lines() {
                    match line {
                        Ok(l) => {
                            log::debug!("[ffmpeg] {}", l);
                            lines.push(l);
                        }
                        Err(_) => break,
                    }
                }
                lines
            })
        });

        log::debug!("Spawned {} (pid {})", program, child.id());
        Ok(Pipeline {
            child,
            stdin,
            stderr_thread,
        })
    }

    /// Write bytes to ffmpeg's stdin.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), PipelineError> {
        let stdin = self.stdin.as_mut().ok_or(PipelineError::StdinClosed)?;
        stdin.write_all(bytes).map_err(|e| {
            if e.kind() == std::io::ErrorKind::BrokenPipe {
                PipelineError::StdinClosed
            } else {
                PipelineError::IoError(e)
            }
        })
    }

    /// Check if the process is still running.
    pub fn is_running(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Close stdin and wait for ffmpeg to finalize its output.
    ///
    /// Falls back to [`Pipeline::shutdown`] if ffmpeg does not exit in time.
    /// A non-zero exit is reported with ffmpeg's stderr.
    pub fn finish(&mut self) -> Result<ExitStatus, PipelineError> {
        if let Some(mut stdin) = self.stdin.take() {
            let _ = stdin.flush();
        }

        let status = match wait_timeout(&mut self.child, FINISH_TIMEOUT)? {
            Some(status) => status,
            None => {
                log::warn!("FFmpeg did not finish within {:?}, interrupting", FINISH_TIMEOUT);
                self.shutdown()?
            }
        };

        if status.success() {
            Ok(status)
        } else {
            Err(PipelineError::ProcessFailed {
                exit_code: status.code(),
                stderr: self.take_stderr_output().join("\n"),
            })
        }
    }

    /// Interrupt ffmpeg, escalating to kill.
    ///
    /// This sends SIGINT (so ffmpeg still writes its trailer) and waits up to
    /// two seconds before SIGKILL.
    pub fn shutdown(&mut self) -> Result<ExitStatus, PipelineError> {
        self.stdin = None;

        #[cfg(unix)]
        {
            let pid = self.child.id() as i32;
            // SAFETY: pid belongs to our own, not yet reaped, child process.
            unsafe {
                libc::kill(pid, libc::SIGINT);
            }
        }

        #[cfg(not(unix))]
        {
            let _ = self.child.kill();
        }

        match wait_timeout(&mut self.child, INTERRUPT_TIMEOUT)? {
            Some(status) => Ok(status),
            None => {
                let _ = self.child.kill();
                self.child.wait().map_err(PipelineError::IoError)
            }
        }
    }

    /// Get the collected stderr output after the process has finished.
    pub fn take_stderr_output(&mut self) -> Vec<String> {
        self.stderr_thread
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if self.is_running() {
            let _ = self.shutdown();
        }
    }
}

fn wait_timeout(child: &mut Child, timeout: Duration) -> Result<Option<ExitStatus>, PipelineError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) if start.elapsed() > timeout => return Ok(None),
            Ok(None) => thread::sleep(Duration::from_millis(20)),
            Err(e) => return Err(PipelineError::IoError(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_not_found() {
        let result = Pipeline::spawn("definitely-not-ffmpeg-xyz", &[]);
        match result {
            Err(PipelineError::FfmpegNotFound(program)) => {
                assert_eq!(program, "definitely-not-ffmpeg-xyz")
            }
            Err(other) => panic!("Expected FfmpegNotFound, got {:?}", other),
            Ok(_) => panic!("Expected FfmpegNotFound, got a running pipeline"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_finish_closes_stdin_and_waits() {
        // `cat` exits once its stdin closes, like ffmpeg reading `-i -`.
        let mut pipeline = Pipeline::spawn("cat", &[]).unwrap();
        pipeline.write(b"frame bytes").unwrap();
        let status = pipeline.finish().unwrap();
        assert!(status.success());
        assert!(matches!(pipeline.write(b"late"), Err(PipelineError::StdinClosed)));
    }

    #[cfg(unix)]
    #[test]
    fn test_finish_reports_failure_with_stderr() {
        let args = vec!["-c".to_string(), "echo broken >&2; exit 3".to_string()];
        let mut pipeline = Pipeline::spawn("sh", &args).unwrap();
        match pipeline.finish() {
            Err(PipelineError::ProcessFailed { exit_code, stderr }) => {
                assert_eq!(exit_code, Some(3));
                assert!(stderr.contains("broken"));
            }
            other => panic!("Expected ProcessFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_pipeline_error_display() {
        let msg = format!("{}", PipelineError::FfmpegNotFound("ffmpeg".to_string()));
        assert!(msg.contains("FFmpeg not found"));
        assert!(msg.contains("brew install ffmpeg"));

        let err = PipelineError::ProcessFailed {
            exit_code: Some(1),
            stderr: "Error message".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1"));
        assert!(msg.contains("Error message"));
    }
}
