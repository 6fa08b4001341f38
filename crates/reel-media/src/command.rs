//! FFmpeg invocation builder and runner.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// An FFmpeg command line under construction.
///
/// Holds the argument list in three sections: global flags, per-input
/// arguments with their inputs, and output arguments ending in the output
/// path. Rendering and frame decoding both build on this.
#[derive(Debug, Clone, Default)]
pub struct FfmpegInvocation {
    global: Vec<String>,
    inputs: Vec<String>,
    output: Vec<String>,
}

impl FfmpegInvocation {
    /// Start a new invocation with `-y -v error`.
    pub fn new() -> Self {
        Self {
            global: vec!["-y".into(), "-v".into(), "error".into()],
            inputs: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Append an argument that precedes the next input.
    pub fn input_flag(mut self, arg: impl Into<String>) -> Self {
        self.inputs.push(arg.into());
        self
    }

    /// Append an input file.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push("-i".into());
        self.inputs
            .push(path.into().to_string_lossy().into_owned());
        self
    }

    /// Append an output-side argument.
    pub fn output_flag(mut self, arg: impl Into<String>) -> Self {
        self.output.push(arg.into());
        self
    }

    /// Append several output-side arguments.
    pub fn output_flags<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set a filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_flag("-filter_complex").output_flag(filter)
    }

    /// Request `-progress pipe:2` key/value reporting on stderr.
    pub fn report_progress(mut self) -> Self {
        self.global.push("-progress".into());
        self.global.push("pipe:2".into());
        self
    }

    /// Terminate with the output path and collect the full argument list.
    pub fn build(mut self, output: impl Into<PathBuf>) -> Vec<String> {
        let mut args = self.global;
        args.append(&mut self.inputs);
        args.append(&mut self.output);
        args.push(output.into().to_string_lossy().into_owned());
        args
    }

    /// Collect the argument list for a pipe-output invocation.
    pub fn build_piped(mut self) -> Vec<String> {
        let mut args = self.global;
        args.append(&mut self.inputs);
        args.append(&mut self.output);
        args.push("pipe:1".into());
        args
    }
}

/// Progress snapshot parsed from FFmpeg's `-progress` stream.
#[derive(Debug, Clone, Default)]
pub struct RenderProgress {
    /// Output timestamp in milliseconds.
    pub out_time_ms: i64,
    /// Frames written so far.
    pub frame: u64,
    /// Current encode speed relative to realtime.
    pub speed: f64,
    /// True once FFmpeg reported `progress=end`.
    pub is_complete: bool,
}

/// Runs FFmpeg invocations with cancellation and timeout.
pub struct FfmpegRunner {
    cancel_rx: Option<watch::Receiver<bool>>,
    timeout_secs: Option<u64>,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self {
            cancel_rx: None,
            timeout_secs: None,
        }
    }

    /// Attach a cancellation signal. When the watched value flips to true,
    /// the running process is killed and `Cancelled` is returned.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Kill the process and fail after `secs` seconds.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run to completion, discarding progress.
    pub async fn run(&self, args: Vec<String>) -> MediaResult<()> {
        self.run_with_progress(args, |_| {}).await
    }

    /// Run to completion, invoking `on_progress` for each progress block.
    pub async fn run_with_progress<F>(&self, args: Vec<String>, on_progress: F) -> MediaResult<()>
    where
        F: Fn(RenderProgress) + Send + 'static,
    {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
        debug!("Running ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut snapshot = RenderProgress::default();
            let mut tail: Vec<String> = Vec::new();
            let mut lines = BufReader::new(stderr).lines();

            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(progress) = parse_progress_line(&line, &mut snapshot) {
                    on_progress(progress);
                } else if !line.trim().is_empty() {
                    // Non-progress stderr output is diagnostic; keep a bounded tail
                    // for failure classification.
                    if tail.len() >= 40 {
                        tail.remove(0);
                    }
                    tail.push(line);
                }
            }
            tail.join("\n")
        });

        let wait_result = self.wait(&mut child).await;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        match wait_result {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(MediaError::render_failed(
                "FFmpeg exited with non-zero status",
                (!stderr_tail.is_empty()).then_some(stderr_tail),
                status.code(),
            )),
            Err(e) => Err(e),
        }
    }

    /// Wait for the child, honoring timeout and cancellation.
    async fn wait(&self, child: &mut Child) -> MediaResult<std::process::ExitStatus> {
        enum WaitOutcome {
            Exited(std::io::Result<std::process::ExitStatus>),
            Cancelled,
            TimedOut,
        }

        // The wait future borrows the child; resolve the race first, then
        // act on the child once the borrow is back.
        let outcome = {
            let timed_out = async {
                match self.timeout_secs {
                    Some(secs) => tokio::time::sleep(std::time::Duration::from_secs(secs)).await,
                    None => std::future::pending().await,
                }
            };

            let mut cancel_rx = self.cancel_rx.clone();
            let cancelled = async {
                match cancel_rx.as_mut() {
                    Some(rx) => {
                        while !*rx.borrow() {
                            if rx.changed().await.is_err() {
                                // Sender dropped; no cancellation will ever arrive.
                                std::future::pending::<()>().await;
                            }
                        }
                    }
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                status = child.wait() => WaitOutcome::Exited(status),
                _ = cancelled => WaitOutcome::Cancelled,
                _ = timed_out => WaitOutcome::TimedOut,
            }
        };

        match outcome {
            WaitOutcome::Exited(status) => Ok(status?),
            WaitOutcome::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
            WaitOutcome::TimedOut => {
                let secs = self.timeout_secs.unwrap_or_default();
                warn!("FFmpeg timed out after {}s, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
        }
    }
}

/// Parse one line of `-progress pipe:2` output into the running snapshot.
/// Returns a completed snapshot when a `progress=` terminator is seen.
fn parse_progress_line(line: &str, snapshot: &mut RenderProgress) -> Option<RenderProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        "out_time_us" | "out_time_ms" => {
            // Both keys carry microseconds in modern FFmpeg builds.
            if let Ok(us) = value.parse::<i64>() {
                snapshot.out_time_ms = us / 1000;
            }
            None
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                snapshot.frame = frame;
            }
            None
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                snapshot.speed = speed;
            }
            None
        }
        "progress" => {
            snapshot.is_complete = value == "end";
            Some(snapshot.clone())
        }
        _ => None,
    }
}

/// Check that FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check that FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
