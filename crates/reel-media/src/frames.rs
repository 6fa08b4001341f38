//! Streaming grayscale frame decode for analysis.
//!
//! Frames are pulled from an FFmpeg child process emitting scaled
//! `rawvideo`/`gray` output over a pipe. One stream is one decode pass;
//! callers re-open to restart.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

use crate::command::FfmpegInvocation;
use crate::error::{MediaError, MediaResult};
use crate::probe::{probe_source, SourceInfo};

/// Sources shorter than this are rejected as empty.
const MIN_SOURCE_DURATION_SECS: f64 = 0.05;

/// Decode parameters for the analysis frame stream.
#[derive(Debug, Clone, Copy)]
pub struct FrameStreamParams {
    /// Frames sampled per second of source.
    pub sample_fps: f64,
    /// Decoded frame width in pixels.
    pub width: u32,
    /// Decoded frame height in pixels.
    pub height: u32,
}

impl Default for FrameStreamParams {
    fn default() -> Self {
        Self {
            sample_fps: 4.0,
            width: 160,
            height: 90,
        }
    }
}

/// One decoded grayscale frame.
#[derive(Debug, Clone)]
pub struct GrayFrame {
    /// Index within the sampled stream.
    pub index: u64,
    /// Timestamp in source seconds.
    pub timestamp: f64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major luma bytes, `width * height` long.
    pub data: Vec<u8>,
}

/// A lazy, finite, single-pass stream of decoded frames.
#[derive(Debug)]
pub struct FrameStream {
    path: PathBuf,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr_task: tokio::task::JoinHandle<String>,
    params: FrameStreamParams,
    info: SourceInfo,
    next_index: u64,
    finished: bool,
}

impl FrameStream {
    /// Probe the source and spawn the decode process.
    ///
    /// Fails with `DecodeFailed` when the container/codec cannot be opened
    /// and `EmptyVideo` when the probed duration is near zero.
    pub async fn open(path: impl AsRef<Path>, params: FrameStreamParams) -> MediaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let info = probe_source(&path).await?;

        if info.duration < MIN_SOURCE_DURATION_SECS {
            return Err(MediaError::EmptyVideo {
                path,
                duration: info.duration,
            });
        }

        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        let args = FfmpegInvocation::new()
            .input(&path)
            .output_flag("-vf")
            .output_flag(format!(
                "fps={},scale={}:{}",
                params.sample_fps, params.width, params.height
            ))
            .output_flag("-f")
            .output_flag("rawvideo")
            .output_flag("-pix_fmt")
            .output_flag("gray")
            .build_piped();

        debug!("Spawning decode: ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = BufReader::new(child.stdout.take().expect("stdout not captured"));
        let mut stderr = child.stderr.take().expect("stderr not captured");
        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = stderr.read_to_string(&mut buf).await;
            buf
        });

        Ok(Self {
            path,
            child,
            stdout,
            stderr_task,
            params,
            info,
            next_index: 0,
            finished: false,
        })
    }

    /// Probed facts about the source being decoded.
    pub fn source_info(&self) -> &SourceInfo {
        &self.info
    }

    /// Decode parameters this stream was opened with.
    pub fn params(&self) -> FrameStreamParams {
        self.params
    }

    /// Pull the next frame, or `None` at end of stream.
    ///
    /// A decode failure mid-stream surfaces as `DecodeFailed` carrying the
    /// process's stderr.
    pub async fn next_frame(&mut self) -> MediaResult<Option<GrayFrame>> {
        if self.finished {
            return Ok(None);
        }

        let frame_len = (self.params.width * self.params.height) as usize;
        let mut data = vec![0u8; frame_len];

        match self.stdout.read_exact(&mut data).await {
            Ok(_) => {
                let index = self.next_index;
                self.next_index += 1;
                Ok(Some(GrayFrame {
                    index,
                    timestamp: index as f64 / self.params.sample_fps,
                    width: self.params.width,
                    height: self.params.height,
                    data,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                self.finished = true;
                self.check_exit().await?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// After EOF, verify the decoder exited cleanly.
    async fn check_exit(&mut self) -> MediaResult<()> {
        let status = self.child.wait().await?;
        if status.success() {
            return Ok(());
        }

        let stderr = match (&mut self.stderr_task).await {
            Ok(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        };
        Err(MediaError::decode_failed(
            self.path.clone(),
            "decoder exited with non-zero status",
            stderr,
        ))
    }
}
