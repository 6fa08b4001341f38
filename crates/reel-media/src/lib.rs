//! FFmpeg CLI plumbing for the Reelcraft generation core.
//!
//! This crate wraps the external media toolkit (FFmpeg/FFprobe) behind
//! narrow async interfaces: probing source files, streaming decoded
//! grayscale frames for analysis, and rendering assembled plans. The
//! toolkit's binaries are located via `which`; their process lifecycles are
//! owned only for the duration of one invocation.

pub mod command;
pub mod error;
pub mod frames;
pub mod probe;
pub mod render;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegInvocation, FfmpegRunner, RenderProgress};
pub use error::{MediaError, MediaResult};
pub use frames::{FrameStream, FrameStreamParams, GrayFrame};
pub use probe::{probe_source, SourceInfo};
pub use render::render_plan;
