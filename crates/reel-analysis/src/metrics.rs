//! Windowed frame metrics extraction.
//!
//! One decode pass produces a lazy sequence of per-window quality signals.
//! Each window covers `window_size` seconds of sampled frames and advances
//! by `stride`, so consecutive windows may overlap. Signals are normalized
//! to `[0, 1]`; the window's representative (middle) frame is fingerprinted
//! for duplicate detection.

use std::collections::VecDeque;
use std::path::Path;

use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::debug;

use reel_media::{FrameStream, FrameStreamParams, GrayFrame, SourceInfo};
use reel_models::FrameWindowMetrics;

use crate::error::AnalysisResult;
use crate::fingerprint::fingerprint_frame;

/// Parameters for one extraction pass.
#[derive(Debug, Clone, Copy)]
pub struct ExtractorParams {
    /// Window length in seconds.
    pub window_size: f64,
    /// Window advance in seconds.
    pub stride: f64,
    /// Decode parameters for the underlying frame stream.
    pub stream: FrameStreamParams,
}

impl Default for ExtractorParams {
    fn default() -> Self {
        Self {
            window_size: 3.0,
            stride: 1.5,
            stream: FrameStreamParams::default(),
        }
    }
}

/// Computes windowed metrics from a source video.
#[derive(Debug, Clone, Default)]
pub struct MetricsExtractor {
    params: ExtractorParams,
}

impl MetricsExtractor {
    pub fn new(params: ExtractorParams) -> Self {
        Self { params }
    }

    /// Start one decode pass. The returned stream is lazy and finite;
    /// calling `extract` again starts a fresh pass.
    pub async fn extract(&self, path: impl AsRef<Path>) -> AnalysisResult<WindowMetricsStream> {
        let stream = FrameStream::open(path, self.params.stream).await?;
        let fps = self.params.stream.sample_fps;
        let window_frames = ((self.params.window_size * fps).round() as usize).max(2);
        let stride_frames = ((self.params.stride * fps).round() as usize).max(1);

        debug!(
            duration_s = format!("{:.2}", stream.source_info().duration),
            window_frames, stride_frames, "Starting metrics extraction"
        );

        Ok(WindowMetricsStream {
            stream,
            window_frames,
            stride_frames,
            buffer: VecDeque::new(),
            eof: false,
        })
    }
}

/// Lazy sequence of per-window metrics over one decode pass.
pub struct WindowMetricsStream {
    stream: FrameStream,
    window_frames: usize,
    stride_frames: usize,
    buffer: VecDeque<GrayFrame>,
    eof: bool,
}

impl WindowMetricsStream {
    /// Probed facts about the source being analyzed.
    pub fn source_info(&self) -> &SourceInfo {
        self.stream.source_info()
    }

    /// Pull the next window's metrics, or `None` once the source is spent.
    pub async fn next_window(&mut self) -> AnalysisResult<Option<FrameWindowMetrics>> {
        while !self.eof && self.buffer.len() < self.window_frames {
            match self.stream.next_frame().await? {
                Some(frame) => self.buffer.push_back(frame),
                None => self.eof = true,
            }
        }

        if self.buffer.len() < 2 {
            return Ok(None);
        }

        let frames: Vec<&GrayFrame> = self.buffer.iter().take(self.window_frames).collect();
        let metrics = compute_window_metrics(&frames, self.stream.params().sample_fps);

        if self.eof && self.buffer.len() < self.window_frames {
            // Tail remnant: emit once, then stop.
            self.buffer.clear();
        } else {
            for _ in 0..self.stride_frames {
                if self.buffer.pop_front().is_none() {
                    break;
                }
            }
        }

        Ok(Some(metrics))
    }

    /// Drain the whole pass into a vector.
    pub async fn collect_all(mut self) -> AnalysisResult<Vec<FrameWindowMetrics>> {
        let mut windows = Vec::new();
        while let Some(w) = self.next_window().await? {
            windows.push(w);
        }
        Ok(windows)
    }
}

/// Compute all signals for one window of frames.
///
/// Callers guarantee `frames.len() >= 2`.
pub(crate) fn compute_window_metrics(frames: &[&GrayFrame], sample_fps: f64) -> FrameWindowMetrics {
    let start_time = frames[0].timestamp;
    let end_time = frames[frames.len() - 1].timestamp + 1.0 / sample_fps;

    let motion = frames
        .windows(2)
        .map(|pair| mean_abs_diff(pair[0], pair[1]))
        .sum::<f64>()
        / (frames.len() - 1) as f64;

    let mut brightness = 0.0;
    let mut variance = 0.0;
    let mut contrast = 0.0;
    for frame in frames {
        let (mean, var) = luma_stats(frame);
        brightness += mean / 255.0;
        variance += var / (128.0 * 128.0);
        contrast += percentile_spread(frame) / 255.0;
    }
    let n = frames.len() as f64;
    brightness /= n;
    variance = (variance / n).min(1.0);
    contrast /= n;

    let blur = frames.iter().map(|f| edge_response(f)).sum::<f64>() / n;

    let representative = frames[frames.len() / 2];

    FrameWindowMetrics {
        start_time,
        end_time,
        motion: motion.clamp(0.0, 1.0),
        variance: variance.clamp(0.0, 1.0),
        blur: blur.clamp(0.0, 1.0),
        contrast: contrast.clamp(0.0, 1.0),
        brightness: brightness.clamp(0.0, 1.0),
        fingerprint: fingerprint_frame(representative),
    }
}

/// Mean absolute luma difference between two frames, normalized to `[0, 1]`.
fn mean_abs_diff(a: &GrayFrame, b: &GrayFrame) -> f64 {
    if a.data.len() != b.data.len() || a.data.is_empty() {
        return 0.0;
    }
    let total: u64 = a
        .data
        .iter()
        .zip(b.data.iter())
        .map(|(&x, &y)| (x as i16 - y as i16).unsigned_abs() as u64)
        .sum();
    total as f64 / (a.data.len() as f64 * 255.0)
}

/// Mean and variance of a frame's luma plane.
fn luma_stats(frame: &GrayFrame) -> (f64, f64) {
    let view = ArrayView2::from_shape(
        (frame.height as usize, frame.width as usize),
        frame.data.as_slice(),
    )
    .expect("frame buffer matches dimensions");

    let len = view.len() as f64;
    let mean = view.iter().map(|&v| v as f64).sum::<f64>() / len;
    let var = view
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / len;
    (mean, var)
}

/// Luma spread between the 5th and 95th percentile.
fn percentile_spread(frame: &GrayFrame) -> f64 {
    if frame.data.is_empty() {
        return 0.0;
    }
    let mut histogram = [0u32; 256];
    for &v in &frame.data {
        histogram[v as usize] += 1;
    }

    let total = frame.data.len() as u32;
    let p5_count = total / 20;
    let p95_count = total - p5_count;

    let mut cumulative = 0u32;
    let mut p5 = 0u8;
    let mut p95 = 255u8;
    let mut p5_found = false;
    for (value, &count) in histogram.iter().enumerate() {
        cumulative += count;
        if !p5_found && cumulative >= p5_count.max(1) {
            p5 = value as u8;
            p5_found = true;
        }
        if cumulative >= p95_count {
            p95 = value as u8;
            break;
        }
    }
    (p95.saturating_sub(p5)) as f64
}

/// Mean absolute 4-neighbor Laplacian response, scaled into `[0, 1]`.
/// Sharp frames respond strongly, defocused frames weakly.
fn edge_response(frame: &GrayFrame) -> f64 {
    let w = frame.width as usize;
    let h = frame.height as usize;
    if w < 3 || h < 3 {
        return 0.0;
    }
    let data = &frame.data;

    let total: f64 = (1..h - 1)
        .into_par_iter()
        .map(|y| {
            let mut row_sum = 0.0;
            for x in 1..w - 1 {
                let i = y * w + x;
                let lap = 4 * data[i] as i32
                    - data[i - 1] as i32
                    - data[i + 1] as i32
                    - data[i - w] as i32
                    - data[i + w] as i32;
                row_sum += lap.abs() as f64;
            }
            row_sum
        })
        .sum();

    let mean = total / (((h - 2) * (w - 2)) as f64 * 255.0);
    (mean * 2.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(value: u8, ts: f64) -> GrayFrame {
        GrayFrame {
            index: 0,
            timestamp: ts,
            width: 32,
            height: 18,
            data: vec![value; 32 * 18],
        }
    }

    fn checkerboard(ts: f64) -> GrayFrame {
        let data: Vec<u8> = (0..18)
            .flat_map(|y| (0..32).map(move |x| if (x + y) % 2 == 0 { 0 } else { 255 }))
            .collect();
        GrayFrame {
            index: 0,
            timestamp: ts,
            width: 32,
            height: 18,
            data,
        }
    }

    #[test]
    fn static_gray_window_scores_low_on_everything_but_brightness() {
        let a = flat(128, 0.0);
        let b = flat(128, 0.25);
        let m = compute_window_metrics(&[&a, &b], 4.0);

        assert_eq!(m.motion, 0.0);
        assert_eq!(m.variance, 0.0);
        assert_eq!(m.contrast, 0.0);
        assert_eq!(m.blur, 0.0);
        assert!((m.brightness - 128.0 / 255.0).abs() < 0.01);
        assert!(m.in_range());
        assert!((m.start_time - 0.0).abs() < 1e-9);
        assert!((m.end_time - 0.5).abs() < 1e-9);
    }

    #[test]
    fn flashing_window_scores_high_motion() {
        let a = flat(0, 0.0);
        let b = flat(255, 0.25);
        let m = compute_window_metrics(&[&a, &b], 4.0);
        assert!((m.motion - 1.0).abs() < 1e-9);
    }

    #[test]
    fn checkerboard_scores_high_detail() {
        let a = checkerboard(0.0);
        let b = checkerboard(0.25);
        let m = compute_window_metrics(&[&a, &b], 4.0);

        assert_eq!(m.motion, 0.0);
        assert!(m.variance > 0.9, "variance was {}", m.variance);
        assert!(m.blur > 0.9, "blur was {}", m.blur);
        assert!(m.contrast > 0.9, "contrast was {}", m.contrast);
        assert!(m.in_range());
    }
}
