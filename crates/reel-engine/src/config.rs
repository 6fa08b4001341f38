//! Engine configuration.

use std::time::Duration;

use reel_media::FrameStreamParams;

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Frames sampled per second during analysis.
    pub sample_fps: f64,
    /// Analysis frame width in pixels.
    pub frame_width: u32,
    /// Analysis frame height in pixels.
    pub frame_height: u32,
    /// Candidate window length in seconds.
    pub window_size: f64,
    /// Window advance in seconds.
    pub stride: f64,
    /// Hamming threshold for duplicate detection.
    pub hamming_threshold: u32,
    /// Vision-hint blend fraction in `[0, 1]`.
    pub hint_mix: f64,
    /// Selection tolerance as a fraction of the target duration.
    pub selection_tolerance: f64,
    /// Narration reconciliation tolerance in seconds.
    pub reconcile_tolerance: f64,
    /// How many variants assemble concurrently within one job.
    pub max_concurrent_variants: usize,
    /// Wall-clock timeout for one generation job.
    pub job_timeout: Duration,
    /// Output dimensions and frame rate for render plans.
    pub output_width: u32,
    pub output_height: u32,
    pub output_fps: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_fps: 4.0,
            frame_width: 160,
            frame_height: 90,
            window_size: 3.0,
            stride: 1.5,
            hamming_threshold: 12,
            hint_mix: 0.3,
            selection_tolerance: 0.1,
            reconcile_tolerance: 1.0,
            max_concurrent_variants: 4,
            job_timeout: Duration::from_secs(1800),
            output_width: 1080,
            output_height: 1920,
            output_fps: 30.0,
        }
    }
}

impl EngineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            sample_fps: env_parse("REEL_SAMPLE_FPS", defaults.sample_fps),
            frame_width: env_parse("REEL_FRAME_WIDTH", defaults.frame_width),
            frame_height: env_parse("REEL_FRAME_HEIGHT", defaults.frame_height),
            window_size: env_parse("REEL_WINDOW_SIZE", defaults.window_size),
            stride: env_parse("REEL_STRIDE", defaults.stride),
            hamming_threshold: env_parse("REEL_HAMMING_THRESHOLD", defaults.hamming_threshold),
            hint_mix: env_parse("REEL_HINT_MIX", defaults.hint_mix),
            selection_tolerance: env_parse("REEL_SELECTION_TOLERANCE", defaults.selection_tolerance),
            reconcile_tolerance: env_parse("REEL_RECONCILE_TOLERANCE", defaults.reconcile_tolerance),
            max_concurrent_variants: env_parse(
                "REEL_MAX_CONCURRENT_VARIANTS",
                defaults.max_concurrent_variants,
            ),
            job_timeout: Duration::from_secs(env_parse("REEL_JOB_TIMEOUT", 1800)),
            output_width: env_parse("REEL_OUTPUT_WIDTH", defaults.output_width),
            output_height: env_parse("REEL_OUTPUT_HEIGHT", defaults.output_height),
            output_fps: env_parse("REEL_OUTPUT_FPS", defaults.output_fps),
        }
    }

    /// Frame stream parameters for analysis decoding.
    pub fn frame_params(&self) -> FrameStreamParams {
        FrameStreamParams {
            sample_fps: self.sample_fps,
            width: self.frame_width,
            height: self.frame_height,
        }
    }

    /// Absolute selection tolerance for a given target duration.
    pub fn tolerance_for(&self, target_duration: f64) -> f64 {
        target_duration * self.selection_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert!(config.stride <= config.window_size);
        assert!((0.0..=1.0).contains(&config.hint_mix));
        assert!((config.tolerance_for(15.0) - 1.5).abs() < 1e-9);
    }
}
