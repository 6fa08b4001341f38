//! Source analysis pipeline: extract → score → dedup → select.

use std::path::Path;

use tracing::{debug, info};

use reel_analysis::{
    DuplicateFilter, ExtractorParams, MetricsExtractor, ScorerConfig, SegmentScorer,
    SegmentSelector, SelectionOutcome, SelectorConfig,
};
use reel_media::SourceInfo;
use reel_models::{FrameWindowMetrics, SourceId, VideoSegment};

use crate::config::EngineConfig;
use crate::coordinator::CancelSignal;
use crate::error::{EngineError, EngineResult};

/// Optional external per-window quality estimate in `[0, 100]`. Absence
/// of a provider (or of a hint for a given window) leaves the formula
/// score untouched.
pub trait VisionHintProvider: Send + Sync {
    fn score_hint(&self, window: &FrameWindowMetrics) -> Option<f64>;
}

/// A fully analyzed source: the de-duplicated candidate pool plus probe
/// facts.
#[derive(Debug, Clone)]
pub struct AnalyzedSource {
    pub source_id: SourceId,
    pub info: SourceInfo,
    pub candidates: Vec<VideoSegment>,
}

/// Runs the analysis stages over one source video.
///
/// Components are constructed once and injected; nothing here reaches for
/// process-global state.
pub struct GenerationPipeline {
    extractor: MetricsExtractor,
    scorer: SegmentScorer,
    dedup: DuplicateFilter,
    selector: SegmentSelector,
    hint_provider: Option<std::sync::Arc<dyn VisionHintProvider>>,
    config: EngineConfig,
}

impl GenerationPipeline {
    pub fn new(config: EngineConfig) -> Self {
        let extractor = MetricsExtractor::new(ExtractorParams {
            window_size: config.window_size,
            stride: config.stride,
            stream: config.frame_params(),
        });
        let scorer = SegmentScorer::new(ScorerConfig {
            hint_mix: config.hint_mix,
        });
        let dedup = DuplicateFilter::new(config.hamming_threshold);
        let selector = SegmentSelector::new(SelectorConfig::default());

        Self {
            extractor,
            scorer,
            dedup,
            selector,
            hint_provider: None,
            config,
        }
    }

    /// Attach an external vision-hint provider.
    pub fn with_hint_provider(
        mut self,
        provider: std::sync::Arc<dyn VisionHintProvider>,
    ) -> Self {
        self.hint_provider = Some(provider);
        self
    }

    /// Decode, score and de-duplicate one source into a candidate pool.
    ///
    /// `on_progress` receives a coarse 0-100 fraction of the decode pass;
    /// the cancellation signal is checked between windows.
    pub async fn analyze(
        &self,
        source_path: impl AsRef<Path>,
        source_id: &SourceId,
        cancel: &CancelSignal,
        mut on_progress: impl FnMut(u8),
    ) -> EngineResult<AnalyzedSource> {
        let mut stream = self.extractor.extract(source_path).await?;
        let info = stream.source_info().clone();
        let duration = info.duration.max(f64::EPSILON);

        let mut scored = Vec::new();
        while let Some(window) = stream.next_window().await? {
            if *cancel.borrow() {
                return Err(EngineError::Cancelled);
            }

            let hint = self
                .hint_provider
                .as_ref()
                .and_then(|p| p.score_hint(&window));
            scored.push(self.scorer.score(source_id, &window, hint)?);

            let fraction = (window.end_time / duration).clamp(0.0, 1.0);
            on_progress((fraction * 100.0) as u8);
        }

        debug!(windows = scored.len(), "Scoring pass complete");
        let candidates = self.dedup.filter(scored);
        info!(
            candidates = candidates.len(),
            duration_s = format!("{:.1}", info.duration),
            "Source analyzed"
        );

        Ok(AnalyzedSource {
            source_id: source_id.clone(),
            info,
            candidates,
        })
    }

    /// Select diversified variants from an analyzed candidate pool.
    pub fn select_variants(
        &self,
        candidates: &[VideoSegment],
        target_duration: f64,
        variant_count: usize,
    ) -> EngineResult<SelectionOutcome> {
        let tolerance = self.config.tolerance_for(target_duration);
        Ok(self
            .selector
            .select(candidates, target_duration, variant_count, tolerance)?)
    }
}
