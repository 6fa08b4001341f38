//! Script-to-video assembly orchestration.
//!
//! Each variant moves through a sequential stage machine:
//! `Queued → SynthesizingNarration → ReconcilingDuration →
//! MatchingSegments → BuildingRenderPlan → Ready`, with `Failed` reachable
//! from every non-terminal stage. Sibling variants run as independent
//! tasks; one variant failing leaves the others untouched.

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use reel_analysis::{beats_from_script, extract_keywords, match_beats, reconcile};
use reel_models::{RenderPlan, RenderRange, VariantPlan, VideoSegment};
use reel_narrate::{NarrationProvider, NarrationSink, VoiceSettings};

use crate::coordinator::CancelSignal;
use crate::error::{EngineError, EngineResult};

/// Stage of one variant's assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantStage {
    Queued,
    SynthesizingNarration,
    ReconcilingDuration,
    MatchingSegments,
    BuildingRenderPlan,
    Ready,
    Failed,
}

impl VariantStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariantStage::Queued => "queued",
            VariantStage::SynthesizingNarration => "synthesizing_narration",
            VariantStage::ReconcilingDuration => "reconciling_duration",
            VariantStage::MatchingSegments => "matching_segments",
            VariantStage::BuildingRenderPlan => "building_render_plan",
            VariantStage::Ready => "ready",
            VariantStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VariantStage::Ready | VariantStage::Failed)
    }
}

/// Settings for one assembly pass.
#[derive(Debug, Clone)]
pub struct AssemblySettings {
    /// Voice passed to the synthesis provider.
    pub voice: VoiceSettings,
    /// Reconciliation tolerance in seconds.
    pub tolerance_secs: f64,
    /// Duplicate threshold used when extending plans.
    pub hamming_threshold: u32,
    /// Render plan output dimensions.
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// One variant assembled to readiness.
#[derive(Debug, Clone)]
pub struct AssembledVariant {
    /// The enriched plan: narration, captions, reconciled segments.
    pub plan: VariantPlan,
    /// The render hand-off, ranges ordered by narration beat matching.
    pub render: RenderPlan,
    /// Stages traversed, ending in `Ready`.
    pub stages: Vec<VariantStage>,
}

/// Sequences narration synthesis, reconciliation, beat matching and
/// render-plan construction per variant.
pub struct AssemblyOrchestrator {
    provider: Arc<dyn NarrationProvider>,
    sink: Arc<dyn NarrationSink>,
}

impl AssemblyOrchestrator {
    pub fn new(provider: Arc<dyn NarrationProvider>, sink: Arc<dyn NarrationSink>) -> Self {
        Self { provider, sink }
    }

    /// Assemble one variant. No retries happen here: a synthesis failure
    /// surfaces to the coordinator, which owns terminal job transitions.
    pub async fn assemble(
        &self,
        script_text: &str,
        keyword_hints: &[String],
        variant: VariantPlan,
        pool: &[VideoSegment],
        settings: &AssemblySettings,
        cancel: &CancelSignal,
    ) -> EngineResult<AssembledVariant> {
        let variant_index = variant.variant_index;
        let mut stages = vec![VariantStage::Queued];
        let mut advance = |stage: VariantStage| {
            debug!(variant = variant_index, stage = stage.as_str(), "Variant stage");
            stages.push(stage);
        };

        if *cancel.borrow() {
            return Err(EngineError::Cancelled);
        }

        advance(VariantStage::SynthesizingNarration);
        let narration = self
            .provider
            .synthesize(script_text, &settings.voice)
            .await?;
        let audio_ref = self.sink.write(variant_index, &narration).await?;

        if *cancel.borrow() {
            return Err(EngineError::Cancelled);
        }

        advance(VariantStage::ReconcilingDuration);
        let mut plan = reconcile(
            &variant,
            pool,
            narration.duration_secs,
            settings.tolerance_secs,
            settings.hamming_threshold,
        )?;
        if plan.is_under_filled() {
            warn!(
                variant = variant_index,
                "Candidate pool exhausted before narration duration was met"
            );
        }

        advance(VariantStage::MatchingSegments);
        let hints: BTreeSet<String> = keyword_hints
            .iter()
            .flat_map(|h| extract_keywords(h))
            .collect();
        let mut beats = beats_from_script(script_text, narration.duration_secs);
        for beat in &mut beats {
            beat.keywords.extend(hints.iter().cloned());
        }
        let matched = match_beats(&beats, &plan.segments);

        advance(VariantStage::BuildingRenderPlan);
        plan.narration_text = Some(script_text.to_string());
        plan.narration_audio = Some(audio_ref.clone());
        plan.caption_beats = beats;

        // Ranges follow narration beat order; segments the matcher did not
        // reach keep their playback order at the tail.
        let mut ranges: Vec<RenderRange> = matched
            .iter()
            .map(|(_, seg)| RenderRange {
                start: seg.start_time,
                end: seg.end_time,
            })
            .collect();
        for seg in &plan.segments {
            let already = ranges
                .iter()
                .any(|r| (r.start - seg.start_time).abs() < f64::EPSILON);
            if !already {
                ranges.push(RenderRange {
                    start: seg.start_time,
                    end: seg.end_time,
                });
            }
        }

        let render = RenderPlan {
            source_id: plan
                .segments
                .first()
                .map(|s| s.source_id.clone())
                .unwrap_or_default(),
            variant_index,
            ranges,
            narration_audio: Some(audio_ref),
            width: settings.width,
            height: settings.height,
            fps: settings.fps,
        };

        advance(VariantStage::Ready);
        info!(
            variant = variant_index,
            duration_s = format!("{:.2}", plan.total_duration),
            "Variant assembled"
        );

        Ok(AssembledVariant {
            plan,
            render,
            stages,
        })
    }

    /// Assemble sibling variants concurrently. Each variant's outcome is
    /// independent: failures are returned in place, never propagated
    /// across siblings.
    pub async fn assemble_all(
        self: Arc<Self>,
        script_text: &str,
        keyword_hints: &[String],
        variants: Vec<VariantPlan>,
        pool: Arc<Vec<VideoSegment>>,
        settings: &AssemblySettings,
        cancel: &CancelSignal,
    ) -> Vec<EngineResult<AssembledVariant>> {
        let tasks = variants.into_iter().map(|variant| {
            let orchestrator = Arc::clone(&self);
            let script = script_text.to_string();
            let hints = keyword_hints.to_vec();
            let pool = Arc::clone(&pool);
            let settings = settings.clone();
            let cancel = cancel.clone();

            tokio::spawn(async move {
                orchestrator
                    .assemble(&script, &hints, variant, &pool, &settings, &cancel)
                    .await
            })
        });

        join_all(tasks)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(result) => result,
                Err(e) => Err(EngineError::Internal(format!("variant task panicked: {e}"))),
            })
            .collect()
    }
}
