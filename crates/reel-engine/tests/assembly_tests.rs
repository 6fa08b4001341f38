//! Assembly orchestration tests: stage sequencing, sibling isolation,
//! cancellation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;

use reel_engine::{AssemblyOrchestrator, AssemblySettings, EngineError, VariantStage};
use reel_models::{Fingerprint, FrameWindowMetrics, SourceId, VariantPlan, VideoSegment};
use reel_narrate::{
    FileNarrationSink, Narration, NarrationProvider, SynthesisError, SynthesisResult,
    VoiceSettings,
};

mockall::mock! {
    Provider {}

    #[async_trait]
    impl NarrationProvider for Provider {
        async fn synthesize(
            &self,
            text: &str,
            voice: &VoiceSettings,
        ) -> SynthesisResult<Narration>;
    }
}

/// Provider whose first `fail_first` calls fail, for isolation tests.
struct FlakyProvider {
    calls: AtomicUsize,
    fail_first: usize,
    duration_secs: f64,
}

#[async_trait]
impl NarrationProvider for FlakyProvider {
    async fn synthesize(&self, _text: &str, _voice: &VoiceSettings) -> SynthesisResult<Narration> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first {
            return Err(SynthesisError::ProviderUnavailable(
                "synthesis backend offline".to_string(),
            ));
        }
        Ok(Narration {
            audio: vec![0u8; 128],
            duration_secs: self.duration_secs,
        })
    }
}

fn segment(start: f64, duration: f64, score: f64, fingerprint: u64, tags: &[&str]) -> VideoSegment {
    VideoSegment {
        source_id: SourceId::from_string("src"),
        start_time: start,
        end_time: start + duration,
        metrics: FrameWindowMetrics {
            start_time: start,
            end_time: start + duration,
            motion: 0.5,
            variance: 0.5,
            blur: 0.5,
            contrast: 0.5,
            brightness: 0.5,
            fingerprint: Fingerprint(fingerprint),
        },
        composite_score: score,
        fingerprint: Fingerprint(fingerprint),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn fifteen_second_variant(index: usize) -> VariantPlan {
    VariantPlan::new(
        index,
        vec![
            segment(0.0, 5.0, 90.0, 0x00ff, &["dynamic"]),
            segment(10.0, 5.0, 85.0, 0xff00_0000, &["bright"]),
            segment(20.0, 5.0, 80.0, 0xff00_0000_0000_0000, &["static"]),
        ],
    )
    .unwrap()
}

fn extension_pool() -> Vec<VideoSegment> {
    vec![
        segment(30.0, 5.0, 75.0, 0x0f0f_0f0f_0f0f_0f0f, &["dynamic"]),
        segment(40.0, 5.0, 70.0, 0xf0f0_f0f0_f0f0_f0f0, &["dark"]),
    ]
}

fn settings() -> AssemblySettings {
    AssemblySettings {
        voice: VoiceSettings::default(),
        tolerance_secs: 1.0,
        hamming_threshold: 12,
        width: 1080,
        height: 1920,
        fps: 30.0,
    }
}

fn not_cancelled() -> watch::Receiver<bool> {
    let (_tx, rx) = watch::channel(false);
    rx
}

#[tokio::test]
async fn assemble_walks_every_stage_and_enriches_the_plan() {
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MockProvider::new();
    provider.expect_synthesize().times(1).returning(|_, _| {
        Ok(Narration {
            audio: vec![0u8; 256],
            duration_secs: 20.0,
        })
    });

    let orchestrator = AssemblyOrchestrator::new(
        Arc::new(provider),
        Arc::new(FileNarrationSink::new(dir.path())),
    );

    let assembled = orchestrator
        .assemble(
            "A dynamic opening. Then a bright scene. Finally a quiet close.",
            &[],
            fifteen_second_variant(0),
            &extension_pool(),
            &settings(),
            &not_cancelled(),
        )
        .await
        .unwrap();

    assert_eq!(
        assembled.stages,
        vec![
            VariantStage::Queued,
            VariantStage::SynthesizingNarration,
            VariantStage::ReconcilingDuration,
            VariantStage::MatchingSegments,
            VariantStage::BuildingRenderPlan,
            VariantStage::Ready,
        ]
    );

    // Reconciled toward the 20s narration by appending pool segments
    assert!(assembled.plan.total_duration >= 19.0 && assembled.plan.total_duration <= 21.0);

    // Narration artifacts are attached and on disk
    let audio_ref = assembled.plan.narration_audio.clone().unwrap();
    assert!(std::path::Path::new(&audio_ref).exists());
    assert!(!assembled.plan.caption_beats.is_empty());
    assert_eq!(assembled.render.narration_audio.as_deref(), Some(audio_ref.as_str()));

    // Every reconciled segment appears exactly once in the render ranges
    assert_eq!(assembled.render.ranges.len(), assembled.plan.segments.len());
}

#[tokio::test]
async fn sibling_variants_are_isolated_from_one_failure() {
    let dir = tempfile::tempdir().unwrap();

    let provider = FlakyProvider {
        calls: AtomicUsize::new(0),
        fail_first: 1,
        duration_secs: 15.0,
    };
    let orchestrator = Arc::new(AssemblyOrchestrator::new(
        Arc::new(provider),
        Arc::new(FileNarrationSink::new(dir.path())),
    ));

    let variants = vec![fifteen_second_variant(0), fifteen_second_variant(1)];
    let results = orchestrator
        .assemble_all(
            "A short narration.",
            &[],
            variants,
            Arc::new(extension_pool()),
            &settings(),
            &not_cancelled(),
        )
        .await;

    assert_eq!(results.len(), 2);
    let failures: Vec<_> = results.iter().filter(|r| r.is_err()).collect();
    let successes: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    assert_eq!(failures.len(), 1, "exactly one variant should fail");
    assert_eq!(successes.len(), 1, "the sibling must survive");

    match failures[0] {
        Err(EngineError::Synthesis(SynthesisError::ProviderUnavailable(_))) => {}
        other => panic!("unexpected failure: {other:?}"),
    }
}

#[tokio::test]
async fn cancellation_stops_before_synthesis() {
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MockProvider::new();
    provider.expect_synthesize().times(0);

    let orchestrator = AssemblyOrchestrator::new(
        Arc::new(provider),
        Arc::new(FileNarrationSink::new(dir.path())),
    );

    let (tx, rx) = watch::channel(true);
    drop(tx);

    let err = orchestrator
        .assemble(
            "Never synthesized.",
            &[],
            fifteen_second_variant(0),
            &extension_pool(),
            &settings(),
            &rx,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Cancelled));
}

#[tokio::test]
async fn keyword_hints_reorder_render_ranges() {
    let dir = tempfile::tempdir().unwrap();

    let mut provider = MockProvider::new();
    provider.expect_synthesize().times(1).returning(|_, _| {
        Ok(Narration {
            audio: vec![0u8; 64],
            duration_secs: 15.0,
        })
    });

    let orchestrator = AssemblyOrchestrator::new(
        Arc::new(provider),
        Arc::new(FileNarrationSink::new(dir.path())),
    );

    // "static" overlaps the third segment's tags; with the hint applied to
    // the first beat, that segment leads the render order.
    let assembled = orchestrator
        .assemble(
            "One single sentence.",
            &["static".to_string()],
            fifteen_second_variant(0),
            &[],
            &settings(),
            &not_cancelled(),
        )
        .await
        .unwrap();

    assert_eq!(assembled.render.ranges[0].start, 20.0);
    // The plan itself stays sorted by start time
    assert_eq!(assembled.plan.segments[0].start_time, 0.0);
}
