//! End-to-end generation flow.
//!
//! One request: acquire the project lock, create a job, analyze the
//! source, select variants, optionally assemble them against a narration
//! script, and leave render plans for the media toolkit. Every component
//! is constructed once at startup and injected here.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use reel_media::{render_plan, FfmpegRunner};
use reel_models::{
    AssemblyWarning, JobId, ProfileId, ProjectId, RenderPlan, SourceId, VariantPlan,
};
use reel_narrate::{NarrationProvider, NarrationSink, VoiceSettings};
use reel_store::KeyValueStore;

use crate::assembly::{AssembledVariant, AssemblyOrchestrator, AssemblySettings};
use crate::config::EngineConfig;
use crate::coordinator::JobCoordinator;
use crate::error::EngineResult;
use crate::pipeline::{GenerationPipeline, VisionHintProvider};

/// One generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Local path of the source video.
    pub source_path: PathBuf,
    /// Identity of the source within the platform.
    pub source_id: SourceId,
    /// Project the generation belongs to.
    pub project_id: ProjectId,
    /// Tenant profile the generation runs under.
    pub profile_id: ProfileId,
    /// Desired output duration in seconds.
    pub target_duration: f64,
    /// How many variants to produce.
    pub variant_count: usize,
    /// Narration script; absent for manual (segments-only) generation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Keyword hints emphasized during beat matching.
    #[serde(default)]
    pub keyword_hints: Vec<String>,
    /// Voice passed to the synthesis provider.
    #[serde(default)]
    pub voice: VoiceSettings,
}

/// What a finished generation hands back to the caller.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub job_id: JobId,
    /// Final plans, one per produced variant.
    pub plans: Vec<VariantPlan>,
    /// Render hand-offs for the media toolkit, parallel to `plans`.
    pub renders: Vec<RenderPlan>,
    /// Non-fatal conditions encountered along the way.
    pub warnings: Vec<AssemblyWarning>,
    /// Per-variant failure messages from script-driven assembly.
    pub variant_failures: Vec<String>,
}

/// The generation core wired together.
pub struct GenerationService {
    config: EngineConfig,
    coordinator: Arc<JobCoordinator>,
    pipeline: Arc<GenerationPipeline>,
    orchestrator: Arc<AssemblyOrchestrator>,
}

impl GenerationService {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn NarrationProvider>,
        sink: Arc<dyn NarrationSink>,
    ) -> Self {
        let coordinator = Arc::new(JobCoordinator::new(store));
        let pipeline = Arc::new(GenerationPipeline::new(config.clone()));
        let orchestrator = Arc::new(AssemblyOrchestrator::new(provider, sink));

        Self {
            config,
            coordinator,
            pipeline,
            orchestrator,
        }
    }

    /// Attach an external vision-hint provider to the analysis pipeline.
    pub fn with_hint_provider(mut self, provider: Arc<dyn VisionHintProvider>) -> Self {
        let pipeline = GenerationPipeline::new(self.config.clone()).with_hint_provider(provider);
        self.pipeline = Arc::new(pipeline);
        self
    }

    /// The coordinator is the caller-facing job API: `create_job`,
    /// `get_job`, `update_progress`, `cancel_job`.
    pub fn coordinator(&self) -> &Arc<JobCoordinator> {
        &self.coordinator
    }

    /// Run one generation end to end under the project lock.
    pub async fn generate(&self, request: GenerationRequest) -> EngineResult<GenerationOutcome> {
        let lock = self
            .coordinator
            .acquire_project_lock(&request.project_id)
            .await;
        let job = self
            .coordinator
            .create_job(request.project_id.clone(), request.profile_id.clone())
            .await?;
        let job_id = job.id.clone();

        let coordinator = Arc::clone(&self.coordinator);
        let pipeline = Arc::clone(&self.pipeline);
        let orchestrator = Arc::clone(&self.orchestrator);
        let config = self.config.clone();
        let inner_job_id = job_id.clone();

        let outcome = self
            .coordinator
            .run_under_job(&job_id, lock, Some(config.job_timeout), |cancel| async move {
                let job_id = inner_job_id;

                coordinator
                    .update_progress(&job_id, 5, "analyzing source")
                    .await?;
                let analyzed = pipeline
                    .analyze(&request.source_path, &request.source_id, &cancel, |_| {})
                    .await?;

                coordinator
                    .update_progress(&job_id, 40, "selecting variants")
                    .await?;
                let selection = pipeline.select_variants(
                    &analyzed.candidates,
                    request.target_duration,
                    request.variant_count,
                )?;

                let mut warnings = Vec::new();
                if let Some(warning) = selection.warning.clone() {
                    warnings.push(warning);
                }

                let (plans, renders, variant_failures) = match &request.script {
                    Some(script) => {
                        coordinator
                            .update_progress(&job_id, 55, "assembling narrated variants")
                            .await?;

                        let settings = AssemblySettings {
                            voice: request.voice.clone(),
                            tolerance_secs: config.reconcile_tolerance,
                            hamming_threshold: config.hamming_threshold,
                            width: config.output_width,
                            height: config.output_height,
                            fps: config.output_fps,
                        };
                        let pool = Arc::new(analyzed.candidates.clone());
                        let results = orchestrator
                            .assemble_all(
                                script,
                                &request.keyword_hints,
                                selection.variants,
                                pool,
                                &settings,
                                &cancel,
                            )
                            .await;

                        let mut assembled: Vec<AssembledVariant> = Vec::new();
                        let mut failures = Vec::new();
                        let mut first_error = None;
                        for result in results {
                            match result {
                                Ok(variant) => assembled.push(variant),
                                Err(e) => {
                                    warn!(job_id = %job_id, error = %e, "Variant assembly failed");
                                    failures.push(e.to_string());
                                    if first_error.is_none() {
                                        first_error = Some(e);
                                    }
                                }
                            }
                        }

                        // Sibling isolation: the job fails only when no
                        // variant survived.
                        if assembled.is_empty() {
                            if let Some(e) = first_error {
                                return Err(e);
                            }
                        }

                        for variant in &assembled {
                            warnings.extend(variant.plan.warnings.iter().cloned());
                        }
                        let plans: Vec<VariantPlan> =
                            assembled.iter().map(|v| v.plan.clone()).collect();
                        let renders: Vec<RenderPlan> =
                            assembled.into_iter().map(|v| v.render).collect();
                        (plans, renders, failures)
                    }
                    None => {
                        let renders = selection
                            .variants
                            .iter()
                            .map(|plan| {
                                RenderPlan::from_variant(
                                    plan,
                                    config.output_width,
                                    config.output_height,
                                    config.output_fps,
                                )
                            })
                            .collect();
                        (selection.variants, renders, Vec::new())
                    }
                };

                if !warnings.is_empty() {
                    coordinator
                        .record_data(&job_id, "warnings", serde_json::to_value(&warnings)?)
                        .await?;
                }
                if !variant_failures.is_empty() {
                    coordinator
                        .record_data(
                            &job_id,
                            "variant_failures",
                            serde_json::to_value(&variant_failures)?,
                        )
                        .await?;
                }
                coordinator
                    .update_progress(&job_id, 90, "generation complete, plans ready")
                    .await?;

                Ok(GenerationOutcome {
                    job_id: job_id.clone(),
                    plans,
                    renders,
                    warnings,
                    variant_failures,
                })
            })
            .await?;

        Ok(outcome)
    }

    /// Execute one render plan through the media toolkit, feeding encode
    /// progress back into the job record.
    pub async fn render_to(
        &self,
        job_id: &JobId,
        plan: &RenderPlan,
        source: impl AsRef<std::path::Path>,
        output: impl AsRef<std::path::Path>,
    ) -> EngineResult<()> {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<u8>();

        let coordinator = Arc::clone(&self.coordinator);
        let progress_job = job_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(percent) = rx.recv().await {
                // A terminal job makes further updates invalid; stop quietly.
                if coordinator
                    .update_progress(&progress_job, percent.min(99), "rendering")
                    .await
                    .is_err()
                {
                    break;
                }
            }
        });

        let runner = FfmpegRunner::new().with_timeout(self.config.job_timeout.as_secs());
        let result = render_plan(&runner, plan, source, output, move |fraction| {
            let _ = tx.send((fraction * 100.0) as u8);
        })
        .await;

        let _ = forwarder.await;
        Ok(result?)
    }
}
