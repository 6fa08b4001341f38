//! Final render of an assembled plan.

use std::path::Path;

use tracing::info;

use reel_models::{format_timestamp, RenderPlan};

use crate::command::{FfmpegInvocation, FfmpegRunner, RenderProgress};
use crate::error::{MediaError, MediaResult};

/// Build the trim/concat filter graph for a plan's ranges.
fn build_filter_graph(plan: &RenderPlan) -> String {
    let mut graph = String::new();

    for (i, range) in plan.ranges.iter().enumerate() {
        graph.push_str(&format!(
            "[0:v]trim=start={:.3}:end={:.3},setpts=PTS-STARTPTS,\
             scale={}:{}:force_original_aspect_ratio=increase,crop={}:{},fps={}[v{}];",
            range.start, range.end, plan.width, plan.height, plan.width, plan.height, plan.fps, i
        ));
    }

    for i in 0..plan.ranges.len() {
        graph.push_str(&format!("[v{}]", i));
    }
    graph.push_str(&format!("concat=n={}:v=1:a=0[vout]", plan.ranges.len()));

    graph
}

/// Build the full argument list for rendering `plan` from `source` into
/// `output`, muxing narration audio when the plan carries one.
pub fn build_render_args(
    plan: &RenderPlan,
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> Vec<String> {
    let mut invocation = FfmpegInvocation::new().report_progress().input(source.as_ref());

    if let Some(audio) = &plan.narration_audio {
        invocation = invocation.input(audio);
    }

    invocation = invocation
        .filter_complex(build_filter_graph(plan))
        .output_flags(["-map", "[vout]"]);

    if plan.narration_audio.is_some() {
        invocation = invocation.output_flags(["-map", "1:a", "-c:a", "aac", "-shortest"]);
    }

    invocation
        .output_flags(["-c:v", "libx264", "-preset", "veryfast", "-crf", "20"])
        .output_flags(["-movflags", "+faststart"])
        .build(output.as_ref())
}

/// Render a plan to `output`, reporting encode progress as a fraction of
/// the plan's total duration.
pub async fn render_plan<F>(
    runner: &FfmpegRunner,
    plan: &RenderPlan,
    source: impl AsRef<Path>,
    output: impl AsRef<Path>,
    on_progress: F,
) -> MediaResult<()>
where
    F: Fn(f64) + Send + 'static,
{
    if plan.ranges.is_empty() {
        return Err(MediaError::render_failed(
            "render plan has no ranges",
            None,
            None,
        ));
    }

    let total_ms = (plan.total_duration() * 1000.0).max(1.0);
    let args = build_render_args(plan, source.as_ref(), output.as_ref());

    info!(
        variant = plan.variant_index,
        ranges = plan.ranges.len(),
        duration = %format_timestamp(plan.total_duration()),
        "Rendering variant"
    );

    runner
        .run_with_progress(args, move |p: RenderProgress| {
            let fraction = (p.out_time_ms as f64 / total_ms).clamp(0.0, 1.0);
            on_progress(fraction);
        })
        .await
}
