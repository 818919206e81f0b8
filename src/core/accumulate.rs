//! Folding one slide's outcome into the run state.

use tracing::{info, warn};

use crate::domain::{ArtifactRef, ArtifactResolver, PipelineRunState, ProgressObservation};

/// Record the clip produced (or not) for the slide at the cursor and advance.
///
/// A present, resolvable artifact is appended unless the same reference is
/// already recorded; anything else marks the slide failed. The cursor moves
/// by exactly one either way. Never fails.
pub fn accumulate(
    state: &mut PipelineRunState,
    artifact: Option<ArtifactRef>,
    resolver: &dyn ArtifactResolver,
) -> ProgressObservation {
    let slide = state.cursor();

    match artifact {
        Some(artifact) if resolver.is_resolvable(&artifact) => {
            if !state.contains_artifact(&artifact) {
                info!(slide = slide + 1, artifact = %artifact, "Slide completed");
                state.push_artifact(slide, artifact);
            }
        }
        Some(artifact) => {
            warn!(slide = slide + 1, artifact = %artifact, "Slide artifact missing or empty");
            state.push_failed(slide);
        }
        None => {
            warn!(slide = slide + 1, "Slide produced no artifact");
            state.push_failed(slide);
        }
    }

    state.advance();

    let progress = state.progress();
    info!(
        cursor = progress.cursor,
        total = progress.total,
        percent = progress.percent(),
        succeeded = progress.success_count,
        failed = progress.failed_count,
        "Progress"
    );
    progress
}
