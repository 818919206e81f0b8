//! Ordering, validation and concatenation of per-slide clips.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use tracing::info;

use crate::adapters::MediaEncoder;
use crate::domain::ArtifactRef;

/// Name of the merged lecture inside the work directory
pub const FINAL_FILE_NAME: &str = "final_lecture.mp4";

static SLIDE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"slide(\d+)").expect("valid slide number regex"));

/// Fatal problems with the merge input or the encoder
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("No slide clips to merge")]
    NothingToMerge,

    #[error("Clip name carries no slide number: {0}")]
    MalformedArtifactName(String),

    #[error("Slide number {number} appears more than once ({first} and {second})")]
    DuplicateSlideNumber {
        number: usize,
        first: String,
        second: String,
    },

    #[error("Encoder failed to concatenate clips: {0}")]
    Encoder(String),
}

/// 1-based slide number embedded in a clip's file name (`slide<N>`)
pub fn slide_number(artifact: &ArtifactRef) -> Result<usize, MergeError> {
    let name = artifact.file_name();
    let number = SLIDE_NUMBER
        .captures(&name)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok());
    number.ok_or(MergeError::MalformedArtifactName(name))
}

/// Sort clips by slide number, rejecting empty, malformed and duplicate input
pub fn order_artifacts(artifacts: &[ArtifactRef]) -> Result<Vec<ArtifactRef>, MergeError> {
    if artifacts.is_empty() {
        return Err(MergeError::NothingToMerge);
    }

    let mut numbered = artifacts
        .iter()
        .map(|a| slide_number(a).map(|n| (n, a.clone())))
        .collect::<Result<Vec<_>, _>>()?;
    numbered.sort_by_key(|(n, _)| *n);

    for pair in numbered.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(MergeError::DuplicateSlideNumber {
                number: pair[0].0,
                first: pair[0].1.to_string(),
                second: pair[1].1.to_string(),
            });
        }
    }

    Ok(numbered.into_iter().map(|(_, a)| a).collect())
}

/// Order the clips and have the encoder concatenate them into `work_dir/final_lecture.mp4`
pub async fn merge(
    artifacts: &[ArtifactRef],
    encoder: &dyn MediaEncoder,
    work_dir: &Path,
) -> Result<ArtifactRef, MergeError> {
    let ordered = order_artifacts(artifacts)?;
    let output = work_dir.join(FINAL_FILE_NAME);

    info!(clips = ordered.len(), output = %output.display(), "Merging lecture");
    encoder
        .concat(&ordered, &output)
        .await
        .map_err(|e| MergeError::Encoder(format!("{:#}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(names: &[&str]) -> Vec<ArtifactRef> {
        names.iter().map(|n| ArtifactRef::from(*n)).collect()
    }

    #[test]
    fn test_orders_by_slide_number() {
        let ordered = order_artifacts(&refs(&[
            "/w/slide3_lecture.mp4",
            "/w/slide1_lecture.mp4",
            "/w/slide2_lecture.mp4",
        ]))
        .unwrap();
        let names: Vec<String> = ordered.iter().map(|a| a.file_name()).collect();
        assert_eq!(names, vec!["slide1_lecture.mp4", "slide2_lecture.mp4", "slide3_lecture.mp4"]);
    }

    #[test]
    fn test_numeric_not_lexical_order() {
        let ordered = order_artifacts(&refs(&["slide10_lecture.mp4", "slide9_lecture.mp4"])).unwrap();
        assert_eq!(ordered[0].file_name(), "slide9_lecture.mp4");
    }

    #[test]
    fn test_slide_number_from_file_name() {
        assert_eq!(slide_number(&ArtifactRef::from("/runs/slide12/slide7_lecture.mp4")).unwrap(), 7);
        assert_eq!(slide_number(&ArtifactRef::from("slide1_lecture.mp4")).unwrap(), 1);
        assert!(matches!(
            slide_number(&ArtifactRef::from("lecture.mp4")),
            Err(MergeError::MalformedArtifactName(name)) if name == "lecture.mp4"
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(order_artifacts(&[]), Err(MergeError::NothingToMerge)));
    }

    #[test]
    fn test_rejects_malformed_name() {
        let err = order_artifacts(&refs(&["slide1_lecture.mp4", "intro.mp4"])).unwrap_err();
        assert!(matches!(err, MergeError::MalformedArtifactName(name) if name == "intro.mp4"));
    }

    #[test]
    fn test_rejects_duplicate_numbers() {
        let err = order_artifacts(&refs(&["a/slide2_lecture.mp4", "b/slide2_lecture.mp4"])).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateSlideNumber { number: 2, .. }));
    }
}
