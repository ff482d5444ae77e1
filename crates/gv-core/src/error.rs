use crate::id::{AoiId, ImageId, PersonId};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// AOI bounds are empty, inverted, or not finite. Never enters a registry.
    #[error("invalid AOI region: left={left}, top={top}, right={right}, bottom={bottom}")]
    InvalidRegion {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },

    #[error("no {id} on image {image}")]
    UnknownAoi { image: ImageId, id: AoiId },

    #[error("{id} already exists on image {image}")]
    DuplicateAoi { image: ImageId, id: AoiId },

    #[error("unknown image {0}")]
    UnknownImage(ImageId),

    #[error("scanpath of {person} has two points at time {time}")]
    DuplicateTimestamp { person: PersonId, time: f64 },

    #[error("gaze point of {person} has a non-finite coordinate or timestamp")]
    InvalidPoint { person: PersonId },

    /// The AOI membership and the scanpath data disagree.
    #[error("transition matrix build failed: {0}")]
    MatrixBuild(String),

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
}
