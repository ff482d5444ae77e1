use gv_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EditorError>;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("no image selected")]
    NoImage,

    #[error("AOI snapshot error: {0}")]
    Snapshot(String),
}

impl From<rmp_serde::encode::Error> for EditorError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        EditorError::Snapshot(format!("encode: {err}"))
    }
}

impl From<rmp_serde::decode::Error> for EditorError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        EditorError::Snapshot(format!("decode: {err}"))
    }
}
