use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Compute device unavailable: {0}")]
    Device(String),

    #[error("Dispatch failed: {0}")]
    Dispatch(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Malformed scene file: {0}")]
    SceneFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

pub type Result<T> = std::result::Result<T, Error>;
