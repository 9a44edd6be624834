//! Error types for the texture packer.

use thiserror::Error;

/// Result type alias using FastpackError.
pub type Result<T> = std::result::Result<T, FastpackError>;

/// Main error type for discovery and atlas building.
#[derive(Error, Debug)]
pub enum FastpackError {
    /// Failed to read or parse a ZIP scene bundle.
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Failed to parse JSON data.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failed to read, encode or process an image.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rectangle packer could not place every UV island in the unit square.
    #[error("Could not pack {islands} UV islands into the unit square")]
    Packing { islands: usize },

    /// The islands need more surface than the atlas can hold.
    #[error("Required atlas surface {required:.4} exceeds the available {available:.4}")]
    Oversize { required: f64, available: f64 },

    /// A material graph cannot be resolved (missing output, dangling link, unknown UV map).
    #[error("Graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// Object not present in the scene.
    #[error("Unknown object: {0}")]
    UnknownObject(String),

    /// Material not present in the scene.
    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    /// Image not present in the scene.
    #[error("Unknown image: {0}")]
    UnknownImage(String),

    /// Socket label not known to the session.
    #[error("Unknown socket: {0}")]
    UnknownSocket(String),

    /// The build was cancelled before committing.
    #[error("Build cancelled")]
    Cancelled,
}
