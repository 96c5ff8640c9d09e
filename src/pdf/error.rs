use thiserror::Error;

pub type Result<T> = std::result::Result<T, ComposeError>;

/// Errors raised while loading sources and assembling output documents.
#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A named source failed; wraps the underlying cause.
    #[error("Failed to process {name}: {source}")]
    Source {
        name: String,
        #[source]
        source: Box<ComposeError>,
    },

    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Page index {index} is out of range ({count} pages)")]
    PageOutOfRange { index: usize, count: usize },

    #[error("Object {0:?} not found")]
    MissingObject(lopdf::ObjectId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ComposeError {
    pub fn for_source(name: impl Into<String>, err: ComposeError) -> Self {
        ComposeError::Source {
            name: name.into(),
            source: Box::new(err),
        }
    }
}
