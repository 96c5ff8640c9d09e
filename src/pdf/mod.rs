pub mod compose;
pub mod document;
pub mod embed;
pub mod error;
#[cfg(test)]
pub mod testing;
pub mod tools;

pub use compose::merge_sources;
pub use document::PdfDocument;
pub use error::ComposeError;
