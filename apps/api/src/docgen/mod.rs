//! Document generation — standardized CV structure to downloadable artifacts.
//!
//! The primary artifact is a DOCX built with `docx-rs`; its generation is
//! deterministic, so identical standardized input yields byte-identical
//! output. The HTML preview is a secondary, best-effort rendition whose
//! failure never fails the primary artifact.

use thiserror::Error;

pub mod docx;
pub mod preview;

pub use docx::{generate_docx, DocumentMeta, RenderMode, DOCX_CONTENT_TYPE};
pub use preview::{placeholder_scores, render_preview_html};

#[derive(Debug, Error)]
pub enum DocgenError {
    #[error("nothing to render: the standardized CV has no sections")]
    Empty,

    #[error("failed to package document: {0}")]
    Pack(String),
}
