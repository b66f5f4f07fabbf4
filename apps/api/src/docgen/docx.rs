//! DOCX rendering of a standardized CV.

use std::io::Cursor;

use docx_rs::{AlignmentType, Docx, Paragraph, Run};

use crate::docgen::DocgenError;
use crate::standardize::StandardizedCv;

pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// Run sizes are half-points: 18pt title, 13pt headings, 11pt body.
const TITLE_SIZE: usize = 36;
const HEADING_SIZE: usize = 26;
const BODY_SIZE: usize = 22;

/// How the document is being rendered.
///
/// `Preview` carries synthesized placeholder scores and stamps the document
/// as an estimate; it is used for ad-hoc "show me what this would look like"
/// requests that have not gone through an optimization job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Standard,
    Preview {
        ats_score: u8,
        improved_ats_score: u8,
    },
}

/// Non-content inputs to document generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMeta {
    pub source_file_name: String,
    pub mode: RenderMode,
}

/// Renders the standardized CV as a DOCX.
///
/// Deterministic in `Standard` mode: identical inputs produce byte-identical
/// artifacts. An empty structure still renders (title page only), so callers
/// with degenerate optimizer output get a valid document rather than an error.
pub fn generate_docx(cv: &StandardizedCv, meta: &DocumentMeta) -> Result<Vec<u8>, DocgenError> {
    let mut doc = Docx::new().add_paragraph(
        Paragraph::new()
            .align(AlignmentType::Center)
            .add_run(Run::new().add_text(document_title(&meta.source_file_name)).size(TITLE_SIZE).bold()),
    );

    if let RenderMode::Preview {
        ats_score,
        improved_ats_score,
    } = meta.mode
    {
        doc = doc.add_paragraph(
            Paragraph::new().align(AlignmentType::Center).add_run(
                Run::new()
                    .add_text(format!(
                        "Estimated ATS score: {ats_score} now, {improved_ats_score} after optimization (estimate only)"
                    ))
                    .size(BODY_SIZE)
                    .italic(),
            ),
        );
    }

    for section in &cv.sections {
        doc = doc.add_paragraph(
            Paragraph::new().add_run(
                Run::new()
                    .add_text(section.heading.as_str())
                    .size(HEADING_SIZE)
                    .bold(),
            ),
        );
        for line in &section.lines {
            doc = doc.add_paragraph(
                Paragraph::new().add_run(Run::new().add_text(line.as_str()).size(BODY_SIZE)),
            );
        }
    }

    let mut cursor = Cursor::new(Vec::new());
    doc.build()
        .pack(&mut cursor)
        .map_err(|e| DocgenError::Pack(e.to_string()))?;
    Ok(cursor.into_inner())
}

fn document_title(source_file_name: &str) -> String {
    std::path::Path::new(source_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.replace(['_', '-'], " "))
        .unwrap_or_else(|| "Curriculum Vitae".to_string())
}
