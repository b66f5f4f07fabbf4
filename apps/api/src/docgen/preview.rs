//! Secondary rendition and preview-mode scoring.

use sha2::{Digest, Sha256};

use crate::docgen::DocgenError;
use crate::standardize::StandardizedCv;

/// Renders the on-screen HTML preview of a standardized CV.
///
/// This is the best-effort secondary rendition: the optimization job treats a
/// failure here as a degraded success (`previewUnavailable`), never as a job
/// failure.
pub fn render_preview_html(cv: &StandardizedCv) -> Result<String, DocgenError> {
    if cv.is_empty() {
        return Err(DocgenError::Empty);
    }

    let mut html = String::from("<article class=\"cv-preview\">\n");
    for section in &cv.sections {
        html.push_str(&format!("<h2>{}</h2>\n", escape(&section.heading)));
        for line in &section.lines {
            html.push_str(&format!("<p>{}</p>\n", escape(line)));
        }
    }
    html.push_str("</article>\n");
    Ok(html)
}

/// Placeholder before/after scores for preview mode.
///
/// Previews have not gone through an optimization job, so no real scores
/// exist. These are pseudo-scores derived from a content hash: stable for the
/// same text, but documented to callers as an estimate, not a computed score.
pub fn placeholder_scores(raw_text: &str) -> (u8, u8) {
    let digest = Sha256::digest(raw_text.trim().as_bytes());
    let before = 55 + digest[0] % 20;
    let after = (before + 12 + digest[1] % 9).min(98);
    (before, after)
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
