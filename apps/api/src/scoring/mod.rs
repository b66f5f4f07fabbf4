//! Score comparison — before/after ATS score delta, verdict, and next actions.
//!
//! Pure functions over two 0-100 scores. The recommended actions are chosen
//! by the band the after-score lands in, most impactful first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreVerdict {
    Improved,
    Unchanged,
    Declined,
}

impl ScoreVerdict {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreVerdict::Improved => "improved",
            ScoreVerdict::Unchanged => "unchanged",
            ScoreVerdict::Declined => "declined",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreComparison {
    pub delta: i16,
    pub verdict: ScoreVerdict,
    pub recommended_actions: Vec<String>,
}

/// Compares two ATS scores. Inputs above 100 are clamped before the delta is
/// taken, so the delta is always within [-100, 100].
pub fn compare_scores(before: u8, after: u8) -> ScoreComparison {
    let before = before.min(100);
    let after = after.min(100);
    let delta = i16::from(after) - i16::from(before);

    let verdict = if delta > 0 {
        ScoreVerdict::Improved
    } else if delta < 0 {
        ScoreVerdict::Declined
    } else {
        ScoreVerdict::Unchanged
    };

    ScoreComparison {
        delta,
        verdict,
        recommended_actions: recommended_actions(after, verdict),
    }
}

fn recommended_actions(after: u8, verdict: ScoreVerdict) -> Vec<String> {
    let band: &[&str] = match after {
        0..=49 => &[
            "Restructure the CV around the roles you are targeting",
            "Add measurable outcomes to every experience entry",
            "Mirror the key terms the job description uses",
        ],
        50..=69 => &[
            "Quantify your most recent achievements",
            "Tighten the profile summary toward the target role",
            "Close the remaining keyword gaps from the job description",
        ],
        70..=84 => &[
            "Polish formatting consistency across sections",
            "Trim content older than ten years",
        ],
        _ => &[
            "Tailor the profile summary for each application",
            "Keep certifications and skills current",
        ],
    };

    let mut actions: Vec<String> = band.iter().map(|s| s.to_string()).collect();
    if verdict == ScoreVerdict::Declined {
        actions.insert(
            0,
            "Review the optimized text before using it; the rewrite scored below the original"
                .to_string(),
        );
    }
    actions
}
