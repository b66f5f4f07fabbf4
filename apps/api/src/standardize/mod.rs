//! Canonical CV section structure.
//!
//! The optimizer returns free text whose layout varies with the source
//! document. Standardization gives DocumentGenerator a stable input contract:
//! recognized sections under canonical headings, in a fixed order, with
//! duplicates merged. Content that appears before any recognized heading is
//! treated as the profile.

/// Recognized section kinds, in canonical output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    Profile,
    Experience,
    Education,
    Skills,
    Projects,
    Certifications,
    Languages,
}

impl SectionKind {
    pub fn canonical_heading(self) -> &'static str {
        match self {
            SectionKind::Profile => "Profile",
            SectionKind::Experience => "Experience",
            SectionKind::Education => "Education",
            SectionKind::Skills => "Skills",
            SectionKind::Projects => "Projects",
            SectionKind::Certifications => "Certifications",
            SectionKind::Languages => "Languages",
        }
    }

    fn aliases(self) -> &'static [&'static str] {
        match self {
            SectionKind::Profile => &[
                "profile",
                "summary",
                "professional summary",
                "about",
                "about me",
                "objective",
            ],
            SectionKind::Experience => &[
                "experience",
                "work experience",
                "professional experience",
                "employment",
                "employment history",
                "work history",
            ],
            SectionKind::Education => &["education", "academic background", "qualifications"],
            SectionKind::Skills => &[
                "skills",
                "technical skills",
                "core competencies",
                "competencies",
                "key skills",
            ],
            SectionKind::Projects => &["projects", "personal projects", "selected projects"],
            SectionKind::Certifications => &["certifications", "certificates", "licenses"],
            SectionKind::Languages => &["languages"],
        }
    }

    const ALL: [SectionKind; 7] = [
        SectionKind::Profile,
        SectionKind::Experience,
        SectionKind::Education,
        SectionKind::Skills,
        SectionKind::Projects,
        SectionKind::Certifications,
        SectionKind::Languages,
    ];
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: String,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardizedCv {
    pub sections: Vec<Section>,
}

impl StandardizedCv {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

/// Normalizes optimized CV text into the canonical section structure.
/// Whitespace-only input yields an empty structure.
pub fn standardize(text: &str) -> StandardizedCv {
    let mut buckets: std::collections::BTreeMap<SectionKind, Vec<String>> = Default::default();
    let mut current = SectionKind::Profile;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(kind) = heading_kind(trimmed) {
            current = kind;
            buckets.entry(kind).or_default();
            continue;
        }
        buckets.entry(current).or_default().push(content_line(trimmed));
    }

    let sections = buckets
        .into_iter()
        .filter(|(_, lines)| !lines.is_empty())
        .map(|(kind, lines)| Section {
            kind,
            heading: kind.canonical_heading().to_string(),
            lines,
        })
        .collect();

    StandardizedCv { sections }
}

/// Classifies a line as a section heading. Headings are short lines whose
/// text (stripped of markdown and trailing colons) matches a known alias.
fn heading_kind(line: &str) -> Option<SectionKind> {
    let cleaned = line
        .trim_start_matches(['#', '*', '-', '=', ' '])
        .trim_end_matches([':', '*', '='])
        .trim();
    if cleaned.is_empty() || cleaned.len() > 40 || cleaned.split_whitespace().count() > 4 {
        return None;
    }
    let lower = cleaned.to_lowercase();
    SectionKind::ALL
        .into_iter()
        .find(|kind| kind.aliases().contains(&lower.as_str()))
}

/// Strips bullet glyphs so generators apply their own list formatting.
fn content_line(line: &str) -> String {
    line.trim_start_matches(['•', '-', '*', '●', '▪'])
        .trim()
        .to_string()
}
