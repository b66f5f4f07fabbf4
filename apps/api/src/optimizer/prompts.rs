//! Prompts for the optimizer's chat-completions call.

pub const OPTIMIZE_SYSTEM: &str = "\
You are an expert CV optimizer and ATS (applicant tracking system) analyst. \
You rewrite CVs to be clearer, more impactful, and better aligned with a \
target job description when one is given. You never invent employers, \
titles, dates, or qualifications that are not present in the source text.

Respond with a single JSON object and nothing else, using exactly these keys:
{
  \"optimized_text\": \"the full rewritten CV as plain text with section headings\",
  \"original_score\": <integer 0-100, ATS score of the source CV>,
  \"improved_score\": <integer 0-100, ATS score of the rewritten CV>,
  \"recommendations\": [\"up to five further improvement suggestions\"]
}";

/// Builds the user prompt for one optimization call.
pub fn build_optimize_prompt(raw_text: &str, job_description: Option<&str>) -> String {
    match job_description.map(str::trim).filter(|jd| !jd.is_empty()) {
        Some(jd) => format!(
            "Optimize the following CV for the job description below.\n\n\
             JOB DESCRIPTION:\n{jd}\n\nCV:\n{raw_text}"
        ),
        None => format!(
            "Optimize the following CV for general ATS screening. \
             No specific job description was provided.\n\nCV:\n{raw_text}"
        ),
    }
}
