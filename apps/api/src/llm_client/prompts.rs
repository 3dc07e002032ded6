// Shared prompt fragments and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Appended to every system prompt whose answer is parsed as JSON.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    Return ONLY valid JSON. \
    Do NOT wrap it in markdown code fences. \
    Do NOT include explanations, notes or apologies.";

/// Appended to every system prompt whose answer is used verbatim as text.
pub const PLAIN_TEXT_INSTRUCTION: &str = "\
    Return ONLY the requested text, without surrounding quotes, \
    labels or explanation.";

/// Full-record shape the extraction and tailoring prompts describe to the model.
/// Dates are `YYYY-MM` strings; absent values are empty strings or empty arrays.
pub const RESUME_SCHEMA_JSON: &str = r#"{
  "contact": { "fullName": "", "email": "", "phone": "", "location": "", "linkedin": "", "portfolio": "", "github": "" },
  "summary": { "text": "" },
  "experience": [{ "company": "", "title": "", "location": "", "startDate": "YYYY-MM", "endDate": "YYYY-MM", "current": false, "bullets": [{ "text": "" }], "skills": [] }],
  "education": [{ "institution": "", "degree": "", "field": "", "startDate": "YYYY-MM", "endDate": "YYYY-MM", "gpa": "", "honors": "" }],
  "skills": { "technical": [{ "name": "", "proficiency": "intermediate", "category": "general" }], "soft": [{ "name": "" }], "languages": [{ "name": "", "proficiency": "" }] },
  "certifications": [{ "name": "", "issuer": "", "date": "YYYY-MM", "url": "" }],
  "projects": [{ "name": "", "description": "", "url": "", "technologies": [], "bullets": [{ "text": "" }] }],
  "awards": [{ "name": "", "issuer": "", "date": "", "description": "" }],
  "publications": [{ "title": "", "venue": "", "date": "", "url": "" }]
}"#;

/// Joins prompt sections with a blank line between them.
pub fn compose(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_fragment_is_valid_json() {
        let v: serde_json::Value = serde_json::from_str(RESUME_SCHEMA_JSON).unwrap();
        assert!(v["skills"]["languages"].is_array());
    }

    #[test]
    fn test_compose_skips_empty_parts() {
        assert_eq!(compose(&["a ", "", "  b"]), "a\n\nb");
    }
}
