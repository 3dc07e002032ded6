// Prompts for the import and enhancement operations.

pub const EXTRACT_SYSTEM_INTRO: &str = "\
    You extract structured resume data. Read the provided text and return it \
    as JSON matching EXACTLY the schema below. Use empty strings and empty \
    arrays for anything the text does not state. Never invent employers, \
    dates, degrees or metrics.";

pub const SUGGEST_SKILLS_SYSTEM: &str = "\
    You are a career skills expert. Given the skills a person already lists, \
    suggest 5-10 related skills they very likely also have. \
    Answer with a JSON array of skill-name strings.";

pub const ENHANCE_BULLET_SYSTEM: &str = "\
    You are a professional resume writer. Rewrite the given bullet point to be \
    more impactful: open with a strong action verb, quantify the result where \
    the original allows it, and follow the shape \
    \"[Action verb] [task or project] [result or impact]\". \
    Keep it to one or two lines.";

pub const SUMMARY_SYSTEM: &str = "\
    You are a professional resume writer. Write a 2-3 sentence professional \
    summary for this person, specific about their expertise and impact.";

/// User message for skill suggestions.
pub fn suggest_skills_user(existing: &[&str]) -> String {
    format!(
        "My existing skills: {}\n\nSuggest related skills I might also have.",
        existing.join(", ")
    )
}

/// User message for summary generation.
pub fn summary_user(experience_line: &str, skills_line: &str) -> String {
    format!("Experience: {experience_line}\nSkills: {skills_line}")
}
