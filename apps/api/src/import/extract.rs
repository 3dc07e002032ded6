//! AI-backed extraction and enhancement.
//!
//! Every operation resolves the session's `TextCompletion` first, so an
//! unconfigured session fails with `AppError::Configuration` before any
//! request is made. Structured answers are fence-stripped and parsed in full
//! before anything is returned; a malformed answer never yields partial data.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{
    compose, JSON_ONLY_INSTRUCTION, PLAIN_TEXT_INSTRUCTION, RESUME_SCHEMA_JSON,
};
use crate::llm_client::session::SessionConfig;
use crate::llm_client::{parse_json_payload, ChatMessage, CompletionOptions, TextCompletion};
use crate::import::prompts::{
    suggest_skills_user, summary_user, ENHANCE_BULLET_SYSTEM, EXTRACT_SYSTEM_INTRO,
    SUGGEST_SKILLS_SYSTEM, SUMMARY_SYSTEM,
};
use crate::models::resume::{normalize_skill_name, ExperienceEntry, ResumePatch, Skills};
use crate::store::workspace::ResumeWorkspace;

pub const PARSE_TEMPERATURE: f32 = 0.1;
pub const SUGGEST_TEMPERATURE: f32 = 0.5;
pub const ENHANCE_TEMPERATURE: f32 = 0.3;
pub const SUMMARY_TEMPERATURE: f32 = 0.4;

const RESUME_EXTRACTION: &str = "resume extraction";
const BULLET_ENHANCEMENT: &str = "bullet enhancement";
const SUMMARY_GENERATION: &str = "summary generation";

/// Result of a sequential batch enhancement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub enhanced: usize,
    /// Bullets with blank text, never sent.
    pub skipped: usize,
    /// Ids of bullets whose request failed; their text is unchanged.
    pub failed: Vec<String>,
}

/// Extracts a structured partial record from free text.
pub async fn parse_text_to_resume(
    session: &SessionConfig,
    text: &str,
) -> Result<ResumePatch, AppError> {
    let completion = session.completion().await?;
    if text.trim().is_empty() {
        return Err(AppError::Validation("No text to parse".to_string()));
    }

    let system = compose(&[EXTRACT_SYSTEM_INTRO, RESUME_SCHEMA_JSON, JSON_ONLY_INSTRUCTION]);
    let messages = [ChatMessage::system(system), ChatMessage::user(text)];
    let response = completion
        .complete(&messages, CompletionOptions::with_temperature(PARSE_TEMPERATURE))
        .await?;

    let value: Value = parse_json_payload(&response)
        .map_err(|e| AppError::extraction_parse(RESUME_EXTRACTION, e))?;
    if !value.is_object() {
        return Err(AppError::extraction_parse(
            RESUME_EXTRACTION,
            "expected a JSON object",
        ));
    }
    let patch = ResumePatch::from_value(value)
        .map_err(|e| AppError::extraction_parse(RESUME_EXTRACTION, e))?;

    info!(
        "AI extraction produced {} entries from {} chars",
        patch.entry_count(),
        text.len()
    );
    Ok(patch)
}

/// Related skill names not already present in any group.
///
/// Transport failures and unparseable answers degrade to an empty list.
pub async fn suggest_skills(
    session: &SessionConfig,
    existing: &Skills,
) -> Result<Vec<String>, AppError> {
    let completion = session.completion().await?;
    let names: Vec<&str> = existing
        .all_names()
        .into_iter()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .collect();
    if names.is_empty() {
        return Ok(Vec::new());
    }

    let messages = [
        ChatMessage::system(compose(&[SUGGEST_SKILLS_SYSTEM, JSON_ONLY_INSTRUCTION])),
        ChatMessage::user(suggest_skills_user(&names)),
    ];
    let response = match completion
        .complete(&messages, CompletionOptions::with_temperature(SUGGEST_TEMPERATURE))
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!("Skill suggestion request failed: {e}");
            return Ok(Vec::new());
        }
    };

    let suggested: Vec<Value> = match parse_json_payload(&response) {
        Ok(v) => v,
        Err(e) => {
            warn!("Skill suggestion response was not a JSON array: {e}");
            return Ok(Vec::new());
        }
    };

    let mut seen: HashSet<String> = names.iter().map(|n| normalize_skill_name(n)).collect();
    Ok(suggested
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(normalize_skill_name(s)))
        .map(String::from)
        .collect())
}

/// Rewrites one bullet; returns the trimmed text.
pub async fn enhance_bullet(session: &SessionConfig, text: &str) -> Result<String, AppError> {
    let completion = session.completion().await?;
    if text.trim().is_empty() {
        return Err(AppError::Validation("Bullet text must not be empty".to_string()));
    }
    rewrite_bullet(completion.as_ref(), text).await
}

/// Enhances the bullets of one experience entry in list order, one request at
/// a time. Each rewrite is applied and saved before the next request is sent,
/// and the workspace is locked only to read a bullet or write one back. A
/// failed request leaves that bullet untouched and the batch moves on.
pub async fn enhance_experience_bullets(
    session: &SessionConfig,
    workspace: &Mutex<ResumeWorkspace>,
    experience_id: &str,
) -> Result<(BatchOutcome, ExperienceEntry), AppError> {
    let completion = session.completion().await?;
    let ids: Vec<String> = workspace
        .lock()
        .await
        .entry::<ExperienceEntry>(experience_id)?
        .bullets
        .iter()
        .map(|b| b.id.clone())
        .collect();
    let mut outcome = BatchOutcome::default();

    for id in ids {
        // Read the current text; the bullet may have been edited or removed
        // since the batch started.
        let current = workspace
            .lock()
            .await
            .entry::<ExperienceEntry>(experience_id)?
            .bullets
            .iter()
            .find(|b| b.id == id)
            .cloned();
        let Some(mut bullet) = current.filter(|b| !b.text.trim().is_empty()) else {
            outcome.skipped += 1;
            continue;
        };

        match rewrite_bullet(completion.as_ref(), &bullet.text).await {
            Ok(text) => {
                bullet.text = text;
                workspace
                    .lock()
                    .await
                    .apply_bullet_texts(experience_id, std::slice::from_ref(&bullet))
                    .await?;
                outcome.enhanced += 1;
            }
            Err(e) => {
                warn!("Enhancing bullet {id} failed, skipping: {e}");
                outcome.failed.push(id);
            }
        }
    }

    info!(
        "Bullet batch finished: {} enhanced, {} skipped, {} failed",
        outcome.enhanced,
        outcome.skipped,
        outcome.failed.len()
    );
    let entry = workspace
        .lock()
        .await
        .entry::<ExperienceEntry>(experience_id)?
        .clone();
    Ok((outcome, entry))
}

async fn rewrite_bullet(completion: &dyn TextCompletion, text: &str) -> Result<String, AppError> {
    let messages = [
        ChatMessage::system(compose(&[ENHANCE_BULLET_SYSTEM, PLAIN_TEXT_INSTRUCTION])),
        ChatMessage::user(text),
    ];
    let response = completion
        .complete(&messages, CompletionOptions::with_temperature(ENHANCE_TEMPERATURE))
        .await?;
    non_empty(response, BULLET_ENHANCEMENT)
}

/// Drafts a professional summary paragraph from experience and skills.
pub async fn generate_summary(
    session: &SessionConfig,
    experience: &[ExperienceEntry],
    skills: &Skills,
) -> Result<String, AppError> {
    let completion = session.completion().await?;

    let messages = [
        ChatMessage::system(compose(&[SUMMARY_SYSTEM, PLAIN_TEXT_INSTRUCTION])),
        ChatMessage::user(summary_user(
            &experience_line(experience),
            &skills_line(skills),
        )),
    ];
    let response = completion
        .complete(&messages, CompletionOptions::with_temperature(SUMMARY_TEMPERATURE))
        .await?;
    non_empty(response, SUMMARY_GENERATION)
}

/// `Title at Company (start–end)` per entry, joined with `; `.
fn experience_line(experience: &[ExperienceEntry]) -> String {
    experience
        .iter()
        .map(|e| {
            let end = if e.current { "Present" } else { e.end_date.as_str() };
            format!("{} at {} ({}–{})", e.title, e.company, e.start_date, end)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn skills_line(skills: &Skills) -> String {
    skills
        .technical
        .iter()
        .chain(skills.soft.iter())
        .map(|s| s.name.trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

fn non_empty(response: String, operation: &str) -> Result<String, AppError> {
    let text = response.trim();
    if text.is_empty() {
        return Err(AppError::extraction_parse(operation, "empty response"));
    }
    Ok(text.to_string())
}
