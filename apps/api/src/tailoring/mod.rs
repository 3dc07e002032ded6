//! Tailoring: reduces the master record to a one-page resume for a job description.
//!
//! The provider selects and rewrites; this module builds the request, parses
//! the answer into `TailoredResume`, and repairs a dropped contact block.

pub mod handlers;
pub mod prompts;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::llm_client::prompts::{compose, JSON_ONLY_INSTRUCTION};
use crate::llm_client::session::SessionConfig;
use crate::llm_client::{parse_json_payload, ChatMessage, CompletionOptions, DEFAULT_MAX_TOKENS};
use crate::models::resume::{
    assign_ids, drop_nulls, CertificationEntry, Contact, EducationEntry, ExperienceEntry,
    ProjectEntry, ResumeRecord, SkillGroup, Skills, Summary,
};
use crate::tailoring::prompts::{tailor_user, TAILORED_SCHEMA_JSON, TAILOR_RULES, TAILOR_SYSTEM_INTRO};

pub const TAILOR_TEMPERATURE: f32 = 0.2;
const RESUME_TAILORING: &str = "resume tailoring";

/// The reduced record returned for one job description. Not persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TailoredResume {
    pub contact: Contact,
    pub summary: Summary,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Skills,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
}

impl TailoredResume {
    /// Parses a provider answer: fences stripped, nulls ignored, missing ids assigned.
    pub fn from_response(text: &str) -> Result<Self, AppError> {
        let mut value: Value = parse_json_payload(text)
            .map_err(|e| AppError::extraction_parse(RESUME_TAILORING, e))?;
        if !value.is_object() {
            return Err(AppError::extraction_parse(
                RESUME_TAILORING,
                "expected a JSON object",
            ));
        }
        drop_nulls(&mut value);
        let mut tailored: TailoredResume = serde_json::from_value(value)
            .map_err(|e| AppError::extraction_parse(RESUME_TAILORING, e))?;
        tailored.assign_ids();
        Ok(tailored)
    }

    fn assign_ids(&mut self) {
        assign_ids(&mut self.experience, &mut HashSet::new());
        assign_ids(&mut self.education, &mut HashSet::new());
        for group in SkillGroup::ALL {
            assign_ids(self.skills.group_mut(group), &mut HashSet::new());
        }
        assign_ids(&mut self.certifications, &mut HashSet::new());
        assign_ids(&mut self.projects, &mut HashSet::new());
    }
}

/// System instruction plus the master record and job description.
pub fn build_tailoring_messages(
    master: &ResumeRecord,
    job_description: &str,
) -> Result<Vec<ChatMessage>, AppError> {
    let master_json = master
        .to_json()
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;
    Ok(vec![
        ChatMessage::system(compose(&[
            TAILOR_SYSTEM_INTRO,
            TAILORED_SCHEMA_JSON,
            TAILOR_RULES,
            JSON_ONLY_INSTRUCTION,
        ])),
        ChatMessage::user(tailor_user(&master_json, job_description.trim())),
    ])
}

/// Requests a tailored resume. The caller applies `apply_contact_fallback`.
pub async fn tailor_resume(
    session: &SessionConfig,
    master: &ResumeRecord,
    job_description: &str,
) -> Result<TailoredResume, AppError> {
    let completion = session.completion().await?;
    if job_description.trim().is_empty() {
        return Err(AppError::Validation("Job description must not be empty".to_string()));
    }

    let messages = build_tailoring_messages(master, job_description)?;
    let options = CompletionOptions {
        max_tokens: DEFAULT_MAX_TOKENS,
        ..CompletionOptions::with_temperature(TAILOR_TEMPERATURE)
    };
    let response = completion.complete(&messages, options).await?;
    let tailored = TailoredResume::from_response(&response)?;

    info!(
        "Tailored resume: {} experience, {} technical skills, {} projects",
        tailored.experience.len(),
        tailored.skills.technical.len(),
        tailored.projects.len()
    );
    Ok(tailored)
}

/// Substitutes the master contact block when the tailored one lost the name.
/// Returns whether the substitution happened.
pub fn apply_contact_fallback(tailored: &mut TailoredResume, master: &ResumeRecord) -> bool {
    if tailored.contact.full_name.trim().is_empty() && !master.contact.full_name.trim().is_empty() {
        warn!("Tailored resume dropped the contact name, restoring master contact block");
        tailored.contact = master.contact.clone();
        return true;
    }
    false
}
