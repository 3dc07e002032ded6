//! The canonical master record and every mutation on it.
//!
//! A mutation runs on a copy of the record; the copy replaces the live record
//! only after it was saved, so a failed validation or save leaves both the
//! in-memory and the stored record untouched.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::import::merge::{merge_into, MergeReport};
use crate::models::resume::{
    assign_ids, assign_ids_with_nested, drop_nulls, nested_ids, normalize_skill_name, BulletPoint,
    ExperienceEntry, ResumePatch, ResumeRecord, SectionEntry, SkillEntry, SkillGroup,
};
use crate::store::ResumeStore;

/// Explicit contact edit: present fields overwrite, absent fields stay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContactUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
    pub portfolio: Option<String>,
    pub github: Option<String>,
}

pub struct ResumeWorkspace {
    record: ResumeRecord,
    store: Arc<dyn ResumeStore>,
}

impl ResumeWorkspace {
    /// Loads the stored record. Nothing stored, or a document that no longer
    /// parses, starts an empty record (the damaged document is left in place
    /// until the next save).
    pub async fn open(store: Arc<dyn ResumeStore>) -> Result<Self, AppError> {
        let stored = store.load().await.map_err(storage_error)?;
        let record = match stored {
            None => {
                info!("No master resume in {}, starting empty", store.describe());
                ResumeRecord::empty()
            }
            Some(text) => match ResumeRecord::from_json(&text) {
                Ok(record) => {
                    info!("Loaded master resume from {}", store.describe());
                    record
                }
                Err(e) => {
                    warn!(
                        "Stored master resume in {} is unreadable ({e}), starting empty",
                        store.describe()
                    );
                    ResumeRecord::empty()
                }
            },
        };
        Ok(Self { record, store })
    }

    pub fn record(&self) -> &ResumeRecord {
        &self.record
    }

    pub fn export_json(&self) -> Result<String, AppError> {
        self.record
            .to_json()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))
    }

    /// Replaces the whole record with an exported document, kept as imported.
    pub async fn import_json(&mut self, text: &str) -> Result<&ResumeRecord, AppError> {
        let record = ResumeRecord::from_json(text)
            .map_err(|e| AppError::ImportFormat(format!("Invalid resume JSON: {e}")))?;
        self.save(&record).await?;
        self.record = record;
        info!("Imported master resume document");
        Ok(&self.record)
    }

    pub async fn reset(&mut self) -> Result<&ResumeRecord, AppError> {
        let record = ResumeRecord::empty();
        self.save(&record).await?;
        self.record = record;
        info!("Master resume reset");
        Ok(&self.record)
    }

    // ── Contact & summary ──

    pub async fn update_contact(&mut self, update: ContactUpdate) -> Result<(), AppError> {
        self.mutate(|r| {
            let c = &mut r.contact;
            let fields = [
                (&mut c.full_name, update.full_name),
                (&mut c.email, update.email),
                (&mut c.phone, update.phone),
                (&mut c.location, update.location),
                (&mut c.linkedin, update.linkedin),
                (&mut c.portfolio, update.portfolio),
                (&mut c.github, update.github),
            ];
            for (field, value) in fields {
                if let Some(value) = value {
                    *field = value.trim().to_string();
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn update_summary(&mut self, text: String) -> Result<(), AppError> {
        self.mutate(|r| {
            r.summary.text = text.trim().to_string();
            Ok(())
        })
        .await
    }

    pub async fn add_summary_variant(&mut self, text: String) -> Result<usize, AppError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Validation("Summary variant must not be empty".to_string()));
        }
        self.mutate(|r| {
            r.summary.variants.push(text);
            Ok(r.summary.variants.len())
        })
        .await
    }

    // ── Section entries ──

    pub fn entry<T: SectionEntry>(&self, id: &str) -> Result<&T, AppError> {
        T::collection(&self.record)
            .iter()
            .find(|e| e.id() == id)
            .ok_or_else(|| not_found::<T>(id))
    }

    /// Appends `entry`. Its id (and its bullets' ids) are replaced when empty or taken.
    pub async fn add_entry<T: SectionEntry>(&mut self, mut entry: T) -> Result<T, AppError> {
        self.mutate(|r| {
            let entries = T::collection_mut(r);
            let mut taken: HashSet<String> = entries.iter().map(|e| e.id().to_string()).collect();
            let mut bullets_taken = nested_ids(entries);
            assign_ids_with_nested(
                std::slice::from_mut(&mut entry),
                &mut taken,
                &mut bullets_taken,
            );
            entry.normalize();
            entries.push(entry.clone());
            Ok(entry)
        })
        .await
    }

    /// Shallow-merges the top-level fields of `changes` into the entry. `id`
    /// cannot be changed; `null` values are ignored.
    pub async fn update_entry<T: SectionEntry>(
        &mut self,
        id: &str,
        mut changes: Value,
    ) -> Result<T, AppError> {
        drop_nulls(&mut changes);
        let Value::Object(changes) = changes else {
            return Err(AppError::Validation("Expected a JSON object".to_string()));
        };

        self.mutate(|r| {
            let entries = T::collection_mut(r);
            let idx = entries
                .iter()
                .position(|e| e.id() == id)
                .ok_or_else(|| not_found::<T>(id))?;

            let mut value = serde_json::to_value(&entries[idx])
                .map_err(|e| AppError::Internal(e.into()))?;
            if let Value::Object(map) = &mut value {
                for (key, v) in changes {
                    if key != "id" {
                        map.insert(key, v);
                    }
                }
            }
            let mut updated: T = serde_json::from_value(value).map_err(|e| {
                AppError::Validation(format!("Invalid {} entry: {e}", T::SECTION.as_str()))
            })?;
            let mut bullets_taken = nested_ids(&entries[..idx]);
            bullets_taken.extend(nested_ids(&entries[idx + 1..]));
            updated.assign_nested_ids(&mut bullets_taken);
            updated.normalize();
            entries[idx] = updated.clone();
            Ok(updated)
        })
        .await
    }

    pub async fn remove_entry<T: SectionEntry>(&mut self, id: &str) -> Result<(), AppError> {
        self.mutate(|r| {
            let entries = T::collection_mut(r);
            let before = entries.len();
            entries.retain(|e| e.id() != id);
            if entries.len() == before {
                return Err(not_found::<T>(id));
            }
            Ok(())
        })
        .await
    }

    // ── Skills ──

    /// Adds a skill. Blank names and names already in the group are rejected.
    pub async fn add_skill(
        &mut self,
        group: SkillGroup,
        mut skill: SkillEntry,
    ) -> Result<SkillEntry, AppError> {
        skill.name = skill.name.trim().to_string();
        if skill.name.is_empty() {
            return Err(AppError::Validation("Skill name must not be empty".to_string()));
        }
        self.mutate(|r| {
            if r.skills.contains(group, &skill.name) {
                return Err(AppError::Validation(format!(
                    "Skill '{}' already exists in {}",
                    skill.name,
                    group.as_str()
                )));
            }
            let entries = r.skills.group_mut(group);
            let mut taken: HashSet<String> = entries.iter().map(|s| s.id.clone()).collect();
            assign_ids(std::slice::from_mut(&mut skill), &mut taken);
            entries.push(skill.clone());
            Ok(skill)
        })
        .await
    }

    /// Replaces a whole skill group, e.g. after reordering.
    pub async fn replace_skills(
        &mut self,
        group: SkillGroup,
        mut skills: Vec<SkillEntry>,
    ) -> Result<Vec<SkillEntry>, AppError> {
        let mut names = HashSet::new();
        for skill in skills.iter_mut() {
            skill.name = skill.name.trim().to_string();
            if skill.name.is_empty() {
                return Err(AppError::Validation("Skill name must not be empty".to_string()));
            }
            if !names.insert(normalize_skill_name(&skill.name)) {
                return Err(AppError::Validation(format!(
                    "Skill '{}' is listed twice",
                    skill.name
                )));
            }
        }
        assign_ids(&mut skills, &mut HashSet::new());

        self.mutate(|r| {
            *r.skills.group_mut(group) = skills.clone();
            Ok(skills)
        })
        .await
    }

    pub async fn remove_skill(&mut self, group: SkillGroup, id: &str) -> Result<(), AppError> {
        self.mutate(|r| {
            let entries = r.skills.group_mut(group);
            let before = entries.len();
            entries.retain(|s| s.id != id);
            if entries.len() == before {
                return Err(AppError::NotFound(format!(
                    "Skill {id} not found in {}",
                    group.as_str()
                )));
            }
            Ok(())
        })
        .await
    }

    // ── Bullets ──

    pub async fn add_bullet(
        &mut self,
        experience_id: &str,
        text: String,
    ) -> Result<BulletPoint, AppError> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::Validation("Bullet text must not be empty".to_string()));
        }
        self.mutate(|r| {
            let mut taken = nested_ids(&r.experience);
            let entry = experience_mut(r, experience_id)?;
            let mut bullet = BulletPoint::new(text);
            assign_ids(std::slice::from_mut(&mut bullet), &mut taken);
            entry.bullets.push(bullet.clone());
            Ok(bullet)
        })
        .await
    }

    /// Writes back bullet texts by id. Bullets removed in the meantime are
    /// ignored. Returns how many bullets changed.
    pub async fn apply_bullet_texts(
        &mut self,
        experience_id: &str,
        bullets: &[BulletPoint],
    ) -> Result<usize, AppError> {
        self.mutate(|r| {
            let entry = experience_mut(r, experience_id)?;
            let mut changed = 0;
            for update in bullets {
                if let Some(b) = entry.bullets.iter_mut().find(|b| b.id == update.id) {
                    if b.text != update.text {
                        b.text = update.text.clone();
                        changed += 1;
                    }
                }
            }
            Ok(changed)
        })
        .await
    }

    // ── Import ──

    pub async fn merge(&mut self, patch: ResumePatch) -> Result<MergeReport, AppError> {
        let report = self.mutate(|r| Ok(merge_into(r, patch))).await?;
        info!(
            "Merged import: {} entries added, {} contact fields filled, {} duplicate skills skipped",
            report.entries_added(),
            report.contact_fields_filled.len(),
            report.skills_skipped
        );
        Ok(report)
    }

    // ── Internals ──

    async fn mutate<R>(
        &mut self,
        f: impl FnOnce(&mut ResumeRecord) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut next = self.record.clone();
        let out = f(&mut next)?;
        next.touch();
        self.save(&next).await?;
        self.record = next;
        Ok(out)
    }

    async fn save(&self, record: &ResumeRecord) -> Result<(), AppError> {
        let document = record
            .to_json()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize resume: {e}")))?;
        self.store.save(&document).await.map_err(storage_error)
    }
}

fn experience_mut<'a>(
    record: &'a mut ResumeRecord,
    id: &str,
) -> Result<&'a mut ExperienceEntry, AppError> {
    record
        .experience
        .iter_mut()
        .find(|e| e.id == id)
        .ok_or_else(|| not_found::<ExperienceEntry>(id))
}

fn not_found<T: SectionEntry>(id: &str) -> AppError {
    AppError::NotFound(format!("{} entry {id} not found", T::SECTION.as_str()))
}

fn storage_error(e: anyhow::Error) -> AppError {
    AppError::Storage(format!("{e:#}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{CertificationEntry, Contact, EducationEntry, Skills};
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    async fn open_empty() -> (ResumeWorkspace, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let ws = ResumeWorkspace::open(store.clone()).await.unwrap();
        (ws, store)
    }

    #[tokio::test]
    async fn test_open_without_document_starts_empty() {
        let (ws, store) = open_empty().await;
        assert!(ws.record().experience.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_open_with_unreadable_document_starts_empty() {
        let store = Arc::new(MemoryStore::with_document("{broken"));
        let ws = ResumeWorkspace::open(store.clone()).await.unwrap();
        assert_eq!(ws.record().version, "1.0");
        assert_eq!(store.document().as_deref(), Some("{broken"));
    }

    #[tokio::test]
    async fn test_reopen_restores_saved_record() {
        let (mut ws, store) = open_empty().await;
        ws.update_summary("Engineer".to_string()).await.unwrap();
        let saved = ws.record().clone();

        let reopened = ResumeWorkspace::open(store).await.unwrap();
        assert_eq!(reopened.record(), &saved);
    }

    #[tokio::test]
    async fn test_every_mutation_saves_and_touches() {
        let (mut ws, store) = open_empty().await;
        let created = ws.record().meta.created_at;
        ws.update_contact(ContactUpdate {
            email: Some(" a@x.com ".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
        ws.add_summary_variant("v1".to_string()).await.unwrap();

        assert_eq!(store.save_count(), 2);
        assert_eq!(ws.record().contact.email, "a@x.com");
        assert_eq!(ws.record().meta.created_at, created);
        assert!(ws.record().meta.updated_at >= created);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_record_untouched() {
        let (mut ws, store) = open_empty().await;
        store.fail_saves(true);
        let err = ws.update_summary("New".to_string()).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(ws.record().summary.text, "");
    }

    #[tokio::test]
    async fn test_export_import_round_trip() {
        let (mut ws, _) = open_empty().await;
        let mut exp = ExperienceEntry::new();
        exp.company = "Acme".to_string();
        exp.bullets.push(BulletPoint::new("Shipped"));
        ws.add_entry(exp).await.unwrap();
        ws.add_skill(SkillGroup::Technical, SkillEntry::named("Rust"))
            .await
            .unwrap();
        let before = ws.record().clone();

        let exported = ws.export_json().unwrap();
        ws.reset().await.unwrap();
        assert!(ws.record().experience.is_empty());

        let imported = ws.import_json(&exported).await.unwrap();
        assert_eq!(imported, &before);
    }

    #[tokio::test]
    async fn test_invalid_import_keeps_existing_record() {
        let (mut ws, store) = open_empty().await;
        ws.update_summary("Keep me".to_string()).await.unwrap();
        let saves = store.save_count();

        let err = ws.import_json("not json").await.unwrap_err();
        assert!(matches!(err, AppError::ImportFormat(_)));
        assert_eq!(ws.record().summary.text, "Keep me");
        assert_eq!(store.save_count(), saves);
    }

    #[tokio::test]
    async fn test_add_entry_repairs_colliding_id() {
        let (mut ws, _) = open_empty().await;
        let first = ws.add_entry(EducationEntry::new()).await.unwrap();
        let mut copy = EducationEntry::new();
        copy.id = first.id.clone();
        let second = ws.add_entry(copy).await.unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(ws.record().education.len(), 2);
    }

    #[tokio::test]
    async fn test_bullet_ids_unique_across_experience_entries() {
        let (mut ws, _) = open_empty().await;
        let mut exp = ExperienceEntry::new();
        exp.bullets.push(BulletPoint::new("Shipped"));
        let first = ws.add_entry(exp.clone()).await.unwrap();
        let second = ws.add_entry(exp.clone()).await.unwrap();
        assert_ne!(first.bullets[0].id, second.bullets[0].id);

        let updated: ExperienceEntry = ws
            .update_entry(&second.id, json!({ "bullets": &first.bullets }))
            .await
            .unwrap();
        assert_ne!(updated.bullets[0].id, first.bullets[0].id);

        let ids = nested_ids(&ws.record().experience);
        assert_eq!(ids.len(), 2);
    }

    #[tokio::test]
    async fn test_current_experience_end_date_cleared_on_add_and_update() {
        let (mut ws, _) = open_empty().await;
        let mut exp = ExperienceEntry::new();
        exp.current = true;
        exp.end_date = "2023-05".to_string();
        let added = ws.add_entry(exp).await.unwrap();
        assert_eq!(added.end_date, "");

        let updated: ExperienceEntry = ws
            .update_entry(&added.id, json!({"current": false, "endDate": "2024-02"}))
            .await
            .unwrap();
        assert_eq!(updated.end_date, "2024-02");

        let updated: ExperienceEntry = ws
            .update_entry(&added.id, json!({"current": true}))
            .await
            .unwrap();
        assert_eq!(updated.end_date, "");
    }

    #[tokio::test]
    async fn test_update_entry_merges_fields_and_keeps_id() {
        let (mut ws, _) = open_empty().await;
        let mut cert = CertificationEntry::new();
        cert.name = "CKA".to_string();
        cert.issuer = "CNCF".to_string();
        let cert = ws.add_entry(cert).await.unwrap();

        let updated: CertificationEntry = ws
            .update_entry(&cert.id, json!({"id": "hijack", "date": 2022, "issuer": null}))
            .await
            .unwrap();
        assert_eq!(updated.id, cert.id);
        assert_eq!(updated.name, "CKA");
        assert_eq!(updated.issuer, "CNCF");
        assert_eq!(updated.date, "2022");
    }

    #[tokio::test]
    async fn test_update_and_remove_missing_entry() {
        let (mut ws, _) = open_empty().await;
        assert!(matches!(
            ws.update_entry::<EducationEntry>("nope", json!({})).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            ws.remove_entry::<EducationEntry>("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let (mut ws, _) = open_empty().await;
        let e = ws.add_entry(EducationEntry::new()).await.unwrap();
        ws.remove_entry::<EducationEntry>(&e.id).await.unwrap();
        assert!(ws.record().education.is_empty());
        assert!(ws.entry::<EducationEntry>(&e.id).is_err());
    }

    #[tokio::test]
    async fn test_duplicate_skill_rejected() {
        let (mut ws, _) = open_empty().await;
        ws.add_skill(SkillGroup::Technical, SkillEntry::named("Python"))
            .await
            .unwrap();
        let err = ws
            .add_skill(SkillGroup::Technical, SkillEntry::named(" python "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        ws.add_skill(SkillGroup::Soft, SkillEntry::named("python"))
            .await
            .unwrap();
        assert_eq!(ws.record().skills.technical.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_and_remove_skills() {
        let (mut ws, _) = open_empty().await;
        let dup = vec![SkillEntry::named("Go"), SkillEntry::named("go")];
        assert!(ws.replace_skills(SkillGroup::Technical, dup).await.is_err());

        let skills = ws
            .replace_skills(
                SkillGroup::Technical,
                vec![SkillEntry::named("Go"), SkillEntry::named("Rust")],
            )
            .await
            .unwrap();
        ws.remove_skill(SkillGroup::Technical, &skills[0].id)
            .await
            .unwrap();
        assert_eq!(ws.record().skills.technical[0].name, "Rust");
        assert!(matches!(
            ws.remove_skill(SkillGroup::Technical, "missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_bullets_add_and_write_back() {
        let (mut ws, _) = open_empty().await;
        let exp = ws.add_entry(ExperienceEntry::new()).await.unwrap();
        let b1 = ws.add_bullet(&exp.id, "first".to_string()).await.unwrap();
        let b2 = ws.add_bullet(&exp.id, "second".to_string()).await.unwrap();

        let mut edited = vec![b1.clone(), b2.clone()];
        edited[0].text = "First!".to_string();
        let changed = ws.apply_bullet_texts(&exp.id, &edited).await.unwrap();
        assert_eq!(changed, 1);

        let stored = ws.entry::<ExperienceEntry>(&exp.id).unwrap();
        assert_eq!(stored.bullets[0].text, "First!");
        assert_eq!(stored.bullets[1].text, "second");

        assert!(matches!(
            ws.add_bullet("missing", "x".to_string()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_merge_persists_once() {
        let (mut ws, store) = open_empty().await;
        let patch = ResumePatch {
            contact: Some(Contact {
                full_name: "Ada".to_string(),
                ..Default::default()
            }),
            skills: Some(Skills {
                technical: vec![SkillEntry::named("Rust")],
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = ws.merge(patch).await.unwrap();
        assert_eq!(report.skills_added, 1);
        assert_eq!(ws.record().contact.full_name, "Ada");
        assert_eq!(store.save_count(), 1);

        let reopened = ResumeWorkspace::open(store).await.unwrap();
        assert_eq!(reopened.record().skills.technical[0].name, "Rust");
    }
}
