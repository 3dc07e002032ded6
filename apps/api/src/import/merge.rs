//! Merge engine: folds a `ResumePatch` into the canonical record in place.
//!
//! Policy per field group:
//! - contact fields are fill-only (an incoming value lands only in an empty field)
//! - the summary is adopted only while the existing text is empty
//! - list sections are appended unconditionally, after id repair
//! - skills are filtered by case-insensitive name per group

use std::collections::HashSet;

use serde::Serialize;

use crate::models::resume::{
    assign_ids, assign_ids_with_nested, nested_ids, AwardEntry, CertificationEntry, Contact,
    EducationEntry, ExperienceEntry, ProjectEntry, PublicationEntry, ResumePatch, ResumeRecord,
    SectionEntry, SkillEntry, SkillGroup, Skills, Summary,
};

/// What a merge changed, returned to callers and logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    /// camelCase names of contact fields that were filled.
    pub contact_fields_filled: Vec<&'static str>,
    pub summary_adopted: bool,
    pub experience_added: usize,
    pub education_added: usize,
    pub certifications_added: usize,
    pub projects_added: usize,
    pub awards_added: usize,
    pub publications_added: usize,
    pub skills_added: usize,
    pub skills_skipped: usize,
}

impl MergeReport {
    pub fn entries_added(&self) -> usize {
        self.experience_added
            + self.education_added
            + self.certifications_added
            + self.projects_added
            + self.awards_added
            + self.publications_added
            + self.skills_added
    }
}

/// Applies `patch` to `record`. Field groups are independent; absent groups are
/// left untouched. Does not touch `meta`; the caller persists the result.
pub fn merge_into(record: &mut ResumeRecord, patch: ResumePatch) -> MergeReport {
    let mut report = MergeReport::default();

    if let Some(contact) = patch.contact.filter(|c| !c.is_empty()) {
        report.contact_fields_filled = fill_contact(&mut record.contact, &contact);
    }
    if let Some(summary) = patch.summary {
        report.summary_adopted = adopt_summary(&mut record.summary, summary);
    }

    report.experience_added = append_section::<ExperienceEntry>(record, patch.experience);
    report.education_added = append_section::<EducationEntry>(record, patch.education);
    report.certifications_added =
        append_section::<CertificationEntry>(record, patch.certifications);
    report.projects_added = append_section::<ProjectEntry>(record, patch.projects);
    report.awards_added = append_section::<AwardEntry>(record, patch.awards);
    report.publications_added = append_section::<PublicationEntry>(record, patch.publications);

    if let Some(skills) = patch.skills.filter(|s| !s.is_empty()) {
        let (added, skipped) = merge_skills(&mut record.skills, skills);
        report.skills_added = added;
        report.skills_skipped = skipped;
    }

    report
}

fn fill_contact(existing: &mut Contact, incoming: &Contact) -> Vec<&'static str> {
    let mut filled = Vec::new();
    let pairs = existing.fields_mut().into_iter().zip(incoming.fields());
    for ((name, current), (_, value)) in pairs {
        if current.trim().is_empty() && !value.trim().is_empty() {
            *current = value.trim().to_string();
            filled.push(name);
        }
    }
    filled
}

fn adopt_summary(existing: &mut Summary, incoming: Summary) -> bool {
    let text = incoming.text.trim();
    if !existing.text.trim().is_empty() || text.is_empty() {
        return false;
    }
    existing.text = text.to_string();
    true
}

/// Appends `incoming` to the matching collection. Entry and bullet ids that are
/// empty or already present in the collection are replaced before the entries land.
fn append_section<T: SectionEntry>(record: &mut ResumeRecord, mut incoming: Vec<T>) -> usize {
    if incoming.is_empty() {
        return 0;
    }
    let existing = T::collection_mut(record);
    let mut taken: HashSet<String> = existing.iter().map(|e| e.id().to_string()).collect();
    let mut bullets_taken = nested_ids(existing);
    assign_ids_with_nested(&mut incoming, &mut taken, &mut bullets_taken);
    incoming.iter_mut().for_each(|e| e.normalize());

    let added = incoming.len();
    existing.extend(incoming);
    added
}

fn merge_skills(existing: &mut Skills, mut incoming: Skills) -> (usize, usize) {
    let mut added = 0;
    let mut skipped = 0;
    for group in SkillGroup::ALL {
        let batch = std::mem::take(incoming.group_mut(group));
        let (a, s) = merge_skill_group(existing.group_mut(group), batch);
        added += a;
        skipped += s;
    }
    (added, skipped)
}

fn merge_skill_group(existing: &mut Vec<SkillEntry>, incoming: Vec<SkillEntry>) -> (usize, usize) {
    let total = incoming.len();
    let mut seen: HashSet<String> = existing.iter().map(SkillEntry::normalized_name).collect();
    let mut fresh: Vec<SkillEntry> = incoming
        .into_iter()
        .filter(|s| {
            let key = s.normalized_name();
            !key.is_empty() && seen.insert(key)
        })
        .map(|mut s| {
            s.name = s.name.trim().to_string();
            s
        })
        .collect();

    let mut taken: HashSet<String> = existing.iter().map(|s| s.id.clone()).collect();
    assign_ids(&mut fresh, &mut taken);

    let added = fresh.len();
    existing.extend(fresh);
    (added, total - added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::{BulletPoint, HasId};

    fn names(skills: &[SkillEntry]) -> Vec<&str> {
        skills.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_contact_is_fill_only() {
        let mut record = ResumeRecord::empty();
        record.contact.email = "a@x.com".to_string();

        let patch = ResumePatch {
            contact: Some(Contact {
                email: "b@y.com".to_string(),
                phone: "555".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = merge_into(&mut record, patch);

        assert_eq!(record.contact.email, "a@x.com");
        assert_eq!(record.contact.phone, "555");
        assert_eq!(report.contact_fields_filled, vec!["phone"]);
    }

    #[test]
    fn test_whitespace_contact_field_counts_as_empty() {
        let mut record = ResumeRecord::empty();
        record.contact.full_name = "  ".to_string();
        let patch = ResumePatch {
            contact: Some(Contact {
                full_name: "Ada".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        merge_into(&mut record, patch);
        assert_eq!(record.contact.full_name, "Ada");
    }

    #[test]
    fn test_summary_adopted_only_when_empty() {
        let mut record = ResumeRecord::empty();
        let first = ResumePatch {
            summary: Some(Summary {
                text: "First".to_string(),
                variants: vec!["ignored".to_string()],
            }),
            ..Default::default()
        };
        assert!(merge_into(&mut record, first).summary_adopted);
        assert_eq!(record.summary.text, "First");
        assert!(record.summary.variants.is_empty());

        let second = ResumePatch {
            summary: Some(Summary {
                text: "Second".to_string(),
                variants: Vec::new(),
            }),
            ..Default::default()
        };
        assert!(!merge_into(&mut record, second).summary_adopted);
        assert_eq!(record.summary.text, "First");
    }

    #[test]
    fn test_skills_deduplicated_case_insensitively() {
        let mut record = ResumeRecord::empty();
        record.skills.technical.push(SkillEntry::named("python"));

        let patch = ResumePatch {
            skills: Some(Skills {
                technical: vec![SkillEntry::named("Python"), SkillEntry::named("SQL")],
                ..Default::default()
            }),
            ..Default::default()
        };
        let report = merge_into(&mut record, patch);

        assert_eq!(names(&record.skills.technical), ["python", "SQL"]);
        assert_eq!(report.skills_added, 1);
        assert_eq!(report.skills_skipped, 1);
    }

    #[test]
    fn test_skill_groups_are_independent_and_batch_deduplicated() {
        let mut record = ResumeRecord::empty();
        record.skills.technical.push(SkillEntry::named("Leadership"));

        let patch = ResumePatch {
            skills: Some(Skills {
                soft: vec![
                    SkillEntry::named("Leadership"),
                    SkillEntry::named("leadership "),
                    SkillEntry::named("   "),
                ],
                ..Default::default()
            }),
            ..Default::default()
        };
        merge_into(&mut record, patch);

        assert_eq!(names(&record.skills.soft), ["Leadership"]);
        assert_eq!(record.skills.technical.len(), 1);
    }

    #[test]
    fn test_sections_appended_without_deduplication() {
        let mut record = ResumeRecord::empty();
        let mut exp = ExperienceEntry::new();
        exp.company = "Acme".to_string();
        record.experience.push(exp.clone());

        let mut incoming = exp.clone();
        incoming.id = String::new();
        let report = merge_into(
            &mut record,
            ResumePatch {
                experience: vec![incoming],
                certifications: vec![CertificationEntry::new()],
                ..Default::default()
            },
        );

        assert_eq!(record.experience.len(), 2);
        assert_eq!(record.experience[1].company, "Acme");
        assert!(!record.experience[1].id.is_empty());
        assert_eq!(report.experience_added, 1);
        assert_eq!(report.certifications_added, 1);
        assert_eq!(report.entries_added(), 2);
    }

    #[test]
    fn test_repeated_merge_never_duplicates_ids() {
        let mut record = ResumeRecord::empty();
        let mut exp = ExperienceEntry::new();
        exp.bullets.push(BulletPoint::new("Shipped"));
        let patch = ResumePatch {
            experience: vec![exp],
            education: vec![EducationEntry::new()],
            ..Default::default()
        };

        merge_into(&mut record, patch.clone());
        merge_into(&mut record, patch);

        assert_eq!(record.experience.len(), 2);
        assert_ne!(record.experience[0].id(), record.experience[1].id());
        assert_ne!(record.education[0].id, record.education[1].id);
        assert_ne!(
            record.experience[0].bullets[0].id,
            record.experience[1].bullets[0].id
        );
    }

    #[test]
    fn test_bullet_ids_unique_across_entries_in_one_patch() {
        let mut record = ResumeRecord::empty();
        let mut exp = ExperienceEntry::new();
        exp.bullets.push(BulletPoint::new("Shipped"));
        let mut copy = exp.clone();
        copy.id = String::new();
        merge_into(
            &mut record,
            ResumePatch {
                experience: vec![exp, copy],
                ..Default::default()
            },
        );

        let ids = nested_ids(&record.experience);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn test_merged_current_experience_has_no_end_date() {
        let mut record = ResumeRecord::empty();
        let mut exp = ExperienceEntry::new();
        exp.current = true;
        exp.end_date = "2024-01".to_string();
        merge_into(
            &mut record,
            ResumePatch {
                experience: vec![exp],
                ..Default::default()
            },
        );
        assert_eq!(record.experience[0].end_date, "");
    }

    #[test]
    fn test_absent_groups_leave_record_untouched() {
        let mut record = ResumeRecord::empty();
        record.summary.text = "Keep".to_string();
        record.awards.push(AwardEntry::new());
        let before = record.clone();

        let report = merge_into(&mut record, ResumePatch::default());
        assert_eq!(record, before);
        assert_eq!(report, MergeReport::default());
    }
}
