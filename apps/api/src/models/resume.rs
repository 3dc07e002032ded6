//! Master resume schema.
//!
//! The JSON layout (camelCase keys) is the export/import document format and
//! must stay stable; new fields are additive only.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "1.0";
pub const DEFAULT_RESUME_NAME: &str = "My Master Resume";
pub const DEFAULT_PROFICIENCY: &str = "intermediate";
pub const DEFAULT_CATEGORY: &str = "general";
pub const LANGUAGE_CATEGORY: &str = "language";

/// Fresh entry identifier. Never reused.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Root aggregate
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeRecord {
    pub version: String,
    pub meta: ResumeMeta,
    pub contact: Contact,
    pub summary: Summary,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Skills,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub awards: Vec<AwardEntry>,
    pub publications: Vec<PublicationEntry>,
}

impl Default for ResumeRecord {
    fn default() -> Self {
        Self::empty()
    }
}

impl ResumeRecord {
    /// An empty record with both timestamps set to now.
    pub fn empty() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            meta: ResumeMeta::default(),
            contact: Contact::default(),
            summary: Summary::default(),
            experience: Vec::new(),
            education: Vec::new(),
            skills: Skills::default(),
            certifications: Vec::new(),
            projects: Vec::new(),
            awards: Vec::new(),
            publications: Vec::new(),
        }
    }

    /// Refreshes `meta.updatedAt`. Called on every mutation.
    pub fn touch(&mut self) {
        self.meta.updated_at = Utc::now();
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses an exported document. Missing fields take their empty defaults,
    /// `null` values are treated as absent, and entries without a usable id get one.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        let mut value: Value = serde_json::from_str(text)?;
        drop_nulls(&mut value);
        let mut record: ResumeRecord = serde_json::from_value(value)?;
        record.assign_ids();
        Ok(record)
    }

    /// Repairs empty or duplicated identifiers in every collection.
    pub fn assign_ids(&mut self) -> usize {
        let mut assigned = 0;
        assigned += assign_ids(&mut self.experience, &mut HashSet::new());
        assigned += assign_ids(&mut self.education, &mut HashSet::new());
        for group in SkillGroup::ALL {
            assigned += assign_ids(self.skills.group_mut(group), &mut HashSet::new());
        }
        assigned += assign_ids(&mut self.certifications, &mut HashSet::new());
        assigned += assign_ids(&mut self.projects, &mut HashSet::new());
        assigned += assign_ids(&mut self.awards, &mut HashSet::new());
        assigned += assign_ids(&mut self.publications, &mut HashSet::new());
        assigned
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeMeta {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
}

impl Default for ResumeMeta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created_at: now,
            updated_at: now,
            name: DEFAULT_RESUME_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Contact {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub portfolio: String,
    pub github: String,
}

impl Contact {
    pub fn fields(&self) -> [(&'static str, &String); 7] {
        [
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("location", &self.location),
            ("linkedin", &self.linkedin),
            ("portfolio", &self.portfolio),
            ("github", &self.github),
        ]
    }

    pub fn fields_mut(&mut self) -> [(&'static str, &mut String); 7] {
        [
            ("fullName", &mut self.full_name),
            ("email", &mut self.email),
            ("phone", &mut self.phone),
            ("location", &mut self.location),
            ("linkedin", &mut self.linkedin),
            ("portfolio", &mut self.portfolio),
            ("github", &mut self.github),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Summary {
    pub text: String,
    /// Alternate drafts, in insertion order. Never de-duplicated.
    pub variants: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Entries
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub id: String,
    pub company: String,
    pub title: String,
    pub location: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    /// `YYYY-MM`, bare year, or empty. Ignored (and kept empty) while `current`.
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    pub current: bool,
    pub bullets: Vec<BulletPoint>,
    pub skills: Vec<String>,
}

impl Default for ExperienceEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperienceEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            company: String::new(),
            title: String::new(),
            location: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            current: false,
            bullets: Vec::new(),
            skills: Vec::new(),
        }
    }
}

/// A bullet owned by an experience or project entry. Accepts either a bare
/// string or the structured object on input; always serialized structured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "BulletInput")]
pub struct BulletPoint {
    pub id: String,
    pub text: String,
    pub tags: Vec<String>,
    pub metrics: Vec<String>,
}

impl BulletPoint {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            text: text.into(),
            tags: Vec::new(),
            metrics: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BulletInput {
    Text(String),
    Structured(StructuredBullet),
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct StructuredBullet {
    id: String,
    text: String,
    tags: Vec<String>,
    metrics: Vec<String>,
}

impl From<BulletInput> for BulletPoint {
    fn from(input: BulletInput) -> Self {
        match input {
            BulletInput::Text(text) => BulletPoint::new(text),
            BulletInput::Structured(b) => BulletPoint {
                id: if b.id.is_empty() { new_id() } else { b.id },
                text: b.text,
                tags: b.tags,
                metrics: b.metrics,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub id: String,
    pub institution: String,
    pub degree: String,
    pub field: String,
    #[serde(deserialize_with = "lenient_string")]
    pub start_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub end_date: String,
    #[serde(deserialize_with = "lenient_string")]
    pub gpa: String,
    pub honors: String,
}

impl Default for EducationEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl EducationEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            institution: String::new(),
            degree: String::new(),
            field: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            gpa: String::new(),
            honors: String::new(),
        }
    }
}

/// Accepts either a bare skill name or the structured object on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "SkillInput", rename_all = "camelCase")]
pub struct SkillEntry {
    pub id: String,
    pub name: String,
    pub proficiency: String,
    pub category: String,
    pub related_skills: Vec<String>,
}

impl SkillEntry {
    pub fn new(
        name: impl Into<String>,
        proficiency: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            proficiency: proficiency.into(),
            category: category.into(),
            related_skills: Vec::new(),
        }
    }

    /// A skill with the default proficiency and category.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_PROFICIENCY, DEFAULT_CATEGORY)
    }

    /// Case-insensitive key used for uniqueness within a skill group.
    pub fn normalized_name(&self) -> String {
        normalize_skill_name(&self.name)
    }
}

pub fn normalize_skill_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SkillInput {
    Name(String),
    Entry(SkillFields),
}

#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SkillFields {
    id: String,
    name: String,
    proficiency: String,
    category: String,
    related_skills: Vec<String>,
}

impl Default for SkillFields {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            proficiency: DEFAULT_PROFICIENCY.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            related_skills: Vec::new(),
        }
    }
}

impl From<SkillInput> for SkillEntry {
    fn from(input: SkillInput) -> Self {
        match input {
            SkillInput::Name(name) => SkillEntry::named(name),
            SkillInput::Entry(s) => SkillEntry {
                id: if s.id.is_empty() { new_id() } else { s.id },
                name: s.name,
                proficiency: s.proficiency,
                category: s.category,
                related_skills: s.related_skills,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillGroup {
    Technical,
    Soft,
    Languages,
}

impl SkillGroup {
    pub const ALL: [SkillGroup; 3] = [SkillGroup::Technical, SkillGroup::Soft, SkillGroup::Languages];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillGroup::Technical => "technical",
            SkillGroup::Soft => "soft",
            SkillGroup::Languages => "languages",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    pub technical: Vec<SkillEntry>,
    pub soft: Vec<SkillEntry>,
    pub languages: Vec<SkillEntry>,
}

impl Skills {
    pub fn group(&self, group: SkillGroup) -> &Vec<SkillEntry> {
        match group {
            SkillGroup::Technical => &self.technical,
            SkillGroup::Soft => &self.soft,
            SkillGroup::Languages => &self.languages,
        }
    }

    pub fn group_mut(&mut self, group: SkillGroup) -> &mut Vec<SkillEntry> {
        match group {
            SkillGroup::Technical => &mut self.technical,
            SkillGroup::Soft => &mut self.soft,
            SkillGroup::Languages => &mut self.languages,
        }
    }

    /// Whether `name` already exists in `group`, compared case-insensitively.
    pub fn contains(&self, group: SkillGroup, name: &str) -> bool {
        let key = normalize_skill_name(name);
        self.group(group).iter().any(|s| s.normalized_name() == key)
    }

    pub fn all_names(&self) -> Vec<&str> {
        SkillGroup::ALL
            .iter()
            .flat_map(|g| self.group(*g).iter().map(|s| s.name.as_str()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.technical.is_empty() && self.soft.is_empty() && self.languages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationEntry {
    pub id: String,
    pub name: String,
    pub issuer: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    pub url: String,
}

impl Default for CertificationEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificationEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            issuer: String::new(),
            date: String::new(),
            url: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectEntry {
    pub id: String,
    pub name: String,
    pub description: String,
    pub url: String,
    pub technologies: Vec<String>,
    pub bullets: Vec<BulletPoint>,
}

impl Default for ProjectEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            description: String::new(),
            url: String::new(),
            technologies: Vec::new(),
            bullets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AwardEntry {
    pub id: String,
    pub name: String,
    pub issuer: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    pub description: String,
}

impl Default for AwardEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl AwardEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            name: String::new(),
            issuer: String::new(),
            date: String::new(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicationEntry {
    pub id: String,
    pub title: String,
    pub venue: String,
    #[serde(deserialize_with = "lenient_string")]
    pub date: String,
    pub url: String,
}

impl Default for PublicationEntry {
    fn default() -> Self {
        Self::new()
    }
}

impl PublicationEntry {
    pub fn new() -> Self {
        Self {
            id: new_id(),
            title: String::new(),
            venue: String::new(),
            date: String::new(),
            url: String::new(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Partial records
// ────────────────────────────────────────────────────────────────────────────

/// A partial record produced by an importer. Absent groups are left alone by
/// the merge engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumePatch {
    pub contact: Option<Contact>,
    pub summary: Option<Summary>,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub skills: Option<Skills>,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub awards: Vec<AwardEntry>,
    pub publications: Vec<PublicationEntry>,
}

impl ResumePatch {
    /// Parses a structured payload, treating `null` as absent.
    pub fn from_value(mut value: Value) -> serde_json::Result<Self> {
        drop_nulls(&mut value);
        let mut patch: ResumePatch = serde_json::from_value(value)?;
        patch.assign_ids();
        Ok(patch)
    }

    /// Gives every entry (and nested bullet) a unique identifier.
    pub fn assign_ids(&mut self) -> usize {
        let mut assigned = 0;
        assigned += assign_ids(&mut self.experience, &mut HashSet::new());
        assigned += assign_ids(&mut self.education, &mut HashSet::new());
        if let Some(skills) = self.skills.as_mut() {
            for group in SkillGroup::ALL {
                assigned += assign_ids(skills.group_mut(group), &mut HashSet::new());
            }
        }
        assigned += assign_ids(&mut self.certifications, &mut HashSet::new());
        assigned += assign_ids(&mut self.projects, &mut HashSet::new());
        assigned += assign_ids(&mut self.awards, &mut HashSet::new());
        assigned += assign_ids(&mut self.publications, &mut HashSet::new());
        assigned
    }

    pub fn entry_count(&self) -> usize {
        self.experience.len()
            + self.education.len()
            + self.skills.as_ref().map_or(0, |s| {
                s.technical.len() + s.soft.len() + s.languages.len()
            })
            + self.certifications.len()
            + self.projects.len()
            + self.awards.len()
            + self.publications.len()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Identifier handling
// ────────────────────────────────────────────────────────────────────────────

pub trait HasId {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);

    /// Identifiers of owned children (bullets).
    fn nested_ids(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Repairs identifiers of owned children against `taken`. Returns how many
    /// were assigned.
    fn assign_nested_ids(&mut self, _taken: &mut HashSet<String>) -> usize {
        0
    }
}

/// Assigns a fresh id to every item whose id is empty or already in `taken`,
/// recording each final id in `taken`. Returns how many ids were assigned.
pub fn assign_ids<T: HasId>(items: &mut [T], taken: &mut HashSet<String>) -> usize {
    assign_ids_with_nested(items, taken, &mut HashSet::new())
}

/// Like [`assign_ids`], with children checked against `nested_taken`, which
/// spans every item so that no two bullets in a collection share an id.
pub fn assign_ids_with_nested<T: HasId>(
    items: &mut [T],
    taken: &mut HashSet<String>,
    nested_taken: &mut HashSet<String>,
) -> usize {
    let mut assigned = 0;
    for item in items.iter_mut() {
        if item.id().is_empty() || taken.contains(item.id()) {
            item.set_id(new_id());
            assigned += 1;
        }
        taken.insert(item.id().to_string());
        assigned += item.assign_nested_ids(nested_taken);
    }
    assigned
}

/// Every child identifier held by `items`.
pub fn nested_ids<T: HasId>(items: &[T]) -> HashSet<String> {
    items
        .iter()
        .flat_map(|item| item.nested_ids())
        .map(str::to_string)
        .collect()
}

macro_rules! impl_has_id {
    ($($ty:ty),* $(,)?) => {
        $(
            impl HasId for $ty {
                fn id(&self) -> &str {
                    &self.id
                }
                fn set_id(&mut self, id: String) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_has_id!(
    BulletPoint,
    EducationEntry,
    SkillEntry,
    CertificationEntry,
    AwardEntry,
    PublicationEntry,
);

impl HasId for ExperienceEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn nested_ids(&self) -> Vec<&str> {
        self.bullets.iter().map(|b| b.id.as_str()).collect()
    }
    fn assign_nested_ids(&mut self, taken: &mut HashSet<String>) -> usize {
        assign_ids(&mut self.bullets, taken)
    }
}

impl HasId for ProjectEntry {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
    fn nested_ids(&self) -> Vec<&str> {
        self.bullets.iter().map(|b| b.id.as_str()).collect()
    }
    fn assign_nested_ids(&mut self, taken: &mut HashSet<String>) -> usize {
        assign_ids(&mut self.bullets, taken)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Collections addressable by section name
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Experience,
    Education,
    Certifications,
    Projects,
    Awards,
    Publications,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Experience => "experience",
            Section::Education => "education",
            Section::Certifications => "certifications",
            Section::Projects => "projects",
            Section::Awards => "awards",
            Section::Publications => "publications",
        }
    }
}

/// An entry type stored in one of the record's ordered collections.
pub trait SectionEntry: HasId + Clone + Default + Serialize + DeserializeOwned {
    const SECTION: Section;

    fn collection(record: &ResumeRecord) -> &Vec<Self>;
    fn collection_mut(record: &mut ResumeRecord) -> &mut Vec<Self>;

    /// Enforces per-entity invariants before the entry is written.
    fn normalize(&mut self) {}
}

impl SectionEntry for ExperienceEntry {
    const SECTION: Section = Section::Experience;

    fn collection(record: &ResumeRecord) -> &Vec<Self> {
        &record.experience
    }
    fn collection_mut(record: &mut ResumeRecord) -> &mut Vec<Self> {
        &mut record.experience
    }
    fn normalize(&mut self) {
        if self.current {
            self.end_date.clear();
        }
    }
}

macro_rules! impl_section_entry {
    ($ty:ty, $section:expr, $field:ident) => {
        impl SectionEntry for $ty {
            const SECTION: Section = $section;

            fn collection(record: &ResumeRecord) -> &Vec<Self> {
                &record.$field
            }
            fn collection_mut(record: &mut ResumeRecord) -> &mut Vec<Self> {
                &mut record.$field
            }
        }
    };
}

impl_section_entry!(EducationEntry, Section::Education, education);
impl_section_entry!(CertificationEntry, Section::Certifications, certifications);
impl_section_entry!(ProjectEntry, Section::Projects, projects);
impl_section_entry!(AwardEntry, Section::Awards, awards);
impl_section_entry!(PublicationEntry, Section::Publications, publications);

// ────────────────────────────────────────────────────────────────────────────
// Lenient input helpers
// ────────────────────────────────────────────────────────────────────────────

/// Removes every object member whose value is `null`, recursively, so that
/// serde defaults apply to them.
pub fn drop_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(drop_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(drop_nulls),
        _ => {}
    }
}

/// Text field that also accepts a JSON number or bool (e.g. `"gpa": 3.8`, `"startDate": 2019`).
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Text(String),
        Number(serde_json::Number),
        Flag(bool),
    }

    Ok(match Option::<Loose>::deserialize(deserializer)? {
        Some(Loose::Text(s)) => s,
        Some(Loose::Number(n)) => n.to_string(),
        Some(Loose::Flag(b)) => b.to_string(),
        None => String::new(),
    })
}
