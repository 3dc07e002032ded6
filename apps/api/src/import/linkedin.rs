//! LinkedIn profile parser. Turns the text of a "Save to PDF" profile export
//! into a `ResumePatch` without any AI involvement.
//!
//! The export has a predictable shape: a handful of whole-line section headers
//! (Contact, Top Skills, Summary, Experience, ...) with positional content under
//! each. Anything this parser cannot segment confidently is left out of the
//! patch rather than guessed.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::import::dates::{is_date_range_line, parse_date_range};
use crate::models::resume::{
    BulletPoint, CertificationEntry, Contact, EducationEntry, ExperienceEntry, ResumePatch,
    SkillEntry, Skills, Summary, LANGUAGE_CATEGORY,
};

pub const CONTACT: &str = "Contact";
pub const TOP_SKILLS: &str = "Top Skills";
pub const LANGUAGES: &str = "Languages";
pub const CERTIFICATIONS: &str = "Certifications";
pub const SUMMARY: &str = "Summary";
pub const EXPERIENCE: &str = "Experience";
pub const EDUCATION: &str = "Education";

/// Whole-line headers that delimit sections in a profile export.
pub const SECTION_HEADERS: &[&str] = &[
    CONTACT,
    TOP_SKILLS,
    LANGUAGES,
    CERTIFICATIONS,
    "Honors-Awards",
    SUMMARY,
    EXPERIENCE,
    EDUCATION,
    "Publications",
    "Patents",
    "Volunteer Experience",
    "Organizations",
];

static PAGE_FOOTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Page \d+ of \d+").expect("footer pattern is valid"));

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w.-]+\.\w+").expect("email pattern is valid"));

static LINKEDIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:www\.)?linkedin\.com/in/[\w-]+").expect("linkedin pattern is valid")
});

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)[\w.-]+\.(?:github\.io|com|org|net|dev|io)/?\S*")
        .expect("url pattern is valid")
});

static LOCATION_HINT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)United States|Area|City|State|Remote").expect("location pattern is valid")
});

static LANGUAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*\((.+?)\)\s*$").expect("language pattern is valid"));

/// `Degree, Field · (2014 - 2016)`
static EDU_INLINE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\s*·\s*\((\d{4})\s*[-–]\s*(\d{4})\)").expect("education pattern is valid")
});

/// `· (2014 - 2016)` or `(2014 - 2016)` on a line of its own.
static EDU_STANDALONE_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*·?\s*\(?(\d{4})\s*[-–]\s*(\d{4})\)?").expect("education pattern is valid")
});

const MAX_LOCATION_LEN: usize = 80;

// ────────────────────────────────────────────────────────────────────────────
// Section segmentation
// ────────────────────────────────────────────────────────────────────────────

/// Profile text split into trimmed, non-empty lines.
#[derive(Debug, Clone)]
pub struct ProfileText {
    lines: Vec<String>,
}

impl ProfileText {
    pub fn new(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Lines between `header` and the nearest following boundary: another known
    /// header, a `Page N of M` footer, or the end of the text. Empty when the
    /// header is missing.
    pub fn section_lines(&self, header: &str) -> &[String] {
        let Some(header_idx) = self.lines.iter().position(|l| is_header(l, header)) else {
            return &[];
        };
        let start = header_idx + 1;
        let end = self.lines[start..]
            .iter()
            .position(|l| is_page_footer(l) || is_other_header(l, header))
            .map_or(self.lines.len(), |offset| start + offset);
        &self.lines[start..end]
    }

    pub fn section(&self, header: &str) -> String {
        self.section_lines(header).join("\n")
    }

    /// Lines before the first recognized section header.
    fn preamble(&self) -> &[String] {
        let end = self
            .lines
            .iter()
            .position(|l| is_known_header(l))
            .unwrap_or(self.lines.len());
        &self.lines[..end]
    }
}

fn is_header(line: &str, header: &str) -> bool {
    line.eq_ignore_ascii_case(header)
}

fn is_known_header(line: &str) -> bool {
    SECTION_HEADERS.iter().any(|h| is_header(line, h))
}

fn is_other_header(line: &str, current: &str) -> bool {
    SECTION_HEADERS
        .iter()
        .filter(|h| !h.eq_ignore_ascii_case(current))
        .any(|h| is_header(line, h))
}

pub fn is_page_footer(line: &str) -> bool {
    PAGE_FOOTER_RE.is_match(line)
}

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Parses the extracted text of a LinkedIn profile export.
pub fn parse_profile_text(text: &str) -> ResumePatch {
    let profile = ProfileText::new(text);

    let skills = Skills {
        technical: parse_top_skills(profile.section_lines(TOP_SKILLS)),
        soft: Vec::new(),
        languages: parse_languages(profile.section_lines(LANGUAGES)),
    };

    let patch = ResumePatch {
        contact: Some(parse_contact(&profile)),
        summary: Some(Summary {
            text: profile.section(SUMMARY),
            variants: Vec::new(),
        }),
        experience: parse_experience(profile.section_lines(EXPERIENCE)),
        education: parse_education(profile.section_lines(EDUCATION)),
        skills: Some(skills),
        certifications: parse_certifications(profile.section_lines(CERTIFICATIONS)),
        ..Default::default()
    };

    debug!(
        "LinkedIn profile parsed: {} lines, {} experience, {} education, {} certifications",
        profile.lines().len(),
        patch.experience.len(),
        patch.education.len(),
        patch.certifications.len()
    );

    patch
}

// ────────────────────────────────────────────────────────────────────────────
// Section parsers
// ────────────────────────────────────────────────────────────────────────────

fn parse_contact(profile: &ProfileText) -> Contact {
    let section = profile.section(CONTACT);
    let mut contact = Contact::default();

    if let Some(m) = EMAIL_RE.find(&section) {
        contact.email = m.as_str().to_string();
    }
    if let Some(m) = LINKEDIN_RE.find(&section) {
        contact.linkedin = m.as_str().to_string();
    }

    let urls: Vec<&str> = URL_RE
        .find_iter(&section)
        .filter(|m| !section[..m.start()].ends_with('@'))
        .map(|m| m.as_str())
        .filter(|u| !u.to_ascii_lowercase().contains("linkedin.com"))
        .collect();
    if let Some(gh) = urls.iter().find(|u| u.to_ascii_lowercase().contains("github")) {
        contact.github = gh.to_string();
    }
    if let Some(site) = urls.iter().find(|u| !u.to_ascii_lowercase().contains("github")) {
        contact.portfolio = site.to_string();
    }

    // Name, headline, location precede the first section header.
    let preamble = profile.preamble();
    if let Some(name) = preamble.first() {
        contact.full_name = name.clone();
    }
    if preamble.len() >= 3 {
        if let Some(location) = preamble.last() {
            contact.location = location.clone();
        }
    }

    contact
}

fn parse_top_skills(lines: &[String]) -> Vec<SkillEntry> {
    lines
        .iter()
        .filter(|l| !is_page_footer(l))
        .map(|name| SkillEntry::named(name.as_str()))
        .collect()
}

/// `English (Native or Bilingual)` → name + proficiency; otherwise name only.
fn parse_languages(lines: &[String]) -> Vec<SkillEntry> {
    lines
        .iter()
        .filter(|l| !is_page_footer(l))
        .map(|line| match LANGUAGE_RE.captures(line) {
            Some(c) => SkillEntry::new(c[1].trim(), c[2].trim(), LANGUAGE_CATEGORY),
            None => SkillEntry::new(line.as_str(), "", LANGUAGE_CATEGORY),
        })
        .collect()
}

/// Entries are anchored on their date-range line: title sits one line above it,
/// company two lines above, an optional location right below, then the
/// description until the next entry's company/title/date block.
pub fn parse_experience(lines: &[String]) -> Vec<ExperienceEntry> {
    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        if is_page_footer(line) || !is_date_range_line(line) {
            i += 1;
            continue;
        }

        let (entry, next) = experience_from_date_line(lines, i);
        entries.push(entry);
        i = next.max(i + 1);
    }

    entries
}

/// Builds one entry around the date line at `date_idx`. Returns the entry and
/// the index where scanning should resume.
fn experience_from_date_line(lines: &[String], date_idx: usize) -> (ExperienceEntry, usize) {
    let mut entry = ExperienceEntry::new();

    if date_idx >= 1 {
        entry.title = lines[date_idx - 1].clone();
    }
    if date_idx >= 2 {
        entry.company = lines[date_idx - 2].clone();
    }

    let range = parse_date_range(&lines[date_idx]);
    entry.start_date = range.start_date;
    entry.end_date = range.end_date;
    entry.current = range.current;

    let mut desc_start = date_idx + 1;
    if let Some(next) = lines.get(date_idx + 1) {
        if looks_like_location(next) {
            entry.location = next.clone();
            desc_start += 1;
        }
    }

    let mut description: Vec<&str> = Vec::new();
    let mut j = desc_start;
    while j < lines.len() {
        let line = &lines[j];
        if is_page_footer(line) {
            j += 1;
            continue;
        }
        if next_entry_follows(lines, j) {
            break;
        }
        description.push(line);
        j += 1;
    }

    // Descriptions collapse into a single bullet.
    let text = description.join(" ");
    let text = text.trim();
    if !text.is_empty() {
        entry.bullets.push(BulletPoint::new(text));
    }

    (entry, j)
}

/// True when line `j` is the company or title line of the next entry.
fn next_entry_follows(lines: &[String], j: usize) -> bool {
    [j + 1, j + 2]
        .iter()
        .any(|&k| lines.get(k).is_some_and(|l| is_date_range_line(l)))
}

fn looks_like_location(line: &str) -> bool {
    line.chars().count() < MAX_LOCATION_LEN
        && !line.contains('.')
        && line.chars().any(|c| c.is_ascii_uppercase())
        && (line.contains(',') || LOCATION_HINT_RE.is_match(line))
}

/// Institution line, then either `Degree, Field · (YYYY - YYYY)`, a standalone
/// year range, or a degree/field line optionally followed by a year range.
pub fn parse_education(lines: &[String]) -> Vec<EducationEntry> {
    let lines: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .filter(|l| !is_page_footer(l))
        .collect();

    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let mut entry = EducationEntry::new();
        entry.institution = lines[i].to_string();
        i += 1;

        if let Some(info) = lines.get(i) {
            if let Some(c) = EDU_INLINE_DATE_RE.captures(info) {
                set_degree_and_field(&mut entry, c[1].trim());
                entry.start_date = c[2].to_string();
                entry.end_date = c[3].to_string();
                i += 1;
            } else if let Some(c) = EDU_STANDALONE_DATE_RE.captures(info) {
                entry.start_date = c[1].to_string();
                entry.end_date = c[2].to_string();
                i += 1;
            } else {
                set_degree_and_field(&mut entry, info);
                i += 1;
                if let Some(c) = lines.get(i).and_then(|l| EDU_STANDALONE_DATE_RE.captures(l)) {
                    entry.start_date = c[1].to_string();
                    entry.end_date = c[2].to_string();
                    i += 1;
                }
            }
        }

        entries.push(entry);
    }

    entries
}

fn set_degree_and_field(entry: &mut EducationEntry, text: &str) {
    let mut parts = text.split(',').map(str::trim);
    entry.degree = parts.next().unwrap_or_default().to_string();
    entry.field = parts.collect::<Vec<_>>().join(", ");
}

fn parse_certifications(lines: &[String]) -> Vec<CertificationEntry> {
    lines
        .iter()
        .filter(|l| !is_page_footer(l))
        .map(|name| CertificationEntry {
            name: name.clone(),
            ..CertificationEntry::new()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROFILE_FIXTURE: &str = "
Jane Doe
Staff Software Engineer at Acme
San Francisco Bay Area
Contact
jane.doe@gmail.com
www.linkedin.com/in/jane-doe (LinkedIn)
janedoe.dev (Personal)
github.com/janedoe (Other)
Top Skills
Rust
Distributed Systems
PostgreSQL
Languages
English (Native or Bilingual)
Spanish (Limited Working)
German
Certifications
AWS Certified Solutions Architect
Certified Kubernetes Administrator
Summary
Engineer who builds reliable storage systems.
Experience
Acme Corp
Staff Software Engineer
June 2021 - Present (4 years 9 months)
San Francisco, California, United States
Led the storage team.
Cut p99 latency by 40%.
Globex
Software Engineer
September 2016 - August 2019 (3 years)
Built billing pipelines.
Education
Stanford University
Master of Science - MS, Computer Science · (2014 - 2016)
University of Michigan
Bachelor of Science - BS, Mathematics, Economics
· (2010 - 2014)
Lincoln High School
(2006 - 2010)
Page 2 of 2
";

    fn lines(text: &str) -> Vec<String> {
        ProfileText::new(text).lines().to_vec()
    }

    #[test]
    fn test_section_stops_at_next_header() {
        let p = ProfileText::new("Summary\nFoo bar.\nExperience\nAcme Corp");
        assert_eq!(p.section(SUMMARY), "Foo bar.");
    }

    #[test]
    fn test_section_stops_at_page_footer() {
        let p = ProfileText::new("Top Skills\nRust\nPage 1 of 3\nGo");
        assert_eq!(p.section_lines(TOP_SKILLS), ["Rust".to_string()]);
    }

    #[test]
    fn test_section_header_is_case_insensitive_whole_line() {
        let p = ProfileText::new("SUMMARY\nHello\nMy Experience with Rust\nEDUCATION\nMIT");
        assert_eq!(p.section(SUMMARY), "Hello\nMy Experience with Rust");
    }

    #[test]
    fn test_missing_section_is_empty() {
        let p = ProfileText::new("Summary\nHello");
        assert!(p.section_lines(EXPERIENCE).is_empty());
        assert_eq!(p.section(EDUCATION), "");
    }

    #[test]
    fn test_profile_contact() {
        let patch = parse_profile_text(PROFILE_FIXTURE);
        let c = patch.contact.unwrap();
        assert_eq!(c.full_name, "Jane Doe");
        assert_eq!(c.location, "San Francisco Bay Area");
        assert_eq!(c.email, "jane.doe@gmail.com");
        assert_eq!(c.linkedin, "www.linkedin.com/in/jane-doe");
        assert_eq!(c.portfolio, "janedoe.dev");
        assert_eq!(c.github, "github.com/janedoe");
    }

    #[test]
    fn test_contact_without_location_when_preamble_short() {
        let patch = parse_profile_text("Jane Doe\nEngineer\nContact\njane@x.io");
        let c = patch.contact.unwrap();
        assert_eq!(c.full_name, "Jane Doe");
        assert_eq!(c.location, "");
        assert_eq!(c.email, "jane@x.io");
        assert_eq!(c.portfolio, "");
    }

    #[test]
    fn test_profile_skills_and_languages() {
        let skills = parse_profile_text(PROFILE_FIXTURE).skills.unwrap();
        let names: Vec<&str> = skills.technical.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Rust", "Distributed Systems", "PostgreSQL"]);
        assert_eq!(skills.languages.len(), 3);
        assert_eq!(skills.languages[0].name, "English");
        assert_eq!(skills.languages[0].proficiency, "Native or Bilingual");
        assert_eq!(skills.languages[2].name, "German");
        assert_eq!(skills.languages[2].proficiency, "");
        assert!(skills.languages.iter().all(|s| s.category == LANGUAGE_CATEGORY));
    }

    #[test]
    fn test_profile_summary_and_certifications() {
        let patch = parse_profile_text(PROFILE_FIXTURE);
        assert_eq!(
            patch.summary.unwrap().text,
            "Engineer who builds reliable storage systems."
        );
        let names: Vec<&str> = patch.certifications.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["AWS Certified Solutions Architect", "Certified Kubernetes Administrator"]
        );
        assert!(patch.certifications.iter().all(|c| c.issuer.is_empty()));
    }

    #[test]
    fn test_profile_experience_entries() {
        let exp = parse_profile_text(PROFILE_FIXTURE).experience;
        assert_eq!(exp.len(), 2);

        assert_eq!(exp[0].company, "Acme Corp");
        assert_eq!(exp[0].title, "Staff Software Engineer");
        assert_eq!(exp[0].start_date, "2021-06");
        assert!(exp[0].current);
        assert_eq!(exp[0].end_date, "");
        assert_eq!(exp[0].location, "San Francisco, California, United States");
        assert_eq!(exp[0].bullets.len(), 1);
        assert_eq!(
            exp[0].bullets[0].text,
            "Led the storage team. Cut p99 latency by 40%."
        );

        assert_eq!(exp[1].company, "Globex");
        assert_eq!(exp[1].start_date, "2016-09");
        assert_eq!(exp[1].end_date, "2019-08");
        assert!(!exp[1].current);
        assert_eq!(exp[1].location, "");
        assert_eq!(exp[1].bullets[0].text, "Built billing pipelines.");
    }

    #[test]
    fn test_experience_location_keyword_without_comma() {
        let exp = parse_experience(&lines(
            "Initech\nEngineer\nMarch 2020 - Present\nRemote\nWrote TPS reports",
        ));
        assert_eq!(exp[0].location, "Remote");
        assert_eq!(exp[0].bullets[0].text, "Wrote TPS reports");
    }

    #[test]
    fn test_experience_next_line_sentence_is_not_location() {
        let exp = parse_experience(&lines(
            "Initech\nEngineer\nMarch 2020 - Present\nShipped the app, on time.",
        ));
        assert_eq!(exp[0].location, "");
        assert_eq!(exp[0].bullets[0].text, "Shipped the app, on time.");
    }

    #[test]
    fn test_experience_without_description_has_no_bullets() {
        let exp = parse_experience(&lines(
            "Acme\nCTO\nJanuary 2022 - Present\nGlobex\nCEO\nMay 2019 - December 2021",
        ));
        assert_eq!(exp.len(), 2);
        assert!(exp[0].bullets.is_empty());
        assert_eq!(exp[1].company, "Globex");
        assert_eq!(exp[1].end_date, "2021-12");
    }

    #[test]
    fn test_experience_date_on_first_line_has_no_company_or_title() {
        let exp = parse_experience(&lines("April 2015 - May 2016\nDid work"));
        assert_eq!(exp.len(), 1);
        assert_eq!(exp[0].title, "");
        assert_eq!(exp[0].company, "");
    }

    #[test]
    fn test_experience_without_date_lines_is_empty() {
        let exp = parse_experience(&lines("Acme\nEngineer\nBuilt things"));
        assert!(exp.is_empty());
    }

    #[test]
    fn test_profile_education_variants() {
        let edu = parse_profile_text(PROFILE_FIXTURE).education;
        assert_eq!(edu.len(), 3);

        assert_eq!(edu[0].institution, "Stanford University");
        assert_eq!(edu[0].degree, "Master of Science - MS");
        assert_eq!(edu[0].field, "Computer Science");
        assert_eq!((edu[0].start_date.as_str(), edu[0].end_date.as_str()), ("2014", "2016"));

        assert_eq!(edu[1].degree, "Bachelor of Science - BS");
        assert_eq!(edu[1].field, "Mathematics, Economics");
        assert_eq!((edu[1].start_date.as_str(), edu[1].end_date.as_str()), ("2010", "2014"));

        assert_eq!(edu[2].institution, "Lincoln High School");
        assert_eq!(edu[2].degree, "");
        assert_eq!(edu[2].start_date, "2006");
    }

    #[test]
    fn test_education_without_dates() {
        let edu = parse_education(&lines("Coursera\nMachine Learning\nMIT"));
        assert_eq!(edu.len(), 2);
        assert_eq!(edu[0].degree, "Machine Learning");
        assert_eq!(edu[0].field, "");
        assert_eq!(edu[0].start_date, "");
        assert_eq!(edu[1].institution, "MIT");
    }

    #[test]
    fn test_unrecognized_text_yields_empty_collections() {
        let patch = parse_profile_text("just some words\nwith no structure");
        assert!(patch.experience.is_empty());
        assert!(patch.education.is_empty());
        assert!(patch.certifications.is_empty());
        assert!(patch.skills.unwrap().is_empty());
        assert_eq!(patch.summary.unwrap().text, "");
        assert_eq!(patch.contact.unwrap().full_name, "just some words");
    }

    #[test]
    fn test_empty_text() {
        let patch = parse_profile_text("");
        assert_eq!(patch.entry_count(), 0);
        assert!(patch.contact.unwrap().is_empty());
    }
}
