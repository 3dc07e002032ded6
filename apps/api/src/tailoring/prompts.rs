// Prompts for job-targeted tailoring.

pub const TAILOR_SYSTEM_INTRO: &str = "\
    You are an expert ATS resume optimizer. You receive a master resume holding \
    a person's full career history and a job description. Build the strongest \
    single-page resume for that job:
    1. Select the experience, skills, projects and achievements most relevant to the role.
    2. Rewrite bullet points to mirror the job's keywords and requirements, \
    without inventing facts that are not in the master resume.
    3. Write a professional summary aimed at this role.
    4. Order items so direct relevance comes first.
    5. Keep it ATS-friendly: standard section names, matching keywords, quantified results.

    Return the tailored resume as JSON matching this schema:";

pub const TAILORED_SCHEMA_JSON: &str = r#"{
  "contact": { "fullName": "", "email": "", "phone": "", "location": "", "linkedin": "", "portfolio": "", "github": "" },
  "summary": { "text": "" },
  "experience": [{ "company": "", "title": "", "location": "", "startDate": "", "endDate": "", "current": false, "bullets": [{ "text": "" }] }],
  "education": [{ "institution": "", "degree": "", "field": "", "startDate": "", "endDate": "", "gpa": "", "honors": "" }],
  "skills": { "technical": [{ "name": "" }], "soft": [{ "name": "" }] },
  "certifications": [{ "name": "", "issuer": "", "date": "" }],
  "projects": [{ "name": "", "description": "", "technologies": [], "bullets": [{ "text": "" }] }]
}"#;

pub const TAILOR_RULES: &str = "\
    Rules:
    - At most 3-4 experience entries, each with at most 3-4 bullets.
    - 8-12 of the most relevant technical skills.
    - Only certifications and projects relevant to this job.
    - Everything must fit on a single page.";

pub fn tailor_user(master_json: &str, job_description: &str) -> String {
    format!("MASTER RESUME:\n{master_json}\n\nJOB DESCRIPTION:\n{job_description}")
}
