//! Text extraction from uploaded files.

use std::io::{Cursor, Read};
use std::path::Path;

use bytes::Bytes;
use quick_xml::events::Event;
use tracing::debug;

use crate::errors::AppError;

/// Extensions accepted by `extract_text`.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "md"];

const DOCX_BODY: &str = "word/document.xml";

/// Decodes an upload into plain text. PDF and DOCX decoding run on the
/// blocking pool.
pub async fn extract_text(file_name: &str, bytes: Bytes) -> Result<String, AppError> {
    let ext = extension(file_name);
    let text = match ext.as_str() {
        "pdf" => {
            let text =
                tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                    .await
                    .map_err(|e| {
                        // pdf-extract panics on some malformed documents.
                        if e.is_panic() {
                            AppError::Validation("Could not read PDF: malformed document".to_string())
                        } else {
                            AppError::Internal(anyhow::anyhow!(
                                "spawn_blocking failed in PDF extraction: {e}"
                            ))
                        }
                    })?
                    .map_err(|e| AppError::Validation(format!("Could not read PDF: {e}")))?;
            normalize_extracted_text(&text)
        }
        "docx" => tokio::task::spawn_blocking(move || docx_text(&bytes))
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("spawn_blocking failed in DOCX extraction: {e}"))
            })?
            .map_err(|e| AppError::Validation(format!("Could not read DOCX: {e}")))?,
        "txt" | "md" => String::from_utf8(bytes.to_vec())
            .map_err(|_| AppError::Validation(format!("{file_name} is not valid UTF-8 text")))?,
        _ => {
            return Err(AppError::Validation(format!(
                "Unsupported file format: .{ext}. Please upload one of: {}",
                SUPPORTED_EXTENSIONS.join(", ")
            )))
        }
    };

    debug!("Extracted {} chars from {file_name}", text.len());
    Ok(text)
}

fn extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

/// Collects the text runs of a Word document's body, one line per paragraph.
fn docx_text(bytes: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut xml = Vec::new();
    archive.by_name(DOCX_BODY)?.read_to_end(&mut xml)?;

    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    let mut buf = Vec::new();
    let mut in_text = false;
    let mut out = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => out.push('\t'),
                b"br" | b"cr" | b"p" => out.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => out.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(normalize_extracted_text(&out))
}

/// Trims trailing spaces and collapses runs of blank lines left by document layout.
fn normalize_extracted_text(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() && out.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }
        out.push(line);
    }
    out.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_upload() {
        let text = extract_text("notes.TXT", Bytes::from_static(b"Jane Doe\nEngineer")).await.unwrap();
        assert_eq!(text, "Jane Doe\nEngineer");
    }

    #[tokio::test]
    async fn test_markdown_upload() {
        let text = extract_text("cv.md", Bytes::from_static(b"# Jane")).await.unwrap();
        assert_eq!(text, "# Jane");
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let err = extract_text("resume.doc", Bytes::from_static(&[1, 2, 3])).await.unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.contains(".doc")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    fn docx(body: &str) -> Bytes {
        use std::io::Write;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file(DOCX_BODY, options).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );
        zip.write_all(xml.as_bytes()).unwrap();
        Bytes::from(zip.finish().unwrap().into_inner())
    }

    #[tokio::test]
    async fn test_docx_upload() {
        let bytes = docx(
            "<w:p><w:r><w:t>Jane </w:t></w:r><w:r><w:t xml:space=\"preserve\">Doe</w:t></w:r></w:p>\
             <w:p><w:r><w:t>R&amp;D Engineer</w:t><w:tab/><w:t>2020</w:t></w:r></w:p>\
             <w:p/>\
             <w:p><w:r><w:t>Skills</w:t></w:r></w:p>",
        );
        let text = extract_text("Resume.DOCX", bytes).await.unwrap();
        assert_eq!(text, "Jane Doe\nR&D Engineer\t2020\n\nSkills");
    }

    #[tokio::test]
    async fn test_corrupt_docx_is_validation_error() {
        assert!(matches!(
            extract_text("cv.docx", Bytes::from_static(b"not a zip")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_utf8_text() {
        assert!(matches!(
            extract_text("a.txt", Bytes::from_static(&[0xff, 0xfe, 0xfd])).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_corrupt_pdf_is_validation_error() {
        assert!(matches!(
            extract_text("profile.pdf", Bytes::from_static(b"not a pdf")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_normalize_extracted_text_collapses_blank_runs() {
        assert_eq!(
            normalize_extracted_text("\n\nJane  \n\n\n\nContact\n"),
            "Jane\n\nContact"
        );
    }
}
