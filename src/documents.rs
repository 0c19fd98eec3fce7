//! Text documents: plain text, PDF, DOCX and ODT.
//!
//! Office formats are zip archives with one XML part holding the body; we
//! walk that part's events and keep text runs, turning paragraph ends and
//! explicit line breaks into newlines.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::{PipelineError, Result};
use crate::textclean::TextEntry;

/// Where the body text of a zipped office document lives.
struct XmlLayout {
    part: &'static str,
    paragraph_tags: &'static [&'static [u8]],
    break_tags: &'static [&'static [u8]],
}

const DOCX: XmlLayout = XmlLayout {
    part: "word/document.xml",
    paragraph_tags: &[b"p"],
    break_tags: &[b"br"],
};

const ODT: XmlLayout = XmlLayout {
    part: "content.xml",
    paragraph_tags: &[b"p", b"h"],
    break_tags: &[b"line-break", b"br"],
};

/// Read a document and split it into one entry per non-empty line.
///
/// Supported: `.txt`, `.md`, `.pdf`, `.docx`, `.odt`.
pub fn load_text_entries(path: &Path) -> Result<Vec<TextEntry>> {
    let text = extract_text(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(TextEntry::new)
        .collect())
}

/// Whole-document text. Dispatch by extension.
pub fn extract_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::NotFound(path.to_path_buf()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "md" | "text" => Ok(fs::read_to_string(path)?),
        "pdf" => pdf_extract::extract_text(path)
            .map_err(|e| PipelineError::document(path, e.to_string())),
        "docx" => extract_zipped_xml(path, &DOCX),
        "odt" => extract_zipped_xml(path, &ODT),
        "" => Err(PipelineError::UnsupportedFormat("(no extension)".to_string())),
        other => Err(PipelineError::UnsupportedFormat(format!(".{other}"))),
    }
}

fn extract_zipped_xml(path: &Path, layout: &XmlLayout) -> Result<String> {
    let file = File::open(path)?;
    let mut zip =
        ZipArchive::new(file).map_err(|e| PipelineError::document(path, e.to_string()))?;
    let mut part = zip
        .by_name(layout.part)
        .map_err(|_| PipelineError::document(path, format!("missing {}", layout.part)))?;
    let mut xml = String::new();
    part.read_to_string(&mut xml)?;
    body_text(&xml, layout).map_err(|message| PipelineError::document(path, message))
}

fn body_text(xml: &str, layout: &XmlLayout) -> std::result::Result<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut out = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if layout.break_tags.contains(&local_name(e.name().as_ref())) {
                    out.push('\n');
                }
            }
            Ok(Event::End(e)) => {
                if layout.paragraph_tags.contains(&local_name(e.name().as_ref())) {
                    out.push('\n');
                }
            }
            Ok(Event::Text(t)) => {
                out.push_str(&t.unescape().map_err(|e| e.to_string())?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML error at {}: {e}", reader.buffer_position())),
            _ => {}
        }
        buf.clear();
    }
    Ok(normalize_lines(&out))
}

fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|&b| b == b':') {
        Some(i) => &name[i + 1..],
        None => name,
    }
}

/// Trim every line and drop blank ones.
fn normalize_lines(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<w:document xmlns:w="x"><w:body>
            <w:p><w:r><w:t>First &amp; best</w:t></w:r></w:p>
            <w:p><w:r><w:t>Second</w:t><w:br/><w:t>Third</w:t></w:r></w:p>
        </w:body></w:document>"#;
        assert_eq!(body_text(xml, &DOCX).unwrap(), "First & best\nSecond\nThird");
    }

    #[test]
    fn odt_headings_and_paragraphs() {
        let xml = r#"<office:document-content xmlns:office="o" xmlns:text="t"><office:body><office:text>
            <text:h>Title</text:h><text:p>Body<text:line-break/>more</text:p>
        </office:text></office:body></office:document-content>"#;
        assert_eq!(body_text(xml, &ODT).unwrap(), "Title\nBody\nmore");
    }

    #[test]
    fn unsupported_extension() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("notes.rtf");
        fs::write(&p, "x").unwrap();
        assert!(matches!(
            extract_text(&p),
            Err(PipelineError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn plain_text_lines_become_entries() {
        let td = tempfile::tempdir().unwrap();
        let p = td.path().join("t.txt");
        fs::write(&p, "\n  Apple Inc. is in Cupertino.\n\n  Tim Cook spoke.  \n").unwrap();
        let entries = load_text_entries(&p).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].text, "Apple Inc. is in Cupertino.");
        assert_eq!(entries[1].row, None);
    }
}
