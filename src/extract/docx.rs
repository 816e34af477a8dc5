// file: src/extract/docx.rs
// description: text from word/document.xml inside docx containers
// reference: https://docs.rs/zip

use crate::error::{RouterError, Result};
use crate::extract::TextExtractor;
use crate::text::patterns::{DOCX_BREAK, XML_TAG};
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DOCUMENT_XML: &str = "word/document.xml";

pub struct DocxExtractor;

impl DocxExtractor {
    fn read_document_xml(path: &Path) -> Result<String> {
        let file = File::open(path).map_err(|source| RouterError::FileOperation {
            path: path.to_path_buf(),
            source,
        })?;

        let extraction_error = |message: String| RouterError::Extraction {
            path: path.to_path_buf(),
            message,
        };

        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| extraction_error(format!("not a docx container: {}", e)))?;
        let mut entry = archive
            .by_name(DOCUMENT_XML)
            .map_err(|e| extraction_error(format!("missing {}: {}", DOCUMENT_XML, e)))?;

        let mut xml = String::new();
        entry.read_to_string(&mut xml)?;
        Ok(xml)
    }
}

/// Paragraph and break markers become newlines; every other tag is dropped.
pub fn xml_to_text(xml: &str) -> String {
    let with_breaks = DOCX_BREAK.replace_all(xml, "\n");
    let stripped = XML_TAG.replace_all(&with_breaks, "");

    let decoded = stripped
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&");

    decoded
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

impl TextExtractor for DocxExtractor {
    fn name(&self) -> &'static str {
        "docx"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["docx"]
    }

    fn extract(&self, path: &Path) -> Result<String> {
        let xml = Self::read_document_xml(path)?;
        Ok(xml_to_text(&xml))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE_XML: &str = r#"<?xml version="1.0"?><w:document><w:body><w:p><w:r><w:t>Invoice &amp; Receipt</w:t></w:r></w:p><w:p><w:r><w:t>Total</w:t></w:r><w:r><w:br/></w:r><w:r><w:t>40 &lt;USD&gt;</w:t></w:r></w:p></w:body></w:document>"#;

    #[test]
    fn test_xml_to_text() {
        assert_eq!(xml_to_text(SAMPLE_XML), "Invoice & Receipt\nTotal\n40 <USD>");
    }

    #[test]
    fn test_extract_from_container() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("letter.docx");

        let file = File::create(&path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file(DOCUMENT_XML, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(SAMPLE_XML.as_bytes()).unwrap();
        zip.finish().unwrap();

        let text = DocxExtractor.extract(&path).unwrap();
        assert!(text.starts_with("Invoice & Receipt"));
    }

    #[test]
    fn test_rejects_non_zip() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fake.docx");
        std::fs::write(&path, "plain text").unwrap();

        assert!(matches!(
            DocxExtractor.extract(&path),
            Err(RouterError::Extraction { .. })
        ));
    }
}
