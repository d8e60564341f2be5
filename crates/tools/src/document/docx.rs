//! DOCX text extraction: paragraphs from `word/document.xml`.

use std::io::{Cursor, Read};

use quick_xml::events::Event;
use quick_xml::Reader;

use super::{ExtractionError, PageContent};

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::DocxError(format!("not a DOCX archive: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|e| ExtractionError::DocxError(format!("missing {DOCUMENT_PART}: {e}")))?
        .read_to_string(&mut xml)?;

    let paragraphs = paragraphs_from_xml(&xml)?;
    Ok(vec![PageContent {
        page_number: 1,
        text: paragraphs.join("\n").trim().to_string(),
    }])
}

/// Collect the text of every `<w:p>` paragraph, in document order.
fn paragraphs_from_xml(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:tab" => current.push('\t'),
                b"w:br" => current.push('\n'),
                b"w:p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::DocxError(e.to_string()))?;
                current.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::DocxError(format!(
                    "malformed XML at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}
