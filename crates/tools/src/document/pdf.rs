use super::{ExtractionError, PageContent};

/// Page break emitted by most PDF producers between pages.
const FORM_FEED: char = '\x0C';

pub fn extract_pdf(bytes: &[u8]) -> Result<Vec<PageContent>, ExtractionError> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| ExtractionError::PdfError(e.to_string()))?;
    let pages = split_pages(&raw);
    if pages.is_empty() {
        tracing::warn!("PDF has no text layer, nothing to index");
    }
    Ok(pages)
}

/// Blank pages are dropped but keep their place in the numbering.
fn split_pages(raw: &str) -> Vec<PageContent> {
    raw.split(FORM_FEED)
        .zip(1..)
        .filter_map(|(chunk, page_number)| {
            let body = chunk.trim();
            (!body.is_empty()).then(|| PageContent {
                page_number,
                text: body.to_owned(),
            })
        })
        .collect()
}
