use super::PageContent;

/// Plain text is a single page. Bytes that are not UTF-8 are replaced
/// rather than rejected.
pub fn extract_txt(bytes: &[u8]) -> Vec<PageContent> {
    let text = String::from_utf8_lossy(bytes);
    vec![PageContent {
        page_number: 1,
        text: text.trim().to_owned(),
    }]
}
