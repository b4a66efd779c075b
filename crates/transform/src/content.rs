use scraper::Html;

/// Strips markup from a message's raw `content_html`, producing the
/// plain-text `content_text` column. `content_html` itself is never
/// touched (spec invariant 5).
pub struct ContentExtractor;

impl ContentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract_cleaned_content(&self, html: &str) -> String {
        if html.is_empty() {
            return String::new();
        }
        let fragment = Html::parse_fragment(html);
        let text: String = fragment
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let extractor = ContentExtractor::new();
        let cleaned = extractor.extract_cleaned_content("<p>Hello   <b>world</b></p>");
        assert_eq!(cleaned, "Hello world");
    }

    #[test]
    fn empty_content_stays_empty() {
        let extractor = ContentExtractor::new();
        assert_eq!(extractor.extract_cleaned_content(""), "");
    }

    #[test]
    fn plain_text_passes_through() {
        let extractor = ContentExtractor::new();
        assert_eq!(extractor.extract_cleaned_content("just text"), "just text");
    }
}
