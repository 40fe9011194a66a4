use std::collections::BTreeMap;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static SHORTCODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\[cta((?:\s+[A-Za-z_][A-Za-z0-9_-]*="[^"]*")*)\s*/?\]"#)
        .expect("shortcode pattern is valid")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_-]*)="([^"]*)""#).expect("attribute pattern is valid")
});
static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line pattern is valid"));

/// A `[cta key="value" ...]` marker inside placed content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shortcode {
    pub attributes: BTreeMap<String, String>,
    /// Byte range of the whole marker in the source text.
    pub span: Range<usize>,
}

impl Shortcode {
    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }
}

pub fn parse_shortcodes(content: &str) -> Vec<Shortcode> {
    SHORTCODE
        .captures_iter(content)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let attributes = caps
                .get(1)
                .map(|attrs| {
                    ATTRIBUTE
                        .captures_iter(attrs.as_str())
                        .map(|a| (a[1].to_ascii_lowercase(), a[2].to_string()))
                        .collect()
                })
                .unwrap_or_default();
            Some(Shortcode {
                attributes,
                span: whole.range(),
            })
        })
        .collect()
}

/// Removes every CTA marker and collapses the blank lines they leave behind.
pub fn strip_shortcodes(content: &str) -> String {
    let stripped = SHORTCODE.replace_all(content, "");
    BLANK_LINES.replace_all(&stripped, "\n\n").into_owned()
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_attributes_and_spans() {
        let content = "Intro\n[cta id=\"demo\" style=\"button\"]\nBody [CTA id=\"x\"] [cta id=\"end\"/]";
        let codes = parse_shortcodes(content);
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].id(), Some("demo"));
        assert_eq!(codes[0].attributes.get("style").map(String::as_str), Some("button"));
        assert_eq!(&content[codes[0].span.clone()], "[cta id=\"demo\" style=\"button\"]");
        assert_eq!(codes[1].id(), Some("end"));
    }

    #[test]
    fn bare_marker_has_no_attributes() {
        let codes = parse_shortcodes("a [cta] b");
        assert_eq!(codes.len(), 1);
        assert!(codes[0].attributes.is_empty());
        assert_eq!(codes[0].id(), None);
    }

    #[test]
    fn strip_removes_markers_and_blank_runs() {
        let content = "One\n\n[cta id=\"a\"]\n\nTwo";
        assert_eq!(strip_shortcodes(content), "One\n\nTwo");
        assert_eq!(count_words("  one two\nthree "), 3);
    }
}
