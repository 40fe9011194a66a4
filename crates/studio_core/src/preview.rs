const TRUNCATED_MARKER: &str = "\n…[truncated]";
pub const MAX_PREVIEW_CONTENT: usize = 4_096;

/// Output shown inline on the review step: frontmatter removed, long
/// content cut on a char boundary with a marker appended.
pub fn prepare_preview_content(markdown: &str) -> String {
    let stripped = strip_frontmatter(markdown);
    if stripped.len() <= MAX_PREVIEW_CONTENT {
        stripped.to_string()
    } else {
        let mut end = MAX_PREVIEW_CONTENT;
        while end > 0 && !stripped.is_char_boundary(end) {
            end -= 1;
        }
        let truncated = &stripped[..end];
        format!("{truncated}{TRUNCATED_MARKER}")
    }
}

fn strip_frontmatter(markdown: &str) -> &str {
    let prefix = "---\n";
    if let Some(rest) = markdown.strip_prefix(prefix) {
        if let Some(idx) = rest.find("\n---") {
            let after = &rest[idx + "\n---".len()..];
            return after.trim_start_matches('\n');
        }
    }
    markdown
}
