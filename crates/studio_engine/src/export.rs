use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use studio_core::{count_words, FlowKind};
use studio_logging::studio_info;

use crate::persist::{AtomicFileWriter, PersistError};

/// Windows-safe, deterministic filename: `{sanitized_title}--{short_hash(content)}.md`
pub fn deterministic_filename(title: &str, content: &str) -> String {
    let sanitized = sanitize_title(title);
    let hash = short_hash(content);
    format!("{sanitized}--{hash}.md")
}

fn sanitize_title(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return "untitled".to_string();
    }

    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }
    // Truncate on a char boundary.
    let mut final_name: String = compacted.chars().take(80).collect();
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}

/// Prepends YAML-style frontmatter. Returns the body's word count and the
/// full document.
pub fn build_markdown_document(
    flow: FlowKind,
    title: &str,
    generated_utc: &str,
    body_markdown: &str,
) -> (usize, String) {
    let word_count = count_words(body_markdown);
    let title = title.replace('\n', " ");
    let doc = format!(
        "---\nflow: {flow}\ntitle: {title}\ngenerated_utc: {generated_utc}\nword_count: {word_count}\n---\n\n{body_markdown}"
    );
    (word_count, doc)
}

/// Writes the document into `dir` and returns the final path.
pub fn export_document(
    dir: &Path,
    flow: FlowKind,
    title: &str,
    body_markdown: &str,
    generated_at: DateTime<Utc>,
) -> Result<PathBuf, PersistError> {
    let generated_utc = generated_at.to_rfc3339_opts(SecondsFormat::Secs, true);
    let (word_count, document) = build_markdown_document(flow, title, &generated_utc, body_markdown);
    let filename = deterministic_filename(title, body_markdown);
    let path = AtomicFileWriter::new(dir.to_path_buf()).write(&filename, &document)?;
    studio_info!("Exported {} words to {}", word_count, path.display());
    Ok(path)
}
