//! PDF text extraction using lopdf
//!
//! Walks every page's content stream and pulls the literal strings shown by
//! the text operators (Tj, TJ, ', ") inside BT/ET blocks. Pages that fail to
//! parse are skipped with a warning rather than failing the whole document.

use super::ExtractError;
use tracing::{debug, warn};

/// Extract text from an in-memory PDF document
pub fn extract_text_from_pdf(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractError::PdfParse {
        message: format!("failed to load PDF: {}", e),
    })?;

    let mut text = String::new();
    let mut page_count = 0usize;

    for page_id in doc.page_iter() {
        page_count += 1;
        match doc.get_page_content(page_id) {
            Ok(content) => {
                let page_text = text_from_content(&content);
                if !page_text.trim().is_empty() {
                    text.push_str(page_text.trim());
                    text.push('\n');
                }
            }
            Err(e) => {
                warn!(page = page_count, error = %e, "failed to read page content, skipping");
            }
        }
    }

    debug!(pages = page_count, extracted_len = text.len(), "pdf extraction complete");

    if text.trim().is_empty() {
        return Err(ExtractError::PdfParse {
            message: "no text content extracted from PDF".to_string(),
        });
    }

    Ok(clean_text(&text))
}

/// Pull shown text out of a page content stream
fn text_from_content(content: &[u8]) -> String {
    let content_str = String::from_utf8_lossy(content);
    let mut text = String::new();
    let mut in_text_block = false;

    for line in content_str.lines() {
        let trimmed = line.trim();

        if trimmed == "BT" {
            in_text_block = true;
            continue;
        }
        if trimmed == "ET" {
            in_text_block = false;
            if !text.ends_with(' ') && !text.is_empty() {
                text.push(' ');
            }
            continue;
        }
        if !in_text_block {
            continue;
        }

        if let Some(shown) = text_from_operator(trimmed) {
            text.push_str(&shown);
            text.push(' ');
        }
    }

    text
}

/// Extract the literal strings from a text-showing operator line
fn text_from_operator(line: &str) -> Option<String> {
    let shows_text = line.ends_with("Tj")
        || line.ends_with("TJ")
        || line.ends_with('\'')
        || line.ends_with('"');
    if !shows_text {
        return None;
    }

    let mut result = String::new();
    let mut current = String::new();
    let mut in_paren = false;
    let mut escaped = false;

    for ch in line.chars() {
        if in_paren {
            if escaped {
                current.push(match ch {
                    'n' => '\n',
                    'r' => '\r',
                    't' => '\t',
                    other => other,
                });
                escaped = false;
            } else {
                match ch {
                    '\\' => escaped = true,
                    ')' => {
                        in_paren = false;
                        result.push_str(&current);
                        current.clear();
                    }
                    _ => current.push(ch),
                }
            }
        } else if ch == '(' {
            in_paren = true;
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Collapse runs of whitespace and strip BOM artifacts
fn clean_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{FEFF}', "")
}
