//! Locates the outermost JSON value inside conversational model output.

use crate::scan::ScanState;
use crate::types::RepairAction;

/// A candidate span believed to bound one JSON value. Byte offsets index the
/// original raw text; the span is produced once and never mutated.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub text: String,
    pub span: (usize, usize),
    pub truncated: bool,
    pub method: ExtractMethod,
    pub actions: Vec<RepairAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMethod {
    CodeFence,
    BraceScan,
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

/// Finds a fenced code block, tolerating an optional language tag after the
/// opening backticks. Returns (inner_start, inner_end, fence span).
fn find_code_fence(text: &str) -> Option<(usize, usize, (usize, usize))> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 2 < bytes.len() {
        if bytes[i] != b'`' || bytes[i + 1] != b'`' || bytes[i + 2] != b'`' {
            i += 1;
            continue;
        }
        let fence_start = i;
        i += 3;
        // optional language tag, e.g. ```json
        while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
            i += 1;
        }
        while i < bytes.len() && is_ws(bytes[i]) {
            i += 1;
        }
        let inner_start = i;
        while i + 2 < bytes.len() {
            if bytes[i] == b'`' && bytes[i + 1] == b'`' && bytes[i + 2] == b'`' {
                return Some((inner_start, i, (fence_start, i + 3)));
            }
            i += 1;
        }
        // Unterminated fence: truncated output, let the brace scan handle it.
        return None;
    }
    None
}

fn brace_scan(text: &str) -> Option<Extraction> {
    let bytes = text.as_bytes();
    let start_obj = text.find('{');
    let start_arr = text.find('[');
    let (start, close) = match (start_obj, start_arr) {
        (None, None) => return None,
        (Some(o), None) => (o, b'}'),
        (None, Some(a)) => (a, b']'),
        (Some(o), Some(a)) => {
            if o < a {
                (o, b'}')
            } else {
                (a, b']')
            }
        }
    };

    let mut state = ScanState::default();
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        state.step(b);
        if !state.in_string() && state.depth() == 0 && b == close {
            end = Some(i + 1);
            break;
        }
    }

    let (end, truncated) = match end {
        Some(e) => (e, false),
        None => {
            // Never closed. Cut at the last matching closer when only noise
            // follows it; keep the whole tail when another container opens
            // after it, so repair and salvage can still see the partial
            // records.
            let tail_end = match text[start..].rfind(close as char) {
                Some(rel) => {
                    let p = start + rel;
                    if text[p..].contains('{') || text[p..].contains('[') {
                        text.len()
                    } else {
                        p + 1
                    }
                }
                None => text.len(),
            };
            (tail_end, true)
        }
    };

    let mut actions = Vec::new();
    if start > 0 {
        actions.push(RepairAction::at("strip_prefix_text", 0));
    }
    if end < text.len() {
        actions.push(RepairAction::at("strip_suffix_text", end));
    }
    Some(Extraction {
        text: text[start..end].to_string(),
        span: (start, end),
        truncated,
        method: ExtractMethod::BraceScan,
        actions,
    })
}

/// Extracts the most plausible JSON candidate from raw model output.
///
/// Prefers a complete fenced code block whose body starts with `{` or `[`;
/// otherwise scans from the first opener, string-aware. Returns `None` when
/// the text contains no opener at all.
pub fn extract_candidate(raw: &str) -> Option<Extraction> {
    if let Some((inner_start, inner_end, fence)) = find_code_fence(raw) {
        let inner = raw[inner_start..inner_end].trim().trim_matches('`').trim();
        if inner.starts_with('{') || inner.starts_with('[') {
            // The fence body may still carry prose or a truncated tail;
            // re-scan inside it for the exact span.
            if let Some(mut ex) = brace_scan(&raw[inner_start..inner_end]) {
                ex.span = (inner_start + ex.span.0, inner_start + ex.span.1);
                ex.method = ExtractMethod::CodeFence;
                ex.actions.push(RepairAction::at("strip_code_fence", fence.0));
                return Some(ex);
            }
        }
    }
    brace_scan(raw)
}
