//! Best-guess completion of a candidate span that failed direct parsing.
//!
//! Repairs are purely structural: unterminated strings, dangling commas,
//! unclosed containers. Field values are never invented; when the structure
//! is too far gone the caller falls through to record salvage.

use crate::scan::{is_escaped, scan};
use crate::types::RepairAction;

/// Lookback window for deciding whether a quote opens a value.
const VALUE_LOOKBACK: usize = 32;

/// Position of the quote that opened the dangling string at end of text,
/// provided a colon inside the lookback window marks it as a value opener.
/// Quotes that close an already-complete `:"..."` pair never qualify: the
/// backward search only ever lands on the final unescaped quote, since every
/// earlier one is paired.
///
/// Known-approximate policy: a colon inside nearby string content can anchor
/// the close at the wrong boundary. The cost is bounded — a wrong cut leaves
/// the text unparseable and salvage takes over.
fn find_string_anchor(text: &str) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = bytes.len();
    while i > 0 {
        i -= 1;
        if bytes[i] == b'"' && !is_escaped(bytes, i) {
            let window = &bytes[i.saturating_sub(VALUE_LOOKBACK)..i];
            if window.contains(&b':') {
                return Some(i);
            }
            return None;
        }
    }
    None
}

fn is_ws(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\r' | b'\t')
}

/// Drops commas that directly precede a closing brace/bracket or end of
/// text, string-aware.
fn strip_trailing_commas(text: &str) -> (String, Vec<RepairAction>) {
    let bytes = text.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut actions = Vec::new();
    let mut in_string = false;
    let mut escape = false;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            out.push(b);
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        if b == b'"' {
            in_string = true;
            out.push(b);
            i += 1;
            continue;
        }
        if b == b',' {
            let mut j = i + 1;
            while j < bytes.len() && is_ws(bytes[j]) {
                j += 1;
            }
            if j >= bytes.len() || bytes[j] == b'}' || bytes[j] == b']' {
                actions.push(RepairAction::at("strip_trailing_comma", i));
                i += 1;
                continue;
            }
        }
        out.push(b);
        i += 1;
    }
    // Input was valid UTF-8 and only ASCII bytes were removed.
    (String::from_utf8_lossy(&out).into_owned(), actions)
}

/// Runs the structural repair passes and returns the candidate document.
///
/// The caller decides success by re-attempting a standard parse; this
/// function never parses.
pub fn repair_candidate(text: &str) -> (String, Vec<RepairAction>) {
    let mut out = text.to_string();
    let mut actions = Vec::new();

    if scan(&out).in_string() {
        match find_string_anchor(&out) {
            Some(q) => {
                let dropped = out.len() - (q + 1);
                out.truncate(q + 1);
                let mut a = RepairAction::at("close_open_string", q);
                a.note = Some(format!("discarded {dropped} trailing bytes"));
                actions.push(a);
            }
            None => {
                actions.push(RepairAction::at("close_open_string", out.len()));
                out.push('"');
            }
        }
    }

    let (stripped, comma_actions) = strip_trailing_commas(&out);
    if stripped != out {
        out = stripped;
        actions.extend(comma_actions);
    }

    let closers = scan(&out).closing_suffix();
    if !closers.is_empty() {
        let mut a = RepairAction::at("close_containers", out.len());
        a.note = Some(closers.clone());
        actions.push(a);
        out.push_str(&closers);
    }

    (out, actions)
}

/// Last-ditch rescue: collect flat complete objects (no nested braces) that
/// carry both an `"id"` and a `"priority"` field, and wrap exactly those in
/// a fresh array. Returns `None` when nothing matches.
pub fn rescue_flat_records(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    let mut in_string = false;
    let mut escape = false;
    let mut open: Option<usize> = None;
    let mut spans: Vec<&str> = Vec::new();
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
            } else if b == b'\\' {
                escape = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            // A nested open supersedes the previous one, keeping only
            // innermost (flat) object spans.
            b'{' => open = Some(i),
            b'}' => {
                if let Some(s) = open.take() {
                    let span = &text[s..=i];
                    if span.contains("\"id\"")
                        && span.contains("\"priority\"")
                        && serde_json::from_str::<serde_json::Value>(span).is_ok()
                    {
                        spans.push(span);
                    }
                }
            }
            _ => {}
        }
    }
    if spans.is_empty() {
        None
    } else {
        Some(format!("[{}]", spans.join(",")))
    }
}
