//! String-aware structural scanner shared by extraction, repair, and salvage.
//!
//! One primitive replaces the per-stage regex scanning the original logic
//! grew: a byte-at-a-time state machine tracking in-string status, backslash
//! escapes, and the stack of open containers.

/// Incremental scan state over a JSON-ish byte stream.
#[derive(Debug, Default, Clone)]
pub struct ScanState {
    in_string: bool,
    escape: bool,
    stack: Vec<u8>,
}

impl ScanState {
    /// Feeds one byte. Structural characters inside strings never touch the
    /// stack; a quote preceded by an unescaped backslash does not toggle
    /// string state.
    pub fn step(&mut self, b: u8) {
        if self.in_string {
            if self.escape {
                self.escape = false;
            } else if b == b'\\' {
                self.escape = true;
            } else if b == b'"' {
                self.in_string = false;
            }
            return;
        }
        match b {
            b'"' => self.in_string = true,
            b'{' | b'[' => self.stack.push(b),
            b'}' => {
                if self.stack.last() == Some(&b'{') {
                    self.stack.pop();
                }
            }
            b']' => {
                if self.stack.last() == Some(&b'[') {
                    self.stack.pop();
                }
            }
            _ => {}
        }
    }

    pub fn in_string(&self) -> bool {
        self.in_string
    }

    /// Current container nesting depth.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Closers needed to bring nesting back to zero, last-opened first.
    /// The LIFO order matters: `{"a":[1` must close as `]}`, never `}]`.
    pub fn closing_suffix(&self) -> String {
        self.stack
            .iter()
            .rev()
            .map(|&b| if b == b'{' { '}' } else { ']' })
            .collect()
    }
}

/// Scans an entire text and returns the final state.
pub fn scan(text: &str) -> ScanState {
    let mut state = ScanState::default();
    for &b in text.as_bytes() {
        state.step(b);
    }
    state
}

/// True when the quote at `at` is preceded by an odd run of backslashes.
pub fn is_escaped(bytes: &[u8], at: usize) -> bool {
    let mut backslashes = 0usize;
    let mut i = at;
    while i > 0 && bytes[i - 1] == b'\\' {
        backslashes += 1;
        i -= 1;
    }
    backslashes % 2 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closers_are_lifo() {
        assert_eq!(scan(r#"{"a":[{"b":1"#).closing_suffix(), "}]}");
        assert_eq!(scan(r#"[{"a":[1,2"#).closing_suffix(), "]}]");
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let st = scan(r#"{"a":"}{][""#);
        assert_eq!(st.closing_suffix(), "}");
        assert!(!st.in_string());
    }

    #[test]
    fn escaped_quote_does_not_close_string() {
        let st = scan(r#"{"a":"x\"y"#);
        assert!(st.in_string());
        let st = scan(r#"{"a":"x\\"#);
        assert!(st.in_string());
    }

    #[test]
    fn mismatched_closer_is_ignored() {
        let st = scan(r#"{"a":1]"#);
        assert_eq!(st.closing_suffix(), "}");
    }
}
