// ============================================================
// Layer 4: Sentence Preprocessor
// ============================================================
// Normalises one raw sentence into the whitespace-tokenised form
// the vocabularies are built from:
//
//   "Hello, World!"  →  "<s> hello , world ! </s>"
//
// Steps (applied in order):
//   1. Map tabs, non-breaking / zero-width spaces and control
//      characters to plain spaces; double quotes are dropped
//   2. Surround "...", "?", ".", "!", "," and "¿" with spaces
//   3. Collapse whitespace runs, trim, lowercase
//   4. Wrap in the <s> ... </s> markers
//
// The same normaliser runs at corpus-load time and for every
// interactive sentence, so training and inference agree on
// token boundaries.

use crate::domain::tokens::{END_TOKEN, START_TOKEN};

const PUNCTUATION: [char; 5] = ['?', '.', '!', ',', '¿'];

pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Full normalisation, markers included.
    pub fn normalize(&self, sentence: &str) -> String {
        let body = self.normalize_body(sentence);
        if body.is_empty() {
            format!("{START_TOKEN} {END_TOKEN}")
        } else {
            format!("{START_TOKEN} {body} {END_TOKEN}")
        }
    }

    /// Normalisation without the sentence markers.
    pub fn normalize_body(&self, sentence: &str) -> String {
        let spaced = split_punctuation(&clean_chars(sentence));
        spaced
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Character cleanup ────────────────────────────────────────────────────────
fn clean_chars(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\t' | '\u{00A0}' | '\u{200B}' | '\u{FEFF}' => ' ',
            '"' => ' ',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

// ─── Punctuation spacing ──────────────────────────────────────────────────────
// An ellipsis is one token, not three full stops.
fn split_punctuation(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 8);
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i..].starts_with(&['.', '.', '.']) {
            out.push_str(" ... ");
            i += 3;
            continue;
        }
        let c = chars[i];
        if PUNCTUATION.contains(&c) {
            out.push(' ');
            out.push(c);
            out.push(' ');
        } else {
            out.push(c);
        }
        i += 1;
    }

    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_and_lowercases() {
        let p = Preprocessor::new();
        assert_eq!(p.normalize("Hello World"), "<s> hello world </s>");
    }

    #[test]
    fn test_separates_punctuation() {
        let p = Preprocessor::new();
        assert_eq!(p.normalize("Hi, you!"), "<s> hi , you ! </s>");
        assert_eq!(p.normalize("¿Qué?"), "<s> ¿ qué ? </s>");
    }

    #[test]
    fn test_ellipsis_is_single_token() {
        let p = Preprocessor::new();
        assert_eq!(p.normalize("wait..."), "<s> wait ... </s>");
        assert_eq!(p.normalize("wait...."), "<s> wait ... . </s>");
    }

    #[test]
    fn test_collapses_spaces_and_drops_quotes() {
        let p = Preprocessor::new();
        assert_eq!(
            p.normalize("  he said   \"no\"\t now "),
            "<s> he said no now </s>"
        );
    }

    #[test]
    fn test_empty_sentence_keeps_markers() {
        let p = Preprocessor::new();
        assert_eq!(p.normalize("   "), "<s> </s>");
    }
}
