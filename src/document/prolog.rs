//! Prolog capture and output normalization
//!
//! Leading `<?...?>` lines (XML declaration, `xml-model` PIs) are kept
//! verbatim outside the tree and prepended again on output.

use once_cell::sync::Lazy;
use regex::Regex;

static PROLOG_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<\?.*\?>\n$").unwrap());
static SPACE_BEFORE_SELF_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r" />").unwrap());

/// Split `text` into its leading processing-instruction lines and the rest.
///
/// A line belongs to the prolog when, including its newline, it is exactly
/// `<?...?>\n`. Capture stops at the first line that is not.
pub fn split_prolog(text: &str) -> (&str, &str) {
    let mut end = 0;
    for line in text.split_inclusive('\n') {
        if PROLOG_LINE.is_match(line) {
            end += line.len();
        } else {
            break;
        }
    }
    text.split_at(end)
}

/// Collapse `" />"` into `"/>"`
pub fn normalize_self_closing(xml: &str) -> String {
    SPACE_BEFORE_SELF_CLOSE.replace_all(xml, "/>").into_owned()
}
