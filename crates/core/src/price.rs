use std::sync::OnceLock;

use regex::Regex;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Digits, `.` or `,`, exactly two digits, at most one currency symbol, then end of line.
re!(re_trailing_price, r"[0-9]+[.,][0-9]{2}\p{Sc}?$");

/// A price recognized at the end of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceMatch<'a> {
    /// The matched text, verbatim (separator and currency symbol included).
    pub text: &'a str,
    /// Byte offset of `text` within the line that was matched.
    pub start: usize,
}

pub struct PriceMatcher;

impl PriceMatcher {
    /// Find the price anchored at the end of `line`.
    ///
    /// Trailing whitespace is ignored. Numeric-looking text earlier in the line
    /// is never returned; only the end-anchored candidate counts.
    pub fn find(line: &str) -> Option<PriceMatch<'_>> {
        let m = re_trailing_price().find(line.trim_end())?;
        Some(PriceMatch { text: m.as_str(), start: m.start() })
    }

    pub fn is_price_line(line: &str) -> bool {
        Self::find(line).is_some()
    }
}
