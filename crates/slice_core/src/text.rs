//! Text helpers shared by the lenient parsers.

use std::sync::LazyLock;

use regex::Regex;

#[expect(clippy::expect_used, reason = "static regex; failure is a programmer error")]
static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("invalid digits regex"));

/// Returns the first maximal run of ASCII digits in `text` as an integer.
///
/// `"299 insertions(+)"` yields `Some(299)` and `"> 100"` yields `Some(100)`.
/// Returns `None` when `text` contains no digits or the run overflows `u64`.
#[must_use]
pub fn first_integer(text: &str) -> Option<u64> {
    DIGITS.find(text).and_then(|m| m.as_str().parse().ok())
}
