//! Human-readable time deltas such as `3d5h19m`.

use std::sync::LazyLock;

use chrono::TimeDelta;
use regex::Regex;

#[expect(clippy::expect_used, reason = "static regex; failure is a programmer error")]
static DELTA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?P<days>-?\d+)d)?(?:(?P<hours>-?\d+)h)?(?:(?P<minutes>-?\d+)m)?")
        .expect("invalid delta regex")
});

/// Parses a delta made of optional day, hour and minute components, in that
/// order, each an integer immediately followed by its unit letter.
///
/// Unit letters are case-insensitive and every component carries its own
/// sign, so `-13d19m` is minus thirteen days plus nineteen minutes. Parsing
/// is anchored at the start of the text; anything after the last recognised
/// component is ignored.
///
/// Returns `None` when no component is present or a component overflows.
#[must_use]
pub fn parse_delta(text: &str) -> Option<TimeDelta> {
    let captures = DELTA.captures(text.trim())?;

    let components = [
        ("days", TimeDelta::try_days as fn(i64) -> Option<TimeDelta>),
        ("hours", TimeDelta::try_hours),
        ("minutes", TimeDelta::try_minutes),
    ];

    let mut total: Option<TimeDelta> = None;

    for (name, unit) in components {
        let Some(value) = captures.name(name) else {
            continue;
        };
        let component = unit(value.as_str().parse().ok()?)?;
        total = Some(total.unwrap_or_else(TimeDelta::zero).checked_add(&component)?);
    }

    #[cfg(feature = "tracing")]
    tracing::trace!(text, ?total, "parsed delta");

    total
}
