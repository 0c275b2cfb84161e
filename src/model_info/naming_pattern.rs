//! Expansion of generated landmark names.
//!
//! Trackers with large, anonymous landmark sets (a face mesh with hundreds of points)
//! declare their names as a pattern plus a count instead of listing them. The pattern
//! carries one or more index placeholders, written the way most configuration files in
//! the motion-capture ecosystem already write them:
//!
//! | placeholder | index 7 renders as |
//! |-------------|--------------------|
//! | `{}`        | `7`                |
//! | `{0}`       | `7`                |
//! | `{:03}`     | `007`              |
//! | `{:03d}`    | `007`              |
//! | `{:3}`      | `  7`              |
use regex::{Captures, Regex};

use crate::{constants::MarkerName, skelly_errors::SkellyError};

const PLACEHOLDER: &str = r"\{0?(?::(?P<fill>0)?(?P<width>\d+)?d?)?\}";

/// Generate `count` sequential marker names from a naming pattern.
///
/// Arguments
/// -----------------
/// * `pattern`: the naming pattern, containing at least one index placeholder.
/// * `count`: number of names to generate; indices run from `0` to `count - 1`.
///
/// Return
/// ----------
/// * The generated names, in index order.
///
/// Errors
/// ----------
/// * [`SkellyError::InvalidNamingPattern`] if the pattern has no placeholder, since every
///   generated name would then be identical.
pub fn expand_naming_pattern(pattern: &str, count: usize) -> Result<Vec<MarkerName>, SkellyError> {
    let placeholder =
        Regex::new(PLACEHOLDER).map_err(|_| SkellyError::InvalidNamingPattern(pattern.into()))?;

    if !placeholder.is_match(pattern) {
        return Err(SkellyError::InvalidNamingPattern(pattern.into()));
    }

    Ok((0..count)
        .map(|index| {
            placeholder
                .replace_all(pattern, |caps: &Captures| format_index(index, caps))
                .into_owned()
        })
        .collect())
}

fn format_index(index: usize, caps: &Captures) -> String {
    let width = caps
        .name("width")
        .and_then(|w| w.as_str().parse::<usize>().ok())
        .unwrap_or(0);

    if caps.name("fill").is_some() {
        format!("{index:0width$}")
    } else {
        format!("{index:>width$}")
    }
}
