//! `${name}` placeholder substitution for URL templates.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]+)\}").unwrap_or_else(|e| panic!("invalid placeholder pattern: {e}"))
});

/// Replaces every `${name}` in `template` with `params[name]`.
///
/// Unknown names are replaced with the empty string and the result is trimmed.
///
/// ```
/// use std::collections::HashMap;
/// use weather_core::format_template;
///
/// let params = HashMap::from([("station", "10637".to_string())]);
/// assert_eq!(
///     format_template("daily?station=${station}&end=${end}", &params),
///     "daily?station=10637&end="
/// );
/// ```
#[must_use]
pub fn format_template<S: AsRef<str>>(template: &str, params: &HashMap<&str, S>) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            params
                .get(&caps[1])
                .map(|value| value.as_ref().to_string())
                .unwrap_or_default()
        })
        .trim()
        .to_string()
}
