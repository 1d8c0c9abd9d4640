//! Version parsing and range matching
//!
//! Xcode and Swift report versions loosely ("14.3", "Xcode 15.0.1",
//! "5.9.2-dev"), and users write ranges the way the npm ecosystem does
//! ("^14", ">=13 <15", "14.x || 15.1"). Both are normalised onto `semver`.

use std::fmt;
use std::sync::OnceLock;

use regex_lite::Regex;
use semver::{Version, VersionReq};

/// Find the first `major[.minor[.patch]]` in `text`, filling missing parts with zero
pub fn coerce_version(text: &str) -> Option<Version> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("version pattern is valid")
    });

    let captures = pattern.captures(text)?;
    let part = |i: usize| -> Option<u64> {
        match captures.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

/// A set of acceptable versions
///
/// Alternatives are separated by `||`; within one alternative all
/// comparators must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    text: String,
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Matches every version
    pub fn any() -> Self {
        Self {
            text: "*".to_string(),
            alternatives: vec![VersionReq::STAR],
        }
    }

    /// Parse an npm-style range
    pub fn parse(text: &str) -> Result<Self, semver::Error> {
        let alternatives = text
            .split("||")
            .map(|alternative| VersionReq::parse(&normalize(alternative)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            text: text.trim().to_string(),
            alternatives,
        })
    }

    /// Range accepting patch releases of `version`, e.g. `5.0` → `>=5.0.0 <5.1.0`
    pub fn tilde(version: &str) -> Result<Self, semver::Error> {
        Self::parse(&format!("~{}", version.trim()))
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

const OPERATORS: &[&str] = &[">=", "<=", ">", "<", "=", "^", "~"];

/// Rewrite one npm-style alternative into `semver` requirement syntax
fn normalize(alternative: &str) -> String {
    let alternative = alternative.trim();

    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(">={}, <={}", low.trim(), high.trim());
    }

    let mut comparators = Vec::new();
    let mut pending_operator: Option<&str> = None;

    for token in alternative.split(|c: char| c.is_whitespace() || c == ',') {
        if token.is_empty() {
            continue;
        }
        if OPERATORS.contains(&token) {
            pending_operator = Some(token);
            continue;
        }
        let token = match pending_operator.take() {
            Some(op) => format!("{}{}", op, token),
            None => token.to_string(),
        };
        comparators.push(pin_bare_version(&token));
    }

    if comparators.is_empty() {
        "*".to_string()
    } else {
        comparators.join(", ")
    }
}

/// A version without an operator pins its given prefix: `14.2` → `=14.2`, `14.x` → `=14`
fn pin_bare_version(token: &str) -> String {
    let token = token.strip_prefix('v').unwrap_or(token);
    if !token.starts_with(|c: char| c.is_ascii_digit() || c == '*' || c == 'x' || c == 'X') {
        return token.to_string();
    }

    let fixed: Vec<&str> = token
        .split('.')
        .take_while(|part| !matches!(*part, "x" | "X" | "*"))
        .collect();

    if fixed.is_empty() {
        "*".to_string()
    } else {
        format!("={}", fixed.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(text: &str) -> Version {
        Version::parse(text).unwrap()
    }

    #[test]
    fn test_coerce_version() {
        assert_eq!(coerce_version("14.3"), Some(v("14.3.0")));
        assert_eq!(coerce_version("Xcode 15.0.1\n"), Some(v("15.0.1")));
        assert_eq!(coerce_version("16"), Some(v("16.0.0")));
        assert_eq!(coerce_version("5.9.2-dev"), Some(v("5.9.2")));
        assert_eq!(coerce_version("(null)"), None);
        assert_eq!(coerce_version(""), None);
    }

    #[test]
    fn test_bare_version_pins_prefix() {
        let range = VersionRange::parse("14.2").unwrap();
        assert!(range.matches(&v("14.2.0")));
        assert!(range.matches(&v("14.2.1")));
        assert!(!range.matches(&v("14.3.0")));

        let range = VersionRange::parse("14").unwrap();
        assert!(range.matches(&v("14.3.1")));
        assert!(!range.matches(&v("15.0.0")));
    }

    #[test]
    fn test_caret_and_tilde() {
        let range = VersionRange::parse("^14.1").unwrap();
        assert!(range.matches(&v("14.3.0")));
        assert!(!range.matches(&v("14.0.0")));
        assert!(!range.matches(&v("15.0.0")));

        let range = VersionRange::tilde("5.0").unwrap();
        assert!(range.matches(&v("5.0.1")));
        assert!(!range.matches(&v("5.1.0")));
        assert!(!range.matches(&v("4.2.0")));
    }

    #[test]
    fn test_space_separated_comparators() {
        for text in [">=13 <15", ">= 13 < 15", ">=13, <15"] {
            let range = VersionRange::parse(text).unwrap();
            assert!(range.matches(&v("14.9.9")), "{}", text);
            assert!(!range.matches(&v("15.0.0")), "{}", text);
            assert!(!range.matches(&v("12.5.0")), "{}", text);
        }
    }

    #[test]
    fn test_alternatives_and_wildcards() {
        let range = VersionRange::parse("13.x || 15.1").unwrap();
        assert!(range.matches(&v("13.4.1")));
        assert!(range.matches(&v("15.1.0")));
        assert!(!range.matches(&v("14.0.0")));
        assert!(!range.matches(&v("15.2.0")));
        assert_eq!(range.to_string(), "13.x || 15.1");
    }

    #[test]
    fn test_hyphen_range() {
        let range = VersionRange::parse("13.1 - 14").unwrap();
        assert!(range.matches(&v("13.1.0")));
        assert!(range.matches(&v("14.9.0")));
        assert!(!range.matches(&v("13.0.9")));
        assert!(!range.matches(&v("15.0.0")));
    }

    #[test]
    fn test_any() {
        for text in ["*", "x", ""] {
            assert!(VersionRange::parse(text).unwrap().matches(&v("1.0.0")));
        }
        assert!(VersionRange::any().matches(&v("99.0.0")));
    }

    #[test]
    fn test_invalid_range() {
        assert!(VersionRange::parse("latest").is_err());
        assert!(VersionRange::parse(">=banana").is_err());
    }
}
