//! Semantic versions with wildcard trailing components.
//!
//! Grounded on `utility/semantic_version.{hpp,cpp}`. A missing `minor` or
//! `patch` is a wildcard that short-circuits ordering comparisons to `Equal`
//! for the *entire* remaining comparison, not just that one field.

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid semantic version: {0}")]
pub struct SemanticVersionParseError(pub String);

impl SemanticVersion {
    pub fn new(major: u64, minor: Option<u64>, patch: Option<u64>) -> Self {
        SemanticVersion {
            major,
            minor,
            patch,
        }
    }

    pub fn parse(input: &str) -> Result<SemanticVersion, SemanticVersionParseError> {
        let err = || SemanticVersionParseError(input.to_owned());
        let s = input.strip_prefix(['v', 'V']).unwrap_or(input);
        let mut parts = s.split('.');

        let major_str = parts.next().ok_or_else(err)?;
        if major_str.is_empty() || !major_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(err());
        }
        let major: u64 = major_str.parse().map_err(|_| err())?;

        let minor = match parts.next() {
            None => None,
            Some("*") => None,
            Some(m) => {
                if m.is_empty() || !m.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                Some(m.parse::<u64>().map_err(|_| err())?)
            }
        };

        let patch = match parts.next() {
            None => None,
            Some("*") => None,
            Some(p) => {
                if p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(err());
                }
                Some(p.parse::<u64>().map_err(|_| err())?)
            }
        };

        if parts.next().is_some() {
            return Err(err());
        }

        Ok(SemanticVersion {
            major,
            minor,
            patch,
        })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.major != other.major {
            return self.major.cmp(&other.major);
        }
        match (self.minor, other.minor) {
            (None, _) | (_, None) => Ordering::Equal,
            (Some(a), Some(b)) => {
                if a != b {
                    return a.cmp(&b);
                }
                match (self.patch, other.patch) {
                    (None, _) | (_, None) => Ordering::Equal,
                    (Some(pa), Some(pb)) => pa.cmp(&pb),
                }
            }
        }
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minor = self
            .minor
            .map(|m| m.to_string())
            .unwrap_or_else(|| "*".to_owned());
        let patch = self
            .patch
            .map(|p| p.to_string())
            .unwrap_or_else(|| "*".to_owned());
        write!(f, "{}.{}.{}", self.major, minor, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let v = SemanticVersion::parse("1.2.3").unwrap();
        assert_eq!(v, SemanticVersion::new(1, Some(2), Some(3)));
    }

    #[test]
    fn parse_wildcards() {
        let v = SemanticVersion::parse("v1.2.*").unwrap();
        assert_eq!(v, SemanticVersion::new(1, Some(2), None));
        let v2 = SemanticVersion::parse("1.*").unwrap();
        assert_eq!(v2, SemanticVersion::new(1, None, None));
    }

    #[test]
    fn wildcard_minor_shortcircuits_whole_comparison() {
        let a = SemanticVersion::new(1, None, None);
        let b = SemanticVersion::new(1, Some(9), Some(9));
        assert_eq!(a.cmp(&b), Ordering::Equal);
    }

    #[test]
    fn wildcard_patch_only_affects_patch() {
        let a = SemanticVersion::new(1, Some(2), None);
        let b = SemanticVersion::new(1, Some(2), Some(9));
        assert_eq!(a.cmp(&b), Ordering::Equal);
        let c = SemanticVersion::new(1, Some(3), None);
        assert_eq!(a.cmp(&c), Ordering::Less);
    }

    #[test]
    fn format_uses_wildcards() {
        let v = SemanticVersion::new(1, Some(2), None);
        assert_eq!(v.to_string(), "1.2.*");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(SemanticVersion::parse("abc").is_err());
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
    }
}
