//! Parsed implementation versions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Empty version string")]
    Empty,
    #[error("Invalid version component \"{component}\" in \"{version}\"")]
    InvalidComponent { component: String, version: String },
    #[error("Invalid constraint \"{expr}\": {reason}")]
    InvalidConstraint { expr: String, reason: String },
}

/// Modifier rank of a version segment. Plain numeric segments rank as
/// [`Modifier::None`], so `1.0-pre < 1.0 < 1.0-post`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Modifier {
    Pre,
    Rc,
    None,
    Post,
}

impl Modifier {
    fn as_str(self) -> &'static str {
        match self {
            Modifier::Pre => "pre",
            Modifier::Rc => "rc",
            Modifier::None => "",
            Modifier::Post => "post",
        }
    }
}

/// One `-`-separated segment: an optional modifier word followed by dotted
/// integers (`1.2.3`, `pre1`, `post`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment {
    modifier: Modifier,
    numbers: Vec<i64>,
}

impl Segment {
    fn parse(chunk: &str, original: &str) -> Result<Self, VersionError> {
        let (modifier, rest) = if let Some(rest) = chunk.strip_prefix("pre") {
            (Modifier::Pre, rest)
        } else if let Some(rest) = chunk.strip_prefix("rc") {
            (Modifier::Rc, rest)
        } else if let Some(rest) = chunk.strip_prefix("post") {
            (Modifier::Post, rest)
        } else {
            (Modifier::None, chunk)
        };

        let mut numbers = Vec::new();
        if !rest.is_empty() {
            for part in rest.split('.') {
                let n: i64 = part.parse().map_err(|_| VersionError::InvalidComponent {
                    component: chunk.to_string(),
                    version: original.to_string(),
                })?;
                numbers.push(n);
            }
        }

        // A plain segment must carry at least one number ("1-" is invalid).
        if modifier == Modifier::None && numbers.is_empty() {
            return Err(VersionError::InvalidComponent {
                component: chunk.to_string(),
                version: original.to_string(),
            });
        }

        Ok(Segment { modifier, numbers })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Modifier and first number are written adjacent (pre1).
        write!(f, "{}", self.modifier.as_str())?;
        for (i, n) in self.numbers.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

/// A parsed version.
///
/// [`Version::dummy`] is the sentinel used for the diagnostic-mode dummy
/// implementation; it cannot be produced by parsing and sorts above every
/// release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Version {
    Dummy,
    Release(ReleaseVersion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    segments: Vec<Segment>,
}

impl Version {
    /// The diagnostic sentinel version.
    pub fn dummy() -> Self {
        Version::Dummy
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self, Version::Dummy)
    }

    pub fn parse(s: &str) -> Result<Self, VersionError> {
        if s.is_empty() {
            return Err(VersionError::Empty);
        }
        let mut segments = Vec::new();
        for (i, chunk) in s.split('-').enumerate() {
            if chunk.is_empty() {
                return Err(VersionError::InvalidComponent {
                    component: String::new(),
                    version: s.to_string(),
                });
            }
            let seg = Segment::parse(chunk, s)?;
            // The leading segment is always plain dotted integers.
            if i == 0 && seg.modifier != Modifier::None {
                return Err(VersionError::InvalidComponent {
                    component: chunk.to_string(),
                    version: s.to_string(),
                });
            }
            segments.push(seg);
        }
        Ok(Version::Release(ReleaseVersion { segments }))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Dummy => write!(f, "dummy"),
            Version::Release(r) => {
                for (i, seg) in r.segments.iter().enumerate() {
                    if i > 0 {
                        write!(f, "-")?;
                    }
                    write!(f, "{}", seg)?;
                }
                Ok(())
            }
        }
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Version::Dummy, Version::Dummy) => Ordering::Equal,
            (Version::Dummy, _) => Ordering::Greater,
            (_, Version::Dummy) => Ordering::Less,
            (Version::Release(a), Version::Release(b)) => cmp_segments(&a.segments, &b.segments),
        }
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn cmp_segments(a: &[Segment], b: &[Segment]) -> Ordering {
    let blank = Segment {
        modifier: Modifier::None,
        numbers: Vec::new(),
    };
    let len = a.len().max(b.len());
    for i in 0..len {
        let sa = a.get(i).unwrap_or(&blank);
        let sb = b.get(i).unwrap_or(&blank);
        match sa.modifier.cmp(&sb.modifier) {
            Ordering::Equal => {}
            other => return other,
        }
        match cmp_numbers(&sa.numbers, &sb.numbers) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

fn cmp_numbers(a: &[i64], b: &[i64]) -> Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let na = a.get(i).copied().unwrap_or(0);
        let nb = b.get(i).copied().unwrap_or(0);
        match na.cmp(&nb) {
            Ordering::Equal => {}
            other => return other,
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_and_display_roundtrip() {
        for s in ["1", "1.0", "1.2.3", "1.2-pre", "1.2-pre1", "0.48-post", "1.0-rc2-post"] {
            assert_eq!(v(s).to_string(), s);
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(Version::parse("").is_err());
        assert!(Version::parse("1..2").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1-").is_err());
        assert!(Version::parse("pre1").is_err());
    }

    #[test]
    fn test_ordering() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("1.0") < v("2.0"));
        assert_eq!(v("1.0"), v("1.0"));
        assert_eq!(v("1.0").cmp(&v("1.0.0")), Ordering::Equal);
    }

    #[test]
    fn test_modifier_ordering() {
        assert!(v("1.0-pre") < v("1.0-rc"));
        assert!(v("1.0-rc") < v("1.0"));
        assert!(v("1.0") < v("1.0-post"));
        assert!(v("1.0-pre1") < v("1.0-pre2"));
        assert!(v("1.0-post") < v("1.1-pre"));
    }

    #[test]
    fn test_dummy_sorts_last() {
        assert!(Version::dummy() > v("999999"));
        assert!(Version::dummy().is_dummy());
        assert_eq!(Version::dummy().to_string(), "dummy");
        // "dummy" is not a parseable version.
        assert!(Version::parse("dummy").is_err());
    }
}
