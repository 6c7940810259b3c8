//! Version constraint expressions.
//!
//! An expression is one or more alternatives joined with `|`; a version is
//! accepted if any alternative accepts it. Alternatives are half-open ranges
//! (`1.2..!2.0`, `1.2..`, `..!2.0`), comparisons (`>=1.0`, `<2`, `!1.5`) or
//! exact versions (`1.2.3`).

use std::fmt;
use std::str::FromStr;

use crate::version::{Version, VersionError};

/// Comparison operator of a single constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Op {
    fn accepts(self, candidate: &Version, bound: &Version) -> bool {
        match self {
            Op::Lt => candidate < bound,
            Op::Le => candidate <= bound,
            Op::Gt => candidate > bound,
            Op::Ge => candidate >= bound,
            Op::Eq => candidate == bound,
            Op::Ne => candidate != bound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Alt {
    /// `min..!before`; either bound may be absent.
    Range {
        min: Option<Version>,
        before: Option<Version>,
    },
    Cmp {
        op: Op,
        version: Version,
    },
}

impl Alt {
    fn accepts(&self, candidate: &Version) -> bool {
        match self {
            Alt::Range { min, before } => {
                if let Some(min) = min {
                    if candidate < min {
                        return false;
                    }
                }
                if let Some(before) = before {
                    if candidate >= before {
                        return false;
                    }
                }
                true
            }
            Alt::Cmp { op, version } => op.accepts(candidate, version),
        }
    }

    fn parse(s: &str, expr: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError::InvalidConstraint {
            expr: expr.to_string(),
            reason: reason.to_string(),
        };

        if let Some((low, high)) = s.split_once("..") {
            let min = if low.is_empty() {
                None
            } else {
                Some(Version::parse(low)?)
            };
            let before = if high.is_empty() {
                None
            } else {
                let high = high
                    .strip_prefix('!')
                    .ok_or_else(|| invalid("range upper bound must start with '!'"))?;
                Some(Version::parse(high)?)
            };
            if min.is_none() && before.is_none() {
                return Err(invalid("range must have at least one bound"));
            }
            return Ok(Alt::Range { min, before });
        }

        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (Op::Ge, rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (Op::Le, rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (Op::Gt, rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Op::Lt, rest)
        } else if let Some(rest) = s.strip_prefix('!') {
            (Op::Ne, rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (Op::Eq, rest)
        } else {
            (Op::Eq, s)
        };

        Ok(Alt::Cmp {
            op,
            version: Version::parse(rest)?,
        })
    }
}

/// A parsed constraint expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionExpr {
    alts: Vec<Alt>,
    source: String,
}

impl VersionExpr {
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let mut alts = Vec::new();
        for part in s.split('|') {
            let part = part.trim();
            if part.is_empty() {
                return Err(VersionError::InvalidConstraint {
                    expr: s.to_string(),
                    reason: "empty alternative".to_string(),
                });
            }
            alts.push(Alt::parse(part, s)?);
        }
        Ok(VersionExpr {
            alts,
            source: s.to_string(),
        })
    }

    /// Whether `candidate` satisfies this expression. The dummy sentinel
    /// satisfies every expression.
    pub fn accepts(&self, candidate: &Version) -> bool {
        candidate.is_dummy() || self.alts.iter().any(|alt| alt.accepts(candidate))
    }
}

impl FromStr for VersionExpr {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionExpr::parse(s)
    }
}

impl fmt::Display for VersionExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accepts(expr: &str, version: &str) -> bool {
        VersionExpr::parse(expr)
            .unwrap()
            .accepts(&Version::parse(version).unwrap())
    }

    #[test]
    fn test_exact() {
        assert!(accepts("1.2", "1.2"));
        assert!(accepts("=1.2", "1.2"));
        assert!(!accepts("1.2", "1.2.1"));
    }

    #[test]
    fn test_comparisons() {
        assert!(accepts(">=2", "2.0"));
        assert!(accepts(">=2", "3.1"));
        assert!(!accepts(">=2", "1.9"));
        assert!(accepts("<2", "1.9"));
        assert!(!accepts("<2", "2.0"));
        assert!(accepts("!1.5", "1.4"));
        assert!(!accepts("!1.5", "1.5"));
    }

    #[test]
    fn test_ranges() {
        assert!(accepts("1.2..!2.0", "1.2"));
        assert!(accepts("1.2..!2.0", "1.9"));
        assert!(!accepts("1.2..!2.0", "2.0"));
        assert!(!accepts("1.2..!2.0", "1.1"));
        assert!(accepts("1.2..", "99"));
        assert!(accepts("..!2.0", "0.1"));
        assert!(!accepts("..!2.0", "2.0"));
    }

    #[test]
    fn test_alternatives() {
        let expr = VersionExpr::parse("..!1.0 | >=2.0").unwrap();
        assert!(expr.accepts(&Version::parse("0.9").unwrap()));
        assert!(expr.accepts(&Version::parse("2.0").unwrap()));
        assert!(!expr.accepts(&Version::parse("1.5").unwrap()));
    }

    #[test]
    fn test_dummy_always_accepted() {
        let expr = VersionExpr::parse(">=99").unwrap();
        assert!(expr.accepts(&Version::dummy()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(VersionExpr::parse("").is_err());
        assert!(VersionExpr::parse("1.0 |").is_err());
        assert!(VersionExpr::parse("1.0..2.0").is_err());
        assert!(VersionExpr::parse("..").is_err());
    }
}
