//! Python versions and `requires-python` constraints
//!
//! Lock files record the interpreter range each package supports
//! (`python-versions` in poetry, `requires_python` in pdm). This module
//! parses those expressions and evaluates them against the target version.
//!
//! Supported syntax:
//! - PEP 440 clauses: `==`, `!=`, `>=`, `<=`, `>`, `<`, `~=`, `===`
//! - wildcard releases: `==3.7.*`, `!=3.0.*`
//! - poetry shorthands: `^3.8`, `~3.8`, bare `3.8`, `*`
//! - alternatives joined with `||`

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PlatformError;

static PYTHON_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?$").expect("valid regex"));

static CLAUSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(===|==|!=|~=|>=|<=|>|<|\^|~)?v?(\d+(?:\.\d+)*)(\.\*)?(?:[.\-+]?[A-Za-z][\w.+\-]*)?$",
    )
    .expect("valid regex")
});

/// Target interpreter version, e.g. `3.11` or `3.9.18`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PythonVersion {
    /// Major version
    pub major: u32,
    /// Minor version
    pub minor: u32,
    /// Micro version, when known
    pub micro: Option<u32>,
}

impl PythonVersion {
    /// Create a version without a micro component
    pub fn new(major: u32, minor: u32) -> Self {
        Self {
            major,
            minor,
            micro: None,
        }
    }

    /// Release components with an unknown micro treated as zero
    pub fn release(&self) -> [u32; 3] {
        [self.major, self.minor, self.micro.unwrap_or(0)]
    }
}

impl FromStr for PythonVersion {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = PYTHON_VERSION_RE
            .captures(s.trim())
            .ok_or_else(|| PlatformError::InvalidPythonVersion(s.to_string()))?;
        let number = |i: usize| -> Result<Option<u32>, PlatformError> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>())
                .transpose()
                .map_err(|_| PlatformError::InvalidPythonVersion(s.to_string()))
        };

        Ok(Self {
            major: number(1)?.unwrap_or(0),
            minor: number(2)?.unwrap_or(0),
            micro: number(3)?,
        })
    }
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.micro {
            Some(micro) => write!(f, "{}.{}.{micro}", self.major, self.minor),
            None => write!(f, "{}.{}", self.major, self.minor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Equal,
    NotEqual,
    GreaterEqual,
    LessEqual,
    Greater,
    Less,
    Compatible,
    Arbitrary,
    Caret,
    Tilde,
}

impl Operator {
    fn parse(op: Option<&str>) -> Self {
        match op {
            Some("!=") => Self::NotEqual,
            Some(">=") => Self::GreaterEqual,
            Some("<=") => Self::LessEqual,
            Some(">") => Self::Greater,
            Some("<") => Self::Less,
            Some("~=") => Self::Compatible,
            Some("===") => Self::Arbitrary,
            Some("^") => Self::Caret,
            Some("~") => Self::Tilde,
            _ => Self::Equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Clause {
    op: Operator,
    release: Vec<u32>,
    wildcard: bool,
    raw: String,
}

impl Clause {
    fn parse(token: &str) -> Result<Self, PlatformError> {
        let invalid = || PlatformError::InvalidSpecifier(token.to_string());
        let caps = CLAUSE_RE.captures(token).ok_or_else(invalid)?;
        let op = Operator::parse(caps.get(1).map(|m| m.as_str()));
        let release = caps[2]
            .split('.')
            .map(str::parse::<u32>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| invalid())?;
        let wildcard = caps.get(3).is_some();

        if wildcard && !matches!(op, Operator::Equal | Operator::NotEqual) {
            return Err(invalid());
        }
        if op == Operator::Compatible && release.len() < 2 {
            return Err(invalid());
        }

        Ok(Self {
            op,
            release,
            wildcard,
            raw: caps[2].to_string(),
        })
    }

    fn matches(&self, version: &PythonVersion) -> bool {
        let target = version.release();
        let ordering = compare(&target, &self.release);

        match self.op {
            Operator::Equal if self.wildcard => has_prefix(&target, &self.release),
            Operator::NotEqual if self.wildcard => !has_prefix(&target, &self.release),
            Operator::Equal => ordering.is_eq(),
            Operator::NotEqual => !ordering.is_eq(),
            Operator::GreaterEqual => ordering.is_ge(),
            Operator::LessEqual => ordering.is_le(),
            Operator::Greater => ordering.is_gt(),
            Operator::Less => ordering.is_lt(),
            Operator::Compatible => {
                ordering.is_ge() && has_prefix(&target, &self.release[..self.release.len() - 1])
            }
            Operator::Arbitrary => version.to_string() == self.raw,
            Operator::Caret => ordering.is_ge() && compare(&target, &caret_bound(&self.release)).is_lt(),
            Operator::Tilde => ordering.is_ge() && compare(&target, &tilde_bound(&self.release)).is_lt(),
        }
    }
}

/// Compare two release tuples, padding the shorter one with zeros
fn compare(a: &[u32], b: &[u32]) -> std::cmp::Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let left = a.get(i).copied().unwrap_or(0);
            let right = b.get(i).copied().unwrap_or(0);
            left.cmp(&right)
        })
        .find(|o| o.is_ne())
        .unwrap_or(std::cmp::Ordering::Equal)
}

fn has_prefix(target: &[u32], prefix: &[u32]) -> bool {
    prefix
        .iter()
        .enumerate()
        .all(|(i, part)| target.get(i).copied().unwrap_or(0) == *part)
}

/// Upper bound of `^X.Y.Z`: bump the first non-zero component
fn caret_bound(release: &[u32]) -> Vec<u32> {
    let index = release
        .iter()
        .position(|part| *part != 0)
        .unwrap_or(release.len() - 1);
    let mut bound = release[..=index].to_vec();
    bound[index] += 1;
    bound
}

/// Upper bound of `~X.Y.Z`: bump minor, or major when only major is given
fn tilde_bound(release: &[u32]) -> Vec<u32> {
    let index = if release.len() > 1 { 1 } else { 0 };
    let mut bound = release[..=index].to_vec();
    bound[index] += 1;
    bound
}

/// Parsed `requires-python` expression
///
/// An empty set of alternatives means "any version".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequiresPython {
    alternatives: Vec<Vec<Clause>>,
}

impl RequiresPython {
    /// Parse a constraint expression
    pub fn parse(expr: &str) -> Result<Self, PlatformError> {
        let expr = expr.trim();
        if expr.is_empty() || expr == "*" {
            return Ok(Self::default());
        }

        let alternatives = expr
            .split("||")
            .map(parse_conjunction)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { alternatives })
    }

    /// Whether any version is accepted
    pub fn is_any(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Check a target version against the constraint
    pub fn contains(&self, version: &PythonVersion) -> bool {
        self.is_any()
            || self
                .alternatives
                .iter()
                .any(|clauses| clauses.iter().all(|c| c.matches(version)))
    }
}

/// Parse comma or whitespace separated clauses, allowing `>= 3.6` spacing
fn parse_conjunction(expr: &str) -> Result<Vec<Clause>, PlatformError> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op: Option<&str> = None;

    for word in expr.split(|c: char| c == ',' || c.is_whitespace()) {
        if word.is_empty() {
            continue;
        }
        if word == "*" {
            continue;
        }
        if word.chars().all(|c| "=!<>~^".contains(c)) {
            pending_op = Some(word);
            continue;
        }
        match pending_op.take() {
            Some(op) => tokens.push(format!("{op}{word}")),
            None => tokens.push(word.to_string()),
        }
    }

    if pending_op.is_some() {
        return Err(PlatformError::InvalidSpecifier(expr.to_string()));
    }

    tokens.iter().map(|t| Clause::parse(t)).collect()
}
