use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::models::version::Version;

static SPECIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>[^\s<>=!~#]*)\s*(?P<op>===|~=|==|!=|>=|<=|>|<)?\s*(?P<version>[^\s#]*)\s*(?:#\s*(?P<note>.*?))?\s*$")
        .expect("specifier regex is valid")
});

/// Version comparison operator of a requirement specifier
///
/// Serialized as the operator text (`">="`), the same way it is written in
/// a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// `>=`
    GreaterEqual,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `<`
    Less,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `~=` compatible release
    Compatible,
    /// `===` arbitrary string equality
    Arbitrary,
}

impl Comparator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Comparator::GreaterEqual => ">=",
            Comparator::LessEqual => "<=",
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::Equal => "==",
            Comparator::NotEqual => "!=",
            Comparator::Compatible => "~=",
            Comparator::Arbitrary => "===",
        }
    }

    pub fn all() -> &'static [Comparator] {
        &[
            Comparator::GreaterEqual,
            Comparator::LessEqual,
            Comparator::Greater,
            Comparator::Less,
            Comparator::Equal,
            Comparator::NotEqual,
            Comparator::Compatible,
            Comparator::Arbitrary,
        ]
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Comparator {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Comparator::all()
            .iter()
            .find(|c| c.as_str() == s)
            .copied()
            .ok_or_else(|| RequirementError::UnknownComparator(s.to_string()))
    }
}

impl Serialize for Comparator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Comparator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let op = String::deserialize(deserializer)?;
        op.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors raised while parsing or validating a requirement specifier
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequirementError {
    #[error("Requirement name cannot be empty")]
    EmptyName,

    #[error("Invalid requirement name '{0}'")]
    InvalidName(String),

    #[error("Missing version comparator in '{0}'")]
    MissingComparator(String),

    #[error("Unknown version comparator '{0}'")]
    UnknownComparator(String),

    #[error("Invalid version '{version}' for requirement '{name}'")]
    InvalidVersion { name: String, version: String },

    #[error("Malformed requirement line '{0}'")]
    Malformed(String),
}

/// One `<name><comparator><version> # <annotation>` line of a requirements manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name as written
    pub name: String,
    /// Version comparison operator
    pub comparator: Comparator,
    /// Version the comparator applies to
    pub version: String,
    /// Trailing comment, usually the package license
    pub annotation: Option<String>,
    /// 1-based line number in the source manifest (0 when built in code)
    pub line: usize,
}

impl Requirement {
    pub fn new(name: &str, comparator: Comparator, version: &str) -> Self {
        Self {
            name: name.to_string(),
            comparator,
            version: version.to_string(),
            annotation: None,
            line: 0,
        }
    }

    /// Attach a trailing annotation
    pub fn with_annotation(mut self, annotation: &str) -> Self {
        self.annotation = Some(annotation.to_string());
        self
    }

    /// Parse a single specifier line
    pub fn parse(line: &str) -> Result<Self, RequirementError> {
        let caps = SPECIFIER_RE
            .captures(line)
            .ok_or_else(|| RequirementError::Malformed(line.trim().to_string()))?;

        let name = caps.name("name").map_or("", |m| m.as_str());
        let version = caps.name("version").map_or("", |m| m.as_str());
        let comparator = match caps.name("op") {
            Some(op) => op.as_str().parse::<Comparator>()?,
            None if name.is_empty() => return Err(RequirementError::EmptyName),
            None => return Err(RequirementError::MissingComparator(line.trim().to_string())),
        };

        let requirement = Self {
            name: name.to_string(),
            comparator,
            version: version.to_string(),
            annotation: caps
                .name("note")
                .map(|m| m.as_str().to_string())
                .filter(|note| !note.is_empty()),
            line: 0,
        };
        requirement.validate()?;
        Ok(requirement)
    }

    /// Validate the requirement according to manifest rules
    pub fn validate(&self) -> Result<(), RequirementError> {
        if self.name.is_empty() {
            return Err(RequirementError::EmptyName);
        }

        let valid_name = self.name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
            && self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
        if !valid_name {
            return Err(RequirementError::InvalidName(self.name.clone()));
        }

        // `===` compares strings, anything else needs a PEP 440 version.
        // Local labels are only allowed with exact (non-wildcard) matching,
        // and a `.*` wildcard only follows release segments.
        let parsed = self.parsed_version();
        let version_ok = match (self.comparator, self.wildcard_prefix()) {
            (Comparator::Arbitrary, _) => !self.version.is_empty(),
            (_, Some(_)) => parsed.is_some_and(|v| v == v.base() && v.local.is_empty()),
            (Comparator::Equal | Comparator::NotEqual, None) => parsed.is_some(),
            (Comparator::Compatible, None) => {
                parsed.is_some_and(|v| v.release.len() >= 2 && v.local.is_empty())
            }
            (_, None) => parsed.is_some_and(|v| v.local.is_empty()),
        };
        if !version_ok {
            return Err(RequirementError::InvalidVersion {
                name: self.name.clone(),
                version: self.version.clone(),
            });
        }

        Ok(())
    }

    /// Release prefix of a `==1.2.*` / `!=1.2.*` specifier
    fn wildcard_prefix(&self) -> Option<&str> {
        match self.comparator {
            Comparator::Equal | Comparator::NotEqual => self.version.strip_suffix(".*"),
            _ => None,
        }
    }

    fn parsed_version(&self) -> Option<Version> {
        self.wildcard_prefix()
            .unwrap_or(&self.version)
            .parse::<Version>()
            .ok()
    }

    /// Name normalized for comparison: lowercase, runs of `-`, `_`, `.` collapsed to `-`
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Check whether a concrete release version satisfies this requirement
    pub fn is_satisfied_by(&self, candidate: &str) -> Result<bool, RequirementError> {
        if self.comparator == Comparator::Arbitrary {
            return Ok(candidate.trim() == self.version);
        }

        let invalid = |version: &str| RequirementError::InvalidVersion {
            name: self.name.clone(),
            version: version.to_string(),
        };
        let wanted = self.parsed_version().ok_or_else(|| invalid(&self.version))?;
        let mut candidate = candidate.parse::<Version>().map_err(|_| invalid(candidate))?;
        if wanted.local.is_empty() {
            candidate = candidate.public();
        }

        if self.wildcard_prefix().is_some() {
            let matched = candidate.shares_prefix(&wanted, wanted.release.len());
            return Ok(matched == (self.comparator == Comparator::Equal));
        }

        let same_base = candidate.base() == wanted.base();
        let satisfied = match self.comparator {
            Comparator::GreaterEqual => candidate >= wanted,
            Comparator::LessEqual => candidate <= wanted,
            // `>1.0` excludes 1.0.post1, `<1.0` excludes 1.0rc1
            Comparator::Greater => {
                candidate > wanted
                    && !(same_base && candidate.is_postrelease() && !wanted.is_postrelease())
            }
            Comparator::Less => {
                candidate < wanted
                    && !(same_base && candidate.is_prerelease() && !wanted.is_prerelease())
            }
            Comparator::Equal => candidate == wanted,
            Comparator::NotEqual => candidate != wanted,
            Comparator::Compatible => {
                let prefix = wanted.release.len().saturating_sub(1);
                candidate >= wanted && candidate.shares_prefix(&wanted, prefix)
            }
            Comparator::Arbitrary => unreachable!("handled above"),
        };
        Ok(satisfied)
    }

    /// Specifier without annotation (name + comparator + version)
    pub fn specifier(&self) -> String {
        format!("{}{}{}", self.name, self.comparator, self.version)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.annotation {
            Some(note) => write!(f, "{} # {}", self.specifier(), note),
            None => f.write_str(&self.specifier()),
        }
    }
}

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Requirement::parse(s)
    }
}

/// Normalize a package name the way package indexes compare them
pub fn normalize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_sep = false;
    for c in name.chars() {
        if c == '-' || c == '_' || c == '.' {
            if !last_sep {
                out.push('-');
            }
            last_sep = true;
        } else {
            out.push(c.to_ascii_lowercase());
            last_sep = false;
        }
    }
    out
}
