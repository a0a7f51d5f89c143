use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::models::requirement::{normalize_name, Requirement, RequirementError};

/// An ordered pip-style requirements manifest
///
/// Specifier order is kept exactly as authored: installers process the lines
/// in order of appearance, and downstream gates depend on that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementsManifest {
    /// Comment lines preceding the first specifier, without the leading `#`
    pub header: Vec<String>,
    /// Specifiers in file order
    pub requirements: Vec<Requirement>,
}

/// Errors raised while reading a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {source}")]
    InvalidLine {
        line: usize,
        #[source]
        source: RequirementError,
    },

    #[error("line {line}: '{name}' duplicates the requirement on line {first}")]
    Duplicate {
        name: String,
        line: usize,
        first: usize,
    },

    #[error("Expected '{expected}' at position {position}, found '{found}'")]
    OrderMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("Expected {expected} requirements, found {found}")]
    CountMismatch { expected: usize, found: usize },
}

impl RequirementsManifest {
    /// Parse manifest text; comment and blank lines are skipped
    pub fn parse(content: &str) -> Result<Self, ManifestError> {
        let mut manifest = Self::default();
        let mut seen: HashMap<String, usize> = HashMap::new();

        for (index, raw) in content.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = raw.trim();

            if trimmed.is_empty() {
                continue;
            }

            if let Some(comment) = trimmed.strip_prefix('#') {
                if manifest.requirements.is_empty() {
                    manifest.header.push(comment.trim().to_string());
                }
                continue;
            }

            let mut requirement = Requirement::parse(trimmed).map_err(|source| {
                ManifestError::InvalidLine {
                    line: line_no,
                    source,
                }
            })?;
            requirement.line = line_no;

            if let Some(&first) = seen.get(&requirement.normalized_name()) {
                return Err(ManifestError::Duplicate {
                    name: requirement.name,
                    line: line_no,
                    first,
                });
            }
            seen.insert(requirement.normalized_name(), line_no);
            manifest.requirements.push(requirement);
        }

        Ok(manifest)
    }

    /// Load and parse a manifest file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Requirement> {
        self.requirements.iter()
    }

    /// Package names in file order
    pub fn names(&self) -> Vec<&str> {
        self.requirements.iter().map(|r| r.name.as_str()).collect()
    }

    /// Look up a requirement by (normalized) package name
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let wanted = normalize_name(name);
        self.requirements
            .iter()
            .find(|r| r.normalized_name() == wanted)
    }

    /// Verify the specifiers appear exactly in the expected order
    pub fn check_order(&self, expected: &[&str]) -> Result<(), ManifestError> {
        if expected.len() != self.requirements.len() {
            return Err(ManifestError::CountMismatch {
                expected: expected.len(),
                found: self.requirements.len(),
            });
        }

        for (position, (want, have)) in expected.iter().zip(&self.requirements).enumerate() {
            if normalize_name(want) != have.normalized_name() {
                return Err(ManifestError::OrderMismatch {
                    position: position + 1,
                    expected: (*want).to_string(),
                    found: have.name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Render the manifest back to text, header first
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            if line.is_empty() {
                out.push_str("#\n");
            } else {
                out.push_str("# ");
                out.push_str(line);
                out.push('\n');
            }
        }
        for requirement in &self.requirements {
            out.push_str(&requirement.to_string());
            out.push('\n');
        }
        out
    }
}

impl<'a> IntoIterator for &'a RequirementsManifest {
    type Item = &'a Requirement;
    type IntoIter = std::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.requirements.iter()
    }
}
