use anyhow::Context;
use clap::Args;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::manifest::RequirementsManifest;
use crate::models::requirement::Requirement;
use crate::utils::error::OccError;

/// Validate a pip-style requirements manifest
#[derive(Debug, Args)]
pub struct RequirementsCommand {
    /// Manifest to check
    #[arg(long, short, default_value = "requirements.txt")]
    pub file: PathBuf,

    /// Fail unless the packages appear in exactly this order (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub expect_order: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// JSON response format for the requirements command
#[derive(Debug, Serialize, Deserialize)]
pub struct RequirementsResponse {
    pub status: String,
    pub file: String,
    pub count: usize,
    pub requirements: Vec<Requirement>,
}

impl RequirementsCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        let manifest = RequirementsManifest::load(&self.file)
            .map_err(OccError::from)
            .with_context(|| format!("Failed to check {}", self.file.display()))?;

        if !self.expect_order.is_empty() {
            let expected: Vec<&str> = self.expect_order.iter().map(String::as_str).collect();
            manifest
                .check_order(&expected)
                .map_err(OccError::from)
                .with_context(|| format!("Unexpected order in {}", self.file.display()))?;
        }

        if self.json {
            let response = RequirementsResponse {
                status: "ok".to_string(),
                file: self.file.display().to_string(),
                count: manifest.len(),
                requirements: manifest.requirements.clone(),
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
            return Ok(());
        }

        println!("{}: {} requirements", self.file.display(), manifest.len());
        for (index, requirement) in manifest.iter().enumerate() {
            match &requirement.annotation {
                Some(note) => println!(
                    "  {}. {} {} {}  ({})",
                    index + 1,
                    requirement.name,
                    requirement.comparator,
                    requirement.version,
                    note
                ),
                None => println!(
                    "  {}. {} {} {}",
                    index + 1,
                    requirement.name,
                    requirement.comparator,
                    requirement.version
                ),
            }
        }
        Ok(())
    }
}
