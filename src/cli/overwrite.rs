//! Destination overwrite policy for the CLI

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Result};

/// Overwrite behavior for existing files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteBehavior {
    /// Prompt user for confirmation (default)
    #[default]
    Prompt,
    /// Force overwrite without prompting
    Force,
    /// Never overwrite, fail if file exists
    NeverOverwrite,
}

impl OverwriteBehavior {
    pub fn from_flags(force: bool, no_clobber: bool) -> Self {
        if force {
            Self::Force
        } else if no_clobber {
            Self::NeverOverwrite
        } else {
            Self::Prompt
        }
    }
}

/// Check if destination file exists and handle overwrite behavior
pub fn check_overwrite_permission(file_path: &Path, behavior: OverwriteBehavior) -> Result<()> {
    if !file_path.exists() {
        return Ok(());
    }

    let shown = file_path.display();
    match behavior {
        OverwriteBehavior::Force => {
            eprintln!("⚠️  Overwriting existing file: {shown}");
            Ok(())
        }
        OverwriteBehavior::NeverOverwrite => {
            bail!("File already exists: {shown} (use --force to overwrite)")
        }
        OverwriteBehavior::Prompt => {
            eprintln!("⚠️  File already exists: {shown}");
            eprint!("Overwrite? [y/N]: ");
            std::io::stderr().flush()?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            match input.trim().to_lowercase().as_str() {
                "y" | "yes" => {
                    eprintln!("✅ Overwriting file");
                    Ok(())
                }
                _ => bail!("Download cancelled by user"),
            }
        }
    }
}
