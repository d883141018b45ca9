//! Command line configuration.
//!
//! Every option can also be given through an `AIGIS_*` environment variable.
//! [`Cli::validate`] checks that the files a command reads exist before any
//! work starts.
//!
//! # Example
//!
//! ```no_run
//! use aigis_patcher::Cli;
//!
//! let cli = Cli::from_args();
//! cli.validate().expect("Invalid configuration");
//! ```

use crate::error::ConfigError;
use aigis_formats::archive::V2Layout;
use aigis_formats::{FailurePolicy, ParseOptions};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// Patcher configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "aigis-patcher",
    about = "Inspect, verify and translate AL* game assets",
    version
)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true, env = "AIGIS_VERBOSE")]
    pub verbose: bool,

    /// Read ALAR version 2 archives with the 8-byte header layout
    #[arg(long, global = true, env = "AIGIS_COMPACT_V2")]
    pub compact_v2: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the object tree of a file
    Inspect {
        /// Asset file
        file: PathBuf,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Translate an asset file
    Patch {
        /// Asset file to read
        input: PathBuf,
        /// Where to write the patched file
        output: PathBuf,
        /// Translation directory
        #[arg(short, long, env = "AIGIS_TRANSLATIONS")]
        translations: PathBuf,
        /// Name the file resolves under in the translation directory,
        /// defaults to the input file name
        #[arg(short, long)]
        name: Option<String>,
        /// Keep untranslatable archive entries instead of failing
        #[arg(long, env = "AIGIS_KEEP_ORIGINAL")]
        keep_original: bool,
    },
    /// Decode a legacy XML payload
    DecodeXml {
        /// Encoded payload
        input: PathBuf,
        /// Where to write the document, stdout when absent
        output: Option<PathBuf>,
    },
    /// Check that files serialize back to their exact bytes
    Verify {
        /// Asset files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn require_file(path: &Path) -> Result<(), ConfigError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ConfigError::MissingInput(path.to_path_buf()))
    }
}

impl Cli {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse options the command line selects
    #[must_use]
    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            alar_v2_layout: if self.compact_v2 {
                V2Layout::Compact
            } else {
                V2Layout::Extended
            },
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - An input file doesn't exist
    /// - The translation directory doesn't exist
    /// - The patch name cannot be derived from the input path
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.command {
            Command::Inspect { file, .. } => require_file(file),
            Command::DecodeXml { input, .. } => require_file(input),
            Command::Verify { files } => files.iter().try_for_each(|file| require_file(file)),
            Command::Patch {
                input,
                translations,
                ..
            } => {
                require_file(input)?;
                if !translations.is_dir() {
                    return Err(ConfigError::MissingTranslations(translations.clone()));
                }
                self.command.patch_name().map(|_| ())
            }
        }
    }
}

impl Command {
    /// Translation name of a `patch` command
    pub fn patch_name(&self) -> Result<String, ConfigError> {
        let Self::Patch { input, name, .. } = self else {
            return Err(ConfigError::MissingRequired("patch command".to_string()));
        };
        if let Some(name) = name {
            return Ok(name.clone());
        }
        input
            .file_name()
            .map(|file| file.to_string_lossy().into_owned())
            .ok_or_else(|| ConfigError::MissingRequired("--name".to_string()))
    }

    /// Failure policy of a `patch` command
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Self::Patch {
                keep_original: true,
                ..
            } => FailurePolicy::KeepOriginal,
            _ => FailurePolicy::Propagate,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_patch_arguments() {
        let cli = Cli::try_parse_from([
            "aigis-patcher",
            "patch",
            "in/Card.aar",
            "out/Card.aar",
            "--translations",
            "patch",
            "--keep-original",
        ])
        .unwrap();
        assert_eq!(cli.command.patch_name().unwrap(), "Card.aar");
        assert_eq!(cli.command.failure_policy(), FailurePolicy::KeepOriginal);
        assert_eq!(cli.parse_options(), ParseOptions::default());
    }

    #[test]
    fn test_explicit_name_and_global_flags() {
        let cli = Cli::try_parse_from([
            "aigis-patcher",
            "patch",
            "blob.bin",
            "out.bin",
            "-t",
            "patch",
            "--name",
            "Card.aar",
            "--compact-v2",
        ])
        .unwrap();
        assert_eq!(cli.command.patch_name().unwrap(), "Card.aar");
        assert_eq!(cli.command.failure_policy(), FailurePolicy::Propagate);
        assert_eq!(cli.parse_options().alar_v2_layout, V2Layout::Compact);
    }

    #[test]
    fn test_verify_needs_files() {
        assert!(Cli::try_parse_from(["aigis-patcher", "verify"]).is_err());
        let cli = Cli::try_parse_from(["aigis-patcher", "-v", "verify", "a", "b"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Verify { ref files } if files.len() == 2));
    }

    #[test]
    fn test_validate_checks_paths() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("Card.aar");
        std::fs::write(&input, b"ALIG\x00").unwrap();
        let input = input.to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["aigis-patcher", "inspect", input.as_str()]).unwrap();
        assert!(cli.validate().is_ok());

        let missing = dir.path().join("missing").to_string_lossy().into_owned();
        let cli = Cli::try_parse_from([
            "aigis-patcher",
            "patch",
            input.as_str(),
            "out",
            "--translations",
            missing.as_str(),
        ])
        .unwrap();
        assert!(matches!(
            cli.validate(),
            Err(ConfigError::MissingTranslations(_))
        ));

        let cli = Cli::try_parse_from(["aigis-patcher", "decode-xml", missing.as_str()]).unwrap();
        assert!(matches!(cli.validate(), Err(ConfigError::MissingInput(_))));
    }
}
