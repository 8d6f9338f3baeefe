//! Subcommands and the profile file helpers they share

pub mod merge;
pub mod normalize;
pub mod repair;

use anyhow::{Context, Result};
use clap::Args;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use strata_aggregator::EngineConfig;
use strata_shared::Profile;

/// Where and how to write the resulting profile
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).with_context(|| match path {
        Some(p) => format!("Failed to load config from {}", p.display()),
        None => "Failed to load config from environment".to_string(),
    })
}

pub fn read_profile(path: &Path) -> Result<Profile> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse profile {}", path.display()))
}

pub fn write_profile(profile: &Profile, args: &OutputArgs) -> Result<()> {
    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut writer = BufWriter::new(writer);
    if args.pretty {
        serde_json::to_writer_pretty(&mut writer, profile)
    } else {
        serde_json::to_writer(&mut writer, profile)
    }
    .context("Failed to serialize profile")?;
    writeln!(writer)?;
    writer.flush().context("Failed to write profile")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.json");
        let profile = Profile {
            string_table: vec!["".into(), "cpu".into()],
            sample_types: vec![strata_shared::ValueType::new(1, 0)],
            ..Default::default()
        };

        write_profile(
            &profile,
            &OutputArgs {
                output: Some(path.clone()),
                pretty: true,
            },
        )
        .unwrap();
        assert_eq!(read_profile(&path).unwrap(), profile);
    }

    #[test]
    fn test_read_missing_profile() {
        let err = read_profile(Path::new("/nonexistent/profile.json")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to open"));
    }
}
