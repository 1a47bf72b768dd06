//! Configuration parsing: CLI flags plus the JSON source manifest.
//!
//! Flags carry the classification thresholds and telemetry cadence; the
//! manifest names the video source, so deployments can repoint a camera
//! without touching the command line.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use serde::Deserialize;

/// CLI arguments accepted by the monitor.
#[derive(Debug, Parser)]
#[command(name = "linewatch", about = "Assembly-line object size monitor")]
pub struct MonitorArgs {
    /// Minimum area of a non-defective part, in pixels.
    #[arg(long = "minarea", alias = "min", value_name = "PX", default_value_t = 20_000)]
    pub min_area: i32,
    /// Maximum area of a non-defective part, in pixels.
    #[arg(long = "maxarea", alias = "max", value_name = "PX", default_value_t = 30_000)]
    pub max_area: i32,
    /// Seconds between telemetry updates to the MQTT broker.
    #[arg(long = "rate", short = 'r', value_name = "SECONDS", default_value_t = 1)]
    pub rate: u64,
    /// Path to the JSON manifest naming the video source.
    #[arg(
        long = "config",
        value_name = "PATH",
        default_value = "resources/config.json"
    )]
    pub config: PathBuf,
}

/// Canonical configuration shared by every stage of the pipeline.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// Video source identifier: a short numeric string selects a local
    /// camera index, anything else is a path or URI.
    pub video: String,
    pub min_area: i32,
    pub max_area: i32,
    pub rate: u64,
}

#[derive(Deserialize)]
struct SourceManifest {
    inputs: Vec<SourceEntry>,
}

#[derive(Deserialize)]
struct SourceEntry {
    video: String,
}

impl MonitorConfig {
    /// Resolve CLI flags and the source manifest into a runtime config.
    pub fn load(args: MonitorArgs) -> Result<Self> {
        if args.min_area <= 0 || args.max_area <= 0 {
            bail!("--minarea and --maxarea must be positive");
        }
        if args.min_area >= args.max_area {
            bail!("--minarea must be smaller than --maxarea");
        }
        if args.rate == 0 {
            bail!("--rate must be at least 1 second");
        }

        let video = read_manifest(&args.config)?;

        Ok(Self {
            video,
            min_area: args.min_area,
            max_area: args.max_area,
            rate: args.rate,
        })
    }
}

fn read_manifest(path: &Path) -> Result<String> {
    let file = File::open(path)
        .with_context(|| format!("failed to open source manifest {}", path.display()))?;
    let manifest: SourceManifest = serde_json::from_reader(file)
        .with_context(|| format!("failed to parse source manifest {}", path.display()))?;
    let entry = manifest
        .inputs
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("source manifest {} lists no inputs", path.display()))?;
    Ok(entry.video)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn manifest_file(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        fs::write(&path, contents).expect("write manifest");
        (dir, path)
    }

    #[test]
    fn manifest_names_the_video_source() {
        let (_dir, path) = manifest_file(r#"{"inputs": [{"video": "vids/line.mp4"}]}"#);
        let args =
            MonitorArgs::try_parse_from(["linewatch", "--config", path.to_str().unwrap()]).unwrap();
        let config = MonitorConfig::load(args).unwrap();
        assert_eq!(config.video, "vids/line.mp4");
        assert_eq!(config.min_area, 20_000);
        assert_eq!(config.max_area, 30_000);
        assert_eq!(config.rate, 1);
    }

    #[test]
    fn alias_flags_match_the_long_names() {
        let args = MonitorArgs::try_parse_from([
            "linewatch", "--min", "1000", "--max", "2000", "-r", "5",
        ])
        .unwrap();
        assert_eq!(args.min_area, 1_000);
        assert_eq!(args.max_area, 2_000);
        assert_eq!(args.rate, 5);
    }

    #[test]
    fn inverted_area_range_is_rejected() {
        let (_dir, path) = manifest_file(r#"{"inputs": [{"video": "0"}]}"#);
        let args = MonitorArgs::try_parse_from([
            "linewatch",
            "--minarea",
            "30000",
            "--maxarea",
            "20000",
            "--config",
            path.to_str().unwrap(),
        ])
        .unwrap();
        assert!(MonitorConfig::load(args).is_err());
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let args =
            MonitorArgs::try_parse_from(["linewatch", "--config", "/no/such/manifest.json"])
                .unwrap();
        assert!(MonitorConfig::load(args).is_err());
    }

    #[test]
    fn empty_inputs_list_is_fatal() {
        let (_dir, path) = manifest_file(r#"{"inputs": []}"#);
        let args =
            MonitorArgs::try_parse_from(["linewatch", "--config", path.to_str().unwrap()]).unwrap();
        assert!(MonitorConfig::load(args).is_err());
    }
}
