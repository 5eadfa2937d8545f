//! Local OSRM dataset preparation (Geofabrik extract + MLD preprocessing).
//!
//! Used to stand up a real routing backend for integration tests and local
//! development. Every step is skipped when its output already exists.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

const OSRM_IMAGE: &str = "osrm/osrm-backend";

#[derive(Debug, Clone)]
pub struct GeofabrikRegion {
    /// Geofabrik region path, e.g. "africa/south-africa".
    pub path: String,
}

impl GeofabrikRegion {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// Last path component, used for file names.
    pub fn name(&self) -> &str {
        self.path
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or("region")
    }

    pub fn url(&self) -> String {
        format!("https://download.geofabrik.de/{}-latest.osm.pbf", self.path.trim_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct OsrmDatasetConfig {
    pub region: GeofabrikRegion,
    pub data_root: PathBuf,
    /// OSRM profile name, matching a Lua file shipped in the image.
    pub profile: String,
}

impl OsrmDatasetConfig {
    pub fn new(region: GeofabrikRegion, data_root: impl Into<PathBuf>) -> Self {
        Self {
            region,
            data_root: data_root.into(),
            profile: "car".to_string(),
        }
    }
}

/// Paths of a prepared dataset, as seen from the host.
#[derive(Debug, Clone)]
pub struct OsrmDataset {
    pub data_dir: PathBuf,
    pub osrm_base: PathBuf,
    pub pbf_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum OsrmDataError {
    #[error("dataset io: {0}")]
    Io(#[from] io::Error),
    #[error("extract download: {0}")]
    Http(#[from] reqwest::Error),
    #[error("osrm preprocessing failed: {0}")]
    ProcessFailure(String),
}

impl OsrmDataset {
    /// Downloads and preprocesses the region unless already done.
    pub fn ensure(config: &OsrmDatasetConfig) -> Result<Self, OsrmDataError> {
        let region = config.region.name();
        let data_root = if config.data_root.is_absolute() {
            config.data_root.clone()
        } else {
            std::env::current_dir()?.join(&config.data_root)
        };
        let data_dir = data_root.join(region);
        fs::create_dir_all(&data_dir)?;

        let pbf_path = data_dir.join(format!("{}-latest.osm.pbf", region));
        if !pbf_path.exists() {
            info!(url = %config.region.url(), "downloading extract");
            download(&config.region.url(), &pbf_path)?;
        }

        let osrm_base = data_dir.join(format!("{}-latest.osrm", region));
        let dataset = Self {
            data_dir,
            osrm_base,
            pbf_path,
        };

        if !dataset.osrm_base.exists() {
            info!(profile = %config.profile, "extracting road graph");
            let profile = format!("/opt/{}.lua", config.profile);
            dataset.run(&["osrm-extract", "-p", &profile, &dataset.container_path(&dataset.pbf_path)])?;
        }

        if !dataset.mld_ready() {
            info!("partitioning and customizing for MLD");
            let base = dataset.container_path(&dataset.osrm_base);
            dataset.run(&["osrm-partition", &base])?;
            dataset.run(&["osrm-customize", &base])?;
        }

        Ok(dataset)
    }

    /// Arguments for `osrm-routed` serving this dataset inside the image.
    pub fn routed_command(&self) -> Vec<String> {
        vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            self.container_path(&self.osrm_base),
        ]
    }

    pub fn container_path(&self, path: &Path) -> String {
        let file = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        format!("/data/{}", file)
    }

    fn mld_ready(&self) -> bool {
        ["osrm.partition", "osrm.mldgr", "osrm.cells"]
            .iter()
            .all(|ext| self.osrm_base.with_extension(ext).exists())
            && self.osrm_base.exists()
    }

    fn run(&self, args: &[&str]) -> Result<(), OsrmDataError> {
        let status = Command::new("docker")
            .args(["run", "--rm", "-t", "-v"])
            .arg(format!("{}:/data", self.data_dir.display()))
            .arg(OSRM_IMAGE)
            .args(args)
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(OsrmDataError::ProcessFailure(format!(
                "{} exited with {}",
                args.first().copied().unwrap_or("docker"),
                status
            )))
        }
    }
}

fn download(url: &str, dest: &Path) -> Result<(), OsrmDataError> {
    let response = reqwest::blocking::get(url)?.error_for_status()?;
    let tmp_path = dest.with_extension("tmp");
    let mut writer = BufWriter::new(File::create(&tmp_path)?);
    writer.write_all(&response.bytes()?)?;
    writer.flush()?;
    fs::rename(tmp_path, dest)?;
    Ok(())
}
