use log::info;
use std::io;
use std::path::{Path, PathBuf};

const ORGANISATION_DIR: &str = "ApsimInitiative";
const APPLICATION_DIR: &str = "ApsimX";
const PYTHON_DIR: &str = "Python";
const TOOL_DIR: &str = "bestiapop";

/// `<data dir>/ApsimInitiative/ApsimX/Python/bestiapop`, the location APSIM installs the tool to.
pub fn default_install_dir() -> io::Result<PathBuf> {
    dirs::data_dir()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "Could not determine the user's application data directory",
            )
        })
        .map(|p| {
            p.join(ORGANISATION_DIR)
                .join(APPLICATION_DIR)
                .join(PYTHON_DIR)
                .join(TOOL_DIR)
        })
}

pub async fn dir_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}

pub async fn ensure_dir_exists(path: &Path) -> io::Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    format!("Path exists but is not a directory: {}", path.display()),
                ));
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("Creating directory: {}", path.display());
            tokio::fs::create_dir_all(path).await
        }
        Err(e) => Err(e),
    }
}

/// Shortest text that round-trips `value`, so `-35.0` prints as `-35` and `149.25` as `149.25`.
pub fn format_coordinate(value: f64) -> String {
    format!("{}", value)
}
