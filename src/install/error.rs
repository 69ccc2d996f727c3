use crate::process::error::CommandError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to create install parent directory '{0}'")]
    ParentDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Install path '{0}' has no parent directory")]
    NoParentDir(PathBuf),

    #[error("Unable to clone bestiapop")]
    Clone(#[source] CommandError),

    #[error("Unable to install bestiapop requirements - is pip installed and on PATH?")]
    Dependencies(#[source] CommandError),
}
