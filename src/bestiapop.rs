//! The weather acquisition orchestrator.
//!
//! [`BestiaPop`] installs the BestiaPop tool on demand, runs it for an
//! [`AcquisitionRequest`], loads the `.met` file it writes and, when asked to, wires the
//! resulting [`WeatherSeries`] into a running simulation.

use crate::config::GeneratorConfig;
use crate::error::AcquisitionError;
use crate::host::{connect, DetachedHost, SimulationHost};
use crate::install::installer::{InstallationState, Installer};
use crate::met::find_met_file;
use crate::met::series::WeatherSeries;
use crate::process::command::ToolCommand;
use crate::request::AcquisitionRequest;
use crate::status::{Status, StatusReporter};
use crate::utils::ensure_dir_exists;
use bon::bon;
use log::{info, warn};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;

const SCRATCH_DIR_PREFIX: &str = "bestiapop-";

/// Generates APSIM weather files with BestiaPop.
///
/// One instance runs one acquisition at a time; a second [`generate`](BestiaPop::generate)
/// while the first is in flight fails with [`AcquisitionError::Busy`]. Progress can be
/// followed through [`BestiaPop::subscribe`].
///
/// # Examples
///
/// ```no_run
/// # use bestiapop::{AcquisitionError, AcquisitionRequest, BestiaPop};
/// # #[tokio::main]
/// # async fn main() -> Result<(), AcquisitionError> {
/// let bestiapop = BestiaPop::new()?;
/// let request = AcquisitionRequest::builder()
///     .latitude(-35.0)
///     .longitude(149.0)
///     .start_year(2010)
///     .end_year(2010)
///     .build();
///
/// let series = bestiapop.generate().request(&request).call().await?;
/// println!("{} days, tav {:.1} °C", series.len(), series.tav());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct BestiaPop {
    config: GeneratorConfig,
    status: StatusReporter,
    busy: Mutex<()>,
}

enum OutputDir {
    Requested(PathBuf),
    Scratch(TempDir),
}

impl OutputDir {
    fn path(&self) -> &Path {
        match self {
            OutputDir::Requested(path) => path,
            OutputDir::Scratch(dir) => dir.path(),
        }
    }
}

#[bon]
impl BestiaPop {
    /// Orchestrator using the default install location under the user's data directory.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::InstallDirResolution`] if that directory cannot be
    /// determined.
    pub fn new() -> Result<Self, AcquisitionError> {
        Ok(Self::with_config(GeneratorConfig::new()?))
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config,
            status: StatusReporter::new(),
            busy: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// The current stage of the acquisition.
    pub fn status(&self) -> Status {
        self.status.current()
    }

    /// A receiver that observes every status change.
    pub fn subscribe(&self) -> watch::Receiver<Status> {
        self.status.subscribe()
    }

    pub async fn is_installed(&self) -> bool {
        Installer::new(&self.config).is_installed().await
    }

    /// Clones BestiaPop and installs its requirements unless the install directory
    /// already exists.
    ///
    /// # Arguments
    ///
    /// * `.cancel(CancellationToken)`: Optional. Kills the running `git`/`pip` when cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Installation`] on failure; the install directory is
    /// removed again in that case.
    #[builder]
    pub async fn ensure_installed(
        &self,
        cancel: Option<CancellationToken>,
    ) -> Result<InstallationState, AcquisitionError> {
        let cancel = cancel.unwrap_or_default();
        Installer::new(&self.config).ensure_installed(&cancel).await
    }

    /// Runs BestiaPop for `request` and loads the weather file it produces.
    ///
    /// The workflow is: validate the request, install the tool if missing, pick the output
    /// directory, run the generator, find the `.met` file, parse it and, if `host` is
    /// running a simulation, resolve the series' links and replay `Commencing` and
    /// `StartOfSimulation` to it.
    ///
    /// When the request names no output directory, a `bestiapop-*` directory is created
    /// under [`GeneratorConfig::temp_root`] and handed to the returned series, which
    /// deletes it when dropped.
    ///
    /// # Arguments
    ///
    /// * `.request(&AcquisitionRequest)`: **Required.** Location, years and options.
    /// * `.host(&dyn SimulationHost)`: Optional. The simulation to wire the series into and
    ///   to write run messages to. Defaults to [`DetachedHost`].
    /// * `.cancel(CancellationToken)`: Optional. Kills the running child process when cancelled.
    ///
    /// # Errors
    ///
    /// * [`AcquisitionError::Busy`] if another acquisition is in progress.
    /// * [`AcquisitionError::InvalidRequest`] for out-of-range coordinates or years.
    /// * [`AcquisitionError::Installation`] if the tool had to be installed and that failed.
    /// * [`AcquisitionError::Generator`] if BestiaPop could not start, exited with an error,
    ///   was cancelled or timed out. The error carries everything it printed.
    /// * [`AcquisitionError::OutputNotFound`] if it wrote no `.met` file.
    /// * [`AcquisitionError::WeatherFile`] if the file could not be read or parsed.
    /// * [`AcquisitionError::Adaptation`] if the host did not accept the series.
    ///
    /// After any error other than `Busy` and `InvalidRequest`, [`BestiaPop::status`] is
    /// [`Status::Failed`]; after success it is [`Status::Idle`].
    #[builder]
    pub async fn generate(
        &self,
        request: &AcquisitionRequest,
        host: Option<&dyn SimulationHost>,
        cancel: Option<CancellationToken>,
    ) -> Result<WeatherSeries, AcquisitionError> {
        let _busy = self.busy.try_lock().map_err(|_| AcquisitionError::Busy)?;
        request.validate()?;

        let host: &dyn SimulationHost = host.unwrap_or(&DetachedHost);
        let cancel = cancel.unwrap_or_default();
        let status = self.status.begin();

        let installer = Installer::new(&self.config);
        if !installer.is_installed().await {
            status.set(Status::Installing);
            installer.ensure_installed(&cancel).await?;
        }

        let output_dir = self.prepare_output_dir(request).await?;
        if let OutputDir::Scratch(dir) = &output_dir {
            host.summary(&format!(
                "Generating weather file in temporary directory {}",
                dir.path().display()
            ));
        }

        status.set(Status::Running);
        let command = ToolCommand::new(&self.config.python, output_dir.path())
            .arg(self.config.entry_script_path())
            .args(request.generator_args(output_dir.path()));
        host.summary(&format!("Running {command}"));

        let output = command
            .run(&cancel, self.config.generator_timeout)
            .await
            .map_err(AcquisitionError::Generator)?;
        if !output.output.trim().is_empty() {
            host.summary(&output.output);
        }

        let met_file = find_met_file(output_dir.path()).await?;
        let mut series = WeatherSeries::load(&met_file).await?;
        info!(
            "Generated {} days of weather for {:?} into {}",
            series.len(),
            request.location(),
            met_file.display()
        );
        if !series.covers_years(request.start_year, request.end_year) {
            warn!(
                "{} covers {:?} to {:?}, requested {}-{}",
                met_file.display(),
                series.first_date(),
                series.last_date(),
                request.start_year,
                request.end_year
            );
        }
        if let OutputDir::Scratch(dir) = output_dir {
            series.keep_scratch_dir(dir);
        }

        connect(host, &mut series)?;

        status.finish();
        Ok(series)
    }

    async fn prepare_output_dir(
        &self,
        request: &AcquisitionRequest,
    ) -> Result<OutputDir, AcquisitionError> {
        if let Some(dir) = request.requested_output_dir() {
            ensure_dir_exists(dir)
                .await
                .map_err(|e| AcquisitionError::OutputDirCreation(dir.to_path_buf(), e))?;
            return Ok(OutputDir::Requested(dir.to_path_buf()));
        }

        let temp_root = &self.config.temp_root;
        ensure_dir_exists(temp_root)
            .await
            .map_err(|e| AcquisitionError::OutputDirCreation(temp_root.clone(), e))?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir_in(temp_root)
            .map_err(|e| AcquisitionError::OutputDirCreation(temp_root.clone(), e))?;
        Ok(OutputDir::Scratch(dir))
    }
}
