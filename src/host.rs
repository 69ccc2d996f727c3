//! The narrow view of a running simulation that the orchestrator needs.
//!
//! A freshly generated [`WeatherSeries`] is an object that appears in the middle of a
//! simulation. To take part it must have its links resolved and receive the lifecycle
//! events every other model already saw. [`SimulationHost`] exposes just those operations
//! plus a place for run messages; [`DetachedHost`] is the host used outside a simulation.

use crate::met::error::SeriesError;
use crate::met::series::WeatherSeries;
use chrono::NaiveDate;
use log::info;
use thiserror::Error;

/// Lifecycle events replayed to a series that joins a running simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationEvent {
    /// Sent before the first simulated day.
    Commencing,
    /// Sent once the simulation clock is set; `today` is the current simulation date.
    StartOfSimulation { today: NaiveDate },
}

impl SimulationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SimulationEvent::Commencing => "Commencing",
            SimulationEvent::StartOfSimulation { .. } => "StartOfSimulation",
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Simulation host rejected the weather series: {reason}")]
    Rejected { reason: String },

    #[error("Unable to resolve link '{0}'")]
    Link(String),

    #[error("Weather series cannot follow the simulation")]
    Series(#[from] SeriesError),
}

/// Capabilities of the simulation the weather series is generated for.
pub trait SimulationHost: Send + Sync {
    /// The simulation's current date while it is running, `None` otherwise.
    fn current_date(&self) -> Option<NaiveDate>;

    fn is_running(&self) -> bool {
        self.current_date().is_some()
    }

    /// Connects the series to the models it depends on.
    fn resolve_links(&self, series: &mut WeatherSeries) -> Result<(), HostError>;

    /// Delivers `event` to the series. The default hands it straight to
    /// [`WeatherSeries::handle_event`].
    fn publish(&self, event: SimulationEvent, series: &mut WeatherSeries) -> Result<(), HostError> {
        series.handle_event(&event)
    }

    /// Records a message in the simulation's run summary.
    fn summary(&self, message: &str) {
        info!("{}", message);
    }
}

/// Host for acquisitions made outside a simulation: never running, messages go to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedHost;

impl SimulationHost for DetachedHost {
    fn current_date(&self) -> Option<NaiveDate> {
        None
    }

    fn resolve_links(&self, _series: &mut WeatherSeries) -> Result<(), HostError> {
        Ok(())
    }
}

/// Wires `series` into `host` if the host is running a simulation.
///
/// Links are resolved first, then `Commencing` and `StartOfSimulation` are published in
/// that order. Returns whether the series was wired.
pub fn connect(host: &dyn SimulationHost, series: &mut WeatherSeries) -> Result<bool, HostError> {
    let Some(today) = host.current_date() else {
        return Ok(false);
    };

    host.resolve_links(series)?;
    host.publish(SimulationEvent::Commencing, series)?;
    host.publish(SimulationEvent::StartOfSimulation { today }, series)?;
    Ok(true)
}
