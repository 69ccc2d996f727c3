mod bestiapop;
mod config;
mod error;
mod host;
mod install;
mod met;
mod process;
mod request;
mod status;
mod utils;

#[cfg(all(test, unix))]
mod test_support;

pub use bestiapop::BestiaPop;
pub use config::*;
pub use error::AcquisitionError;
pub use request::*;
pub use status::Status;

pub use host::{connect, DetachedHost, HostError, SimulationEvent, SimulationHost};

pub use install::error::InstallError;
pub use install::installer::{InstallationState, Installer};

pub use process::command::{CommandOutput, ToolCommand};
pub use process::error::CommandError;

pub use met::calc;
pub use met::daily::{
    DailyMet, WeatherDay, CIVIL_TWILIGHT, DEFAULT_AIR_PRESSURE, DEFAULT_CO2, DEFAULT_WIND,
};
pub use met::error::{MetFileError, MetParseError, SeriesError};
pub use met::find_met_file;
pub use met::parser::MetConstant;
pub use met::series::WeatherSeries;
pub use met::MET_EXTENSION;
