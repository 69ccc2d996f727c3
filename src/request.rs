//! What to generate: location, years, data source and variables.

use crate::error::AcquisitionError;
use crate::utils::format_coordinate;
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// ```
/// use bestiapop::LatLon;
///
/// let canberra = LatLon(-35.28, 149.13);
/// assert_eq!(canberra.0, -35.28);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// Climate database BestiaPop pulls observations from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// SILO, the Queensland government gridded climate dataset (Australia only).
    #[default]
    Silo,
    /// NASA POWER, global coverage.
    NasaPower,
}

impl DataSource {
    pub fn as_arg(self) -> &'static str {
        match self {
            DataSource::Silo => "silo",
            DataSource::NasaPower => "nasapower",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_arg())
    }
}

/// A climate variable BestiaPop can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimateVariable {
    DailyRain,
    MaxTemp,
    MinTemp,
    #[serde(rename = "vp")]
    VapourPressure,
    #[serde(rename = "vp_deficit")]
    VapourPressureDeficit,
    #[serde(rename = "evap_pan")]
    PanEvaporation,
    Radiation,
    #[serde(rename = "et_short_crop")]
    ReferenceEvapotranspiration,
}

impl ClimateVariable {
    /// Name used on the BestiaPop command line.
    pub fn as_arg(self) -> &'static str {
        match self {
            ClimateVariable::DailyRain => "daily_rain",
            ClimateVariable::MaxTemp => "max_temp",
            ClimateVariable::MinTemp => "min_temp",
            ClimateVariable::VapourPressure => "vp",
            ClimateVariable::VapourPressureDeficit => "vp_deficit",
            ClimateVariable::PanEvaporation => "evap_pan",
            ClimateVariable::Radiation => "radiation",
            ClimateVariable::ReferenceEvapotranspiration => "et_short_crop",
        }
    }
}

/// Everything an APSIM simulation needs.
pub const DEFAULT_VARIABLES: [ClimateVariable; 8] = [
    ClimateVariable::DailyRain,
    ClimateVariable::MaxTemp,
    ClimateVariable::MinTemp,
    ClimateVariable::VapourPressure,
    ClimateVariable::VapourPressureDeficit,
    ClimateVariable::PanEvaporation,
    ClimateVariable::Radiation,
    ClimateVariable::ReferenceEvapotranspiration,
];

fn default_variables() -> Vec<ClimateVariable> {
    DEFAULT_VARIABLES.to_vec()
}

/// Parameters of one weather file generation.
///
/// Leave `output_dir` unset (or empty) to have the files generated into a fresh
/// temporary directory that is deleted together with the returned series.
///
/// # Examples
///
/// ```
/// use bestiapop::{AcquisitionRequest, DataSource};
///
/// let request = AcquisitionRequest::builder()
///     .latitude(-35.0)
///     .longitude(149.0)
///     .start_year(2010)
///     .end_year(2012)
///     .build();
///
/// assert_eq!(request.source, DataSource::Silo);
/// assert!(!request.multi_process);
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct AcquisitionRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_year: i32,
    pub end_year: i32,

    #[builder(into)]
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Run BestiaPop in multi-process mode.
    #[builder(default)]
    #[serde(default)]
    pub multi_process: bool,

    #[builder(default)]
    #[serde(default)]
    pub source: DataSource,

    #[builder(default = default_variables())]
    #[serde(default = "default_variables")]
    pub variables: Vec<ClimateVariable>,
}

impl AcquisitionRequest {
    pub fn location(&self) -> LatLon {
        LatLon(self.latitude, self.longitude)
    }

    /// The caller's output directory, if one was given and is not empty.
    pub fn requested_output_dir(&self) -> Option<&Path> {
        self.output_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
    }

    /// Checks coordinates, year order and the variable list.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::InvalidRequest`] describing the first problem found.
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(AcquisitionError::InvalidRequest(format!(
                "latitude {} is outside -90..=90",
                self.latitude
            )));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(AcquisitionError::InvalidRequest(format!(
                "longitude {} is outside -180..=180",
                self.longitude
            )));
        }
        if self.start_year > self.end_year {
            return Err(AcquisitionError::InvalidRequest(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if self.variables.is_empty() {
            return Err(AcquisitionError::InvalidRequest(
                "no climate variables requested".to_string(),
            ));
        }
        Ok(())
    }

    /// Arguments following the entry script on the BestiaPop command line.
    pub fn generator_args(&self, output_dir: &Path) -> Vec<OsString> {
        let variables = self
            .variables
            .iter()
            .map(|v| v.as_arg())
            .collect::<Vec<_>>()
            .join(" ");

        let mut args: Vec<OsString> = vec![
            "-a".into(),
            "generate-climate-file".into(),
            "-s".into(),
            self.source.as_arg().into(),
            "-y".into(),
            format!("{}-{}", self.start_year, self.end_year).into(),
            "-lat".into(),
            format_coordinate(self.latitude).into(),
            "-lon".into(),
            format_coordinate(self.longitude).into(),
            "-c".into(),
            variables.into(),
        ];
        if self.multi_process {
            args.push("-m".into());
        }
        args.push("-o".into());
        args.push(output_dir.as_os_str().to_os_string());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canberra_2010() -> AcquisitionRequest {
        AcquisitionRequest::builder()
            .latitude(-35.0)
            .longitude(149.0)
            .start_year(2010)
            .end_year(2010)
            .build()
    }

    fn as_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_generator_args() {
        let args = as_strings(canberra_2010().generator_args(Path::new("/tmp/out")));
        assert_eq!(
            args,
            [
                "-a",
                "generate-climate-file",
                "-s",
                "silo",
                "-y",
                "2010-2010",
                "-lat",
                "-35",
                "-lon",
                "149",
                "-c",
                "daily_rain max_temp min_temp vp vp_deficit evap_pan radiation et_short_crop",
                "-o",
                "/tmp/out",
            ]
        );
    }

    #[test]
    fn test_multi_process_flag_precedes_output() {
        let mut request = canberra_2010();
        request.multi_process = true;
        let args = as_strings(request.generator_args(Path::new("/tmp/out")));
        let n = args.len();
        assert_eq!(&args[n - 3..], ["-m", "-o", "/tmp/out"]);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let mut request = canberra_2010();
        request.start_year = 2011;
        assert!(matches!(
            request.validate(),
            Err(AcquisitionError::InvalidRequest(_))
        ));

        let mut request = canberra_2010();
        request.latitude = -95.0;
        assert!(request.validate().is_err());

        let mut request = canberra_2010();
        request.longitude = f64::NAN;
        assert!(request.validate().is_err());

        let mut request = canberra_2010();
        request.variables.clear();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_empty_output_dir_means_none() {
        let mut request = canberra_2010();
        assert!(request.requested_output_dir().is_none());
        request.output_dir = Some(PathBuf::new());
        assert!(request.requested_output_dir().is_none());
        request.output_dir = Some(PathBuf::from("/data/met"));
        assert_eq!(request.requested_output_dir(), Some(Path::new("/data/met")));
    }

    #[test]
    fn test_request_from_json_uses_defaults() -> Result<(), serde_json::Error> {
        let request: AcquisitionRequest = serde_json::from_str(
            r#"{ "latitude": -27.5, "longitude": 152.25, "start_year": 1990, "end_year": 1999,
                 "source": "nasapower", "variables": ["daily_rain", "radiation", "vp"] }"#,
        )?;
        assert_eq!(request.source, DataSource::NasaPower);
        assert_eq!(
            request.variables,
            [
                ClimateVariable::DailyRain,
                ClimateVariable::Radiation,
                ClimateVariable::VapourPressure
            ]
        );
        assert!(request.output_dir.is_none());
        assert!(!request.multi_process);

        let defaulted: AcquisitionRequest = serde_json::from_str(
            r#"{ "latitude": 0, "longitude": 0, "start_year": 2000, "end_year": 2000 }"#,
        )?;
        assert_eq!(defaulted.variables, DEFAULT_VARIABLES);
        Ok(())
    }
}
