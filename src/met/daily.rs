use crate::met::calc;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Wind speed (m/s) assumed when the file has none.
pub const DEFAULT_WIND: f64 = 3.0;
/// Atmospheric CO2 (ppm) assumed when the file has none.
pub const DEFAULT_CO2: f64 = 350.0;
/// Air pressure (hPa) assumed when the file has none.
pub const DEFAULT_AIR_PRESSURE: f64 = 1010.0;
/// Sun altitude (degrees) used for sunrise and sunset: civil twilight.
pub const CIVIL_TWILIGHT: f64 = -6.0;

/// One row of a `.met` file, exactly as read.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct DailyMet {
    pub date: NaiveDate,
    pub radn: f64,                 // radn (MJ/m^2)
    pub max_t: f64,                // maxt (oC)
    pub min_t: f64,                // mint (oC)
    pub rain: f64,                 // rain (mm)
    pub vp: Option<f64>,           // vp (hPa)
    pub evap: Option<f64>,         // evap (mm)
    pub wind: Option<f64>,         // wind (m/s)
    pub co2: Option<f64>,          // co2 (ppm)
    pub air_pressure: Option<f64>, // airpressure (hPa)
    pub vp_deficit: Option<f64>,   // vpd / vp_deficit (hPa)
}

impl DailyMet {
    pub fn new(date: NaiveDate, radn: f64, max_t: f64, min_t: f64, rain: f64) -> Self {
        Self {
            date,
            radn,
            max_t,
            min_t,
            rain,
            vp: None,
            evap: None,
            wind: None,
            co2: None,
            air_pressure: None,
            vp_deficit: None,
        }
    }
}

/// Series-wide fallbacks taken from the file header.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SiteDefaults {
    pub latitude: f64,
    pub wind: f64,
    pub co2: f64,
    pub air_pressure: f64,
}

/// The weather for one day with every gap filled in.
///
/// Missing columns fall back to header constants, then to APSIM's defaults
/// ([`DEFAULT_WIND`], [`DEFAULT_CO2`], [`DEFAULT_AIR_PRESSURE`]). A missing vapour
/// pressure is taken as the saturated vapour pressure at the minimum temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherDay {
    pub date: NaiveDate,
    pub max_t: f64,
    pub min_t: f64,
    pub rain: f64,
    pub radn: f64,
    pub vp: f64,
    pub wind: f64,
    pub co2: f64,
    pub air_pressure: f64,
    pub evap: Option<f64>,
    vp_deficit: Option<f64>,
    latitude: f64,
}

impl WeatherDay {
    pub(crate) fn resolve(record: &DailyMet, site: &SiteDefaults) -> Self {
        Self {
            date: record.date,
            max_t: record.max_t,
            min_t: record.min_t,
            rain: record.rain,
            radn: record.radn,
            vp: record
                .vp
                .unwrap_or_else(|| calc::svp(record.min_t).max(0.0)),
            wind: record.wind.unwrap_or(site.wind),
            co2: record.co2.unwrap_or(site.co2),
            air_pressure: record.air_pressure.unwrap_or(site.air_pressure),
            evap: record.evap,
            vp_deficit: record.vp_deficit,
            latitude: site.latitude,
        }
    }

    pub fn day_of_year(&self) -> u32 {
        self.date.ordinal()
    }

    pub fn mean_t(&self) -> f64 {
        (self.max_t + self.min_t) / 2.0
    }

    /// Vapour pressure deficit (hPa): the file's value if it has one, otherwise derived
    /// from vapour pressure and the day's temperatures.
    pub fn vpd(&self) -> f64 {
        self.vp_deficit
            .unwrap_or_else(|| calc::vpd(self.vp, self.min_t, self.max_t))
    }

    /// Length of the day in hours, counted while the sun is above `twilight` degrees.
    pub fn day_length(&self, twilight: f64) -> f64 {
        calc::day_length(self.day_of_year(), twilight, self.latitude)
    }

    /// Time of sunrise in hours after midnight (solar time).
    pub fn sunrise(&self) -> f64 {
        12.0 - self.day_length(CIVIL_TWILIGHT) / 2.0
    }

    /// Time of sunset in hours after midnight (solar time).
    pub fn sunset(&self) -> f64 {
        12.0 + self.day_length(CIVIL_TWILIGHT) / 2.0
    }
}
