//! The `WeatherSeries`: a loaded `.met` file plus a simulation cursor.

use crate::host::{HostError, SimulationEvent};
use crate::met::calc;
use crate::met::daily::{
    DailyMet, SiteDefaults, WeatherDay, DEFAULT_AIR_PRESSURE, DEFAULT_CO2, DEFAULT_WIND,
};
use crate::met::error::{MetFileError, MetParseError, SeriesError};
use crate::met::parser::{parse_met, MetConstant};
use chrono::{Datelike, NaiveDate};
use log::debug;
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Daily weather read from an APSIM `.met` file.
///
/// Besides random access by date ([`WeatherSeries::day`]) the series keeps a cursor for
/// the simulation's current day, moved by [`WeatherSeries::seek`] / [`WeatherSeries::advance`]
/// or by the `StartOfSimulation` event, giving the usual today / yesterday / tomorrow view.
///
/// When the series was generated into a temporary directory it owns that directory, and
/// the generated files are deleted when the series is dropped.
#[derive(Debug)]
pub struct WeatherSeries {
    file_name: Option<PathBuf>,
    section: Option<String>,
    constants: BTreeMap<String, MetConstant>,
    headings: Vec<String>,
    site: SiteDefaults,
    longitude: Option<f64>,
    tav: f64,
    amp: f64,
    records: Vec<DailyMet>,
    cursor: Option<usize>,
    scratch_dir: Option<TempDir>,
}

impl WeatherSeries {
    /// Parses `.met` text.
    ///
    /// # Errors
    ///
    /// Returns a [`MetParseError`] for malformed content, a missing `latitude` constant, or
    /// a file without daily records.
    pub fn parse(text: &str) -> Result<Self, MetParseError> {
        let parsed = parse_met(text)?;
        let number = |name: &str| -> Result<Option<f64>, MetParseError> {
            match parsed.constants.get(name) {
                None => Ok(None),
                Some(constant) => constant.as_f64().map(Some).ok_or_else(|| {
                    MetParseError::InvalidConstant {
                        name: name.to_string(),
                        value: constant.value.clone(),
                    }
                }),
            }
        };

        let latitude = number("latitude")?.ok_or(MetParseError::MissingConstant("latitude"))?;
        let longitude = number("longitude")?;
        let site = SiteDefaults {
            latitude,
            wind: number("wind")?.unwrap_or(DEFAULT_WIND),
            co2: number("co2")?.unwrap_or(DEFAULT_CO2),
            air_pressure: number("airpressure")?.unwrap_or(DEFAULT_AIR_PRESSURE),
        };

        let (tav, amp) = match (number("tav")?, number("amp")?) {
            (Some(tav), Some(amp)) => (tav, amp),
            (tav, amp) => {
                let (computed_tav, computed_amp) = calc::tav_amp(&parsed.records);
                (tav.unwrap_or(computed_tav), amp.unwrap_or(computed_amp))
            }
        };

        Ok(Self {
            file_name: None,
            section: parsed.section,
            constants: parsed.constants,
            headings: parsed.headings,
            site,
            longitude,
            tav,
            amp,
            records: parsed.records,
            cursor: None,
            scratch_dir: None,
        })
    }

    /// Reads and parses a `.met` file on a blocking thread.
    ///
    /// # Errors
    ///
    /// Returns [`MetFileError::Read`] if the file cannot be read and
    /// [`MetFileError::Parse`] if its content is invalid.
    pub async fn load(path: &Path) -> Result<Self, MetFileError> {
        let path_buf = path.to_path_buf();
        let series = tokio::task::spawn_blocking(move || {
            let text = std::fs::read_to_string(&path_buf)
                .map_err(|e| MetFileError::Read(path_buf.clone(), e))?;
            let mut series = Self::parse(&text).map_err(|source| MetFileError::Parse {
                path: path_buf.clone(),
                source,
            })?;
            series.file_name = Some(path_buf);
            Ok::<_, MetFileError>(series)
        })
        .await??;
        debug!(
            "Loaded {} days of weather from {}",
            series.len(),
            path.display()
        );
        Ok(series)
    }

    pub(crate) fn keep_scratch_dir(&mut self, dir: TempDir) {
        self.scratch_dir = Some(dir);
    }

    /// Path of the file the series was loaded from.
    pub fn file_name(&self) -> Option<&Path> {
        self.file_name.as_deref()
    }

    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    pub fn constant(&self, name: &str) -> Option<&MetConstant> {
        self.constants.get(&name.to_lowercase())
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn latitude(&self) -> f64 {
        self.site.latitude
    }

    pub fn longitude(&self) -> Option<f64> {
        self.longitude
    }

    /// Annual average ambient temperature (°C).
    pub fn tav(&self) -> f64 {
        self.tav
    }

    /// Annual amplitude in mean monthly temperature (°C).
    pub fn amp(&self) -> f64 {
        self.amp
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DailyMet] {
        &self.records
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }

    /// Whether the series spans 1 January of `start_year` to 31 December of `end_year`.
    pub fn covers_years(&self, start_year: i32, end_year: i32) -> bool {
        match (self.first_date(), self.last_date()) {
            (Some(first), Some(last)) => {
                first.year() <= start_year
                    && first.ordinal() == 1
                    && last.year() >= end_year
                    && last.month() == 12
                    && last.day() == 31
            }
            _ => false,
        }
    }

    pub fn day(&self, date: NaiveDate) -> Option<WeatherDay> {
        self.index_of(date).map(|i| self.resolve(i))
    }

    pub fn days(&self) -> impl Iterator<Item = WeatherDay> + '_ {
        (0..self.records.len()).map(|i| self.resolve(i))
    }

    /// The simulation's current day, once the cursor has been placed.
    pub fn today(&self) -> Option<WeatherDay> {
        self.cursor.map(|i| self.resolve(i))
    }

    pub fn yesterday(&self) -> Option<WeatherDay> {
        let i = self.cursor?.checked_sub(1)?;
        Some(self.resolve(i))
    }

    pub fn tomorrow(&self) -> Option<WeatherDay> {
        let i = self.cursor? + 1;
        (i < self.records.len()).then(|| self.resolve(i))
    }

    /// Places the cursor on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::DateOutOfRange`] if the series has no record for `date`.
    pub fn seek(&mut self, date: NaiveDate) -> Result<WeatherDay, SeriesError> {
        let index = self.index_of(date).ok_or_else(|| self.out_of_range(date))?;
        self.cursor = Some(index);
        Ok(self.resolve(index))
    }

    /// Moves the cursor to the next record, or to the first one if it is not placed yet.
    /// Returns `None` at the end of the series.
    pub fn advance(&mut self) -> Option<WeatherDay> {
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.records.len() {
            return None;
        }
        self.cursor = Some(next);
        Some(self.resolve(next))
    }

    /// Reaction to simulation lifecycle events published by the host.
    ///
    /// `Commencing` clears the cursor; `StartOfSimulation` places it on the simulation's
    /// first day.
    pub fn handle_event(&mut self, event: &SimulationEvent) -> Result<(), HostError> {
        match event {
            SimulationEvent::Commencing => {
                self.cursor = None;
            }
            SimulationEvent::StartOfSimulation { today } => {
                self.seek(*today)?;
            }
        }
        Ok(())
    }

    /// All days as a Polars `DataFrame`, with defaults applied.
    ///
    /// Columns: `date`, `radn`, `maxt`, `mint`, `meant`, `rain`, `vp`, `vpd`, `wind`, `co2`,
    /// `airpressure`, `evap`, `daylength`.
    pub fn to_frame(&self) -> Result<DataFrame, SeriesError> {
        let days: Vec<WeatherDay> = self.days().collect();

        let frame = DataFrame::new(vec![
            Column::new(
                "date".into(),
                days.iter().map(|d| d.date).collect::<Vec<NaiveDate>>(),
            ),
            float_column("radn", &days, |d| d.radn),
            float_column("maxt", &days, |d| d.max_t),
            float_column("mint", &days, |d| d.min_t),
            float_column("meant", &days, |d| d.mean_t()),
            float_column("rain", &days, |d| d.rain),
            float_column("vp", &days, |d| d.vp),
            float_column("vpd", &days, |d| d.vpd()),
            float_column("wind", &days, |d| d.wind),
            float_column("co2", &days, |d| d.co2),
            float_column("airpressure", &days, |d| d.air_pressure),
            Column::new(
                "evap".into(),
                days.iter().map(|d| d.evap).collect::<Vec<Option<f64>>>(),
            ),
            float_column("daylength", &days, |d| d.day_length(0.0)),
        ])?;
        Ok(frame)
    }

    /// Lazy frame restricted to whole calendar years, inclusive.
    pub fn frame_for_years(&self, start_year: i32, end_year: i32) -> Result<LazyFrame, SeriesError> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
            .ok_or(SeriesError::InvalidYear(start_year))?;
        let end = NaiveDate::from_ymd_opt(end_year, 12, 31)
            .ok_or(SeriesError::InvalidYear(end_year))?;
        Ok(self.to_frame()?.lazy().filter(
            col("date")
                .gt_eq(lit(start))
                .and(col("date").lt_eq(lit(end))),
        ))
    }

    fn index_of(&self, date: NaiveDate) -> Option<usize> {
        self.records.binary_search_by_key(&date, |r| r.date).ok()
    }

    fn resolve(&self, index: usize) -> WeatherDay {
        WeatherDay::resolve(&self.records[index], &self.site)
    }

    fn out_of_range(&self, date: NaiveDate) -> SeriesError {
        SeriesError::DateOutOfRange {
            date,
            first: self.first_date().unwrap_or(date),
            last: self.last_date().unwrap_or(date),
        }
    }
}

fn float_column(name: &str, days: &[WeatherDay], value: impl Fn(&WeatherDay) -> f64) -> Column {
    Column::new(name.into(), days.iter().map(value).collect::<Vec<f64>>())
}
