//! Reader for APSIM `.met` weather files.
//!
//! ```text
//! [weather.met.weather]
//! latitude = -35.00 (DECIMAL DEGREES)
//! tav = 13.1 (oC)   ! annual average ambient temperature
//! amp = 14.5 (oC)
//! year  day radn  maxt  mint  rain  vp    evap
//! ()    ()  (MJ/m^2) (oC) (oC)  (mm)  (hPa) (mm)
//! 2010  1   31.0  30.2  14.1  0.0   14.2  9.0
//! ```
//!
//! `!` starts a comment anywhere on a line. Constants (`name = value (units)`) and the
//! `[section]` line may only appear before the headings. A units row directly after the
//! headings is optional.

use crate::met::daily::DailyMet;
use crate::met::error::MetParseError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

const MISSING_TOKENS: [&str; 4] = ["?", "*", "nan", "NaN"];

/// A header constant such as `latitude = -35.00 (DECIMAL DEGREES)`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetConstant {
    pub value: String,
    pub units: Option<String>,
}

impl MetConstant {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        match text.split_once('(') {
            Some((value, rest)) => Self {
                value: value.trim().to_string(),
                units: Some(rest.trim_end().trim_end_matches(')').trim().to_string()),
            },
            None => Self {
                value: text.to_string(),
                units: None,
            },
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.parse().ok()
    }
}

#[derive(Debug)]
pub(crate) struct ParsedMet {
    pub section: Option<String>,
    pub constants: BTreeMap<String, MetConstant>,
    pub headings: Vec<String>,
    pub records: Vec<DailyMet>,
}

#[derive(Debug, Clone, Copy)]
enum DateColumns {
    YearDay { year: usize, day: usize },
    Date(usize),
}

#[derive(Debug)]
struct ColumnLayout {
    headings: Vec<String>,
    date: DateColumns,
    radn: usize,
    max_t: usize,
    min_t: usize,
    rain: usize,
    vp: Option<usize>,
    evap: Option<usize>,
    wind: Option<usize>,
    co2: Option<usize>,
    air_pressure: Option<usize>,
    vp_deficit: Option<usize>,
}

impl ColumnLayout {
    fn from_headings(line: &str) -> Result<Self, MetParseError> {
        let headings: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
        let find = |names: &[&str]| position(&headings, names);
        let require = |name: &'static str| {
            position(&headings, &[name]).ok_or(MetParseError::MissingColumn(name))
        };

        let date = match (find(&["year"]), find(&["day", "doy"]), find(&["date"])) {
            (Some(year), Some(day), _) => DateColumns::YearDay { year, day },
            (_, _, Some(date)) => DateColumns::Date(date),
            (None, _, None) => return Err(MetParseError::MissingColumn("year")),
            (Some(_), None, None) => return Err(MetParseError::MissingColumn("day")),
        };

        Ok(Self {
            date,
            radn: require("radn")?,
            max_t: require("maxt")?,
            min_t: require("mint")?,
            rain: require("rain")?,
            vp: find(&["vp"]),
            evap: find(&["evap"]),
            wind: find(&["wind"]),
            co2: find(&["co2"]),
            air_pressure: find(&["airpressure"]),
            vp_deficit: find(&["vpd", "vp_deficit"]),
            headings,
        })
    }

    fn parse_row(&self, line: &str, line_no: usize) -> Result<DailyMet, MetParseError> {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.len() != self.headings.len() {
            return Err(MetParseError::RowLength {
                line: line_no,
                expected: self.headings.len(),
                found: values.len(),
            });
        }

        let date = match self.date {
            DateColumns::YearDay { year, day } => {
                let year: i32 = values[year]
                    .parse()
                    .map_err(|_| MetParseError::InvalidDate { line: line_no })?;
                let day: u32 = values[day]
                    .parse()
                    .map_err(|_| MetParseError::InvalidDate { line: line_no })?;
                NaiveDate::from_yo_opt(year, day)
            }
            DateColumns::Date(index) => NaiveDate::parse_from_str(values[index], "%Y-%m-%d").ok(),
        }
        .ok_or(MetParseError::InvalidDate { line: line_no })?;

        let required = |index: usize| self.required(&values, index, line_no);
        let optional = |index: Option<usize>| self.optional(&values, index, line_no);

        Ok(DailyMet {
            date,
            radn: required(self.radn)?,
            max_t: required(self.max_t)?,
            min_t: required(self.min_t)?,
            rain: required(self.rain)?,
            vp: optional(self.vp)?,
            evap: optional(self.evap)?,
            wind: optional(self.wind)?,
            co2: optional(self.co2)?,
            air_pressure: optional(self.air_pressure)?,
            vp_deficit: optional(self.vp_deficit)?,
        })
    }

    fn required(&self, values: &[&str], index: usize, line_no: usize) -> Result<f64, MetParseError> {
        values[index]
            .parse()
            .map_err(|_| self.invalid_value(values, index, line_no))
    }

    fn optional(
        &self,
        values: &[&str],
        index: Option<usize>,
        line_no: usize,
    ) -> Result<Option<f64>, MetParseError> {
        let Some(index) = index else {
            return Ok(None);
        };
        if MISSING_TOKENS.contains(&values[index]) {
            return Ok(None);
        }
        self.required(values, index, line_no).map(Some)
    }

    fn invalid_value(&self, values: &[&str], index: usize, line_no: usize) -> MetParseError {
        MetParseError::InvalidValue {
            line: line_no,
            column: self.headings[index].clone(),
            value: values[index].to_string(),
        }
    }
}

fn position(headings: &[String], names: &[&str]) -> Option<usize> {
    headings.iter().position(|h| names.contains(&h.as_str()))
}

fn strip_comment(line: &str) -> &str {
    match line.find('!') {
        Some(index) => &line[..index],
        None => line,
    }
}

pub(crate) fn parse_met(text: &str) -> Result<ParsedMet, MetParseError> {
    let mut section = None;
    let mut constants = BTreeMap::new();
    let mut layout: Option<ColumnLayout> = None;
    let mut records: Vec<DailyMet> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line_no = index + 1;
        let line = strip_comment(raw).trim();
        if line.is_empty() {
            continue;
        }

        let Some(columns) = &layout else {
            if line.starts_with('[') {
                section = Some(line.trim_matches(|c| c == '[' || c == ']').to_string());
            } else if let Some((name, value)) = line.split_once('=') {
                constants.insert(name.trim().to_lowercase(), MetConstant::parse(value));
            } else {
                layout = Some(ColumnLayout::from_headings(line)?);
            }
            continue;
        };

        if records.is_empty() && line.starts_with('(') {
            continue;
        }

        let record = columns.parse_row(line, line_no)?;
        if let Some(previous) = records.last() {
            if record.date <= previous.date {
                return Err(MetParseError::OutOfOrder {
                    line: line_no,
                    date: record.date,
                    previous: previous.date,
                });
            }
        }
        records.push(record);
    }

    let layout = layout.ok_or(MetParseError::MissingHeadings)?;
    if records.is_empty() {
        return Err(MetParseError::NoData);
    }

    Ok(ParsedMet {
        section,
        constants,
        headings: layout.headings,
        records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[weather.met.weather]
!station number = 70351
latitude = -35.00 (DECIMAL DEGREES)
longitude = 149.00 (DECIMAL DEGREES)
tav = 13.1 (oC) ! annual average ambient temperature
amp = 14.5 (oC)

year  day radn  maxt   mint  rain  vp    evap
()    ()  (MJ/m^2) (oC) (oC)  (mm)  (hPa) (mm)
2010  1   31.0  30.2   14.1  0.0   14.2  9.0
2010  2   29.5  27.8   12.9  4.2   ?     7.1
";

    #[test]
    fn test_parse_sample() -> Result<(), MetParseError> {
        let parsed = parse_met(SAMPLE)?;
        assert_eq!(parsed.section.as_deref(), Some("weather.met.weather"));
        assert_eq!(parsed.constants["latitude"].as_f64(), Some(-35.0));
        assert_eq!(
            parsed.constants["latitude"].units.as_deref(),
            Some("DECIMAL DEGREES")
        );
        assert_eq!(parsed.constants["tav"].as_f64(), Some(13.1));
        assert!(!parsed.constants.contains_key("!station number"));
        assert_eq!(
            parsed.headings,
            ["year", "day", "radn", "maxt", "mint", "rain", "vp", "evap"]
        );
        assert_eq!(parsed.records.len(), 2);

        let first = &parsed.records[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2010, 1, 1).unwrap());
        assert_eq!(first.max_t, 30.2);
        assert_eq!(first.vp, Some(14.2));
        assert_eq!(parsed.records[1].vp, None);
        assert_eq!(parsed.records[1].rain, 4.2);
        Ok(())
    }

    #[test]
    fn test_date_column_and_no_units_row() -> Result<(), MetParseError> {
        let parsed = parse_met(
            "latitude = 10\n\
             Date maxt mint radn rain wind\n\
             1999-12-31 30 20 25 0 2.5\n\
             2000-01-01 31 21 26 1 *\n",
        )?;
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].wind, Some(2.5));
        assert_eq!(parsed.records[1].wind, None);
        assert_eq!(
            parsed.records[1].date,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()
        );
        Ok(())
    }

    #[test]
    fn test_missing_required_column() {
        let err = parse_met("year day radn maxt mint\n2010 1 1 2 3\n").unwrap_err();
        assert!(matches!(err, MetParseError::MissingColumn("rain")), "{err:?}");
    }

    #[test]
    fn test_row_length_mismatch_reports_line() {
        let err = parse_met("year day radn maxt mint rain\n2010 1 20 30 10\n").unwrap_err();
        assert!(
            matches!(err, MetParseError::RowLength { line: 2, expected: 6, found: 5 }),
            "{err:?}"
        );
    }

    #[test]
    fn test_invalid_required_value() {
        let err = parse_met("year day radn maxt mint rain\n2010 1 20 ? 10 0\n").unwrap_err();
        match err {
            MetParseError::InvalidValue { line, column, value } => {
                assert_eq!(line, 2);
                assert_eq!(column, "maxt");
                assert_eq!(value, "?");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_day_of_year() {
        let err = parse_met("year day radn maxt mint rain\n2010 366 20 30 10 0\n").unwrap_err();
        assert!(matches!(err, MetParseError::InvalidDate { line: 2 }), "{err:?}");
    }

    #[test]
    fn test_dates_must_increase() {
        let err = parse_met(
            "year day radn maxt mint rain\n2010 2 20 30 10 0\n2010 1 20 30 10 0\n",
        )
        .unwrap_err();
        assert!(matches!(err, MetParseError::OutOfOrder { line: 3, .. }), "{err:?}");
    }

    #[test]
    fn test_empty_inputs() {
        assert!(matches!(
            parse_met("latitude = 1\n"),
            Err(MetParseError::MissingHeadings)
        ));
        assert!(matches!(
            parse_met("year day radn maxt mint rain\n() () () () () ()\n"),
            Err(MetParseError::NoData)
        ));
    }
}
