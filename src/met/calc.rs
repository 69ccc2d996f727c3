//! Meteorological formulas used by APSIM weather components.

use crate::met::daily::DailyMet;
use chrono::Datelike;
use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Fraction of the day's VPD attributed to the maximum temperature.
const SVP_FRACTION: f64 = 0.66;

/// Saturated vapour pressure (hPa) at `temp` (°C).
pub fn svp(temp: f64) -> f64 {
    6.1078 * (17.269 * temp / (237.3 + temp)).exp()
}

/// Daytime vapour pressure deficit (hPa), weighted towards the maximum temperature.
pub fn vpd(vp: f64, min_t: f64, max_t: f64) -> f64 {
    let vpd_min_t = (svp(min_t) - vp).max(0.0);
    let vpd_max_t = (svp(max_t) - vp).max(0.0);
    SVP_FRACTION * vpd_max_t + (1.0 - SVP_FRACTION) * vpd_min_t
}

/// Hours between the sun crossing `sun_angle` degrees on the way up and on the way down.
///
/// `sun_angle` is the altitude of the sun's centre; `-6` gives civil twilight, `0` the
/// geometric day. The result is clamped to 0 (polar night) and 24 (midnight sun).
pub fn day_length(day_of_year: u32, sun_angle: f64, latitude: f64) -> f64 {
    const EQUINOX: f64 = 82.25;
    const DEG_TO_RAD: f64 = PI / 180.0;
    const SOLAR_DECLINATION: f64 = 23.45116 * DEG_TO_RAD;
    const DAY_TO_RAD: f64 = 2.0 * PI / 365.25;
    const RAD_TO_HOURS: f64 = 24.0 / (2.0 * PI);

    let sun_altitude = sun_angle * DEG_TO_RAD;
    let declination = SOLAR_DECLINATION * (DAY_TO_RAD * (f64::from(day_of_year) - EQUINOX)).sin();

    let cos_hour_angle = if latitude.abs() >= 90.0 {
        (-declination).signum() * latitude.signum()
    } else {
        let lat_rad = latitude * DEG_TO_RAD;
        let sin_sin = lat_rad.sin() * declination.sin();
        let cos_cos = lat_rad.cos() * declination.cos();
        let altitude_min = (sin_sin - cos_cos).clamp(-1.0, 1.0).asin();
        let altitude_max = (sin_sin + cos_cos).clamp(-1.0, 1.0).asin();
        let altitude = sun_altitude.clamp(altitude_min, altitude_max);
        (altitude.sin() - sin_sin) / cos_cos
    };

    cos_hour_angle.clamp(-1.0, 1.0).acos() * RAD_TO_HOURS * 2.0
}

/// Annual average temperature and mean annual amplitude of monthly mean temperatures.
///
/// Amplitude is averaged over years with all twelve months present; when there are none
/// it falls back to the spread of all monthly means.
pub fn tav_amp(records: &[DailyMet]) -> (f64, f64) {
    let mut months: BTreeMap<(i32, u32), (f64, u32)> = BTreeMap::new();
    for record in records {
        let entry = months
            .entry((record.date.year(), record.date.month()))
            .or_insert((0.0, 0));
        entry.0 += (record.max_t + record.min_t) / 2.0;
        entry.1 += 1;
    }
    if months.is_empty() {
        return (0.0, 0.0);
    }

    let monthly_means: Vec<((i32, u32), f64)> = months
        .into_iter()
        .map(|(key, (sum, count))| (key, sum / f64::from(count)))
        .collect();

    let tav = monthly_means.iter().map(|(_, t)| t).sum::<f64>() / monthly_means.len() as f64;

    let mut years: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for ((year, _), mean) in &monthly_means {
        years.entry(*year).or_default().push(*mean);
    }
    let amplitudes: Vec<f64> = years
        .values()
        .filter(|means| means.len() == 12)
        .map(|means| spread(means))
        .collect();

    let amp = if amplitudes.is_empty() {
        spread(&monthly_means.iter().map(|(_, t)| *t).collect::<Vec<_>>())
    } else {
        amplitudes.iter().sum::<f64>() / amplitudes.len() as f64
    };

    (tav, amp)
}

fn spread(values: &[f64]) -> f64 {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    max - min
}
