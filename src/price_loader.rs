use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, TimeZone};
use chrono_tz::Tz;
use log::info;
use serde::Deserialize;

use crate::error::ScheduleError;
use crate::models::{EnergyPriceSeries, RegulationPrice, RegulationPriceSeries};

/// Raw energy price row as published: operating day plus hour-of-day 1..=24.
#[derive(Debug, Deserialize)]
struct EnergyPriceRow {
    #[serde(rename = "Operating Day")]
    operating_day: String,
    #[serde(rename = "Operating Hour")]
    operating_hour: u32,
    #[serde(rename = "Price")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct RegulationPriceRow {
    #[serde(rename = "Operating Day")]
    operating_day: String,
    #[serde(rename = "Operating Hour")]
    operating_hour: u32,
    #[serde(rename = "Regulation Up")]
    reg_up: f64,
    #[serde(rename = "Regulation Down")]
    reg_down: f64,
}

/// Normalizes raw `(operating day, hour-of-day)` price rows onto canonical
/// hour-start instants in a configured civil timezone, so the energy and
/// regulation series can be joined on a single hourly key.
pub struct PriceLoader {
    timezone: Tz,
}

impl PriceLoader {
    pub fn new(timezone: Tz) -> Self {
        Self { timezone }
    }

    pub fn load_energy_prices(&self, path: &Path) -> Result<EnergyPriceSeries> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening energy price file {}", path.display()))?;

        let mut points = Vec::new();
        for row in reader.deserialize() {
            let row: EnergyPriceRow = row.context("parsing energy price row")?;
            let hour = self.hour_start(&row.operating_day, row.operating_hour)?;
            points.push((hour, row.price));
        }

        let series = EnergyPriceSeries::from_points(points)?;
        info!(
            "Loaded {} energy price hours from {}",
            series.len(),
            path.display()
        );
        Ok(series)
    }

    pub fn load_regulation_prices(&self, path: &Path) -> Result<RegulationPriceSeries> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening regulation price file {}", path.display()))?;

        let mut points = Vec::new();
        for row in reader.deserialize() {
            let row: RegulationPriceRow = row.context("parsing regulation price row")?;
            let hour = self.hour_start(&row.operating_day, row.operating_hour)?;
            points.push((
                hour,
                RegulationPrice {
                    reg_up: row.reg_up,
                    reg_down: row.reg_down,
                },
            ));
        }

        let series = RegulationPriceSeries::from_points(points)?;
        info!(
            "Loaded {} regulation price hours from {}",
            series.len(),
            path.display()
        );
        Ok(series)
    }

    /// Maps `(operating day, hour-of-day)` to the hour-start instant
    /// `day + (hour - 1) hours` localized to the configured timezone. Hour 1
    /// is the day's first hour. DST-ambiguous local times resolve to the
    /// earlier instant; nonexistent local times are a data error.
    fn hour_start(&self, operating_day: &str, operating_hour: u32) -> Result<DateTime<Tz>, ScheduleError> {
        if !(1..=24).contains(&operating_hour) {
            return Err(ScheduleError::DataAlignment {
                detail: format!(
                    "operating hour {} on {} outside 1..=24",
                    operating_hour, operating_day
                ),
            });
        }

        let day = NaiveDate::parse_from_str(operating_day, "%m/%d/%Y")
            .or_else(|_| NaiveDate::parse_from_str(operating_day, "%Y-%m-%d"))
            .map_err(|_| ScheduleError::DataAlignment {
                detail: format!("unparseable operating day '{}'", operating_day),
            })?;

        let naive =
            day.and_time(chrono::NaiveTime::MIN) + Duration::hours(i64::from(operating_hour) - 1);

        match self.timezone.from_local_datetime(&naive) {
            LocalResult::Single(instant) => Ok(instant),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(ScheduleError::DataAlignment {
                detail: format!("local time {} does not exist in {}", naive, self.timezone),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::America::Chicago;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_hour_start_maps_hour_one_to_first_hour() {
        let loader = PriceLoader::new(Chicago);
        let instant = loader.hour_start("01/15/2023", 1).unwrap();
        assert_eq!(instant, Chicago.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap());

        let instant = loader.hour_start("2023-01-15", 24).unwrap();
        assert_eq!(instant, Chicago.with_ymd_and_hms(2023, 1, 15, 23, 0, 0).unwrap());
    }

    #[test]
    fn test_hour_start_rejects_out_of_range_hour() {
        let loader = PriceLoader::new(Chicago);
        assert!(matches!(
            loader.hour_start("01/15/2023", 0),
            Err(ScheduleError::DataAlignment { .. })
        ));
        assert!(matches!(
            loader.hour_start("01/15/2023", 25),
            Err(ScheduleError::DataAlignment { .. })
        ));
    }

    #[test]
    fn test_load_energy_prices() {
        let file = write_csv(
            "Operating Day,Operating Hour,Price\n\
             01/15/2023,1,21.50\n\
             01/15/2023,2,19.75\n\
             01/15/2023,3,18.00\n",
        );
        let loader = PriceLoader::new(Chicago);
        let series = loader.load_energy_prices(file.path()).unwrap();
        assert_eq!(series.len(), 3);

        let second = Chicago.with_ymd_and_hms(2023, 1, 15, 1, 0, 0).unwrap();
        assert_eq!(series.price(&second), Some(19.75));
    }

    #[test]
    fn test_load_regulation_prices() {
        let file = write_csv(
            "Operating Day,Operating Hour,Regulation Up,Regulation Down\n\
             01/15/2023,1,12.0,4.5\n\
             01/15/2023,2,11.0,5.0\n",
        );
        let loader = PriceLoader::new(Chicago);
        let series = loader.load_regulation_prices(file.path()).unwrap();
        assert_eq!(series.len(), 2);

        let first = Chicago.with_ymd_and_hms(2023, 1, 15, 0, 0, 0).unwrap();
        let price = series.price(&first).unwrap();
        assert_eq!(price.reg_up, 12.0);
        assert_eq!(price.reg_down, 4.5);
    }

    #[test]
    fn test_load_rejects_duplicate_hour() {
        let file = write_csv(
            "Operating Day,Operating Hour,Price\n\
             01/15/2023,1,21.50\n\
             01/15/2023,1,22.00\n",
        );
        let loader = PriceLoader::new(Chicago);
        assert!(loader.load_energy_prices(file.path()).is_err());
    }

    #[test]
    fn test_load_rejects_missing_hour() {
        let file = write_csv(
            "Operating Day,Operating Hour,Price\n\
             01/15/2023,1,21.50\n\
             01/15/2023,3,22.00\n",
        );
        let loader = PriceLoader::new(Chicago);
        assert!(loader.load_energy_prices(file.path()).is_err());
    }
}
