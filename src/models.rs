use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Battery Energy Storage System asset description.
///
/// The stored energy capacity is the usable, efficiency-derated capacity
/// (`nameplate / efficiency`), computed once at construction. All state of
/// charge bounds in the dispatch model refer to this derated figure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BessProfile {
    power_capacity: f64,
    energy_capacity: f64,
    efficiency: f64,
}

impl BessProfile {
    pub fn new(
        power_capacity: f64,
        nameplate_energy_capacity: f64,
        efficiency: f64,
    ) -> Result<Self, ScheduleError> {
        if !(power_capacity > 0.0) {
            return Err(ScheduleError::InvalidProfile {
                detail: format!("power capacity must be positive, got {}", power_capacity),
            });
        }
        if !(nameplate_energy_capacity > 0.0) {
            return Err(ScheduleError::InvalidProfile {
                detail: format!(
                    "energy capacity must be positive, got {}",
                    nameplate_energy_capacity
                ),
            });
        }
        if !(efficiency > 0.0 && efficiency <= 1.0) {
            return Err(ScheduleError::InvalidProfile {
                detail: format!("efficiency must be in (0, 1], got {}", efficiency),
            });
        }

        Ok(Self {
            power_capacity,
            energy_capacity: nameplate_energy_capacity / efficiency,
            efficiency,
        })
    }

    pub fn power_capacity(&self) -> f64 {
        self.power_capacity
    }

    /// Usable (efficiency-derated) energy capacity in MWh.
    pub fn usable_energy_capacity(&self) -> f64 {
        self.energy_capacity
    }

    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }
}

/// Regulation capacity prices for one hour.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RegulationPrice {
    pub reg_up: f64,
    pub reg_down: f64,
}

/// Aligned hourly energy prices, keyed by hour-start instant.
///
/// Construction enforces the alignment contract: exactly one point per hour
/// and no interior gaps. Duplicates and gaps are data-quality errors, never
/// silently resolved.
#[derive(Debug, Clone, Default)]
pub struct EnergyPriceSeries {
    points: BTreeMap<DateTime<Tz>, f64>,
}

impl EnergyPriceSeries {
    pub fn from_points(
        points: impl IntoIterator<Item = (DateTime<Tz>, f64)>,
    ) -> Result<Self, ScheduleError> {
        let mut map = BTreeMap::new();
        for (hour, price) in points {
            if map.insert(hour, price).is_some() {
                return Err(ScheduleError::DataAlignment {
                    detail: format!("duplicate energy price for hour {}", hour),
                });
            }
        }
        check_contiguous(map.keys(), "energy")?;
        Ok(Self { points: map })
    }

    pub fn price(&self, hour: &DateTime<Tz>) -> Option<f64> {
        self.points.get(hour).copied()
    }

    /// Hour-start instants whose local operating day falls inside
    /// `[start, end]`, in chronological order.
    pub fn hours_in(&self, start: NaiveDate, end: NaiveDate) -> Vec<DateTime<Tz>> {
        self.points
            .keys()
            .filter(|hour| {
                let day = hour.date_naive();
                day >= start && day <= end
            })
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Aligned hourly regulation-up/down prices, same alignment contract as
/// [`EnergyPriceSeries`].
#[derive(Debug, Clone, Default)]
pub struct RegulationPriceSeries {
    points: BTreeMap<DateTime<Tz>, RegulationPrice>,
}

impl RegulationPriceSeries {
    pub fn from_points(
        points: impl IntoIterator<Item = (DateTime<Tz>, RegulationPrice)>,
    ) -> Result<Self, ScheduleError> {
        let mut map = BTreeMap::new();
        for (hour, price) in points {
            if map.insert(hour, price).is_some() {
                return Err(ScheduleError::DataAlignment {
                    detail: format!("duplicate regulation price for hour {}", hour),
                });
            }
        }
        check_contiguous(map.keys(), "regulation")?;
        Ok(Self { points: map })
    }

    pub fn price(&self, hour: &DateTime<Tz>) -> Option<RegulationPrice> {
        self.points.get(hour).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

fn check_contiguous<'a>(
    hours: impl Iterator<Item = &'a DateTime<Tz>>,
    series: &str,
) -> Result<(), ScheduleError> {
    let mut previous: Option<&DateTime<Tz>> = None;
    for hour in hours {
        if let Some(prev) = previous {
            if *hour - *prev != Duration::hours(1) {
                return Err(ScheduleError::DataAlignment {
                    detail: format!(
                        "{} series has a gap between {} and {}",
                        series, prev, hour
                    ),
                });
            }
        }
        previous = Some(hour);
    }
    Ok(())
}

/// Tunable parameters of the dispatch formulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Fraction of current state of charge available for discharge plus
    /// regulation-up in any hour (safety margin against mid-hour drift).
    pub headroom_margin: f64,
    /// Expected fraction of committed regulation capacity actually called,
    /// used both in the revenue adder and the state-of-charge recurrence.
    pub reg_dispatch_fraction: f64,
    /// Presentation rounding for hourly schedule values.
    pub hourly_decimals: u32,
    /// Presentation rounding for total profit.
    pub profit_decimals: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            headroom_margin: 0.9,
            reg_dispatch_fraction: 0.1,
            hourly_decimals: 2,
            profit_decimals: 1,
        }
    }
}

/// One hour of the optimal schedule. Values are rounded for presentation;
/// derived metrics are computed from raw solver values before rounding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyDispatch {
    pub timestamp: DateTime<Tz>,
    pub gen_hour: f64,
    pub charge_hour: f64,
    pub reg_up_hour: f64,
    pub reg_down_hour: f64,
    pub state_of_charge: f64,
}

/// Outcome of one optimization call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationResult {
    pub schedule: Vec<HourlyDispatch>,
    pub total_profit: f64,
    /// Total charged energy over the window divided by usable capacity,
    /// reported to one decimal place.
    pub total_cycles: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn hour(h: u32) -> DateTime<Tz> {
        Chicago.with_ymd_and_hms(2023, 1, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_profile_derates_energy_capacity() {
        let bess = BessProfile::new(100.0, 200.0, 0.9).unwrap();
        assert_eq!(bess.power_capacity(), 100.0);
        assert!((bess.usable_energy_capacity() - 200.0 / 0.9).abs() < 1e-9);
        assert_eq!(bess.efficiency(), 0.9);
    }

    #[test]
    fn test_profile_rejects_bad_parameters() {
        assert!(matches!(
            BessProfile::new(0.0, 200.0, 0.9),
            Err(ScheduleError::InvalidProfile { .. })
        ));
        assert!(matches!(
            BessProfile::new(100.0, -5.0, 0.9),
            Err(ScheduleError::InvalidProfile { .. })
        ));
        assert!(matches!(
            BessProfile::new(100.0, 200.0, 1.5),
            Err(ScheduleError::InvalidProfile { .. })
        ));
        assert!(matches!(
            BessProfile::new(100.0, 200.0, 0.0),
            Err(ScheduleError::InvalidProfile { .. })
        ));
    }

    #[test]
    fn test_series_rejects_duplicate_hour() {
        let result =
            EnergyPriceSeries::from_points(vec![(hour(0), 25.0), (hour(1), 30.0), (hour(1), 31.0)]);
        assert!(matches!(result, Err(ScheduleError::DataAlignment { .. })));
    }

    #[test]
    fn test_series_rejects_gap() {
        let result =
            EnergyPriceSeries::from_points(vec![(hour(0), 25.0), (hour(1), 30.0), (hour(3), 40.0)]);
        assert!(matches!(result, Err(ScheduleError::DataAlignment { .. })));
    }

    #[test]
    fn test_regulation_series_rejects_gap() {
        let p = RegulationPrice {
            reg_up: 5.0,
            reg_down: 3.0,
        };
        let result = RegulationPriceSeries::from_points(vec![(hour(2), p), (hour(4), p)]);
        assert!(matches!(result, Err(ScheduleError::DataAlignment { .. })));
    }

    #[test]
    fn test_hours_in_filters_by_operating_day() {
        let points: Vec<_> = (0..24).map(|h| (hour(h), 20.0)).collect();
        let series = EnergyPriceSeries::from_points(points).unwrap();

        let day = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let hours = series.hours_in(day, day);
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0], hour(0));
        assert_eq!(hours[23], hour(23));

        let next_day = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
        assert!(series.hours_in(next_day, next_day).is_empty());
    }
}
