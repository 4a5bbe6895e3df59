use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel,
};
use log::{debug, info};

use crate::error::ScheduleError;
use crate::models::{
    BessProfile, DispatchConfig, EnergyPriceSeries, HourlyDispatch, OptimizationResult,
    RegulationPriceSeries,
};

/// Builds and solves the hourly dispatch linear program for one battery over
/// one planning window, then extracts the revenue-maximizing schedule.
///
/// Each call builds an independent variable set and model instance; nothing
/// is cached or shared between calls.
pub struct DispatchOptimizer {
    config: DispatchConfig,
}

impl DispatchOptimizer {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Maximize net revenue from energy arbitrage plus regulation-up/down
    /// capacity sales over `[start_date, end_date]` (inclusive operating
    /// days), anchored at `initial_charge` MWh of stored energy.
    pub fn optimize(
        &self,
        bess: &BessProfile,
        energy: &EnergyPriceSeries,
        regulation: &RegulationPriceSeries,
        start_date: NaiveDate,
        end_date: NaiveDate,
        initial_charge: f64,
    ) -> Result<OptimizationResult, ScheduleError> {
        if start_date > end_date {
            return Err(ScheduleError::InvalidWindow {
                detail: format!("start date {} is after end date {}", start_date, end_date),
            });
        }

        let hours = energy.hours_in(start_date, end_date);
        if hours.is_empty() {
            return Err(ScheduleError::InvalidWindow {
                detail: format!(
                    "no energy price hours between {} and {}",
                    start_date, end_date
                ),
            });
        }
        for pair in hours.windows(2) {
            if pair[1] - pair[0] != Duration::hours(1) {
                return Err(ScheduleError::InvalidWindow {
                    detail: format!("hour sequence has a gap between {} and {}", pair[0], pair[1]),
                });
            }
        }

        let mut energy_prices = Vec::with_capacity(hours.len());
        let mut reg_up_prices = Vec::with_capacity(hours.len());
        let mut reg_down_prices = Vec::with_capacity(hours.len());
        for hour in &hours {
            let price = energy.price(hour).ok_or_else(|| ScheduleError::InvalidWindow {
                detail: format!("hour {} absent from energy prices", hour),
            })?;
            let reg = regulation
                .price(hour)
                .ok_or_else(|| ScheduleError::InvalidWindow {
                    detail: format!("hour {} absent from regulation prices", hour),
                })?;
            energy_prices.push(price);
            reg_up_prices.push(reg.reg_up);
            reg_down_prices.push(reg.reg_down);
        }

        let usable = bess.usable_energy_capacity();
        if !(initial_charge >= 0.0 && initial_charge <= usable) {
            return Err(ScheduleError::InvalidInitialState {
                value: initial_charge,
                max: usable,
            });
        }

        let power = bess.power_capacity();
        let eff = bess.efficiency();
        let inv_eff = 1.0 / eff;
        let margin = self.config.headroom_margin;
        let dispatch_fraction = self.config.reg_dispatch_fraction;
        let n = hours.len();

        // One variable per (family, hour), indexed positionally so solved
        // values map back to their origin without any name round-trip.
        let mut vars = ProblemVariables::new();
        let gen = vars.add_vector(variable().min(0.0).max(power), n);
        let charge = vars.add_vector(variable().min(0.0).max(power), n);
        let reg_up = vars.add_vector(variable().min(0.0).max(power), n);
        let reg_down = vars.add_vector(variable().min(0.0).max(power), n);
        let soc = vars.add_vector(variable().min(0.0).max(usable), n);

        // Energy sold/bought at the spot price; each regulation product earns
        // its capacity price plus an energy-price adder for expected mileage.
        let mut objective = Expression::default();
        for i in 0..n {
            let price = energy_prices[i];
            objective += price * gen[i];
            objective -= price * charge[i];
            objective += reg_up_prices[i] * reg_up[i];
            objective += (dispatch_fraction * price) * reg_up[i];
            objective += reg_down_prices[i] * reg_down[i];
            objective += (dispatch_fraction * price) * reg_down[i];
        }

        let mut model = vars.maximise(objective.clone()).using(default_solver);

        // State anchor.
        model = model.with(constraint!(soc[0] == initial_charge));

        for i in 0..n {
            // Interconnection limit across simultaneous products.
            model = model.with(constraint!(gen[i] + reg_up[i] <= power));
            // Discharge plus reserved capacity within the headroom margin of
            // currently stored energy.
            model = model.with(constraint!(gen[i] + reg_up[i] - margin * soc[i] <= 0.0));
            // Charging plus reserved capacity within remaining ullage,
            // inflated by the round-trip loss incurred while charging.
            model = model.with(constraint!(
                charge[i] + reg_down[i] + inv_eff * soc[i] <= inv_eff * usable
            ));
        }

        // One full cycle per operating day: cap daily generated and charged
        // throughput.
        let mut hours_by_day: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
        for (i, hour) in hours.iter().enumerate() {
            hours_by_day.entry(hour.date_naive()).or_default().push(i);
        }
        for day_hours in hours_by_day.values() {
            let mut day_gen = Expression::default();
            let mut day_charge = Expression::default();
            for &i in day_hours {
                day_gen += gen[i];
                day_charge += charge[i];
            }
            model = model.with(constraint!(day_gen <= eff * usable));
            model = model.with(constraint!(day_charge <= inv_eff * usable));
        }

        // State recurrence: full energy flows pass through the round-trip
        // efficiency; committed regulation flows at the expected dispatch
        // fraction.
        for i in 1..n {
            model = model.with(constraint!(
                soc[i]
                    == soc[i - 1] + eff * charge[i - 1] - inv_eff * gen[i - 1]
                        + (dispatch_fraction * eff) * reg_down[i - 1]
                        - (dispatch_fraction * inv_eff) * reg_up[i - 1]
            ));
        }

        info!(
            "Solving dispatch LP: {} hours across {} operating days",
            n,
            hours_by_day.len()
        );
        let solution = model.solve().map_err(|err| match err {
            ResolutionError::Infeasible => ScheduleError::Infeasible,
            other => ScheduleError::Solver {
                detail: other.to_string(),
            },
        })?;

        // Derived metrics come from raw solver values; rounding is applied
        // only for presentation afterwards.
        let raw_charge_total: f64 = charge.iter().map(|&v| solution.value(v)).sum();
        let total_cycles = round_to(raw_charge_total / usable, 1);
        let total_profit = round_to(solution.eval(objective), self.config.profit_decimals);

        let decimals = self.config.hourly_decimals;
        let schedule = hours
            .iter()
            .enumerate()
            .map(|(i, timestamp)| HourlyDispatch {
                timestamp: *timestamp,
                gen_hour: round_to(solution.value(gen[i]), decimals),
                charge_hour: round_to(solution.value(charge[i]), decimals),
                reg_up_hour: round_to(solution.value(reg_up[i]), decimals),
                reg_down_hour: round_to(solution.value(reg_down[i]), decimals),
                state_of_charge: round_to(solution.value(soc[i]), decimals),
            })
            .collect();

        debug!(
            "Optimal dispatch found: profit {}, cycles {}",
            total_profit, total_cycles
        );

        Ok(OptimizationResult {
            schedule,
            total_profit,
            total_cycles,
        })
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
