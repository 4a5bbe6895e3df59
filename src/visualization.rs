use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use plotters::prelude::*;

use crate::models::OptimizationResult;

/// Renders the optimal schedule as a PNG: state of charge plus the four
/// hourly dispatch series over the window.
pub struct ScheduleChart {
    output_dir: PathBuf,
}

impl ScheduleChart {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating chart directory {}", output_dir.display()))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn render(&self, case: &str, result: &OptimizationResult) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("dispatch-{}.png", case));
        let n = result.schedule.len();

        let y_max = result
            .schedule
            .iter()
            .flat_map(|r| {
                [
                    r.state_of_charge,
                    r.gen_hour,
                    r.charge_hour,
                    r.reg_up_hour,
                    r.reg_down_hour,
                ]
            })
            .fold(1.0f64, f64::max)
            * 1.1;

        // The backend borrows the output path, so the whole drawing pass is
        // scoped to release it before the path is returned.
        {
            let root = BitMapBackend::new(&path, (1280, 720)).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(format!("BESS Dispatch - {}", case), ("sans-serif", 30))
                .margin(10)
                .x_label_area_size(40)
                .y_label_area_size(60)
                .build_cartesian_2d(0i32..n as i32, 0f64..y_max)?;

            chart
                .configure_mesh()
                .x_desc("Hour of window")
                .y_desc("MW / MWh")
                .draw()?;

            let rows = &result.schedule;
            chart
                .draw_series(LineSeries::new(
                    rows.iter()
                        .enumerate()
                        .map(|(i, r)| (i as i32, r.state_of_charge)),
                    &BLUE,
                ))?
                .label("State of charge")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

            chart
                .draw_series(LineSeries::new(
                    rows.iter().enumerate().map(|(i, r)| (i as i32, r.gen_hour)),
                    &GREEN,
                ))?
                .label("Generation")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREEN));

            chart
                .draw_series(LineSeries::new(
                    rows.iter()
                        .enumerate()
                        .map(|(i, r)| (i as i32, r.charge_hour)),
                    &RED,
                ))?
                .label("Charge")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

            chart
                .draw_series(LineSeries::new(
                    rows.iter()
                        .enumerate()
                        .map(|(i, r)| (i as i32, r.reg_up_hour)),
                    &MAGENTA,
                ))?
                .label("Reg up")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], MAGENTA));

            chart
                .draw_series(LineSeries::new(
                    rows.iter()
                        .enumerate()
                        .map(|(i, r)| (i as i32, r.reg_down_hour)),
                    &CYAN,
                ))?
                .label("Reg down")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], CYAN));

            chart
                .configure_series_labels()
                .border_style(BLACK)
                .background_style(WHITE.mix(0.8))
                .draw()?;
            root.present()?;
        }

        info!("Wrote dispatch chart to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_output_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("charts");
        ScheduleChart::new(&nested).unwrap();
        assert!(nested.is_dir());
    }
}
