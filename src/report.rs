use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::models::OptimizationResult;

/// Writes the hourly schedule for a case to the export sink and prints the
/// headline figures. Only ever handed complete results; failed optimization
/// calls abort before reaching this layer.
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)
            .with_context(|| format!("creating output directory {}", output_dir.display()))?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// One row per hour, keyed by case identifier, consumed downstream by
    /// reporting and plotting collaborators.
    pub fn write_schedule(&self, case: &str, result: &OptimizationResult) -> Result<PathBuf> {
        let path = self.output_dir.join(format!("results-{}.csv", case));
        let mut writer = csv::Writer::from_path(&path)
            .with_context(|| format!("creating schedule file {}", path.display()))?;

        writer.write_record([
            "timestamp",
            "gen_hour",
            "charge_hour",
            "reg_up_hour",
            "reg_down_hour",
            "state_of_charge",
        ])?;
        for row in &result.schedule {
            writer.write_record([
                row.timestamp.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
                row.gen_hour.to_string(),
                row.charge_hour.to_string(),
                row.reg_up_hour.to_string(),
                row.reg_down_hour.to_string(),
                row.state_of_charge.to_string(),
            ])?;
        }
        writer.flush()?;

        info!(
            "Wrote {} schedule rows to {}",
            result.schedule.len(),
            path.display()
        );
        Ok(path)
    }

    pub fn print_summary(&self, case: &str, result: &OptimizationResult) {
        println!("BESS Dispatch Summary");
        println!("{}", "=".repeat(60));
        println!("Case: {}", case);
        if let (Some(first), Some(last)) = (result.schedule.first(), result.schedule.last()) {
            println!("Window: {} to {}", first.timestamp, last.timestamp);
        }
        println!("Hours scheduled: {}", result.schedule.len());
        println!("Total profit: ${:.1}", result.total_profit);
        println!("Total cycles: {:.1}", result.total_cycles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HourlyDispatch;
    use chrono::TimeZone;
    use chrono_tz::America::Chicago;

    fn sample_result() -> OptimizationResult {
        let schedule = (0..3)
            .map(|h| HourlyDispatch {
                timestamp: Chicago.with_ymd_and_hms(2023, 1, 1, h, 0, 0).unwrap(),
                gen_hour: 10.0,
                charge_hour: 0.0,
                reg_up_hour: 5.5,
                reg_down_hour: 0.0,
                state_of_charge: 42.25,
            })
            .collect();
        OptimizationResult {
            schedule,
            total_profit: 1234.5,
            total_cycles: 0.3,
        }
    }

    #[test]
    fn test_write_schedule_csv() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let path = writer.write_schedule("unit", &sample_result()).unwrap();
        assert!(path.ends_with("results-unit.csv"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next().unwrap(),
            "timestamp,gen_hour,charge_hour,reg_up_hour,reg_down_hour,state_of_charge"
        );
        assert_eq!(lines.clone().count(), 3);
        assert!(lines.next().unwrap().contains("42.25"));
    }
}
