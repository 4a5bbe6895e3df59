use std::path::PathBuf;

use anyhow::{Context, Result};
use bess_scheduler::{
    BessProfile, DispatchConfig, DispatchOptimizer, PriceLoader, ReportWriter, ScheduleChart,
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use clap::{Parser, ValueEnum};
use log::info;

#[derive(Parser)]
#[command(name = "bess_scheduler")]
#[command(about = "Optimize hourly BESS dispatch across energy and regulation markets")]
struct Args {
    /// Case identifier used to name output files
    #[arg(short, long, default_value = "case1")]
    case: String,

    /// Energy price CSV (Operating Day, Operating Hour, Price)
    #[arg(long)]
    energy_prices: PathBuf,

    /// Regulation price CSV (Operating Day, Operating Hour, Regulation Up, Regulation Down)
    #[arg(long)]
    regulation_prices: PathBuf,

    /// Battery power capacity in MW
    #[arg(long, default_value = "100.0")]
    power_mw: f64,

    /// Nameplate energy capacity in MWh
    #[arg(long, default_value = "200.0")]
    capacity_mwh: f64,

    /// Round-trip efficiency (0-1)
    #[arg(short, long, default_value = "0.9")]
    efficiency: f64,

    /// First operating day (YYYY-MM-DD)
    #[arg(long)]
    start_date: String,

    /// Last operating day (YYYY-MM-DD), inclusive
    #[arg(long)]
    end_date: String,

    /// State of charge at the first hour, in MWh
    #[arg(long, default_value = "0.0")]
    initial_charge: f64,

    /// Civil timezone of the operating day/hour price keys
    #[arg(long, default_value = "America/Chicago")]
    timezone: String,

    /// Directory for schedule exports and charts
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Stdout output format
    #[arg(long, value_enum, default_value = "summary")]
    format: OutputFormat,

    /// Render a dispatch chart alongside the schedule CSV
    #[arg(long)]
    chart: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Summary,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let timezone: Tz = args
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("parsing timezone")?;
    let start_date = NaiveDate::parse_from_str(&args.start_date, "%Y-%m-%d")
        .context("parsing start date")?;
    let end_date =
        NaiveDate::parse_from_str(&args.end_date, "%Y-%m-%d").context("parsing end date")?;

    let bess = BessProfile::new(args.power_mw, args.capacity_mwh, args.efficiency)?;

    info!("Loading price data for case {}", args.case);
    let loader = PriceLoader::new(timezone);
    let energy = loader.load_energy_prices(&args.energy_prices)?;
    let regulation = loader.load_regulation_prices(&args.regulation_prices)?;

    info!(
        "Optimizing dispatch from {} to {} (initial charge {} MWh)",
        start_date, end_date, args.initial_charge
    );
    let optimizer = DispatchOptimizer::new(DispatchConfig::default());
    let result = optimizer.optimize(
        &bess,
        &energy,
        &regulation,
        start_date,
        end_date,
        args.initial_charge,
    )?;

    // Nothing reaches the export sink unless the solve succeeded.
    let writer = ReportWriter::new(&args.output_dir)?;
    writer.write_schedule(&args.case, &result)?;

    if args.chart {
        let chart = ScheduleChart::new(&args.output_dir)?;
        chart.render(&args.case, &result)?;
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Csv => {
            println!("timestamp,gen_hour,charge_hour,reg_up_hour,reg_down_hour,state_of_charge");
            for row in &result.schedule {
                println!(
                    "{},{},{},{},{},{}",
                    row.timestamp.format("%Y-%m-%d %H:%M:%S %Z"),
                    row.gen_hour,
                    row.charge_hour,
                    row.reg_up_hour,
                    row.reg_down_hour,
                    row.state_of_charge
                );
            }
        }
        OutputFormat::Summary => writer.print_summary(&args.case, &result),
    }

    Ok(())
}
