pub mod error;
pub mod models;
pub mod optimizer;
pub mod price_loader;
pub mod report;
pub mod visualization;

pub use error::ScheduleError;
pub use models::{
    BessProfile, DispatchConfig, EnergyPriceSeries, HourlyDispatch, OptimizationResult,
    RegulationPrice, RegulationPriceSeries,
};
pub use optimizer::DispatchOptimizer;
pub use price_loader::PriceLoader;
pub use report::ReportWriter;
pub use visualization::ScheduleChart;
