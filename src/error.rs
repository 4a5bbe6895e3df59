use thiserror::Error;

/// Error taxonomy for one optimization call. All variants are terminal for
/// the call that raised them; no partial schedule is ever returned.
#[derive(Error, Debug)]
pub enum ScheduleError {
    #[error("price series alignment error: {detail}")]
    DataAlignment { detail: String },

    #[error("invalid optimization window: {detail}")]
    InvalidWindow { detail: String },

    #[error("initial charge {value} MWh outside [0, {max}] MWh")]
    InvalidInitialState { value: f64, max: f64 },

    #[error("invalid battery profile: {detail}")]
    InvalidProfile { detail: String },

    #[error("dispatch model is infeasible")]
    Infeasible,

    #[error("LP solver failure: {detail}")]
    Solver { detail: String },
}
