//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod listen;
mod serve;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use listen::run_listen;
pub use serve::{router, run_serve, AppState};
