mod app;
mod effects;
mod logging;
mod persistence;
pub mod ui;

pub use app::run_app;
pub use effects::{CommandSink, EffectRunner};
pub use logging::LogDestination;
