pub mod app;
pub mod logging;
pub mod signal;

pub use app::{build, Application};
pub use signal::ShutdownSignal;
