pub mod event;
pub mod pipeline;

pub use event::*;
pub use pipeline::*;
