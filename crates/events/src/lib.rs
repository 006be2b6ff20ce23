//! Domain events and deterministic command execution.

pub mod event;
pub mod handler;

pub use event::Event;
pub use handler::execute;
