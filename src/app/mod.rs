pub mod action;
pub mod orchestrator;
pub mod session;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{AcquisitionConfig, Orchestrator};
pub use session::{RefreshSummary, Session};
