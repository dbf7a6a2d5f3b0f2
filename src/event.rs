use crate::app::RefreshSummary;
use crate::error::Result;

/// Inputs to the repeat loop.
pub enum AppEvent {
    /// The repeat interval elapsed; time to request a refresh.
    Tick,
    /// The in-flight refresh finished.
    Completed(Result<RefreshSummary>),
}
