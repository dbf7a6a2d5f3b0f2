use log::debug;
use tokio::sync::mpsc;

use super::orchestrator::{Acquisition, Orchestrator};
use super::state::AcquisitionState;
use crate::error::{PortsError, Result};
use crate::model::SocketRecord;

/// What a completed refresh changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSummary {
    pub records: usize,
    pub privileged: bool,
    pub state: AcquisitionState,
}

/// Message sent back by the blocking acquisition task.
struct Completion {
    orchestrator: Orchestrator,
    result: Result<Acquisition>,
}

/// Owns the socket table and the privilege flag for the life of the program.
///
/// Only a completed refresh writes either of them, and it replaces both
/// wholesale. While a refresh is in flight the orchestrator lives on the
/// blocking pool, so further refresh requests are ignored rather than queued.
pub struct Session {
    table: Vec<SocketRecord>,
    privileged: bool,
    orchestrator: Option<Orchestrator>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl Session {
    pub fn new(orchestrator: Orchestrator) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            table: Vec::new(),
            privileged: false,
            orchestrator: Some(orchestrator),
            completions_tx,
            completions_rx,
        }
    }

    pub fn table(&self) -> &[SocketRecord] {
        &self.table
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    pub fn is_refreshing(&self) -> bool {
        self.orchestrator.is_none()
    }

    /// Acquisition state, or `None` while a refresh is in flight.
    pub fn state(&self) -> Option<AcquisitionState> {
        self.orchestrator.as_ref().map(|o| o.state())
    }

    /// Start a refresh on the blocking pool. Returns `false` when one is
    /// already running; the request is dropped in that case.
    pub fn request_refresh(&mut self) -> bool {
        let Some(mut orchestrator) = self.orchestrator.take() else {
            debug!("refresh requested while another is in flight; ignoring");
            return false;
        };

        let tx = self.completions_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = orchestrator.acquire();
            // The receiver lives in the session; if it is gone nobody is waiting.
            let _ = tx.send(Completion {
                orchestrator,
                result,
            });
        });
        true
    }

    /// Wait for the in-flight refresh and apply its outcome.
    ///
    /// On failure the previous table and flag are kept. Pending forever when
    /// nothing is in flight, which makes it safe to race against a ticker.
    pub async fn next_completion(&mut self) -> Result<RefreshSummary> {
        let completion = match self.completions_rx.recv().await {
            Some(completion) => completion,
            // The session holds a sender, so the channel never closes.
            None => return std::future::pending().await,
        };

        self.orchestrator = Some(completion.orchestrator);
        let acquisition = completion.result?;
        self.table = acquisition.records;
        self.privileged = acquisition.privileged;

        Ok(RefreshSummary {
            records: self.table.len(),
            privileged: self.privileged,
            state: acquisition.state,
        })
    }

    /// Request a refresh and wait for it.
    pub async fn refresh(&mut self) -> Result<RefreshSummary> {
        if !self.request_refresh() {
            return Err(PortsError::RefreshInProgress);
        }
        self.next_completion().await
    }
}
