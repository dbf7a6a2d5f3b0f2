use log::{debug, info, warn};

use super::state::{AcquisitionState, Fallback};
use crate::error::{CommandError, PortsError, Result};
use crate::model::{SnapshotFields, SocketRecord};
use crate::parser::{parse, Dialect};
use crate::platform::{attach_snapshots, CommandRunner, CommandSpec, ProcessEnricher};

/// Unprivileged sources, tried in order.
const FALLBACK_CHAIN: [Fallback; 2] = [Fallback::Ss, Fallback::Netstat];

#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// When false the privileged attempt is never made.
    pub allow_elevation: bool,
    pub fields: SnapshotFields,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            allow_elevation: true,
            fields: SnapshotFields::all(),
        }
    }
}

/// The product of one successful refresh.
#[derive(Debug)]
pub struct Acquisition {
    pub records: Vec<SocketRecord>,
    pub privileged: bool,
    pub state: AcquisitionState,
}

fn fallback_command(fallback: Fallback) -> CommandSpec {
    match fallback {
        Fallback::Ss => CommandSpec::ss(),
        Fallback::Netstat => CommandSpec::netstat_unprivileged(),
    }
}

/// Chooses a source per refresh and turns its output into a socket table.
///
/// Elevation is attempted on first load, after a failed refresh, and
/// whenever the previous refresh was privileged. Once authentication is
/// refused the orchestrator stays on unprivileged sources for the rest of
/// its life.
pub struct Orchestrator {
    runner: Box<dyn CommandRunner>,
    enricher: Box<dyn ProcessEnricher>,
    config: AcquisitionConfig,
    state: AcquisitionState,
    elevation_declined: bool,
}

impl Orchestrator {
    pub fn new(
        runner: Box<dyn CommandRunner>,
        enricher: Box<dyn ProcessEnricher>,
        config: AcquisitionConfig,
    ) -> Self {
        Self {
            runner,
            enricher,
            config,
            state: AcquisitionState::Uninitialized,
            elevation_declined: false,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    #[cfg(test)]
    pub fn elevation_declined(&self) -> bool {
        self.elevation_declined
    }

    /// Run one refresh to completion.
    pub fn acquire(&mut self) -> Result<Acquisition> {
        let mut attempts = Vec::new();

        if self.should_attempt_privileged() {
            match self.acquire_privileged() {
                Ok(acquisition) => return Ok(acquisition),
                Err(err) => {
                    if matches!(err, CommandError::AuthFailed) {
                        self.elevation_declined = true;
                    }
                    warn!(
                        "privileged acquisition failed ({}); using unprivileged sources",
                        err
                    );
                    attempts.push((CommandSpec::netstat_privileged().to_string(), err));
                }
            }
        }

        self.acquire_unprivileged(attempts)
    }

    fn should_attempt_privileged(&self) -> bool {
        if !self.config.allow_elevation || self.elevation_declined {
            return false;
        }
        !matches!(self.state, AcquisitionState::Unprivileged(_))
    }

    fn acquire_privileged(&mut self) -> std::result::Result<Acquisition, CommandError> {
        self.transition(AcquisitionState::AttemptingPrivileged);
        let text = self.runner.run(&CommandSpec::netstat_privileged(), true)?;

        let mut records = parse(Dialect::NetstatPrivileged, &text);
        let snapshots = self.enricher.snapshot_all(self.config.fields);
        let summary = attach_snapshots(&mut records, &snapshots);
        debug!(
            "enriched {} of {} records ({} pids, {} gone)",
            summary.attached,
            records.len(),
            summary.lookups,
            summary.missing
        );

        self.transition(AcquisitionState::Privileged);
        Ok(Acquisition {
            records,
            privileged: self.state.is_privileged(),
            state: self.state,
        })
    }

    fn acquire_unprivileged(
        &mut self,
        mut attempts: Vec<(String, CommandError)>,
    ) -> Result<Acquisition> {
        for fallback in FALLBACK_CHAIN {
            let command = fallback_command(fallback);
            match self.runner.run(&command, false) {
                Ok(text) => {
                    let records = parse(fallback.dialect(), &text);
                    info!("`{}` returned {} sockets", command, records.len());
                    self.transition(AcquisitionState::Unprivileged(fallback));
                    return Ok(Acquisition {
                        records,
                        privileged: self.state.is_privileged(),
                        state: self.state,
                    });
                }
                Err(err) => {
                    info!("`{}` failed: {}", command, err);
                    attempts.push((command.to_string(), err));
                }
            }
        }

        self.transition(AcquisitionState::Failed);
        Err(PortsError::SourcesExhausted { attempts })
    }

    fn transition(&mut self, next: AcquisitionState) {
        debug!("acquisition state: {} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::test_support::*;
    use crate::parser::UNKNOWN_NO_PRIVILEGES;

    fn orchestrator(runner: &FakeRunner, enricher: &FakeEnricher) -> Orchestrator {
        Orchestrator::new(
            Box::new(runner.clone()),
            Box::new(enricher.clone()),
            AcquisitionConfig::default(),
        )
    }

    #[test]
    fn test_first_load_privileged_success() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        let enricher = FakeEnricher::with_pids(&[1234, 845]);
        let mut orch = orchestrator(&runner, &enricher);

        let acquisition = orch.acquire().unwrap();

        assert!(acquisition.privileged);
        assert_eq!(orch.state(), AcquisitionState::Privileged);
        assert_eq!(runner.calls(), vec![("netstat -plntu".to_string(), true)]);
        assert_eq!(enricher.calls(), 1);

        let records = &acquisition.records;
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].pid, Some(1234));
        assert!(records[0].process_info.is_some());
        // postgres exited before the snapshot was taken
        assert_eq!(records[1].pid, Some(777));
        assert!(records[1].process_info.is_none());
        assert_eq!(records[2].pid, None);
        assert!(records[2].process_info.is_none());
    }

    #[test]
    fn test_auth_failure_falls_back_to_ss() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::AuthFailed);
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        let enricher = FakeEnricher::with_pids(&[1]);
        let mut orch = orchestrator(&runner, &enricher);

        let acquisition = orch.acquire().unwrap();

        assert!(!acquisition.privileged);
        assert_eq!(orch.state(), AcquisitionState::Unprivileged(Fallback::Ss));
        assert!(orch.elevation_declined());
        assert!(!acquisition.records.is_empty());
        assert!(acquisition.records.iter().all(|r| r.pid.is_none()));
        assert!(acquisition.records.iter().all(|r| r.process_info.is_none()));
        assert!(acquisition
            .records
            .iter()
            .all(|r| r.process_name == UNKNOWN_NO_PRIVILEGES));
        assert_eq!(enricher.calls(), 0);
    }

    #[test]
    fn test_missing_privileged_netstat_is_not_a_decline() {
        let runner = FakeRunner::default();
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);

        orch.acquire().unwrap();
        assert!(!orch.elevation_declined());

        // After a failed refresh the privileged source is tried again.
        runner.set("ss -tuan", Outcome::NotFound);
        assert!(orch.acquire().is_err());
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        runner.clear_calls();
        orch.acquire().unwrap();
        assert_eq!(runner.calls()[0], ("netstat -plntu".to_string(), true));
    }

    #[test]
    fn test_missing_ss_uses_netstat() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Exit(1));
        runner.set("netstat -tun", Outcome::Output(NETSTAT_TUN));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);

        let acquisition = orch.acquire().unwrap();

        assert_eq!(orch.state(), AcquisitionState::Unprivileged(Fallback::Netstat));
        assert!(!orch.elevation_declined());
        assert_eq!(acquisition.records.len(), 1);
        assert_eq!(
            runner.calls(),
            vec![
                ("netstat -plntu".to_string(), true),
                ("ss -tuan".to_string(), false),
                ("netstat -tun".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_all_sources_failing_is_terminal_for_the_refresh() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::AuthFailed);
        runner.set("ss -tuan", Outcome::Exit(2));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);

        match orch.acquire() {
            Err(PortsError::SourcesExhausted { attempts }) => {
                let commands: Vec<&str> = attempts.iter().map(|(c, _)| c.as_str()).collect();
                assert_eq!(commands, vec!["netstat -plntu", "ss -tuan", "netstat -tun"]);
            }
            other => panic!("expected SourcesExhausted, got {:?}", other.map(|a| a.state)),
        }
        assert_eq!(orch.state(), AcquisitionState::Failed);
    }

    #[test]
    fn test_refresh_after_unprivileged_skips_elevation() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Exit(1));
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);
        orch.acquire().unwrap();

        runner.clear_calls();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        orch.acquire().unwrap();

        assert_eq!(runner.calls(), vec![("ss -tuan".to_string(), false)]);
        assert_eq!(orch.state(), AcquisitionState::Unprivileged(Fallback::Ss));
    }

    #[test]
    fn test_refresh_after_privileged_elevates_again() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);
        orch.acquire().unwrap();
        orch.acquire().unwrap();

        assert_eq!(
            runner.calls(),
            vec![
                ("netstat -plntu".to_string(), true),
                ("netstat -plntu".to_string(), true),
            ]
        );
        assert_eq!(enricher.calls(), 2);
    }

    #[test]
    fn test_declined_elevation_is_not_retried_after_privileged() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);
        orch.acquire().unwrap();

        runner.set("netstat -plntu", Outcome::AuthFailed);
        let second = orch.acquire().unwrap();
        assert!(!second.privileged);

        runner.clear_calls();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        orch.acquire().unwrap();
        assert_eq!(runner.calls(), vec![("ss -tuan".to_string(), false)]);
    }

    #[test]
    fn test_failed_state_restarts_from_scratch() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::NotFound);
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);
        assert!(orch.acquire().is_err());
        assert_eq!(orch.state(), AcquisitionState::Failed);

        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        let acquisition = orch.acquire().unwrap();
        assert!(acquisition.privileged);
        assert_eq!(orch.state(), AcquisitionState::Privileged);
    }

    #[test]
    fn test_failed_after_decline_stays_unprivileged() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::AuthFailed);
        let enricher = FakeEnricher::default();
        let mut orch = orchestrator(&runner, &enricher);
        assert!(orch.acquire().is_err());

        runner.clear_calls();
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        orch.acquire().unwrap();
        assert_eq!(runner.calls(), vec![("ss -tuan".to_string(), false)]);
    }

    #[test]
    fn test_elevation_disabled_by_config() {
        let runner = FakeRunner::default();
        runner.set("netstat -plntu", Outcome::Output(NETSTAT_PLNTU));
        runner.set("ss -tuan", Outcome::Output(SS_TUAN));
        let enricher = FakeEnricher::default();
        let mut orch = Orchestrator::new(
            Box::new(runner.clone()),
            Box::new(enricher.clone()),
            AcquisitionConfig {
                allow_elevation: false,
                ..AcquisitionConfig::default()
            },
        );

        let acquisition = orch.acquire().unwrap();
        assert!(!acquisition.privileged);
        assert_eq!(runner.calls(), vec![("ss -tuan".to_string(), false)]);
    }
}
