use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::config::{ConfigStore, Configuration};

use super::checker::{DEFAULT_PROBE_TIMEOUT, Prober};
use super::scheduler::Scheduler;
use super::types::{EngineEvent, ProbeResult, StatusSnapshot, TargetStatus, TargetView};

const COMMAND_BUFFER: usize = 32;
const EVENT_BUFFER: usize = 64;

/// Identifies one sweep. The epoch is bumped whenever the target list or
/// monitoring state changes, so results from a sweep that started against a
/// superseded configuration are discarded whole instead of applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SweepId {
    seq: u64,
    epoch: u64,
}

#[derive(Debug)]
enum Command {
    SetMonitoring(bool),
    SetInterval(u64),
    ToggleTarget(usize),
    Reload,
    ToggleStartupWatch,
    Snapshot(oneshot::Sender<StatusSnapshot>),
    SweepFinished { sweep: SweepId, results: Vec<(usize, ProbeResult)> },
    Shutdown,
}

/// Cloneable control surface for the engine actor.
///
/// Commands go over an mpsc channel into the single state-owning task;
/// events come back over a broadcast bus, so any number of observers can
/// subscribe without one blocking another.
#[derive(Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<EngineEvent>,
}

impl EngineHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub async fn set_monitoring(&self, enabled: bool) {
        self.send(Command::SetMonitoring(enabled)).await;
    }

    pub async fn set_interval(&self, seconds: u64) {
        self.send(Command::SetInterval(seconds)).await;
    }

    pub async fn toggle_target(&self, index: usize) {
        self.send(Command::ToggleTarget(index)).await;
    }

    pub async fn reload(&self) {
        self.send(Command::Reload).await;
    }

    pub async fn toggle_startup_watch(&self) {
        self.send(Command::ToggleStartupWatch).await;
    }

    /// Request a copy of the current state. Returns None if the engine has
    /// already shut down.
    pub async fn snapshot(&self) -> Option<StatusSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx)).await;
        reply_rx.await.ok()
    }

    pub async fn shutdown(&self) {
        self.send(Command::Shutdown).await;
    }

    async fn send(&self, command: Command) {
        // a dropped engine just means the command has nowhere to go
        let _ = self.commands.send(command).await;
    }
}

/// The monitoring engine: owns the authoritative target list, per-target
/// statuses, and the scheduler, and is the only writer of any of them.
///
/// Runs as a single actor task. Sweeps fan out one concurrent probe per
/// enabled target, each under its own hard timeout, and return as one
/// buffered result set so observers never see a torn snapshot.
pub struct MonitorEngine {
    store: ConfigStore,
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,

    config: Configuration,
    statuses: Vec<TargetStatus>,
    config_error: Option<String>,
    monitoring_enabled: bool,
    scheduler: Scheduler,

    epoch: u64,
    sweep_seq: u64,
    in_flight: Option<u64>,

    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<EngineEvent>,
}

impl MonitorEngine {
    /// Construct the engine, performing the initial configuration load.
    ///
    /// Monitoring starts enabled and in the startup watch, giving fast
    /// feedback right after launch while services are plausibly still
    /// coming up.
    pub fn new(store: ConfigStore, prober: Arc<dyn Prober>) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (events, _) = broadcast::channel(EVENT_BUFFER);

        let (config, config_error) = match store.load() {
            Ok(config) => (config, None),
            Err(error) => {
                warn!(error = %error, "initial configuration load failed");
                (Configuration::default(), Some(error.to_string()))
            }
        };

        let statuses = vec![TargetStatus::default(); config.services.len()];
        let mut scheduler = Scheduler::new();
        scheduler.enter_startup_watch(Instant::now());

        Self {
            store,
            prober,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            config,
            statuses,
            config_error,
            monitoring_enabled: true,
            scheduler,
            epoch: 0,
            sweep_seq: 0,
            in_flight: None,
            commands_tx,
            commands_rx,
            events,
        }
    }

    pub fn with_probe_timeout(mut self, probe_timeout: Duration) -> Self {
        self.probe_timeout = probe_timeout;
        self
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle { commands: self.commands_tx.clone(), events: self.events.clone() }
    }

    /// Spawn the actor loop, returning its control handle.
    pub fn spawn(self) -> EngineHandle {
        let handle = self.handle();
        tokio::spawn(self.run());
        handle
    }

    /// The actor loop: sleeps on the scheduler's single deadline, drains
    /// commands, and runs until shutdown. All state mutation happens here.
    pub async fn run(mut self) {
        info!(
            targets = self.config.services.len(),
            interval_secs = self.config.update_interval_seconds,
            "monitoring engine started"
        );

        self.publish_targets();
        if self.config_error.is_some() {
            self.publish_config_error();
        }
        self.publish_startup_watch();

        loop {
            let deadline = self.scheduler.next_fire();
            let tick = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                command = self.commands_rx.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                () = tick => self.on_tick(Instant::now()),
            }
        }

        info!("monitoring engine stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetMonitoring(enabled) => self.set_monitoring(enabled),
            Command::SetInterval(seconds) => self.set_interval(seconds),
            Command::ToggleTarget(index) => self.toggle_target(index),
            Command::Reload => self.reload(),
            Command::ToggleStartupWatch => self.toggle_startup_watch(),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::SweepFinished { sweep, results } => {
                self.apply_sweep(sweep, results);
            }
            Command::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    /// A fired deadline: advance the scheduler, handle burst expiry, and
    /// start a sweep.
    fn on_tick(&mut self, now: Instant) {
        self.scheduler.on_fired(now);

        if self.scheduler.in_startup_watch() {
            if self.scheduler.burst_should_exit(now, self.up_count(), self.enabled_count()) {
                // re-entering Normal arms an immediate sweep
                self.exit_startup_watch(now);
                return;
            }
            self.publish_startup_watch();
        }

        self.start_sweep();
    }

    fn set_monitoring(&mut self, enabled: bool) {
        if enabled == self.monitoring_enabled {
            return;
        }

        info!(enabled, "monitoring toggled");
        self.monitoring_enabled = enabled;
        self.epoch += 1;

        let now = Instant::now();
        if enabled {
            self.scheduler.start_normal(self.interval(), now);
        } else {
            let was_burst = self.scheduler.in_startup_watch();
            self.scheduler.stop();
            if was_burst {
                self.publish_startup_watch();
            }
        }
        self.publish_targets();
    }

    fn set_interval(&mut self, seconds: u64) {
        let clamped = Configuration::clamp_interval(seconds);
        if clamped != seconds {
            debug!(requested = seconds, clamped, "interval clamped");
        }

        self.config.update_interval_seconds = clamped;
        self.persist();
        self.scheduler.set_interval(Duration::from_secs(clamped), Instant::now());
        self.publish(EngineEvent::IntervalChanged(clamped));
    }

    /// Flip one target's enable/disable mode and persist the whole
    /// configuration. The last-known status stays on display; re-enabling
    /// does not force an out-of-cycle probe.
    fn toggle_target(&mut self, index: usize) {
        let Some(target) = self.config.services.get_mut(index) else {
            warn!(index, "toggle for unknown target index ignored");
            return;
        };

        target.mode = target.mode.toggled();
        debug!(name = %target.name, mode = %target.mode, "target mode toggled");

        self.epoch += 1;
        self.persist();
        self.publish_targets();
    }

    /// Re-read the configuration file. Success replaces the target list
    /// (new targets start unknown) and restarts the scheduler in its
    /// current mode; failure empties the target list, stops the scheduler,
    /// and surfaces the error until a later reload succeeds.
    fn reload(&mut self) {
        self.epoch += 1;

        match self.store.load() {
            Ok(config) => {
                info!(targets = config.services.len(), "configuration reloaded");
                self.config = config;
                self.statuses = vec![TargetStatus::default(); self.config.services.len()];

                if self.config_error.take().is_some() {
                    self.publish_config_error();
                }

                let now = Instant::now();
                if self.monitoring_enabled {
                    if self.scheduler.in_startup_watch() {
                        self.scheduler.rearm_now(now);
                    } else {
                        self.scheduler.start_normal(self.interval(), now);
                    }
                }
                self.publish_targets();
            }
            Err(error) => {
                warn!(error = %error, "configuration reload failed");
                self.config.services.clear();
                self.statuses.clear();
                self.config_error = Some(error.to_string());
                self.scheduler.stop();
                self.publish_config_error();
                self.publish_targets();
            }
        }
    }

    /// Manual burst entry/exit, irrespective of the automatic triggers.
    fn toggle_startup_watch(&mut self) {
        if !self.monitoring_enabled {
            debug!("startup watch toggle ignored while monitoring is off");
            return;
        }

        let now = Instant::now();
        if self.scheduler.in_startup_watch() {
            self.exit_startup_watch(now);
        } else {
            self.scheduler.enter_startup_watch(now);
            self.publish_startup_watch();
        }
    }

    fn exit_startup_watch(&mut self, now: Instant) {
        info!("startup watch ended, resuming normal interval");
        self.scheduler.start_normal(self.interval(), now);
        self.publish_startup_watch();
    }

    /// Snapshot the enabled targets and hand the probing off to a spawned
    /// fan-out task; results come back as a single SweepFinished command.
    /// A tick landing while a sweep is still in flight is skipped, so two
    /// sweeps never interleave their status writes.
    fn start_sweep(&mut self) {
        let Some((sweep, work)) = self.begin_sweep() else { return };

        let prober = Arc::clone(&self.prober);
        let probe_timeout = self.probe_timeout;
        let commands = self.commands_tx.clone();

        tokio::spawn(async move {
            let results = probe_all(prober, probe_timeout, work).await;
            // the engine may be gone during shutdown
            let _ = commands.send(Command::SweepFinished { sweep, results }).await;
        });
    }

    fn begin_sweep(&mut self) -> Option<(SweepId, Vec<(usize, String)>)> {
        if !self.monitoring_enabled {
            return None;
        }
        if self.in_flight.is_some() {
            debug!("previous sweep still in flight, skipping tick");
            return None;
        }

        let work: Vec<(usize, String)> = self
            .config
            .services
            .iter()
            .enumerate()
            .filter(|(_, target)| target.mode.is_enabled())
            .map(|(index, target)| (index, target.url.clone()))
            .collect();

        self.sweep_seq += 1;
        let sweep = SweepId { seq: self.sweep_seq, epoch: self.epoch };
        self.in_flight = Some(sweep.seq);
        Some((sweep, work))
    }

    /// Apply a finished sweep's buffered results in one step and publish a
    /// single snapshot for the tick. Returns the aggregate up-count.
    fn apply_sweep(&mut self, sweep: SweepId, results: Vec<(usize, ProbeResult)>) -> usize {
        if self.in_flight == Some(sweep.seq) {
            self.in_flight = None;
        }
        if sweep.epoch != self.epoch {
            debug!("discarding results from a superseded sweep");
            return self.up_count();
        }

        let checked_at = Utc::now();
        for (index, result) in results {
            let Some(status) = self.statuses.get_mut(index) else { continue };
            status.is_up = result.ok;
            status.last_checked = Some(checked_at);
            // a successful probe clears the previous diagnostic
            status.last_error = result.error;
        }

        self.publish_targets();

        let up_count = self.up_count();
        if self.scheduler.burst_should_exit(Instant::now(), up_count, self.enabled_count()) {
            self.exit_startup_watch(Instant::now());
        }
        up_count
    }

    fn persist(&mut self) {
        // save failures are reported, never fatal
        if let Err(error) = self.store.save(&self.config) {
            warn!(error = %error, "failed to persist configuration");
        }
    }

    fn interval(&self) -> Duration {
        Duration::from_secs(self.config.update_interval_seconds)
    }

    fn enabled_count(&self) -> usize {
        self.config.services.iter().filter(|target| target.mode.is_enabled()).count()
    }

    /// Enabled targets whose most recent probe was healthy. Disabled
    /// targets never count, whatever their last status was.
    fn up_count(&self) -> usize {
        self.config
            .services
            .iter()
            .zip(&self.statuses)
            .filter(|(target, status)| target.mode.is_enabled() && status.is_up)
            .count()
    }

    fn snapshot(&self) -> StatusSnapshot {
        let targets = self
            .config
            .services
            .iter()
            .zip(&self.statuses)
            .map(|(target, status)| TargetView {
                name: target.name.clone(),
                url: target.url.clone(),
                mode: target.mode,
                is_up: status.is_up,
                last_error: status.last_error.clone(),
                last_checked: status.last_checked,
            })
            .collect();

        StatusSnapshot {
            targets,
            up_count: self.up_count(),
            monitoring_enabled: self.monitoring_enabled,
            config_error: self.config_error.clone(),
            interval_secs: self.config.update_interval_seconds,
            startup_watch_remaining_secs: self
                .scheduler
                .burst_remaining(Instant::now())
                .map(|remaining| remaining.as_secs()),
            symbol_up: self.config.symbol_up.clone(),
            symbol_down: self.config.symbol_down.clone(),
            symbol_disabled: self.config.symbol_disabled.clone(),
        }
    }

    fn publish_targets(&self) {
        self.publish(EngineEvent::Targets(self.snapshot()));
    }

    fn publish_config_error(&self) {
        self.publish(EngineEvent::ConfigError(self.config_error.clone()));
    }

    fn publish_startup_watch(&self) {
        let remaining = self.scheduler.burst_remaining(Instant::now());
        self.publish(EngineEvent::StartupWatch {
            active: remaining.is_some(),
            remaining_secs: remaining.map(|remaining| remaining.as_secs()),
        });
    }

    fn publish(&self, event: EngineEvent) {
        // ignore errors if there are no receivers
        let _ = self.events.send(event);
    }
}

/// Probe every enabled target concurrently, each under its own timeout, and
/// wait for all of them; no early exit on first failure.
async fn probe_all(
    prober: Arc<dyn Prober>,
    probe_timeout: Duration,
    work: Vec<(usize, String)>,
) -> Vec<(usize, ProbeResult)> {
    let probes = work.into_iter().map(|(index, url)| {
        let prober = Arc::clone(&prober);
        async move { (index, prober.check(&url, probe_timeout).await) }
    });
    join_all(probes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::checker::HttpProber;
    use crate::monitoring::checker::testing::FakeProber;
    use crate::monitoring::scheduler::SchedulerMode;
    use crate::monitoring::types::{Target, TargetMode};
    use tempfile::TempDir;

    fn target(name: &str, url: &str, mode: TargetMode) -> Target {
        Target { name: name.to_string(), url: url.to_string(), mode }
    }

    fn engine_with(
        dir: &TempDir,
        services: Vec<Target>,
        prober: Arc<dyn Prober>,
    ) -> MonitorEngine {
        let store = ConfigStore::new(Some(dir.path().join("config.json"))).unwrap();
        let config = Configuration { services, ..Configuration::default() };
        store.save(&config).unwrap();
        MonitorEngine::new(store, prober)
    }

    /// Drive one full sweep inline: the same begin/probe/apply sequence the
    /// spawned fan-out task performs.
    async fn sweep_now(engine: &mut MonitorEngine) -> usize {
        match engine.begin_sweep() {
            Some((sweep, work)) => {
                let results =
                    probe_all(Arc::clone(&engine.prober), engine.probe_timeout, work).await;
                engine.apply_sweep(sweep, results)
            }
            None => engine.up_count(),
        }
    }

    #[tokio::test]
    async fn sweep_probes_only_enabled_targets() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        fake.mark_up("http://a/health");

        let mut engine = engine_with(
            &dir,
            vec![
                target("A", "http://a/health", TargetMode::Enabled),
                target("B", "http://b/health", TargetMode::Enabled),
                target("C", "http://c/health", TargetMode::Disabled),
            ],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        let up_count = sweep_now(&mut engine).await;

        assert_eq!(fake.call_count(), 2);
        assert_eq!(up_count, 1);
        assert!(engine.statuses[0].is_up);
        assert!(engine.statuses[0].last_error.is_none());
        assert!(!engine.statuses[1].is_up);
        assert!(engine.statuses[1].last_error.is_some());

        // the disabled target was never touched
        assert!(!engine.statuses[2].is_up);
        assert!(engine.statuses[2].last_checked.is_none());
    }

    #[tokio::test]
    async fn up_count_never_counts_disabled_targets() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        fake.mark_up("http://a/health");
        fake.mark_up("http://b/health");

        let mut engine = engine_with(
            &dir,
            vec![
                target("A", "http://a/health", TargetMode::Enabled),
                target("B", "http://b/health", TargetMode::Enabled),
            ],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        assert_eq!(sweep_now(&mut engine).await, 2);

        engine.toggle_target(1);
        assert_eq!(engine.up_count(), 1);

        // the next sweep skips the now-disabled target entirely
        let calls_before = fake.call_count();
        assert_eq!(sweep_now(&mut engine).await, 1);
        assert_eq!(fake.call_count(), calls_before + 1);
    }

    #[tokio::test]
    async fn successful_probe_clears_previous_error() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());

        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        sweep_now(&mut engine).await;
        assert!(engine.statuses[0].last_error.is_some());

        fake.mark_up("http://a/health");
        sweep_now(&mut engine).await;
        assert!(engine.statuses[0].is_up);
        assert!(engine.statuses[0].last_error.is_none());
    }

    #[tokio::test]
    async fn set_interval_clamps_and_persists() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(&dir, Vec::new(), Arc::clone(&fake) as Arc<dyn Prober>);
        let mut events = engine.handle().subscribe();

        engine.set_interval(200);
        assert_eq!(engine.config.update_interval_seconds, 60);

        engine.set_interval(0);
        assert_eq!(engine.config.update_interval_seconds, 1);

        // the clamped value was persisted, not the requested one
        let stored = engine.store.load().unwrap();
        assert_eq!(stored.update_interval_seconds, 1);

        assert!(matches!(events.try_recv(), Ok(EngineEvent::IntervalChanged(60))));
        assert!(matches!(events.try_recv(), Ok(EngineEvent::IntervalChanged(1))));
    }

    #[tokio::test]
    async fn reload_over_corrupt_file_surfaces_error_and_empties_targets() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        std::fs::write(engine.store.path(), "{ not json").unwrap();
        engine.reload();

        assert!(engine.config_error.is_some());
        assert!(engine.config.services.is_empty());
        assert_eq!(engine.scheduler.mode(), SchedulerMode::Stopped);

        let snapshot = engine.snapshot();
        assert!(snapshot.targets.is_empty());
        assert!(snapshot.config_error.is_some());
    }

    #[tokio::test]
    async fn successful_reload_clears_error_and_restarts_probing() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        std::fs::write(engine.store.path(), "{ not json").unwrap();
        engine.reload();
        assert!(engine.config_error.is_some());

        let config = Configuration {
            services: vec![target("B", "http://b/health", TargetMode::Enabled)],
            ..Configuration::default()
        };
        engine.store.save(&config).unwrap();
        engine.reload();

        assert!(engine.config_error.is_none());
        assert_eq!(engine.config.services.len(), 1);
        // new targets start with unknown status
        assert!(!engine.statuses[0].is_up);
        assert!(engine.statuses[0].last_checked.is_none());
        assert_ne!(engine.scheduler.mode(), SchedulerMode::Stopped);
    }

    #[tokio::test]
    async fn results_from_a_superseded_sweep_are_discarded() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        fake.mark_up("http://a/health");

        let mut engine = engine_with(
            &dir,
            vec![
                target("A", "http://a/health", TargetMode::Enabled),
                target("B", "http://b/health", TargetMode::Enabled),
            ],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        let (sweep, work) = engine.begin_sweep().unwrap();
        let results = probe_all(Arc::clone(&engine.prober), engine.probe_timeout, work).await;

        // the target list changed while the sweep was in flight
        engine.toggle_target(1);
        engine.apply_sweep(sweep, results);

        assert!(!engine.statuses[0].is_up);
        assert!(engine.statuses[0].last_checked.is_none());
        // the in-flight marker is released either way
        assert!(engine.in_flight.is_none());
    }

    #[tokio::test]
    async fn ticks_are_skipped_while_a_sweep_is_in_flight() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        let first = engine.begin_sweep();
        assert!(first.is_some());
        assert!(engine.begin_sweep().is_none());

        let (sweep, work) = first.unwrap();
        let results = probe_all(Arc::clone(&engine.prober), engine.probe_timeout, work).await;
        engine.apply_sweep(sweep, results);
        assert!(engine.begin_sweep().is_some());
    }

    #[tokio::test]
    async fn disabling_monitoring_stops_the_scheduler_and_probing() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        engine.set_monitoring(false);
        assert_eq!(engine.scheduler.mode(), SchedulerMode::Stopped);
        assert!(engine.begin_sweep().is_none());
        assert!(!engine.snapshot().monitoring_enabled);

        engine.set_monitoring(true);
        assert_eq!(engine.scheduler.mode(), SchedulerMode::Normal);
        assert!(engine.begin_sweep().is_some());
    }

    #[tokio::test]
    async fn all_enabled_targets_up_ends_the_startup_watch() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        fake.mark_up("http://a/health");

        let mut engine = engine_with(
            &dir,
            vec![
                target("A", "http://a/health", TargetMode::Enabled),
                target("C", "http://c/health", TargetMode::Disabled),
            ],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );
        assert_eq!(engine.scheduler.mode(), SchedulerMode::StartupWatch);

        // the enabled target comes up; the disabled one is irrelevant
        sweep_now(&mut engine).await;
        assert_eq!(engine.scheduler.mode(), SchedulerMode::Normal);
    }

    #[tokio::test]
    async fn startup_watch_survives_sweeps_with_zero_enabled_targets() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(&dir, Vec::new(), Arc::clone(&fake) as Arc<dyn Prober>);

        assert_eq!(engine.scheduler.mode(), SchedulerMode::StartupWatch);
        sweep_now(&mut engine).await;
        assert_eq!(engine.scheduler.mode(), SchedulerMode::StartupWatch);
    }

    #[tokio::test]
    async fn manual_startup_watch_toggle_enters_and_exits() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let mut engine = engine_with(&dir, Vec::new(), Arc::clone(&fake) as Arc<dyn Prober>);

        assert_eq!(engine.scheduler.mode(), SchedulerMode::StartupWatch);
        engine.toggle_startup_watch();
        assert_eq!(engine.scheduler.mode(), SchedulerMode::Normal);
        engine.toggle_startup_watch();
        assert_eq!(engine.scheduler.mode(), SchedulerMode::StartupWatch);
    }

    #[tokio::test]
    async fn toggle_target_persists_and_keeps_last_status() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        fake.mark_up("http://a/health");

        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        sweep_now(&mut engine).await;
        assert!(engine.statuses[0].is_up);

        engine.toggle_target(0);
        assert_eq!(engine.config.services[0].mode, TargetMode::Disabled);
        // last-known status stays on display
        assert!(engine.statuses[0].is_up);

        let stored = engine.store.load().unwrap();
        assert_eq!(stored.services[0].mode, TargetMode::Disabled);

        // out-of-range toggles are ignored
        engine.toggle_target(7);
        assert_eq!(engine.config.services.len(), 1);
    }

    #[tokio::test]
    async fn snapshot_reflects_symbols_and_interval() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let engine = engine_with(&dir, Vec::new(), Arc::clone(&fake) as Arc<dyn Prober>);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.interval_secs, Configuration::default().update_interval_seconds);
        assert_eq!(snapshot.symbol_up, Configuration::default().symbol_up);
        assert!(snapshot.startup_watch_remaining_secs.is_some());
    }

    #[tokio::test]
    async fn unreachable_local_target_is_down_after_one_sweep() {
        let dir = TempDir::new().unwrap();
        let prober = Arc::new(HttpProber::new().unwrap());

        let mut engine = engine_with(
            &dir,
            vec![target("A", "http://localhost:9999", TargetMode::Enabled)],
            prober as Arc<dyn Prober>,
        );

        let up_count = sweep_now(&mut engine).await;

        assert_eq!(up_count, 0);
        assert!(!engine.statuses[0].is_up);
        assert!(!engine.statuses[0].last_error.as_deref().unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn engine_task_answers_snapshot_requests() {
        let dir = TempDir::new().unwrap();
        let fake = Arc::new(FakeProber::new());
        let engine = engine_with(
            &dir,
            vec![target("A", "http://a/health", TargetMode::Enabled)],
            Arc::clone(&fake) as Arc<dyn Prober>,
        );

        let handle = engine.spawn();
        let snapshot = handle.snapshot().await.expect("engine alive");
        assert_eq!(snapshot.targets.len(), 1);

        handle.shutdown().await;
    }
}
