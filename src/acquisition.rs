//! The per-session acquisition state machine.
//!
//! One session owns one transport (or the simulator), one buffer, and one
//! `RunState`. A single periodic task pulls at most one sample per tick;
//! operator intents arrive on a control channel and state is published on a
//! watch channel, so pause/resume, stop and mode switches are plain state
//! transitions with no hidden timers to reconcile.
//!
//! Fault policy: an open failure or a mid-run transport fault degrades the
//! session to simulated mode instead of halting it. The loop never
//! terminates itself except via an explicit `Stop` (or the handle being
//! dropped, which counts as one).

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::buffer::SharedBuffer;
use crate::config::AcquisitionSettings;
use crate::error::FlowError;
use crate::parser;
use crate::sample::Sample;
use crate::sample_log::SampleLog;
use crate::simulator::Simulator;
use crate::transport::{ReadOutcome, Transport};

/// Where samples come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SourceMode {
    /// A physical device on the serial transport.
    Real,
    /// Synthetic samples from the simulator.
    Simulated,
}

/// Session lifecycle phase.
///
/// `Connecting` is transient; it resolves to `Running` whether or not the
/// device could be claimed. `Stopped` is terminal; a new session starts a
/// fresh buffer and state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Phase {
    Idle,
    Connecting,
    Running,
    Paused,
    Stopped,
}

/// Published session state, one per acquisition session.
#[derive(Clone, Debug, Serialize)]
pub struct RunState {
    pub mode: SourceMode,
    pub phase: Phase,
    /// Accepted samples this session.
    pub samples: u64,
    /// Lines that carried no usable number. Dropped, never fatal.
    pub parse_drops: u64,
}

impl RunState {
    fn idle() -> Self {
        Self {
            mode: SourceMode::Simulated,
            phase: Phase::Idle,
            samples: 0,
            parse_drops: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_stopped(&self) -> bool {
        self.phase == Phase::Stopped
    }
}

/// Operator intents accepted by a running session.
#[derive(Debug)]
pub enum Control {
    Pause,
    Resume,
    Stop,
    SwitchMode(SourceMode),
}

/// How the session obtains samples at start.
pub enum Connect {
    /// Outcome of a transport open attempt. `Err` falls back to simulation:
    /// the capability check guards the transition, it never aborts the
    /// session.
    Device(Result<Box<dyn Transport>, FlowError>),
    /// Simulated mode by operator choice.
    Simulated,
}

/// Handle to a spawned acquisition session.
///
/// Dropping the handle stops the session: the control channel closes, which
/// the loop treats as `Stop`.
pub struct SessionHandle {
    control: mpsc::Sender<Control>,
    state: watch::Receiver<RunState>,
    buffer: SharedBuffer,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Subscribe to published session state.
    pub fn state(&self) -> watch::Receiver<RunState> {
        self.state.clone()
    }

    /// Shared read access to the session buffer.
    pub fn buffer(&self) -> SharedBuffer {
        self.buffer.clone()
    }

    pub async fn pause(&self) {
        let _ = self.control.send(Control::Pause).await;
    }

    pub async fn resume(&self) {
        let _ = self.control.send(Control::Resume).await;
    }

    pub async fn switch_mode(&self, mode: SourceMode) {
        let _ = self.control.send(Control::SwitchMode(mode)).await;
    }

    /// Request stop. Observable within one tick period; sending to an
    /// already-stopped session is a no-op.
    pub async fn stop(&self) {
        let _ = self.control.send(Control::Stop).await;
    }

    /// Wait for the session task to finish.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// One acquisition session.
pub struct Session;

impl Session {
    /// Spawn the session task and return its handle.
    pub fn spawn(
        settings: AcquisitionSettings,
        connect: Connect,
        simulator: Simulator,
        sample_log: Option<SampleLog>,
    ) -> SessionHandle {
        let buffer = SharedBuffer::new(settings.buffer_cap);
        let (control_tx, control_rx) = mpsc::channel(16);
        let (state_tx, state_rx) = watch::channel(RunState::idle());

        let worker = Worker {
            settings,
            connect: Some(connect),
            simulator,
            sample_log,
            buffer: buffer.clone(),
            control_rx,
            state_tx,
            state: RunState::idle(),
        };
        let task = tokio::spawn(worker.run());

        SessionHandle {
            control: control_tx,
            state: state_rx,
            buffer,
            task,
        }
    }
}

struct Worker {
    settings: AcquisitionSettings,
    connect: Option<Connect>,
    simulator: Simulator,
    sample_log: Option<SampleLog>,
    buffer: SharedBuffer,
    control_rx: mpsc::Receiver<Control>,
    state_tx: watch::Sender<RunState>,
    state: RunState,
}

impl Worker {
    async fn run(mut self) {
        let mut transport = self.connecting();
        let started = Instant::now();
        let mut ticker = interval(self.settings.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                signal = self.control_rx.recv() => {
                    match signal {
                        Some(Control::Pause) => {
                            if self.state.phase == Phase::Running {
                                info!("acquisition paused");
                                self.set_phase(Phase::Paused);
                            }
                        }
                        Some(Control::Resume) => {
                            if self.state.phase == Phase::Paused {
                                info!("acquisition resumed");
                                self.set_phase(Phase::Running);
                            }
                        }
                        Some(Control::SwitchMode(mode)) => self.switch_mode(mode, &transport),
                        // A closed control channel means the handle is gone;
                        // treat it as Stop
                        Some(Control::Stop) | None => break,
                    }
                }

                _ = ticker.tick() => {
                    if self.state.phase != Phase::Running {
                        continue;
                    }
                    let elapsed = started.elapsed().as_secs_f64();
                    if let Some(value) = self.acquire(elapsed, &mut transport).await {
                        self.accept(Sample::new(elapsed, value));
                    }
                }
            }
        }

        // Exactly one close per successful open, on every exit path
        if let Some(mut t) = transport.take() {
            t.close().await;
        }
        self.set_phase(Phase::Stopped);
        info!(
            samples = self.state.samples,
            parse_drops = self.state.parse_drops,
            "acquisition stopped"
        );
    }

    /// Resolve the transient `Connecting` phase. Never gets stuck: an open
    /// failure selects simulated mode and the session proceeds to `Running`.
    fn connecting(&mut self) -> Option<Box<dyn Transport>> {
        self.set_phase(Phase::Connecting);
        let transport = match self.connect.take() {
            Some(Connect::Device(Ok(t))) => {
                info!(endpoint = %t.endpoint(), "acquiring from device");
                self.set_mode(SourceMode::Real);
                Some(t)
            }
            Some(Connect::Device(Err(e))) => {
                warn!(error = %e, "transport unavailable, falling back to simulation");
                self.set_mode(SourceMode::Simulated);
                None
            }
            Some(Connect::Simulated) | None => {
                info!("acquiring from simulator");
                self.set_mode(SourceMode::Simulated);
                None
            }
        };
        self.set_phase(Phase::Running);
        transport
    }

    /// Pull at most one value for this tick.
    async fn acquire(
        &mut self,
        elapsed: f64,
        transport: &mut Option<Box<dyn Transport>>,
    ) -> Option<f64> {
        if self.state.mode == SourceMode::Real {
            let outcome = match transport.as_mut() {
                Some(t) => t.read_line().await,
                None => Err(FlowError::TransportClosed),
            };
            match outcome {
                Ok(ReadOutcome::Line(raw)) => match parser::parse(&raw) {
                    Ok(value) => return Some(value),
                    Err(e) => {
                        debug!(error = %e, "sample dropped");
                        self.state.parse_drops += 1;
                        self.publish();
                        return None;
                    }
                },
                Ok(ReadOutcome::Idle) => return None,
                Err(e) => {
                    warn!(error = %e, "transport fault, switching to simulation");
                    if let Some(mut t) = transport.take() {
                        t.close().await;
                    }
                    self.set_mode(SourceMode::Simulated);
                    return None;
                }
            }
        }
        Some(self.simulator.next(elapsed))
    }

    fn accept(&mut self, sample: Sample) {
        self.buffer.push(sample);
        self.state.samples += 1;
        self.publish();
        trace!(
            elapsed = sample.elapsed_secs,
            value = sample.value,
            "sample accepted"
        );
        if let Some(log) = self.sample_log.as_mut() {
            if let Err(e) = log.append(&sample) {
                warn!(error = %e, "sample log write failed");
            }
        }
    }

    fn switch_mode(&mut self, mode: SourceMode, transport: &Option<Box<dyn Transport>>) {
        match mode {
            SourceMode::Real if transport.is_none() => {
                warn!("no device attached to this session, staying simulated");
            }
            _ if mode == self.state.mode => {}
            _ => {
                info!(?mode, "mode switched");
                self.set_mode(mode);
            }
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        self.state.phase = phase;
        self.publish();
    }

    fn set_mode(&mut self, mode: SourceMode) {
        self.state.mode = mode;
        self.publish();
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }
}
