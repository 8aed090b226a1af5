//! Shared test helpers: a scripted transport double and session fixtures.
#![allow(dead_code)] // not every test binary uses every helper

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use flowmon::acquisition::RunState;
use flowmon::config::{AcquisitionSettings, SimulatorSettings};
use flowmon::error::FlowError;
use flowmon::simulator::Simulator;
use flowmon::transport::{ReadOutcome, Transport};

/// One scripted read outcome.
pub enum Step {
    Line(&'static str),
    Idle,
    Fault,
}

/// In-memory transport that serves a fixed script, then goes idle.
/// Counts every `close` call so tests can assert exactly-once release.
pub struct ScriptedTransport {
    script: VecDeque<Step>,
    closes: Arc<AtomicUsize>,
    open: bool,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Step>) -> (Self, Arc<AtomicUsize>) {
        let closes = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script: script.into(),
                closes: closes.clone(),
                open: true,
            },
            closes,
        )
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn endpoint(&self) -> &str {
        "scripted"
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn read_line(&mut self) -> Result<ReadOutcome, FlowError> {
        match self.script.pop_front() {
            Some(Step::Line(s)) => Ok(ReadOutcome::Line(s.to_string())),
            Some(Step::Idle) | None => Ok(ReadOutcome::Idle),
            Some(Step::Fault) => Err(FlowError::Transport("device lost".into())),
        }
    }

    async fn close(&mut self) {
        self.open = false;
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn acquisition_settings() -> AcquisitionSettings {
    AcquisitionSettings {
        tick: Duration::from_secs(1),
        buffer_cap: 1_000,
    }
}

pub fn simulator() -> Simulator {
    let settings = SimulatorSettings {
        offset: 12.0,
        amplitude: 4.0,
        period: Duration::from_secs(30),
        jitter: 0.25,
    };
    Simulator::seeded(&settings, 1)
}

/// Block until the published state satisfies `pred`.
pub async fn wait_for<F>(rx: &mut tokio::sync::watch::Receiver<RunState>, mut pred: F)
where
    F: FnMut(&RunState) -> bool,
{
    loop {
        if pred(&rx.borrow_and_update()) {
            return;
        }
        rx.changed().await.expect("session state channel closed");
    }
}
