//! Hardware controller: the sole owner of zone/brightness state and the
//! only component that issues hardware commands.
//!
//! `HardwareController` is a cheap cloneable handle over a single worker
//! task. The worker owns the zone state, the per-method circuit breakers,
//! and the executor, and processes requests strictly in order — one command
//! in flight per control method, never more. Callers get typed results over
//! oneshot channels; nothing panics across this boundary.
//!
//! ```text
//! [CLI / EffectManager]  — mpsc →  [worker: breaker → executor → ectool/dd]
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::breaker::{CircuitBreaker, CircuitStatus};
use crate::color::Rgb;
use crate::config::EngineConfig;
use crate::error::HardwareError;
use crate::exec::{CommandExecutor, CommandResult, CommandSpec};
use crate::hal::{ControlBackend, ControlMethod, EcDirectBackend, EctoolBackend, NUM_ZONES};

/// Requests queued ahead of the worker; effect pushes drop frames rather
/// than pile up behind a slow control utility.
const REQUEST_QUEUE_DEPTH: usize = 8;

/// Snapshot of the controller's zone/brightness state.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneState {
    pub colors: [Rgb; NUM_ZONES],
    /// Process-wide brightness, 0-100, applied at command-emission time.
    pub brightness: u8,
    pub method: ControlMethod,
}

enum Request {
    Detect {
        reply: oneshot::Sender<ControlMethod>,
    },
    ApplyStatic {
        colors: [Rgb; NUM_ZONES],
        /// `None` for throttled effect pushes (fire and forget).
        reply: Option<oneshot::Sender<Result<(), HardwareError>>>,
    },
    ApplyBrightness {
        level: u8,
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    ShutdownAllZones {
        reply: oneshot::Sender<Result<(), HardwareError>>,
    },
    ZoneState {
        reply: oneshot::Sender<ZoneState>,
    },
    CircuitStatus {
        method: ControlMethod,
        reply: oneshot::Sender<Option<CircuitStatus>>,
    },
    LastResult {
        reply: oneshot::Sender<Option<CommandResult>>,
    },
}

/// Cloneable handle to the hardware worker.
#[derive(Clone)]
pub struct HardwareController {
    tx: mpsc::Sender<Request>,
}

impl HardwareController {
    /// Spawn the worker with the real backends (ectool first, EC direct
    /// second). The active method is `None` until `detect` is called.
    pub fn spawn(config: &EngineConfig) -> Self {
        let backends: Vec<Box<dyn ControlBackend>> = vec![
            Box::new(EctoolBackend::new(config.ectool_path.clone())),
            Box::new(EcDirectBackend::new(config.ec_io_path.clone())),
        ];
        Self::spawn_with_backends(config, backends)
    }

    /// Spawn with no backends at all: detection always lands on
    /// `ControlMethod::None` and every apply is simulated.
    pub fn spawn_simulated(config: &EngineConfig) -> Self {
        Self::spawn_with_backends(config, Vec::new())
    }

    /// Spawn with an explicit backend list (tests inject fakes here).
    pub fn spawn_with_backends(
        config: &EngineConfig,
        backends: Vec<Box<dyn ControlBackend>>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE_DEPTH);
        let mut breakers = BTreeMap::new();
        for backend in &backends {
            let method = backend.method();
            breakers.insert(
                method,
                CircuitBreaker::new(
                    method.label(),
                    config.breaker.threshold,
                    config.breaker.cooldown(),
                    config.breaker.max_cooldown(),
                ),
            );
        }
        let worker = Worker {
            executor: CommandExecutor::new(config.command_timeout()),
            probe_executor: CommandExecutor::new(config.probe_timeout()),
            backends,
            breakers,
            active: ControlMethod::None,
            colors: [Rgb::BLACK; NUM_ZONES],
            brightness: 100,
            last_result: None,
        };
        tokio::spawn(worker.run(rx));
        Self { tx }
    }

    /// Probe control methods in priority order and activate the first that
    /// responds. May be re-invoked after repeated failures to re-evaluate.
    pub async fn detect(&self) -> Result<ControlMethod, HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::Detect { reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)
    }

    /// Apply one frame of zone colors, awaiting the hardware result.
    pub async fn apply_static(&self, colors: [Rgb; NUM_ZONES]) -> Result<(), HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::ApplyStatic {
            colors,
            reply: Some(reply),
        })
        .await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)?
    }

    /// Queue one frame without waiting for the result. Returns `false` if
    /// the queue is full (hardware backed up) and the frame was dropped.
    pub fn push_frame(&self, colors: [Rgb; NUM_ZONES]) -> bool {
        self.tx
            .try_send(Request::ApplyStatic {
                colors,
                reply: None,
            })
            .is_ok()
    }

    /// Set process-wide brightness (0-100) and re-emit the current frame.
    pub async fn apply_brightness(&self, level: u8) -> Result<(), HardwareError> {
        if level > 100 {
            return Err(HardwareError::InvalidParams(format!(
                "brightness must be 0-100, got {level}"
            )));
        }
        let (reply, rx) = oneshot::channel();
        self.send(Request::ApplyBrightness { level, reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)?
    }

    /// Blank every zone.
    pub async fn shutdown_all_zones(&self) -> Result<(), HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::ShutdownAllZones { reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)?
    }

    pub async fn zone_state(&self) -> Result<ZoneState, HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::ZoneState { reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)
    }

    pub async fn active_method(&self) -> Result<ControlMethod, HardwareError> {
        Ok(self.zone_state().await?.method)
    }

    /// Breaker snapshot for a control method; `None` for unknown methods
    /// (including `ControlMethod::None`, which has no breaker).
    pub async fn circuit_status(
        &self,
        method: ControlMethod,
    ) -> Result<Option<CircuitStatus>, HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::CircuitStatus { method, reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)
    }

    /// Outcome of the most recent external command, for diagnostics.
    pub async fn last_result(&self) -> Result<Option<CommandResult>, HardwareError> {
        let (reply, rx) = oneshot::channel();
        self.send(Request::LastResult { reply }).await?;
        rx.await.map_err(|_| HardwareError::WorkerGone)
    }

    async fn send(&self, req: Request) -> Result<(), HardwareError> {
        self.tx.send(req).await.map_err(|_| HardwareError::WorkerGone)
    }
}

// ── Worker ───────────────────────────────────────────────────────────

struct Worker {
    executor: CommandExecutor,
    probe_executor: CommandExecutor,
    /// Priority order; index 0 is probed first.
    backends: Vec<Box<dyn ControlBackend>>,
    breakers: BTreeMap<ControlMethod, CircuitBreaker>,
    active: ControlMethod,
    colors: [Rgb; NUM_ZONES],
    brightness: u8,
    last_result: Option<CommandResult>,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::Receiver<Request>) {
        while let Some(req) = rx.recv().await {
            self.handle(req).await;
        }
        debug!("hardware worker stopped");
    }

    async fn handle(&mut self, req: Request) {
        match req {
            Request::Detect { reply } => {
                let method = self.detect().await;
                let _ = reply.send(method);
            }
            Request::ApplyStatic { colors, reply } => {
                let result = self.apply_static(colors).await;
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                } else if let Err(e) = result {
                    // Effect pushes have no caller to report to.
                    debug!(error = %e, "effect frame push failed");
                }
            }
            Request::ApplyBrightness { level, reply } => {
                let _ = reply.send(self.apply_brightness(level).await);
            }
            Request::ShutdownAllZones { reply } => {
                let _ = reply.send(self.shutdown_all_zones().await);
            }
            Request::ZoneState { reply } => {
                let _ = reply.send(ZoneState {
                    colors: self.colors,
                    brightness: self.brightness,
                    method: self.active,
                });
            }
            Request::CircuitStatus { method, reply } => {
                let now = Instant::now();
                let _ = reply.send(self.breakers.get(&method).map(|b| b.status(now)));
            }
            Request::LastResult { reply } => {
                let _ = reply.send(self.last_result.clone());
            }
        }
    }

    /// Probe backends in priority order; first success wins.
    async fn detect(&mut self) -> ControlMethod {
        for backend in &self.backends {
            let method = backend.method();
            let result = self.probe_executor.run(&backend.probe()).await;
            self.last_result = Some(result.clone());
            if result.is_success() {
                info!(%method, "control method detected");
                self.active = method;
                return method;
            }
            debug!(%method, outcome = ?result.outcome, "probe failed");
        }
        warn!("no control method detected, running in simulated mode");
        self.active = ControlMethod::None;
        ControlMethod::None
    }

    fn active_backend(&self) -> Option<&dyn ControlBackend> {
        self.backends
            .iter()
            .find(|b| b.method() == self.active)
            .map(|b| b.as_ref())
    }

    async fn apply_static(&mut self, colors: [Rgb; NUM_ZONES]) -> Result<(), HardwareError> {
        if self.active.is_none() {
            // Simulated mode: state updates locally, zero external commands.
            self.colors = colors;
            return Ok(());
        }
        self.admit_active()?;
        let scale = self.brightness as f32 / 100.0;
        let scaled = colors.map(|c| c.scale(scale));
        let specs = self
            .active_backend()
            .ok_or(HardwareError::NoControlMethod)?
            .zone_frame(&scaled);
        self.issue(specs).await?;
        self.colors = colors;
        Ok(())
    }

    async fn apply_brightness(&mut self, level: u8) -> Result<(), HardwareError> {
        if self.active.is_none() {
            self.brightness = level;
            return Ok(());
        }
        self.admit_active()?;
        let scale = level as f32 / 100.0;
        let scaled = self.colors.map(|c| c.scale(scale));
        let backend = self.active_backend().ok_or(HardwareError::NoControlMethod)?;
        // Backlight PWM plus a re-emit of the current frame at the new scale.
        let mut specs = backend.backlight(level);
        specs.extend(backend.zone_frame(&scaled));
        self.issue(specs).await?;
        self.brightness = level;
        Ok(())
    }

    async fn shutdown_all_zones(&mut self) -> Result<(), HardwareError> {
        if self.active.is_none() {
            self.colors = [Rgb::BLACK; NUM_ZONES];
            return Ok(());
        }
        self.admit_active()?;
        let specs = self
            .active_backend()
            .ok_or(HardwareError::NoControlMethod)?
            .clear();
        self.issue(specs).await?;
        self.colors = [Rgb::BLACK; NUM_ZONES];
        Ok(())
    }

    /// Ask the active method's breaker for admission. Runs before any
    /// command is built, so an open circuit costs nothing.
    fn admit_active(&mut self) -> Result<(), HardwareError> {
        self.breakers
            .get_mut(&self.active)
            .ok_or(HardwareError::NoControlMethod)?
            .admit(Instant::now())
    }

    /// Run an admitted command sequence and record its outcome on the
    /// active method's breaker. The whole sequence counts as one breaker
    /// event: a failure part-way aborts the rest.
    async fn issue(&mut self, specs: Vec<CommandSpec>) -> Result<(), HardwareError> {
        let mut failure = None;
        for spec in &specs {
            let result = self.executor.run(spec).await;
            let error = result.to_error();
            self.last_result = Some(result);
            if let Some(e) = error {
                failure = Some(e);
                break;
            }
        }

        if let Some(breaker) = self.breakers.get_mut(&self.active) {
            match failure {
                Some(_) => breaker.record_failure(Instant::now()),
                None => breaker.record_success(),
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
