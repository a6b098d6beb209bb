//! Effect scheduler.
//!
//! Runs a periodic tick that computes the next frame and forwards it to the
//! hardware controller. Computation and hardware cadence are decoupled:
//! frames are computed at `frame_hz` but pushed only when the colors
//! changed and at most at `push_hz`, since the external control utility is
//! orders of magnitude slower than in-process computation.
//!
//! A hardware push failure never stops the tick — the animation keeps
//! computing and recovers as soon as pushes succeed again.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::color::Rgb;
use crate::config::EngineConfig;
use crate::controller::HardwareController;
use crate::error::HardwareError;
use crate::hal::NUM_ZONES;

use super::{compute, EffectKind, EffectParams};

/// Owns the running effect task; IDLE when `running` is empty.
pub struct EffectManager {
    controller: HardwareController,
    frame_interval: Duration,
    push_interval: Duration,
    running: Option<RunningEffect>,
}

struct RunningEffect {
    kind: EffectKind,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EffectManager {
    pub fn new(controller: HardwareController, config: &EngineConfig) -> Self {
        Self {
            controller,
            frame_interval: config.frame_interval(),
            push_interval: config.push_interval(),
            running: None,
        }
    }

    /// Start an effect, replacing any running one. The parameter snapshot
    /// is moved into the tick task whole; it is never mutated afterwards.
    pub async fn start(&mut self, params: EffectParams) -> Result<(), HardwareError> {
        params.validate()?;
        self.stop().await;

        info!(effect = %params.kind, speed = params.speed, "starting effect");
        let (stop_tx, stop_rx) = watch::channel(false);
        let kind = params.kind;
        let handle = tokio::spawn(tick_loop(
            self.controller.clone(),
            params,
            self.frame_interval,
            self.push_interval,
            stop_rx,
        ));
        self.running = Some(RunningEffect {
            kind,
            stop_tx,
            handle,
        });
        Ok(())
    }

    /// Stop the running effect. Idempotent; zones keep their last-applied
    /// colors. Waits for the tick task to drain so no frame is emitted
    /// after this returns.
    pub async fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            info!(effect = %running.kind, "stopping effect");
            let _ = running.stop_tx.send(true);
            let _ = running.handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn running_kind(&self) -> Option<EffectKind> {
        self.running.as_ref().map(|r| r.kind)
    }
}

async fn tick_loop(
    controller: HardwareController,
    params: EffectParams,
    frame_interval: Duration,
    push_interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let start = Instant::now();
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut frame_index: u64 = 0;
    let mut last_pushed: Option<[Rgb; NUM_ZONES]> = None;
    let mut last_push_at: Option<Instant> = None;

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                // Stop requested, or the manager itself is gone.
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let frame = compute(&params, start.elapsed(), frame_index, NUM_ZONES);
                frame_index += 1;

                let mut colors = [Rgb::BLACK; NUM_ZONES];
                colors.copy_from_slice(&frame);

                let now = Instant::now();
                let changed = last_pushed != Some(colors);
                let due = last_push_at
                    .is_none_or(|at| now.duration_since(at) >= push_interval);
                if changed && due {
                    // try_send semantics: a full queue drops this frame and
                    // a later one supersedes it.
                    if controller.push_frame(colors) {
                        last_pushed = Some(colors);
                        last_push_at = Some(now);
                    } else {
                        debug!("hardware queue full, frame dropped");
                    }
                }
            }
        }
    }
    debug!(frames = frame_index, "effect tick loop drained");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::effects::Direction;

    fn fast_config() -> EngineConfig {
        EngineConfig::from_toml("frame_hz = 60\npush_hz = 60\n").unwrap()
    }

    fn manager() -> EffectManager {
        let config = fast_config();
        let controller = HardwareController::spawn_simulated(&config);
        EffectManager::new(controller.clone(), &config)
    }

    #[tokio::test]
    async fn test_start_pushes_frames_to_controller() {
        let config = fast_config();
        let controller = HardwareController::spawn_simulated(&config);
        let mut mgr = EffectManager::new(controller.clone(), &config);

        let mut params = EffectParams::new(EffectKind::ColorCycle);
        params.speed = 2.0;
        mgr.start(params).await.unwrap();
        assert!(mgr.is_running());

        tokio::time::sleep(Duration::from_millis(150)).await;
        mgr.stop().await;

        // Simulated controller recorded the animation frames.
        let state = controller.zone_state().await.unwrap();
        assert_ne!(state.colors, [Rgb::BLACK; NUM_ZONES]);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_keeps_state() {
        let config = fast_config();
        let controller = HardwareController::spawn_simulated(&config);
        let mut mgr = EffectManager::new(controller.clone(), &config);

        mgr.start(EffectParams::new(EffectKind::ColorCycle))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        mgr.stop().await;
        let after_stop = controller.zone_state().await.unwrap();

        // Second stop is a no-op; zones keep their last-applied colors.
        mgr.stop().await;
        assert!(!mgr.is_running());
        assert_eq!(controller.zone_state().await.unwrap(), after_stop);
    }

    #[tokio::test]
    async fn test_start_replaces_running_effect() {
        let mut mgr = manager();
        mgr.start(EffectParams::new(EffectKind::Breathing))
            .await
            .unwrap();
        assert_eq!(mgr.running_kind(), Some(EffectKind::Breathing));

        let params = EffectParams {
            direction: Direction::Reverse,
            ..EffectParams::new(EffectKind::Wave)
        };
        mgr.start(params).await.unwrap();
        assert_eq!(mgr.running_kind(), Some(EffectKind::Wave));
        mgr.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_params_rejected_without_state_change() {
        let mut mgr = manager();
        let mut params = EffectParams::new(EffectKind::Strobe);
        params.speed = -1.0;
        assert!(matches!(
            mgr.start(params).await,
            Err(HardwareError::InvalidParams(_))
        ));
        assert!(!mgr.is_running());
    }
}
