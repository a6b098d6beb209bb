// eclight - Per-zone RGB keyboard backlight control for ChromeOS-EC laptops
// Command layer (executor + circuit breaker), hardware controller, and
// effect engine. The CLI in main.rs is a thin consumer of this library.

pub mod breaker;
pub mod color;
pub mod config;
pub mod controller;
pub mod effects;
pub mod error;
pub mod exec;
pub mod hal;

pub use breaker::{CircuitState, CircuitStatus};
pub use color::Rgb;
pub use config::EngineConfig;
pub use controller::{HardwareController, ZoneState};
pub use effects::{Direction, EffectKind, EffectManager, EffectParams};
pub use error::HardwareError;
pub use exec::{CommandExecutor, CommandOutcome, CommandResult, CommandSpec};
pub use hal::{ControlBackend, ControlMethod, LEDS_PER_ZONE, NUM_ZONES};
