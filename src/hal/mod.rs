// Hardware Abstraction Layer for EC keyboard backlight control
//
// This module provides:
// - Zone layout constants
// - Control method identifiers
// - Command builders for each control method (ectool, direct EC registers)
//
// Backends are pure command builders: they turn an intent (set zones, set
// brightness, probe) into the argv sequence to hand to the executor. They
// never touch the hardware themselves.

pub mod ec_direct;
pub mod ectool;

pub use ec_direct::EcDirectBackend;
pub use ectool::EctoolBackend;

use crate::color::Rgb;
use crate::exec::CommandSpec;

/// Number of addressable backlight zones.
pub const NUM_ZONES: usize = 4;

/// LEDs per zone; `ectool rgbkbd` takes one packed color per LED.
pub const LEDS_PER_ZONE: usize = 3;

/// Mechanism used to command the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ControlMethod {
    /// ChromeOS `ectool` utility (preferred).
    Ectool,
    /// Direct EC register writes through debugfs.
    EcDirect,
    /// No hardware control detected; applies are simulated locally.
    None,
}

impl ControlMethod {
    pub fn label(self) -> &'static str {
        match self {
            ControlMethod::Ectool => "ectool",
            ControlMethod::EcDirect => "ec-direct",
            ControlMethod::None => "none",
        }
    }

    pub fn is_none(self) -> bool {
        self == ControlMethod::None
    }
}

impl std::fmt::Display for ControlMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Builds the external commands implementing one control method.
pub trait ControlBackend: Send + Sync {
    fn method(&self) -> ControlMethod;

    /// Cheap liveness check run during detection.
    fn probe(&self) -> CommandSpec;

    /// Commands for one full frame of zone colors (already brightness-scaled).
    fn zone_frame(&self, colors: &[Rgb; NUM_ZONES]) -> Vec<CommandSpec>;

    /// Commands for the keyboard backlight PWM level (0-100).
    fn backlight(&self, percent: u8) -> Vec<CommandSpec>;

    /// Commands to blank every zone.
    fn clear(&self) -> Vec<CommandSpec>;
}
