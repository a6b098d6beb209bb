//! `ectool` command backend.
//!
//! Zone colors go through `ectool rgbkbd <first_led> <packed>...` with one
//! 24-bit packed color per LED in the zone; brightness uses the keyboard
//! backlight PWM (`pwmsetkblight`). `ectool version` doubles as the
//! detection probe since it answers without touching LED state.

use crate::color::Rgb;
use crate::exec::CommandSpec;

use super::{ControlBackend, ControlMethod, LEDS_PER_ZONE, NUM_ZONES};

pub struct EctoolBackend {
    path: String,
}

impl EctoolBackend {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn cmd(&self, args: Vec<String>) -> CommandSpec {
        CommandSpec {
            program: self.path.clone(),
            args,
            stdin: None,
        }
    }
}

impl ControlBackend for EctoolBackend {
    fn method(&self) -> ControlMethod {
        ControlMethod::Ectool
    }

    fn probe(&self) -> CommandSpec {
        self.cmd(vec!["version".into()])
    }

    fn zone_frame(&self, colors: &[Rgb; NUM_ZONES]) -> Vec<CommandSpec> {
        colors
            .iter()
            .enumerate()
            .map(|(zone, color)| {
                let mut args = vec![
                    "rgbkbd".to_string(),
                    (zone * LEDS_PER_ZONE).to_string(),
                ];
                let packed = color.packed().to_string();
                args.extend(std::iter::repeat_n(packed, LEDS_PER_ZONE));
                self.cmd(args)
            })
            .collect()
    }

    fn backlight(&self, percent: u8) -> Vec<CommandSpec> {
        vec![self.cmd(vec![
            "pwmsetkblight".into(),
            percent.min(100).to_string(),
        ])]
    }

    fn clear(&self) -> Vec<CommandSpec> {
        vec![self.cmd(vec!["rgbkbd".into(), "clear".into(), "0".into()])]
    }
}
