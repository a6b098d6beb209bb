//! Direct EC register backend.
//!
//! Writes single bytes into the EC's debugfs io node with `dd`, the value
//! arriving on stdin. Register map (from the vendor EC firmware):
//!
//! - 160: control — 0 enters RGB mode, 1 commits the staged frame
//! - 161: sub-mode (0 = per-zone static)
//! - 163: backlight brightness, 0-255
//! - 165 + zone*3: staged R, G, B for each zone
//!
//! Commands are staged then committed, so a frame lands atomically from the
//! EC's point of view even though it takes a dozen register writes.

use crate::color::Rgb;
use crate::exec::CommandSpec;

use super::{ControlBackend, ControlMethod, NUM_ZONES};

const REG_CONTROL: u8 = 160;
const REG_SUBMODE: u8 = 161;
const REG_BRIGHTNESS: u8 = 163;
const REG_ZONE_BASE: u8 = 165;

const CONTROL_STAGE: u8 = 0;
const CONTROL_COMMIT: u8 = 1;

pub struct EcDirectBackend {
    io_path: String,
}

impl EcDirectBackend {
    pub fn new(io_path: impl Into<String>) -> Self {
        Self {
            io_path: io_path.into(),
        }
    }

    /// One single-byte register write.
    fn write_reg(&self, register: u8, value: u8) -> CommandSpec {
        CommandSpec {
            program: "dd".to_string(),
            args: vec![
                format!("of={}", self.io_path),
                "bs=1".to_string(),
                format!("seek={register}"),
                "count=1".to_string(),
                "conv=notrunc".to_string(),
                "status=none".to_string(),
            ],
            stdin: Some(vec![value]),
        }
    }
}

impl ControlBackend for EcDirectBackend {
    fn method(&self) -> ControlMethod {
        ControlMethod::EcDirect
    }

    fn probe(&self) -> CommandSpec {
        // A one-byte read proves the io node exists and is accessible.
        CommandSpec::new(
            "dd",
            &[
                &format!("if={}", self.io_path),
                "bs=1",
                "count=1",
                "status=none",
            ],
        )
    }

    fn zone_frame(&self, colors: &[Rgb; NUM_ZONES]) -> Vec<CommandSpec> {
        let mut cmds = Vec::with_capacity(NUM_ZONES * 3 + 3);
        cmds.push(self.write_reg(REG_CONTROL, CONTROL_STAGE));
        cmds.push(self.write_reg(REG_SUBMODE, 0));
        for (zone, color) in colors.iter().enumerate() {
            let base = REG_ZONE_BASE + (zone as u8) * 3;
            cmds.push(self.write_reg(base, color.r));
            cmds.push(self.write_reg(base + 1, color.g));
            cmds.push(self.write_reg(base + 2, color.b));
        }
        cmds.push(self.write_reg(REG_CONTROL, CONTROL_COMMIT));
        cmds
    }

    fn backlight(&self, percent: u8) -> Vec<CommandSpec> {
        let value = (percent.min(100) as u16 * 255 / 100) as u8;
        vec![self.write_reg(REG_BRIGHTNESS, value)]
    }

    fn clear(&self) -> Vec<CommandSpec> {
        self.zone_frame(&[Rgb::BLACK; NUM_ZONES])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> EcDirectBackend {
        EcDirectBackend::new("/sys/kernel/debug/ec/ec0/io")
    }

    #[test]
    fn test_write_reg_argv() {
        let cmd = backend().write_reg(163, 128);
        assert_eq!(cmd.program, "dd");
        assert_eq!(
            cmd.args,
            vec![
                "of=/sys/kernel/debug/ec/ec0/io",
                "bs=1",
                "seek=163",
                "count=1",
                "conv=notrunc",
                "status=none"
            ]
        );
        assert_eq!(cmd.stdin, Some(vec![128]));
    }

    #[test]
    fn test_zone_frame_stages_then_commits() {
        let mut colors = [Rgb::BLACK; NUM_ZONES];
        colors[2] = Rgb::new(1, 2, 3);
        let cmds = backend().zone_frame(&colors);
        assert_eq!(cmds.len(), NUM_ZONES * 3 + 3);
        // First: enter RGB mode; last: commit
        assert_eq!(cmds[0].stdin, Some(vec![CONTROL_STAGE]));
        assert_eq!(cmds.last().unwrap().stdin, Some(vec![CONTROL_COMMIT]));
        // Zone 2 lands at registers 171/172/173
        assert!(cmds[8].args.contains(&"seek=171".to_string()));
        assert_eq!(cmds[8].stdin, Some(vec![1]));
        assert_eq!(cmds[9].stdin, Some(vec![2]));
        assert_eq!(cmds[10].stdin, Some(vec![3]));
    }

    #[test]
    fn test_backlight_scales_to_byte() {
        assert_eq!(backend().backlight(100)[0].stdin, Some(vec![255]));
        assert_eq!(backend().backlight(50)[0].stdin, Some(vec![127]));
        assert_eq!(backend().backlight(0)[0].stdin, Some(vec![0]));
    }
}
