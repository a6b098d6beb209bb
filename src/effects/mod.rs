//! Animated lighting effects.
//!
//! `compute` is a pure function of (params, elapsed, frame index, zone
//! count): no clock, no hardware, no hidden state. The scheduler supplies
//! elapsed time, which makes every effect reproducible in tests — including
//! starlight, whose flicker is seeded from the frame index rather than
//! wall-clock entropy.

pub mod manager;

pub use manager::EffectManager;

use std::f64::consts::TAU;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::color::Rgb;
use crate::error::HardwareError;

/// Spatial direction for propagating effects (wave, zone chase).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// The closed set of effect waveforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Sinusoidal brightness envelope on a fixed (or rainbow) color.
    Breathing,
    /// Uniform hue rotation across all zones.
    ColorCycle,
    /// Sine envelope with a per-zone phase offset.
    Wave,
    /// One lit zone stepping across the keyboard.
    ZoneChase,
    /// Pseudo-random per-zone twinkle.
    Starlight,
    /// Hard on/off blink.
    Strobe,
    /// A bright spot sweeping back and forth with a falloff tail.
    Scanner,
    /// A ring expanding outward from the center zone.
    Ripple,
}

impl EffectKind {
    pub const ALL: [EffectKind; 8] = [
        EffectKind::Breathing,
        EffectKind::ColorCycle,
        EffectKind::Wave,
        EffectKind::ZoneChase,
        EffectKind::Starlight,
        EffectKind::Strobe,
        EffectKind::Scanner,
        EffectKind::Ripple,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Breathing => "breathing",
            EffectKind::ColorCycle => "color-cycle",
            EffectKind::Wave => "wave",
            EffectKind::ZoneChase => "zone-chase",
            EffectKind::Starlight => "starlight",
            EffectKind::Strobe => "strobe",
            EffectKind::Scanner => "scanner",
            EffectKind::Ripple => "ripple",
        }
    }
}

impl std::fmt::Display for EffectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "breathing" | "breathe" => Ok(EffectKind::Breathing),
            "color-cycle" | "cycle" => Ok(EffectKind::ColorCycle),
            "wave" => Ok(EffectKind::Wave),
            "zone-chase" | "chase" => Ok(EffectKind::ZoneChase),
            "starlight" => Ok(EffectKind::Starlight),
            "strobe" => Ok(EffectKind::Strobe),
            "scanner" | "scan" => Ok(EffectKind::Scanner),
            "ripple" => Ok(EffectKind::Ripple),
            other => Err(format!("unknown effect: {other}")),
        }
    }
}

/// Immutable parameter snapshot for one effect activation.
///
/// `EffectManager::start` takes the whole struct by value; a running
/// animation never sees a partially updated parameter set.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectParams {
    pub kind: EffectKind,
    /// Cycles per second; must be finite and positive.
    pub speed: f32,
    pub base_color: Rgb,
    /// Substitute a time/zone-derived hue for the base color.
    pub rainbow: bool,
    pub direction: Direction,
}

impl EffectParams {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            speed: 1.0,
            base_color: Rgb::WHITE,
            rainbow: false,
            direction: Direction::Forward,
        }
    }

    pub fn validate(&self) -> Result<(), HardwareError> {
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(HardwareError::InvalidParams(format!(
                "effect speed must be finite and positive, got {}",
                self.speed
            )));
        }
        Ok(())
    }
}

/// Compute the color of every zone for one frame.
///
/// Deterministic: identical inputs always produce the identical sequence.
/// The returned vector has exactly `zone_count` entries.
pub fn compute(
    params: &EffectParams,
    elapsed: Duration,
    frame_index: u64,
    zone_count: usize,
) -> Vec<Rgb> {
    // Elapsed time in effect cycles; speed stretches or compresses time.
    let t = elapsed.as_secs_f64() * params.speed as f64;

    match params.kind {
        EffectKind::Breathing => breathing(params, t, zone_count),
        EffectKind::ColorCycle => color_cycle(t, zone_count),
        EffectKind::Wave => wave(params, t, zone_count),
        EffectKind::ZoneChase => zone_chase(params, t, zone_count),
        EffectKind::Starlight => starlight(params, frame_index, zone_count),
        EffectKind::Strobe => strobe(params, t, zone_count),
        EffectKind::Scanner => scanner(params, t, zone_count),
        EffectKind::Ripple => ripple(params, t, zone_count),
    }
}

/// Base color for a frame, honoring rainbow mode (hue follows time).
fn frame_color(params: &EffectParams, t: f64) -> Rgb {
    if params.rainbow {
        Rgb::from_hsv(((t * 360.0).rem_euclid(360.0)) as f32, 1.0, 1.0)
    } else {
        params.base_color
    }
}

/// Envelope `(1 - cos(2πx)) / 2`: 0 at x=0, 1 at x=0.5, 0 at x=1.
fn raised_cosine(x: f64) -> f32 {
    ((1.0 - (TAU * x).cos()) / 2.0) as f32
}

fn breathing(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    let envelope = raised_cosine(t);
    let color = frame_color(params, t).scale(envelope);
    vec![color; zone_count]
}

fn color_cycle(t: f64, zone_count: usize) -> Vec<Rgb> {
    let hue = (t * 360.0).rem_euclid(360.0) as f32;
    vec![Rgb::from_hsv(hue, 1.0, 1.0); zone_count]
}

fn wave(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    (0..zone_count)
        .map(|zone| {
            let mut phase = zone as f64 / zone_count.max(1) as f64;
            if params.direction == Direction::Reverse {
                phase = -phase;
            }
            let envelope = raised_cosine(t - phase);
            let color = if params.rainbow {
                let hue = ((t - phase) * 360.0).rem_euclid(360.0) as f32;
                Rgb::from_hsv(hue, 1.0, 1.0)
            } else {
                params.base_color
            };
            color.scale(envelope)
        })
        .collect()
}

fn zone_chase(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    if zone_count == 0 {
        return Vec::new();
    }
    let step = t.floor().rem_euclid(zone_count as f64) as usize;
    let active = match params.direction {
        Direction::Forward => step,
        Direction::Reverse => zone_count - 1 - step,
    };
    let color = frame_color(params, t);
    (0..zone_count)
        .map(|zone| if zone == active { color } else { Rgb::BLACK })
        .collect()
}

fn starlight(params: &EffectParams, frame_index: u64, zone_count: usize) -> Vec<Rgb> {
    (0..zone_count)
        .map(|zone| {
            // Seed from frame and zone only, never wall-clock entropy.
            let seed = frame_index
                .wrapping_mul(0x9E37_79B9_7F4A_7C15)
                .wrapping_add(zone as u64);
            let mut rng = fastrand::Rng::with_seed(seed);
            let twinkle = rng.f32() < 0.3;
            let color = if params.rainbow {
                Rgb::from_hsv(rng.f32() * 360.0, 1.0, 1.0)
            } else {
                params.base_color
            };
            if twinkle {
                color.scale(0.3 + 0.7 * rng.f32())
            } else {
                color.scale(0.05)
            }
        })
        .collect()
}

fn strobe(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    let on = (t.floor() as i64).rem_euclid(2) == 0;
    let color = if on {
        frame_color(params, t)
    } else {
        Rgb::BLACK
    };
    vec![color; zone_count]
}

fn scanner(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    if zone_count == 0 {
        return Vec::new();
    }
    // Triangle sweep: forward over every zone, then back, one zone per
    // step. A full pass covers 2n-2 steps so the endpoints are not held
    // twice.
    let cycle = (zone_count * 2).saturating_sub(2).max(1);
    let step = t.floor().rem_euclid(cycle as f64) as usize;
    let mut pos = if step < zone_count {
        step
    } else {
        cycle - step
    };
    if params.direction == Direction::Reverse {
        pos = zone_count - 1 - pos;
    }
    let color = if params.rainbow {
        Rgb::from_hsv(pos as f32 / zone_count as f32 * 360.0, 1.0, 1.0)
    } else {
        params.base_color
    };
    (0..zone_count)
        .map(|zone| {
            let distance = zone.abs_diff(pos) as f64;
            color.scale((1.0 - distance * 0.7).max(0.0) as f32)
        })
        .collect()
}

fn ripple(params: &EffectParams, t: f64, zone_count: usize) -> Vec<Rgb> {
    if zone_count == 0 {
        return Vec::new();
    }
    let center = zone_count / 2;
    // The ring travels past the outermost zone before wrapping, so each
    // pulse fully fades out instead of snapping back to the center.
    let span = (zone_count + 5) as f64;
    let radius = t.rem_euclid(1.0) * span;
    let color = if params.rainbow {
        Rgb::from_hsv(((radius * 36.0).rem_euclid(360.0)) as f32, 1.0, 1.0)
    } else {
        params.base_color
    };
    (0..zone_count)
        .map(|zone| {
            let distance = zone.abs_diff(center) as f64;
            color.scale((1.0 - (distance - radius).abs() * 0.5).max(0.0) as f32)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(kind: EffectKind) -> EffectParams {
        EffectParams {
            base_color: Rgb::new(200, 40, 0),
            ..EffectParams::new(kind)
        }
    }

    #[test]
    fn test_compute_is_deterministic() {
        for kind in EffectKind::ALL {
            let p = params(kind);
            let elapsed = Duration::from_millis(1234);
            let a = compute(&p, elapsed, 42, 4);
            let b = compute(&p, elapsed, 42, 4);
            assert_eq!(a, b, "{kind} not deterministic");
        }
    }

    #[test]
    fn test_output_length_matches_zone_count() {
        for kind in EffectKind::ALL {
            let p = params(kind);
            for zone_count in 1..=8 {
                let out = compute(&p, Duration::from_millis(500), 7, zone_count);
                assert_eq!(out.len(), zone_count, "{kind} at {zone_count} zones");
            }
        }
    }

    #[test]
    fn test_breathing_periodicity() {
        // One full cycle at speed 2.0 is 0.5s; envelope repeats exactly.
        let mut p = params(EffectKind::Breathing);
        p.speed = 2.0;
        let at_zero = compute(&p, Duration::ZERO, 0, 4);
        let at_period = compute(&p, Duration::from_millis(500), 10, 4);
        assert_eq!(at_zero, at_period);
        // Dark at phase 0, bright at half phase
        assert_eq!(at_zero[0], Rgb::BLACK);
        let at_half = compute(&p, Duration::from_millis(250), 5, 4);
        assert_eq!(at_half[0], p.base_color);
    }

    #[test]
    fn test_color_cycle_hue_progression() {
        let p = params(EffectKind::ColorCycle);
        let c0 = compute(&p, Duration::ZERO, 0, 4);
        let c1 = compute(&p, Duration::from_millis(250), 5, 4);
        let c2 = compute(&p, Duration::from_millis(400), 8, 4);
        // hue = elapsed * speed * 360 mod 360
        assert_eq!(c0[0], Rgb::from_hsv(0.0, 1.0, 1.0));
        assert_eq!(c1[0], Rgb::from_hsv(90.0, 1.0, 1.0));
        assert_eq!(c2[0], Rgb::from_hsv(144.0, 1.0, 1.0));
        // Uniform across zones, distinct across samples
        assert!(c0.iter().all(|&c| c == c0[0]));
        assert_ne!(c0[0], c1[0]);
        assert_ne!(c1[0], c2[0]);
    }

    #[test]
    fn test_color_cycle_wraps_after_full_cycle() {
        let p = params(EffectKind::ColorCycle);
        let c0 = compute(&p, Duration::ZERO, 0, 4);
        let c1 = compute(&p, Duration::from_secs(1), 20, 4);
        assert_eq!(c0, c1);
    }

    #[test]
    fn test_zone_chase_steps_through_zones() {
        let p = params(EffectKind::ZoneChase);
        for step in 0..4usize {
            let out = compute(&p, Duration::from_millis(step as u64 * 1000 + 100), 0, 4);
            for (zone, &c) in out.iter().enumerate() {
                if zone == step {
                    assert_eq!(c, p.base_color);
                } else {
                    assert_eq!(c, Rgb::BLACK);
                }
            }
        }
        // Wraps around
        let out = compute(&p, Duration::from_millis(4100), 0, 4);
        assert_eq!(out[0], p.base_color);
    }

    #[test]
    fn test_zone_chase_direction_reverses() {
        let mut p = params(EffectKind::ZoneChase);
        p.direction = Direction::Reverse;
        let out = compute(&p, Duration::from_millis(100), 0, 4);
        assert_eq!(out[3], p.base_color);
        assert_eq!(out[0], Rgb::BLACK);
    }

    #[test]
    fn test_wave_phase_offsets_differ_across_zones() {
        let p = params(EffectKind::Wave);
        let out = compute(&p, Duration::from_millis(100), 2, 4);
        // Adjacent zones sit at different envelope phases
        assert_ne!(out[0], out[1]);
        // Direction flip mirrors the pattern
        let mut rev = p.clone();
        rev.direction = Direction::Reverse;
        let out_rev = compute(&rev, Duration::from_millis(100), 2, 4);
        assert_ne!(out, out_rev);
    }

    #[test]
    fn test_strobe_alternates() {
        let p = params(EffectKind::Strobe);
        let on = compute(&p, Duration::from_millis(100), 2, 4);
        let off = compute(&p, Duration::from_millis(1100), 22, 4);
        assert_eq!(on[0], p.base_color);
        assert_eq!(off[0], Rgb::BLACK);
        // Back on in the next cycle
        let on_again = compute(&p, Duration::from_millis(2100), 42, 4);
        assert_eq!(on_again[0], p.base_color);
    }

    #[test]
    fn test_scanner_sweeps_back_and_forth() {
        let p = params(EffectKind::Scanner);
        // Forward half of the cycle: the spot walks 0, 1, 2, 3 ...
        for step in 0..4usize {
            let out = compute(&p, Duration::from_millis(step as u64 * 1000 + 100), 0, 4);
            assert_eq!(out[step], p.base_color, "step {step}");
        }
        // ... then turns around: steps 4 and 5 sit on zones 2 and 1.
        let back = compute(&p, Duration::from_millis(4100), 0, 4);
        assert_eq!(back[2], p.base_color);
        let back = compute(&p, Duration::from_millis(5100), 0, 4);
        assert_eq!(back[1], p.base_color);
        // Full cycle is 6 steps for 4 zones.
        let wrapped = compute(&p, Duration::from_millis(6100), 0, 4);
        assert_eq!(wrapped[0], p.base_color);
    }

    #[test]
    fn test_scanner_tail_falls_off() {
        let p = params(EffectKind::Scanner);
        let out = compute(&p, Duration::from_millis(100), 0, 4);
        // Spot at zone 0: the neighbor carries a dimmed tail, zones two or
        // more away are dark.
        assert_eq!(out[0], p.base_color);
        assert_ne!(out[1], Rgb::BLACK);
        assert!(out[1].r < out[0].r);
        assert_eq!(out[2], Rgb::BLACK);
        assert_eq!(out[3], Rgb::BLACK);

        let mut rev = p.clone();
        rev.direction = Direction::Reverse;
        let out = compute(&rev, Duration::from_millis(100), 0, 4);
        assert_eq!(out[3], p.base_color);
    }

    #[test]
    fn test_ripple_expands_from_center() {
        let p = params(EffectKind::Ripple);
        // Radius 0: only the center zone (and its direct neighbors, at half
        // intensity) are lit.
        let start = compute(&p, Duration::ZERO, 0, 4);
        assert_eq!(start[2], p.base_color);
        assert_ne!(start[1], Rgb::BLACK);
        assert!(start[1].r < start[2].r);
        assert_eq!(start[0], Rgb::BLACK);

        // Radius ~2: the ring has reached the outermost zone and the
        // center has gone dark.
        let later = compute(&p, Duration::from_secs_f64(2.0 / 9.0), 0, 4);
        assert!(later[0].r > later[1].r);
        assert_ne!(later[0], Rgb::BLACK);
        assert_eq!(later[2], Rgb::BLACK);

        // One full cycle later the ring is back at the center.
        assert_eq!(start, compute(&p, Duration::from_secs(1), 20, 4));
    }

    #[test]
    fn test_starlight_seeded_by_frame_index() {
        let p = params(EffectKind::Starlight);
        let elapsed = Duration::from_millis(100);
        // Same frame -> same flicker
        assert_eq!(compute(&p, elapsed, 3, 4), compute(&p, elapsed, 3, 4));
        // Across many frames the flicker pattern changes
        let base = compute(&p, elapsed, 0, 4);
        let changed = (1..=20).any(|frame| compute(&p, elapsed, frame, 4) != base);
        assert!(changed);
    }

    #[test]
    fn test_rainbow_substitutes_hue() {
        let mut p = params(EffectKind::Breathing);
        p.rainbow = true;
        // At quarter cycle the envelope is nonzero and hue is time-derived
        let out = compute(&p, Duration::from_millis(250), 5, 4);
        assert_ne!(out[0], p.base_color.scale(0.5));
    }

    #[test]
    fn test_params_validation() {
        let mut p = params(EffectKind::Wave);
        assert!(p.validate().is_ok());
        p.speed = 0.0;
        assert!(p.validate().is_err());
        p.speed = f32::NAN;
        assert!(p.validate().is_err());
        p.speed = f32::INFINITY;
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_effect_kind_parsing() {
        assert_eq!("breathing".parse::<EffectKind>(), Ok(EffectKind::Breathing));
        assert_eq!("Color-Cycle".parse::<EffectKind>(), Ok(EffectKind::ColorCycle));
        assert_eq!("zone_chase".parse::<EffectKind>(), Ok(EffectKind::ZoneChase));
        assert!("disco".parse::<EffectKind>().is_err());
        for kind in EffectKind::ALL {
            assert_eq!(kind.name().parse::<EffectKind>(), Ok(kind));
        }
    }
}
