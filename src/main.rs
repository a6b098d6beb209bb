//! eclight CLI
//!
//! Thin front end over the library: detection, static colors, brightness,
//! and effect playback.

use anyhow::{anyhow, bail, Context};
use clap::Parser;
use tracing::info;

use eclight::{
    ControlMethod, Direction, EffectKind, EffectManager, EffectParams, EngineConfig,
    HardwareController, Rgb, NUM_ZONES,
};

mod cli;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("eclight=info".parse()?),
        )
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).map_err(|e| anyhow!(e))?,
        None => EngineConfig::load_default().map_err(|e| anyhow!(e))?,
    };

    let controller = if cli.simulate {
        HardwareController::spawn_simulated(&config)
    } else {
        HardwareController::spawn(&config)
    };

    match cli.command {
        Commands::Detect => {
            let method = controller.detect().await?;
            match method {
                ControlMethod::None => {
                    println!("No control method detected; simulated mode only")
                }
                m => println!("Active control method: {m}"),
            }
        }

        Commands::Status => {
            controller.detect().await?;
            status(&controller).await?;
        }

        Commands::Set { color, zone } => {
            let color = parse_color(&color)?;
            controller.detect().await?;
            let mut colors = match zone {
                // Single-zone change keeps the other zones as they are.
                Some(_) => controller.zone_state().await?.colors,
                None => [color; NUM_ZONES],
            };
            if let Some(z) = zone {
                colors[z as usize] = color;
            }
            controller.apply_static(colors).await?;
            println!("Applied");
        }

        Commands::Zones { colors } => {
            let mut parsed = [Rgb::BLACK; NUM_ZONES];
            for (i, s) in colors.iter().enumerate().take(NUM_ZONES) {
                parsed[i] = parse_color(s)?;
            }
            controller.detect().await?;
            controller.apply_static(parsed).await?;
            println!("Applied");
        }

        Commands::Brightness { level } => {
            controller.detect().await?;
            controller.apply_brightness(level).await?;
            println!("Brightness set to {level}%");
        }

        Commands::Clear => {
            controller.detect().await?;
            controller.shutdown_all_zones().await?;
            println!("All zones off");
        }

        Commands::Effects => {
            for kind in EffectKind::ALL {
                println!("{kind}");
            }
        }

        Commands::Effect {
            kind,
            color,
            speed,
            rainbow,
            reverse,
            duration,
        } => {
            let kind: EffectKind = kind.parse().map_err(|e: String| anyhow!(e))?;
            let params = EffectParams {
                kind,
                speed,
                base_color: parse_color(&color)?,
                rainbow,
                direction: if reverse {
                    Direction::Reverse
                } else {
                    Direction::Forward
                },
            };

            let method = controller.detect().await?;
            if method.is_none() {
                info!("no hardware detected, effect runs in simulated mode");
            }

            let mut manager = EffectManager::new(controller.clone(), &config);
            manager
                .start(params)
                .await
                .context("failed to start effect")?;

            match duration {
                Some(secs) if secs.is_finite() && secs > 0.0 => {
                    tokio::time::sleep(std::time::Duration::from_secs_f64(secs)).await;
                }
                Some(secs) => bail!("invalid duration: {secs}"),
                None => {
                    println!("Running '{kind}' — Ctrl-C to stop");
                    tokio::signal::ctrl_c().await?;
                }
            }
            manager.stop().await;
            status(&controller).await?;
        }
    }

    Ok(())
}

fn parse_color(s: &str) -> anyhow::Result<Rgb> {
    Rgb::parse(s).ok_or_else(|| anyhow!("unrecognized color: {s}"))
}

async fn status(controller: &HardwareController) -> anyhow::Result<()> {
    let state = controller.zone_state().await?;
    println!("Control method: {}", state.method);
    println!("Brightness:     {}%", state.brightness);
    for (i, color) in state.colors.iter().enumerate() {
        println!("Zone {i}:         {color}");
    }
    for method in [ControlMethod::Ectool, ControlMethod::EcDirect] {
        if let Some(status) = controller.circuit_status(method).await? {
            let cooldown = status
                .cooldown_remaining
                .map(|d| format!(", retry in {:.1}s", d.as_secs_f64()))
                .unwrap_or_default();
            println!(
                "Circuit {}: {} ({} consecutive failures{cooldown})",
                method.label(),
                status.state,
                status.consecutive_failures
            );
        }
    }
    if let Some(result) = controller.last_result().await? {
        println!("Last command:   {:?}", result.outcome);
        if !result.stderr_excerpt.is_empty() {
            println!("  stderr: {}", result.stderr_excerpt);
        }
    }
    Ok(())
}
