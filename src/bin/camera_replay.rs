//! Camera Replay - Offline Camera Rig Runner
//!
//! Feeds a recorded sequence of view target states through the blend stack
//! and prints one POV per frame as JSON lines.
//!
//! Run with: `cargo run --bin camera_replay -- replay.json [--config rig.toml]`
//!
//! Replay format:
//!
//! ```json
//! {
//!   "view_target": 1,
//!   "player": 1,
//!   "obstacles": [{ "min": [200, -500, -500], "max": [260, 500, 500] }],
//!   "frames": [
//!     { "dt": 0.016, "targets": [{ "id": 1, "location": [0, 0, 0], "capsule": { "radius": 40, "half_height": 90 } }] }
//!   ]
//! }
//! ```
//!
//! Set `RUST_LOG=debug` to see mode transitions on stderr.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use city_camera_engine::camera::{BoxWorld, CameraModeKind, CameraPov, Obstacle, ViewTarget, ViewTargetId};
use city_camera_engine::config::CameraRigConfig;
use city_camera_engine::math::Rotator;

#[derive(Debug, Deserialize)]
struct Replay {
    view_target: Option<ViewTargetId>,
    #[serde(default)]
    player: Option<ViewTargetId>,
    #[serde(default)]
    obstacles: Vec<Obstacle>,
    frames: Vec<ReplayFrame>,
}

#[derive(Debug, Deserialize)]
struct ReplayFrame {
    dt: f32,
    targets: Vec<ViewTarget>,
    /// Switches the view target from this frame on
    #[serde(default)]
    view_target: Option<ViewTargetId>,
    /// Look input added to the control rotation before the update
    #[serde(default)]
    control_input: Option<Rotator>,
    #[serde(default)]
    use_alternate: Option<bool>,
    #[serde(default)]
    configure_alternate: Option<AlternateCameraConfig>,
}

#[derive(Debug, Deserialize)]
struct AlternateCameraConfig {
    mode: CameraModeKind,
    view_target: ViewTargetId,
    #[serde(default)]
    transition_time: f32,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame: usize,
    mode: Option<CameraModeKind>,
    stack_depth: usize,
    player_hidden: bool,
    pov: &'a CameraPov,
}

struct Args {
    replay: PathBuf,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut replay = None;
    let mut config = None;
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            "--help" | "-h" => {
                println!("usage: camera_replay <replay.json> [--config rig.(json|toml)]");
                std::process::exit(0);
            }
            _ if replay.is_none() => replay = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {}", arg),
        }
    }
    let replay = replay.context("missing replay file (see --help)")?;
    Ok(Args { replay, config })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => CameraRigConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => CameraRigConfig::default(),
    };
    let text = std::fs::read_to_string(&args.replay)
        .with_context(|| format!("reading {}", args.replay.display()))?;
    let replay: Replay = serde_json::from_str(&text).context("parsing replay")?;
    log::info!(
        "replaying {} frames against {} obstacles",
        replay.frames.len(),
        replay.obstacles.len()
    );

    let world = BoxWorld::new(replay.obstacles);
    let mut stack = config.into_blend_stack();
    stack.set_view_target(replay.view_target);
    stack.set_player_character(replay.player);

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for (index, frame) in replay.frames.iter().enumerate() {
        if let Some(alternate) = &frame.configure_alternate {
            stack.configure_alternate_camera(alternate.mode, alternate.view_target, alternate.transition_time);
        }
        if let Some(use_alternate) = frame.use_alternate {
            stack.set_using_alternate_camera(use_alternate);
        }
        if frame.view_target.is_some() {
            stack.set_view_target(frame.view_target);
        }
        if let Some(input) = frame.control_input {
            stack.add_control_input(input);
        }

        let pov = stack.update_view_target(&frame.targets, &world, frame.dt);
        stack.cleanup_outdated_instances(&frame.targets);

        let record = FrameOutput {
            frame: index,
            mode: stack.current_mode(),
            stack_depth: stack.stack_len(),
            player_hidden: stack.is_player_hidden(),
            pov: &pov,
        };
        serde_json::to_writer(&mut out, &record)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
