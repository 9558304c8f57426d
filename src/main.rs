// ============================================================================
// main.rs — GpuFlock
// Entry point. Parses the command line, loads the config and starts either
// the windowed event loop or a headless run.
// ============================================================================

mod app;
mod backend;
mod camera;
mod config;
mod dispatch;
mod driver;
mod error;
mod headless;
mod hud;
mod input;
mod kernel;
mod mesh;
mod obstacles;
mod pipeline;
mod renderer;
mod scene;
mod time;
mod world;

#[cfg(test)]
mod testing;

use app::App;
use config::FlockConfig;
use error::FlockError;
use headless::{run_headless, HeadlessConfig};
use winit::event_loop::{ControlFlow, EventLoop};

const USAGE: &str = "usage: gpu-flock [--config <path>] [--headless <frames>] [--paused] [--seed <n>] [--boids <n>]";

#[derive(Debug, Default, PartialEq)]
struct CliOptions {
    config_path: Option<String>,
    headless_frames: Option<u32>,
    paused: bool,
    seed: Option<u64>,
    boids: Option<u32>,
    help: bool,
}

impl CliOptions {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, FlockError> {
        let mut options = CliOptions::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => options.config_path = Some(value(&mut args, &arg)?),
                "--headless" => options.headless_frames = Some(number(&mut args, &arg)?),
                "--paused" => options.paused = true,
                "--seed" => options.seed = Some(number(&mut args, &arg)?),
                "--boids" => options.boids = Some(number(&mut args, &arg)?),
                "-h" | "--help" => options.help = true,
                other => {
                    return Err(FlockError::Usage(format!("unknown argument '{}'\n{}", other, USAGE)))
                }
            }
        }
        Ok(options)
    }

    /// Command-line values override whatever the config file set.
    fn apply(&self, config: &mut FlockConfig) {
        if self.paused {
            config.paused = true;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(boids) = self.boids {
            config.boid_count = boids;
        }
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, FlockError> {
    args.next()
        .ok_or_else(|| FlockError::Usage(format!("{} needs a value", flag)))
}

fn number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<T, FlockError> {
    let raw = value(args, flag)?;
    raw.parse()
        .map_err(|_| FlockError::Usage(format!("{} expects a number, got '{}'", flag, raw)))
}

fn run() -> Result<(), FlockError> {
    let options = CliOptions::parse(std::env::args().skip(1))?;
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = match &options.config_path {
        Some(path) => FlockConfig::load(path)?,
        None => FlockConfig::default(),
    };
    options.apply(&mut config);

    if let Some(frames) = options.headless_frames {
        return run_headless(
            &config,
            &HeadlessConfig {
                frames,
                ..Default::default()
            },
        );
    }

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(err) = run() {
        log::error!("{}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
