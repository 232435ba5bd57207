/*  Copyright 2017-2026 the Conwayste Developers.
 *
 *  This file is part of torus-life.
 *
 *  torus-life is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  torus-life is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with torus-life.  If not, see <http://www.gnu.org/licenses/>. */

#[macro_use]
extern crate log;

use std::path::PathBuf;
use std::process::exit;
use std::time::{Duration, Instant};

use clap::{self, Parser};
use env_logger::Env;
use rand::rngs::StdRng;
use rand::SeedableRng;

use torus_life::config::Settings;
use torus_life::rle::PatternFile;
use torus_life::{Engine, EngineResult, Redraw};

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless parallel Life on a torus", long_about = None)]
struct Args {
    #[arg(short, long, help = "Path to a torus-life.toml file.")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "RLE pattern to center on the board instead of random soup.")]
    pattern: Option<PathBuf>,

    #[arg(short, long, help = "Number of frames to run.")]
    frames: Option<usize>,

    #[arg(short, long, help = "Number of worker threads.")]
    workers: Option<usize>,

    #[arg(long, help = "Board width in cells.")]
    width: Option<usize>,

    #[arg(long, help = "Board height in cells.")]
    height: Option<usize>,

    #[arg(long, help = "Dump the effective configuration and then exit.")]
    dump_config: bool,
}

impl Args {
    /// Command line flags win over the config file.
    fn apply(&self, settings: &mut Settings) {
        if let Some(ref pattern) = self.pattern {
            settings.run.pattern = Some(pattern.clone());
        }
        if let Some(frames) = self.frames {
            settings.run.frames = frames;
        }
        if let Some(workers) = self.workers {
            settings.engine.workers = workers;
        }
        if let Some(width) = self.width {
            settings.engine.width = width;
        }
        if let Some(height) = self.height {
            settings.engine.height = height;
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut settings = match args.config {
        Some(ref path) => Settings::load(path).unwrap_or_else(|e| {
            error!("{}", e);
            exit(1);
        }),
        None => Settings::new(),
    };
    args.apply(&mut settings);

    if args.dump_config {
        match settings.to_toml_string() {
            Ok(text) => print!("{}", text),
            Err(e) => {
                error!("{}", e);
                exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(&settings) {
        error!("{}", e);
        exit(1);
    }
}

fn run(settings: &Settings) -> EngineResult<()> {
    let mut engine = settings.engine.to_big_bang().birth()?;
    seed(&mut engine, settings)?;
    info!("starting population {}", engine.population());

    let start = Instant::now();
    let mut stepped_time = Duration::from_secs(0);
    let mut steps = 0u32;
    for _ in 0..settings.run.frames {
        if engine.advance_frame()?.is_none() {
            continue;
        }
        steps += 1;
        stepped_time += engine.last_step_time();
        if log_enabled!(log::Level::Debug) {
            match engine.redraw() {
                Redraw::Full(region) => debug!("gen {}: full redraw of {:?}", engine.generation(), region),
                Redraw::Tiles(tiles) => debug!("gen {}: {} dirty tiles", engine.generation(), tiles.count()),
            }
        }
    }

    let average = if steps > 0 { stepped_time / steps } else { Duration::from_secs(0) };
    println!(
        "generation {} population {} ({} steps in {:?}, {:?} per step)",
        engine.generation(),
        engine.population(),
        steps,
        start.elapsed(),
        average
    );
    Ok(())
}

fn seed(engine: &mut Engine, settings: &Settings) -> EngineResult<()> {
    match settings.run.pattern {
        Some(ref path) => {
            let pattern = PatternFile::load(path)?;
            info!("stamping {}x{} pattern from {}", pattern.width(), pattern.height(), path.display());
            engine.stamp_centered(&pattern);
        }
        None => {
            let mut rng = StdRng::seed_from_u64(settings.run.seed);
            engine.seed_random(settings.run.density, &mut rng)?;
        }
    }
    Ok(())
}
