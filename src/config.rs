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

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::BigBang;
use crate::error::{EngineError, EngineResult};
use crate::worker::IdlePolicy;

pub const DEFAULT_WIDTH: usize = 1280;
pub const DEFAULT_HEIGHT: usize = 800;
pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_TILE_SIZE: usize = 32;
pub const DEFAULT_UPDATE_RATE: usize = 1;
pub const DEFAULT_IDLE_WAIT_MS: u64 = 1;

/// Settings contains everything configurable about a run. All of it is fixed at startup. Any
/// key missing from the TOML file keeps its default.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub run:    RunSettings,
}

/// Decoded from the [engine] section.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    pub width:        usize,
    pub height:       usize,
    pub workers:      usize,
    pub tile_size:    usize,
    /// Simulate once every this many frames.
    pub update_rate:  usize,
    /// 0 means idle workers spin.
    pub idle_wait_ms: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            width:        DEFAULT_WIDTH,
            height:       DEFAULT_HEIGHT,
            workers:      DEFAULT_WORKERS,
            tile_size:    DEFAULT_TILE_SIZE,
            update_rate:  DEFAULT_UPDATE_RATE,
            idle_wait_ms: DEFAULT_IDLE_WAIT_MS,
        }
    }
}

impl EngineSettings {
    /// A builder preloaded with these settings. Nothing is validated until `birth`.
    pub fn to_big_bang(&self) -> BigBang {
        BigBang::new()
            .width(self.width)
            .height(self.height)
            .workers(self.workers)
            .tile_size(self.tile_size)
            .update_rate(self.update_rate)
            .idle_policy(IdlePolicy::from_millis(self.idle_wait_ms))
    }
}

/// Decoded from the [run] section; used by the headless driver.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RunSettings {
    pub frames:  usize,
    /// RLE file to seed the board with, centered. Random soup if absent.
    pub pattern: Option<PathBuf>,
    pub density: f64,
    pub seed:    u64,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            frames:  1000,
            pattern: None,
            density: 0.25,
            seed:    0,
        }
    }
}

impl Settings {
    /// Creates the default configuration with default settings.
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_toml_str(toml_str: &str) -> EngineResult<Settings> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Reads settings from `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Settings> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| EngineError::Io {
            reason: format!("{}: {}", path.display(), e),
        })?;
        let settings = Settings::from_toml_str(&contents)?;
        info!("loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> EngineResult<String> {
        toml::to_string(self).map_err(|e| EngineError::InvalidConfig {
            reason: format!("could not serialize settings: {}", e),
        })
    }
}
