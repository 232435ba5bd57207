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
#[macro_use]
extern crate custom_error;

pub mod config;
pub mod engine;
pub mod error;
pub mod grids;
pub mod queue;
pub mod region;
pub mod rle;
pub mod source;
pub mod sync;
pub mod worker;

pub use engine::{BigBang, Engine, Redraw};
pub use error::{EngineError, EngineResult};
pub use grids::BitGrid;
pub use region::{Region, Tile};
pub use source::PixelSource;
pub use sync::ShutdownHandle;
