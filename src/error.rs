/*  Copyright 2019-2026 the Conwayste Developers.
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

custom_error! {pub EngineError
    InvalidConfig{reason: String} = "EngineError->InvalidConfig->{reason}",
    InvalidData{reason: String}   = "EngineError->InvalidData->{reason}",
    ShuttingDown{reason: String}  = "EngineError->ShuttingDown->{reason}",
    Io{reason: String}            = "EngineError->Io->{reason}"
}

pub type EngineResult<T> = ::std::result::Result<T, EngineError>;

impl EngineError {
    fn parts(&self) -> (u8, &str) {
        use EngineError::*;
        match *self {
            InvalidConfig { ref reason } => (0, reason),
            InvalidData { ref reason } => (1, reason),
            ShuttingDown { ref reason } => (2, reason),
            Io { ref reason } => (3, reason),
        }
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &EngineError) -> bool {
        self.parts() == other.parts()
    }
}

impl From<::std::io::Error> for EngineError {
    fn from(e: ::std::io::Error) -> Self {
        EngineError::Io { reason: e.to_string() }
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(e: toml::de::Error) -> Self {
        EngineError::InvalidConfig {
            reason: format!("could not parse settings: {}", e),
        }
    }
}
