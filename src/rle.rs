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

//! Reader for the [RLE pattern format](http://www.conwaylife.com/wiki/Run_Length_Encoded).
//!
//! ```
//! use std::str::FromStr;
//! use torus_life::rle::PatternFile;
//! use torus_life::source::PixelSource;
//!
//! let glider = PatternFile::from_str("x = 3, y = 3, rule = B3/S23\nbob$2bo$3o!").unwrap();
//! assert_eq!((glider.width(), glider.height()), (3, 3));
//! assert!(glider.is_opaque(1, 0));
//! ```

const MAX_NUMBER: usize = 50000;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};
use crate::grids::BitGrid;
use crate::source::PixelSource;

/// Accepted spellings of the one rule this engine runs.
const LIFE_RULES: [&str; 3] = ["B3/S23", "S23/B3", "23/3"];

/// This contains just the RLE pattern string. For example: "4bobo$7b3o!"
#[derive(Debug, PartialEq, Clone)]
pub struct Pattern(pub String);

/// Represents the contents of a RLE file, with the pattern already decoded.
#[derive(Debug, PartialEq, Clone)]
pub struct PatternFile {
    pub comment_lines: Vec<String>,
    pub header_line:   HeaderLine,
    pub pattern:       Pattern,
    cells:             BitGrid,
}

#[derive(Debug, PartialEq, Clone)]
pub struct HeaderLine {
    pub x:    usize, // width (cols)
    pub y:    usize, // height (rows)
    pub rule: Option<String>,
}

impl PatternFile {
    /// Reads and parses an RLE file.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<PatternFile> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| EngineError::Io {
            reason: format!("{}: {}", path.as_ref().display(), e),
        })?;
        PatternFile::from_str(&contents)
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.header_line.x
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.header_line.y
    }

    /// The decoded cells, sized per the header.
    pub fn cells(&self) -> &BitGrid {
        &self.cells
    }
}

impl PixelSource for PatternFile {
    fn width(&self) -> usize {
        PatternFile::width(self)
    }

    fn height(&self) -> usize {
        PatternFile::height(self)
    }

    fn is_opaque(&self, x: usize, y: usize) -> bool {
        self.cells.get(x, y)
    }
}

impl FromStr for PatternFile {
    type Err = EngineError;

    /// Generate a PatternFile from the contents of an RLE file.
    fn from_str(file_contents: &str) -> Result<Self, Self::Err> {
        use EngineError::*;
        let mut comment_lines: Vec<String> = vec![];
        let mut opt_header_line: Option<HeaderLine> = None;
        let mut pattern_lines: Vec<&str> = vec![];
        for line in file_contents.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('#') {
                if opt_header_line.is_some() {
                    return Err(InvalidData {
                        reason: "Found a comment line after a non-comment line".to_owned(),
                    });
                }
                comment_lines.push(line.to_owned());
                continue;
            }
            if opt_header_line.is_none() {
                // this line should be a header line
                opt_header_line = Some(HeaderLine::from_str(line)?);
                continue;
            }
            match line.find('!') {
                Some(idx) => {
                    pattern_lines.push(&line[0..=idx]);
                    break; // we don't care about anything after the '!'
                }
                None => pattern_lines.push(line),
            };
        }
        let header_line = opt_header_line.ok_or_else(|| InvalidData {
            reason: "missing header line".to_owned(),
        })?;
        if pattern_lines.is_empty() {
            return Err(InvalidData {
                reason: "missing pattern lines".to_owned(),
            });
        }
        let pattern = Pattern(pattern_lines.concat());
        let cells = pattern.to_new_bit_grid(header_line.x, header_line.y)?;
        Ok(PatternFile {
            comment_lines,
            header_line,
            pattern,
            cells,
        })
    }
}

impl FromStr for HeaderLine {
    type Err = EngineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        use EngineError::*;
        let mut map = BTreeMap::new();
        for term in line.split(',') {
            let parts = term.split('=').map(|part| part.trim()).collect::<Vec<&str>>();
            if parts.len() != 2 {
                return Err(InvalidData {
                    reason: format!("unexpected term in header line: {:?}", term),
                });
            }
            map.insert(parts[0], parts[1]);
        }
        let (x, y) = match (map.get("x"), map.get("y")) {
            (Some(x), Some(y)) => (*x, *y),
            _ => {
                return Err(InvalidData {
                    reason: format!("header line missing `x` and/or `y`: {:?}", line),
                })
            }
        };
        let x = usize::from_str(x).map_err(|e| InvalidData {
            reason: format!("Error while parsing x: {}", e),
        })?;
        let y = usize::from_str(y).map_err(|e| InvalidData {
            reason: format!("Error while parsing y: {}", e),
        })?;
        if x == 0 || y == 0 {
            return Err(InvalidData {
                reason: format!("pattern dimensions must be positive, got {}x{}", x, y),
            });
        }
        let rule = map.get("rule").map(|s: &&str| (*s).to_owned());
        if let Some(ref rule) = rule {
            if !LIFE_RULES.iter().any(|r| r.eq_ignore_ascii_case(rule)) {
                return Err(InvalidData {
                    reason: format!("unsupported rule {:?}; only B3/S23 is supported", rule),
                });
            }
        }
        Ok(HeaderLine { x, y, rule })
    }
}

fn digits_to_number(digits: &[char]) -> EngineResult<usize> {
    let mut result = 0;
    for ch in digits {
        let d = ch.to_digit(10).unwrap_or(0);
        result = result * 10 + d as usize;
        if result > MAX_NUMBER {
            return Err(EngineError::InvalidData {
                reason: format!("Could not parse digits {:?} because larger than {}", digits, MAX_NUMBER),
            });
        }
    }
    Ok(result)
}

impl Pattern {
    /// Creates a BitGrid of exactly `width`x`height` cells holding this pattern.
    ///
    /// # Errors
    ///
    /// Parse errors, or a live cell that falls outside `width`x`height`.
    pub fn to_new_bit_grid(&self, width: usize, height: usize) -> EngineResult<BitGrid> {
        let grid = BitGrid::new(width, height);
        let mut outside = None;
        self.each_live(|col, row| {
            if col < width && row < height {
                grid.set(col, row, true);
            } else if outside.is_none() {
                outside = Some((col, row));
            }
        })?;
        if let Some((col, row)) = outside {
            return Err(EngineError::InvalidData {
                reason: format!("live cell ({}, {}) lies outside the {}x{} header size", col, row, width, height),
            });
        }
        Ok(grid)
    }

    /// Calculates the width and height actually spanned by live cells, or `(0, 0)` if none.
    pub fn calc_size(&self) -> EngineResult<(usize, usize)> {
        let mut size = (0, 0);
        self.each_live(|col, row| {
            size.0 = size.0.max(col + 1);
            size.1 = size.1.max(row + 1);
        })?;
        Ok(size)
    }

    /// Calls `callback(col, row)` for each live (`o`) cell. Dead cells are `b`; any other letter
    /// is treated as a live cell of an unnamed state, as many RLE writers do.
    pub fn each_live<F: FnMut(usize, usize)>(&self, mut callback: F) -> EngineResult<()> {
        use EngineError::*;
        let mut col: usize = 0;
        let mut row: usize = 0;
        let mut last = None;
        let mut complete = false;
        let mut digits: Vec<char> = vec![];
        for (i, ch) in self.0.char_indices() {
            last = Some(i);
            if !digits.is_empty() && ch == '!' {
                return Err(InvalidData {
                    reason: format!("Cannot have {} after number at {}", ch, i),
                });
            }
            match ch {
                '!' => {
                    // end of input
                    complete = true;
                    break;
                }
                '$' => {
                    // new line
                    let number = if digits.is_empty() { 1 } else { digits_to_number(&digits)? };
                    digits.clear();
                    col = 0;
                    row += number;
                }
                '\r' | '\n' | ' ' | '\t' => {}
                x if x.is_ascii_digit() => {
                    digits.push(ch);
                }
                x if x.is_ascii_alphabetic() => {
                    let number = if digits.is_empty() { 1 } else { digits_to_number(&digits)? };
                    digits.clear();
                    if x != 'b' {
                        for offset in 0..number {
                            callback(col + offset, row);
                        }
                    }
                    col += number;
                }
                _ => {
                    return Err(InvalidData {
                        reason: format!("Unrecognized character {} at {}", ch, i),
                    });
                }
            }
        }
        if !complete {
            return Err(InvalidData {
                reason: format!("Premature termination at {:?}", last),
            });
        }
        Ok(())
    }
}
