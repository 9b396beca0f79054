//! Taxi grid layouts parsed from text maps
//!
//! A map is framed by `+---+` lines. Each row line starts and ends with
//! `|`; cells sit at odd columns and hold a stop letter or a blank, and
//! the characters between cells are `|` for a wall or `:` for a passage.
//!
//! ```text
//! +---------+
//! |R: | : :Y|
//! | : | : : |
//! | : : : : |
//! | | : | :B|
//! |G| : | : |
//! +---------+
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use oomdp_core::{OomdpError, Result, Value};

/// The standard 5×5 Taxi map
pub const STANDARD_LAYOUT: &str = "\
+---------+
|R: | : :Y|
| : | : : |
| : : : : |
| | : | :B|
|G| : | : |
+---------+";

/// A 3×3 map with four stops
pub const SMALL_LAYOUT: &str = "\
+-----+
|R| :G|
| : : |
|Y:B: |
+-----+";

/// Side of a cell; also the encoding of the wall `side` attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Towards row 0
    North,
    /// Towards the last row
    South,
    /// Towards the last column
    East,
    /// Towards column 0
    West,
}

impl Side {
    /// All sides in attribute order
    pub const ALL: [Side; 4] = [Side::North, Side::South, Side::East, Side::West];

    /// Attribute encoding
    #[must_use]
    pub fn code(self) -> Value {
        match self {
            Side::North => 0,
            Side::South => 1,
            Side::East => 2,
            Side::West => 3,
        }
    }

    /// `(dcol, drow)` of a step through this side
    #[must_use]
    pub fn offset(self) -> (Value, Value) {
        match self {
            Side::North => (0, -1),
            Side::South => (0, 1),
            Side::East => (1, 0),
            Side::West => (-1, 0),
        }
    }
}

/// A named pickup/dropoff location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    /// Stop letter
    pub name: char,
    /// Column
    pub col: Value,
    /// Row
    pub row: Value,
}

/// A wall segment on one side of one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WallSegment {
    /// Column of the blocked cell
    pub col: Value,
    /// Row of the blocked cell
    pub row: Value,
    /// Blocked side
    pub side: Side,
}

/// Grid size, stops and walls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxiLayout {
    width: Value,
    height: Value,
    stops: Vec<Stop>,
    walls: BTreeSet<WallSegment>,
}

impl TaxiLayout {
    /// The standard 5×5 layout
    pub fn standard() -> Result<Self> {
        Self::parse(STANDARD_LAYOUT)
    }

    /// Parse a text map
    pub fn parse(source: &str) -> Result<Self> {
        let lines: Vec<&str> = source
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();
        if lines.len() < 3 {
            return Err(layout_error("a map needs a frame and at least one row"));
        }
        let frame = lines[0];
        if !frame.starts_with('+') || lines[lines.len() - 1] != frame {
            return Err(layout_error("map must be framed by identical `+---+` lines"));
        }
        let line_width = frame.chars().count();
        if line_width < 3 || line_width % 2 == 0 {
            return Err(layout_error("frame width must be odd and at least 3"));
        }

        let width = Value::try_from((line_width - 1) / 2)
            .map_err(|_| layout_error("map too wide"))?;
        let rows = &lines[1..lines.len() - 1];
        let height = Value::try_from(rows.len()).map_err(|_| layout_error("map too tall"))?;

        let mut stops = Vec::new();
        let mut walls = BTreeSet::new();
        for (r, line) in rows.iter().enumerate() {
            let row = Value::try_from(r).map_err(|_| layout_error("map too tall"))?;
            let chars: Vec<char> = line.chars().collect();
            if chars.len() != line_width || chars[0] != '|' || chars[line_width - 1] != '|' {
                return Err(layout_error(&format!("row {r} does not match the frame")));
            }
            for c in 0..width {
                let cell = chars[cell_index(c)];
                match cell {
                    ' ' | '.' => {}
                    letter if letter.is_ascii_uppercase() => {
                        if stops.iter().any(|s: &Stop| s.name == letter) {
                            return Err(layout_error(&format!("stop `{letter}` appears twice")));
                        }
                        stops.push(Stop { name: letter, col: c, row });
                    }
                    other => {
                        return Err(layout_error(&format!("unexpected cell `{other}` in row {r}")))
                    }
                }
                if c + 1 < width {
                    match chars[cell_index(c) + 1] {
                        ':' | ' ' => {}
                        '|' => {
                            walls.insert(WallSegment { col: c, row, side: Side::East });
                            walls.insert(WallSegment { col: c + 1, row, side: Side::West });
                        }
                        other => {
                            return Err(layout_error(&format!(
                                "unexpected separator `{other}` in row {r}"
                            )))
                        }
                    }
                }
            }
        }
        if stops.len() < 2 {
            return Err(layout_error("a map needs at least two stops"));
        }

        for c in 0..width {
            walls.insert(WallSegment { col: c, row: 0, side: Side::North });
            walls.insert(WallSegment { col: c, row: height - 1, side: Side::South });
        }
        for r in 0..height {
            walls.insert(WallSegment { col: 0, row: r, side: Side::West });
            walls.insert(WallSegment { col: width - 1, row: r, side: Side::East });
        }

        Ok(Self {
            width,
            height,
            stops,
            walls,
        })
    }

    /// Number of columns
    #[must_use]
    pub fn width(&self) -> Value {
        self.width
    }

    /// Number of rows
    #[must_use]
    pub fn height(&self) -> Value {
        self.height
    }

    /// Stops in row-major order of appearance
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Stop by letter
    #[must_use]
    pub fn stop(&self, name: char) -> Option<Stop> {
        self.stops.iter().copied().find(|s| s.name == name)
    }

    /// Every wall segment, boundary included, in sorted order
    pub fn walls(&self) -> impl Iterator<Item = &WallSegment> + '_ {
        self.walls.iter()
    }

    /// Whether a side of a cell is walled
    #[must_use]
    pub fn blocked(&self, col: Value, row: Value, side: Side) -> bool {
        self.walls.contains(&WallSegment { col, row, side })
    }

    /// Cell reached by moving through `side`, or the same cell if walled
    #[must_use]
    pub fn move_from(&self, col: Value, row: Value, side: Side) -> (Value, Value) {
        if self.blocked(col, row, side) {
            (col, row)
        } else {
            let (dc, dr) = side.offset();
            (col + dc, row + dr)
        }
    }
}

fn cell_index(col: Value) -> usize {
    usize::try_from(col).map_or(0, |c| 2 * c + 1)
}

fn layout_error(message: &str) -> OomdpError {
    OomdpError::Config(format!("taxi layout: {message}"))
}
