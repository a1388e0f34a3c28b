// Scramble generation with the no-adjacent-axis constraint.
// Pure function of the entropy source handed in; the session owns the RNG.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::PuzzleKind;

/// One of the six canonical cube faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Face {
    U,
    D,
    L,
    R,
    F,
    B,
}

impl Face {
    pub fn axis(&self) -> Axis {
        match self {
            Face::U | Face::D => Axis::UD,
            Face::L | Face::R => Axis::LR,
            Face::F | Face::B => Axis::FB,
        }
    }

    fn letter(&self) -> char {
        match self {
            Face::U => 'U',
            Face::D => 'D',
            Face::L => 'L',
            Face::R => 'R',
            Face::F => 'F',
            Face::B => 'B',
        }
    }

    fn from_letter(c: char) -> Option<Face> {
        match c {
            'U' => Some(Face::U),
            'D' => Some(Face::D),
            'L' => Some(Face::L),
            'R' => Some(Face::R),
            'F' => Some(Face::F),
            'B' => Some(Face::B),
            _ => None,
        }
    }
}

/// Opposing face pair. Consecutive scramble moves never share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    UD,
    LR,
    FB,
}

/// Rotation applied to a face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    Clockwise,
    CounterClockwise,
    Double,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [
        Modifier::Clockwise,
        Modifier::CounterClockwise,
        Modifier::Double,
    ];

    fn suffix(&self) -> &'static str {
        match self {
            Modifier::Clockwise => "",
            Modifier::CounterClockwise => "'",
            Modifier::Double => "2",
        }
    }
}

/// A single turn. `wide` turns the outer two layers (4x4 `Rw`, `Uw`, `Fw`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub face: Face,
    pub modifier: Modifier,
    pub wide: bool,
}

impl Move {
    pub fn new(face: Face, modifier: Modifier) -> Self {
        Move {
            face,
            modifier,
            wide: false,
        }
    }

    pub fn wide(face: Face, modifier: Modifier) -> Self {
        Move {
            face,
            modifier,
            wide: true,
        }
    }

    pub fn axis(&self) -> Axis {
        self.face.axis()
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.face.letter())?;
        if self.wide {
            f.write_str("w")?;
        }
        f.write_str(self.modifier.suffix())
    }
}

impl FromStr for Move {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidNotation(s.to_string());
        let mut chars = s.chars();
        let face = chars.next().and_then(Face::from_letter).ok_or_else(invalid)?;
        let mut rest = chars.as_str();
        let wide = rest.starts_with('w');
        if wide {
            rest = &rest[1..];
        }
        let modifier = match rest {
            "" => Modifier::Clockwise,
            "'" => Modifier::CounterClockwise,
            "2" => Modifier::Double,
            _ => return Err(invalid()),
        };
        Ok(Move {
            face,
            modifier,
            wide,
        })
    }
}

/// Ordered, non-empty move sequence with no two adjacent moves on the same axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Scramble {
    moves: Vec<Move>,
}

impl Scramble {
    /// Build a scramble from moves, checking the sequence invariants.
    pub fn from_moves(moves: Vec<Move>) -> Result<Self> {
        if moves.is_empty() {
            return Err(CoreError::InvalidScrambleLength(0));
        }
        if let Some(pair) = moves.windows(2).find(|w| w[0].axis() == w[1].axis()) {
            return Err(CoreError::InvalidNotation(format!(
                "{} {} turn the same axis",
                pair[0], pair[1]
            )));
        }
        Ok(Scramble { moves })
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mv) in self.moves.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{mv}")?;
        }
        Ok(())
    }
}

impl FromStr for Scramble {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let moves = s
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Move>>>()?;
        Scramble::from_moves(moves)
    }
}

impl TryFrom<String> for Scramble {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Scramble> for String {
    fn from(scramble: Scramble) -> Self {
        scramble.to_string()
    }
}

const CUBE2_LAYERS: &[(Face, bool)] = &[(Face::R, false), (Face::U, false), (Face::F, false)];

const CUBE3_LAYERS: &[(Face, bool)] = &[
    (Face::R, false),
    (Face::L, false),
    (Face::U, false),
    (Face::D, false),
    (Face::F, false),
    (Face::B, false),
];

const CUBE4_LAYERS: &[(Face, bool)] = &[
    (Face::R, false),
    (Face::L, false),
    (Face::U, false),
    (Face::D, false),
    (Face::F, false),
    (Face::B, false),
    (Face::R, true),
    (Face::U, true),
    (Face::F, true),
];

/// Random-move scramble generator for one puzzle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrambleGenerator {
    puzzle: PuzzleKind,
}

impl ScrambleGenerator {
    pub fn new(puzzle: PuzzleKind) -> Self {
        ScrambleGenerator { puzzle }
    }

    pub fn puzzle(&self) -> PuzzleKind {
        self.puzzle
    }

    fn layers(&self) -> &'static [(Face, bool)] {
        match self.puzzle {
            PuzzleKind::Cube2 => CUBE2_LAYERS,
            PuzzleKind::Cube3 => CUBE3_LAYERS,
            PuzzleKind::Cube4 => CUBE4_LAYERS,
        }
    }

    /// Generate a scramble of exactly `length` moves.
    ///
    /// Each step draws a modifier once, then draws faces until one lands on a
    /// different axis than the previous move. Every layer set spans at least
    /// two axes, so the redraw loop always terminates.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> Result<Scramble> {
        if length == 0 {
            return Err(CoreError::InvalidScrambleLength(length));
        }

        let layers = self.layers();
        let mut moves: Vec<Move> = Vec::with_capacity(length);

        while moves.len() < length {
            let modifier = Modifier::ALL[rng.gen_range(0..Modifier::ALL.len())];
            let previous_axis = moves.last().map(Move::axis);

            let (face, wide) = loop {
                let candidate = layers[rng.gen_range(0..layers.len())];
                if Some(candidate.0.axis()) != previous_axis {
                    break candidate;
                }
            };

            moves.push(Move {
                face,
                modifier,
                wide,
            });
        }

        log::trace!("generated {} scramble of {} moves", self.puzzle.label(), length);
        Ok(Scramble { moves })
    }

    /// Generate a scramble at the puzzle's default length.
    pub fn generate_default<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Scramble> {
        self.generate(rng, self.puzzle.default_scramble_length())
    }
}

impl Default for ScrambleGenerator {
    fn default() -> Self {
        Self::new(PuzzleKind::default())
    }
}
