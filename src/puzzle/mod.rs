//! Puzzle generation and answer checking
//!
//! Every puzzle kind produces a prompt and checks a candidate answer, so the
//! ringing session treats them interchangeably. A puzzle is generated fresh
//! per attempt and never mutated.

pub mod matching;
pub mod math;
pub mod riddle;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::AlarmError;
use crate::escalation::Difficulty;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleKind {
    Math,
    Riddle,
    Matching,
}

impl PuzzleKind {
    pub fn generate<R: Rng + ?Sized>(self, difficulty: Difficulty, rng: &mut R) -> Puzzle {
        match self {
            PuzzleKind::Math => math::generate(difficulty, rng),
            PuzzleKind::Riddle => riddle::generate(rng),
            PuzzleKind::Matching => matching::generate(difficulty, rng),
        }
    }
}

/// What a correct answer looks like.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedAnswer {
    /// Accepted when `|candidate - value| < tolerance`
    Numeric { value: f64, tolerance: f64 },
    /// Compared after normalization, see [`normalize_text`]
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Puzzle {
    kind: PuzzleKind,
    prompt: String,
    expected: ExpectedAnswer,
}

impl Puzzle {
    pub(crate) fn new(kind: PuzzleKind, prompt: String, expected: ExpectedAnswer) -> Self {
        let expected = match expected {
            ExpectedAnswer::Text(text) => ExpectedAnswer::Text(normalize_text(&text)),
            numeric => numeric,
        };
        Self {
            kind,
            prompt,
            expected,
        }
    }

    pub fn kind(&self) -> PuzzleKind {
        self.kind
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn expected(&self) -> &ExpectedAnswer {
        &self.expected
    }

    /// Check a candidate answer.
    ///
    /// # Errors
    /// `AlarmError::Parse` when the candidate is not a number (numeric
    /// puzzles) or is blank (text puzzles). The caller re-prompts with the
    /// same puzzle.
    pub fn check(&self, candidate: &str) -> Result<bool, AlarmError> {
        let trimmed = candidate.trim();
        match &self.expected {
            ExpectedAnswer::Numeric { value, tolerance } => {
                let parsed: f64 = trimmed
                    .parse()
                    .map_err(|_| AlarmError::parse(trimmed, "expected a numeric answer"))?;
                if !parsed.is_finite() {
                    return Err(AlarmError::parse(trimmed, "expected a finite number"));
                }
                Ok((parsed - value).abs() < *tolerance)
            }
            ExpectedAnswer::Text(expected) => {
                if trimmed.is_empty() {
                    return Err(AlarmError::parse(trimmed, "expected a non-empty answer"));
                }
                Ok(normalize_text(trimmed) == *expected)
            }
        }
    }
}

/// Lowercase and trim each comma-separated part, then rejoin with commas.
pub fn normalize_text(text: &str) -> String {
    text.split(',')
        .map(|part| part.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

/// Picks a puzzle kind uniformly from the configured set.
#[derive(Debug, Clone)]
pub struct PuzzleGenerator {
    kinds: Vec<PuzzleKind>,
}

impl PuzzleGenerator {
    /// An empty kind list falls back to math puzzles.
    pub fn new(kinds: Vec<PuzzleKind>) -> Self {
        let kinds = if kinds.is_empty() {
            vec![PuzzleKind::Math]
        } else {
            kinds
        };
        Self { kinds }
    }

    pub fn kinds(&self) -> &[PuzzleKind] {
        &self.kinds
    }

    pub fn generate<R: Rng + ?Sized>(&self, difficulty: Difficulty, rng: &mut R) -> Puzzle {
        let kind = self
            .kinds
            .choose(rng)
            .copied()
            .unwrap_or(PuzzleKind::Math);
        kind.generate(difficulty, rng)
    }
}

impl Default for PuzzleGenerator {
    fn default() -> Self {
        Self::new(vec![PuzzleKind::Math])
    }
}
