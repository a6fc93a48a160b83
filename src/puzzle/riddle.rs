use rand::seq::SliceRandom;
use rand::Rng;

use super::{ExpectedAnswer, Puzzle, PuzzleKind};

const RIDDLES: [(&str, &str); 5] = [
    (
        "I speak without a mouth and hear without ears. I have no body, but I come alive with wind. What am I?",
        "echo",
    ),
    ("The more of this there is, the less you see. What is it?", "darkness"),
    ("What has keys but can't open locks?", "piano"),
    ("What has to be broken before you can use it?", "egg"),
    ("I'm tall when I'm young, and I'm short when I'm old. What am I?", "candle"),
];

/// Riddles do not scale with difficulty; any riddle may be drawn.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Puzzle {
    let (question, answer) = RIDDLES.choose(rng).copied().unwrap_or(RIDDLES[0]);
    Puzzle::new(
        PuzzleKind::Riddle,
        format!("Riddle: {}", question),
        ExpectedAnswer::Text(answer.to_string()),
    )
}
