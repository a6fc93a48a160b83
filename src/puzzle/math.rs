//! Arithmetic puzzles evaluated strictly left to right
//!
//! There is no operator precedence: each operator applies immediately to the
//! running result, so `4 - 2 * 3` is `(4 - 2) * 3 = 6`. The rendered prompt
//! and the expected answer come from the same term list, which keeps them
//! consistent with each other.

use rand::Rng;

use super::{ExpectedAnswer, Puzzle, PuzzleKind};
use crate::escalation::Difficulty;

/// Acceptance band when the expression contains no division
pub const EXACT_EPSILON: f64 = 1e-9;

/// Acceptance band when the expression contains a division
pub const DIVISION_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    const WITHOUT_DIVISION: [Operator; 3] = [Operator::Add, Operator::Sub, Operator::Mul];
    const WITH_DIVISION: [Operator; 4] =
        [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    fn apply(self, acc: f64, operand: f64) -> f64 {
        match self {
            Operator::Add => acc + operand,
            Operator::Sub => acc - operand,
            Operator::Mul => acc * operand,
            Operator::Div => acc / operand,
        }
    }
}

/// Operand count, operand range and operator set for one difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Shape {
    terms: usize,
    min: i64,
    max: i64,
    division: bool,
}

fn shape_for(difficulty: Difficulty) -> Shape {
    match difficulty.level() {
        1 => Shape {
            terms: 2,
            min: 1,
            max: 10,
            division: false,
        },
        2 => Shape {
            terms: 2,
            min: 5,
            max: 20,
            division: false,
        },
        3 => Shape {
            terms: 3,
            min: 10,
            max: 50,
            division: false,
        },
        4 => Shape {
            terms: 3,
            min: 10,
            max: 100,
            division: true,
        },
        _ => Shape {
            terms: 4,
            min: 20,
            max: 200,
            division: true,
        },
    }
}

pub fn evaluate_left_to_right(first: i64, rest: &[(Operator, i64)]) -> f64 {
    rest.iter()
        .fold(first as f64, |acc, &(op, operand)| op.apply(acc, operand as f64))
}

pub fn render_expression(first: i64, rest: &[(Operator, i64)]) -> String {
    let mut expression = first.to_string();
    for (op, operand) in rest {
        expression.push(' ');
        expression.push(op.symbol());
        expression.push(' ');
        expression.push_str(&operand.to_string());
    }
    expression
}

/// Build a math puzzle from explicit terms.
///
/// Division operands must be non-zero; generated puzzles never contain zero
/// operands.
pub fn from_terms(first: i64, rest: &[(Operator, i64)]) -> Puzzle {
    let value = evaluate_left_to_right(first, rest);
    let has_division = rest.iter().any(|(op, _)| *op == Operator::Div);
    let tolerance = if has_division {
        DIVISION_TOLERANCE
    } else {
        EXACT_EPSILON
    };

    Puzzle::new(
        PuzzleKind::Math,
        format!("Compute: {}", render_expression(first, rest)),
        ExpectedAnswer::Numeric { value, tolerance },
    )
}

pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Puzzle {
    let shape = shape_for(difficulty);
    let operators: &[Operator] = if shape.division {
        &Operator::WITH_DIVISION
    } else {
        &Operator::WITHOUT_DIVISION
    };

    let first = rng.gen_range(shape.min..=shape.max);
    let rest: Vec<(Operator, i64)> = (1..shape.terms)
        .map(|_| {
            let op = operators[rng.gen_range(0..operators.len())];
            (op, rng.gen_range(shape.min..=shape.max))
        })
        .collect();

    from_terms(first, &rest)
}
