//! Matching exercise: pair numbered items with shuffled lettered options
//!
//! The answer key is canonical `1a,2c,3b`; candidates are compared after
//! lowercasing and trimming around each comma.

use rand::seq::SliceRandom;
use rand::Rng;

use super::{ExpectedAnswer, Puzzle, PuzzleKind};
use crate::escalation::Difficulty;

const PAIRS: [(&str, &str); 7] = [
    ("Capital of France", "Paris"),
    ("Largest planet", "Jupiter"),
    ("Author of Hamlet", "Shakespeare"),
    ("Chemical symbol for Gold", "Au"),
    ("Fastest land animal", "Cheetah"),
    ("Square root of 81", "Nine"),
    ("Frozen water", "Ice"),
];

/// Pairs shown at a difficulty: two more than the level, capped by the bank.
pub fn pair_count(difficulty: Difficulty) -> usize {
    (usize::from(difficulty.level()) + 2).min(PAIRS.len())
}

pub fn generate<R: Rng + ?Sized>(difficulty: Difficulty, rng: &mut R) -> Puzzle {
    let mut chosen: Vec<(&str, &str)> = PAIRS
        .choose_multiple(rng, pair_count(difficulty))
        .copied()
        .collect();
    chosen.shuffle(rng);

    let mut options: Vec<&str> = chosen.iter().map(|(_, option)| *option).collect();
    options.shuffle(rng);

    let mut prompt = String::from("Match the items:\n");
    for (index, (item, _)) in chosen.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", index + 1, item));
    }
    prompt.push_str("\nOptions:\n");
    for (index, option) in options.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", letter(index), option));
    }
    let example: Vec<String> = (0..chosen.len().min(3))
        .map(|index| format!("{}{}", index + 1, letter(index)))
        .collect();
    prompt.push_str(&format!("\nFormat: {}", example.join(",")));

    let key: Vec<String> = chosen
        .iter()
        .enumerate()
        .filter_map(|(index, (_, answer))| {
            options
                .iter()
                .position(|option| option == answer)
                .map(|slot| format!("{}{}", index + 1, letter(slot).to_ascii_lowercase()))
        })
        .collect();

    Puzzle::new(
        PuzzleKind::Matching,
        prompt,
        ExpectedAnswer::Text(key.join(",")),
    )
}

fn letter(index: usize) -> char {
    (b'A' + (index % 26) as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn key_of(puzzle: &Puzzle) -> String {
        match puzzle.expected() {
            ExpectedAnswer::Text(key) => key.clone(),
            ExpectedAnswer::Numeric { .. } => panic!("matching puzzle must be text"),
        }
    }

    #[test]
    fn test_pair_count_grows_and_caps() {
        assert_eq!(pair_count(Difficulty::EASIEST), 3);
        assert_eq!(pair_count(Difficulty::new(4).unwrap()), 6);
        assert_eq!(pair_count(Difficulty::HARDEST), 7);
    }

    #[test]
    fn test_key_points_each_item_at_its_option() {
        let mut rng = StdRng::seed_from_u64(11);
        let puzzle = generate(Difficulty::new(2).unwrap(), &mut rng);
        let prompt = puzzle.prompt();
        let key = key_of(&puzzle);
        let entries: Vec<&str> = key.split(',').collect();
        assert_eq!(entries.len(), 4);

        for (index, entry) in entries.iter().enumerate() {
            let (number, slot) = entry.split_at(entry.len() - 1);
            assert_eq!(number, (index + 1).to_string());

            let item_line = prompt
                .lines()
                .find(|line| line.starts_with(&format!("{}. ", number)))
                .unwrap();
            let option_line = prompt
                .lines()
                .find(|line| line.starts_with(&format!("{}. ", slot.to_uppercase())))
                .unwrap();
            let item = &item_line[number.len() + 2..];
            let option = &option_line[3..];
            assert!(
                PAIRS.iter().any(|&(i, o)| i == item && o == option),
                "{} -> {}",
                item,
                option
            );
        }
    }

    #[test]
    fn test_matching_answer_is_normalized() {
        let mut rng = StdRng::seed_from_u64(5);
        let puzzle = generate(Difficulty::EASIEST, &mut rng);
        let key = key_of(&puzzle);

        assert!(puzzle.check(&key).unwrap());
        assert!(puzzle.check(&key.to_uppercase()).unwrap());
        let spaced = key.replace(',', " , ");
        assert!(puzzle.check(&format!("  {}  ", spaced)).unwrap());
        assert!(!puzzle.check("1a").unwrap());
    }
}
