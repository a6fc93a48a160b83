// Motivational quotes shown when an alarm is solved

use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;

const DEFAULT_QUOTES: [&str; 5] = [
    "Believe you can and you're halfway there. - Theodore Roosevelt",
    "The secret of getting ahead is getting started. - Mark Twain",
    "Don't watch the clock; do what it does. Keep going. - Sam Levenson",
    "Push yourself, because no one else is going to do it for you.",
    "Great things never come from comfort zones.",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotePool {
    quotes: Vec<String>,
}

impl QuotePool {
    /// Load one quote per non-blank line.
    ///
    /// A missing, unreadable or empty file yields the built-in set.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => {
                let pool = Self::from_lines(contents.lines());
                log::info!("[Quotes] Loaded {} quote(s) from {:?}", pool.len(), path);
                pool
            }
            Err(e) => {
                log::debug!("[Quotes] {:?} not readable ({}), using defaults", path, e);
                Self::default()
            }
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let quotes: Vec<String> = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if quotes.is_empty() {
            Self::default()
        } else {
            Self { quotes }
        }
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn quotes(&self) -> &[String] {
        &self.quotes
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        self.quotes
            .choose(rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_QUOTES[0])
    }
}

impl Default for QuotePool {
    fn default() -> Self {
        Self {
            quotes: DEFAULT_QUOTES.iter().map(|q| q.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_skips_blank_lines() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "First quote\n\n   \n  Second quote  ").unwrap();

        let pool = QuotePool::load(file.path());
        assert_eq!(pool.quotes(), &["First quote".to_string(), "Second quote".to_string()]);
    }

    #[test]
    fn test_missing_or_empty_file_uses_defaults() {
        let missing = QuotePool::load("/nonexistent/quotes.txt");
        assert_eq!(missing.len(), DEFAULT_QUOTES.len());

        let empty = NamedTempFile::new().unwrap();
        assert_eq!(QuotePool::load(empty.path()), QuotePool::default());
    }

    #[test]
    fn test_pick_returns_pool_member() {
        let pool = QuotePool::from_lines(["a", "b", "c"]);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let quote = pool.pick(&mut rng);
            assert!(["a", "b", "c"].contains(&quote));
        }
    }
}
