//! Player names
//!
//! Validation for typed names and an offline generator for suggestions.

use std::cell::RefCell;
use std::rc::Rc;

use async_trait::async_trait;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use thiserror::Error;

use crate::consts::MAX_NAME_LEN;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is {len} characters, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("name generator unavailable: {0}")]
    Unavailable(String),
}

/// Trim and check a player name
pub fn sanitize_player_name(raw: &str) -> Result<String, NameError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(NameError::TooLong {
            len,
            max: MAX_NAME_LEN,
        });
    }
    Ok(name.to_string())
}

/// Source of suggested player names
#[async_trait(?Send)]
pub trait NameGenerator {
    async fn generate(&self) -> Result<String, NameError>;
}

#[async_trait(?Send)]
impl<G: NameGenerator + ?Sized> NameGenerator for Rc<G> {
    async fn generate(&self) -> Result<String, NameError> {
        (**self).generate().await
    }
}

#[async_trait(?Send)]
impl<G: NameGenerator + ?Sized> NameGenerator for Box<G> {
    async fn generate(&self) -> Result<String, NameError> {
        (**self).generate().await
    }
}

const PREFIXES: [&str; 8] = ["Circle", "Arc", "Round", "Orbit", "Loop", "Ring", "Halo", "Radius"];
const SUFFIXES: [&str; 8] = ["Savant", "Robin", "Angel", "Ace", "Master", "Smith", "Rider", "Wizard"];

/// Two-word names without spaces, e.g. "CircleSavant"
pub struct RandomNameGenerator {
    rng: RefCell<Pcg32>,
}

impl RandomNameGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: RefCell::new(Pcg32::seed_from_u64(seed)),
        }
    }

    fn pick(&self) -> String {
        let mut rng = self.rng.borrow_mut();
        let prefix = PREFIXES[rng.random_range(0..PREFIXES.len())];
        let suffix = SUFFIXES[rng.random_range(0..SUFFIXES.len())];
        format!("{prefix}{suffix}")
    }
}

#[async_trait(?Send)]
impl NameGenerator for RandomNameGenerator {
    async fn generate(&self) -> Result<String, NameError> {
        sanitize_player_name(&self.pick())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_trims() {
        assert_eq!(sanitize_player_name("  ArcAngel \n").unwrap(), "ArcAngel");
    }

    #[test]
    fn test_sanitize_rejects_blank_and_long() {
        assert_eq!(sanitize_player_name("   "), Err(NameError::Empty));
        assert_eq!(
            sanitize_player_name(&"x".repeat(21)),
            Err(NameError::TooLong { len: 21, max: 20 })
        );
        assert!(sanitize_player_name(&"x".repeat(20)).is_ok());
    }

    #[test]
    fn test_length_counts_chars_not_bytes() {
        assert!(sanitize_player_name(&"é".repeat(20)).is_ok());
    }

    #[test]
    fn test_generated_names_are_valid() {
        let generator = RandomNameGenerator::new(7);
        for _ in 0..50 {
            let name = pollster::block_on(generator.generate()).unwrap();
            assert!(!name.contains(' '));
            assert!(name.len() <= MAX_NAME_LEN);
            assert!(PREFIXES.iter().any(|p| name.starts_with(p)));
        }
    }

    #[test]
    fn test_generator_is_seeded() {
        let a = RandomNameGenerator::new(42);
        let b = RandomNameGenerator::new(42);
        assert_eq!(
            pollster::block_on(a.generate()).unwrap(),
            pollster::block_on(b.generate()).unwrap()
        );
    }
}
