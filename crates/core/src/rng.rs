//! Piece source - decides which shape comes next
//!
//! Locally the next shape is drawn uniformly from the mode's family with a seeded
//! `Pcg32`, so the same seed replays the same game. In an online match the server assigns
//! each side a symbol sequence up front; the source serves that queue first and falls
//! back to seeded random draws once it runs dry.

use std::collections::VecDeque;

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::catalog::{lookup, random_shape, ShapeDef};
use crate::types::PieceFamily;

/// A wire symbol that names no shape of the family.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown piece symbol {symbol:?}")]
pub struct UnknownSymbol {
    pub symbol: String,
}

/// Resolve a wire symbol, failing with [`UnknownSymbol`].
pub fn resolve(family: PieceFamily, symbol: &str) -> Result<&'static ShapeDef, UnknownSymbol> {
    lookup(family, symbol).ok_or_else(|| UnknownSymbol {
        symbol: symbol.to_string(),
    })
}

#[derive(Debug, Clone)]
pub struct PieceSource {
    family: PieceFamily,
    rng: Pcg32,
    queue: VecDeque<&'static ShapeDef>,
}

impl PieceSource {
    /// Uniform random shapes from `family`.
    pub fn random(family: PieceFamily, seed: u64) -> Self {
        Self {
            family,
            rng: Pcg32::seed_from_u64(seed),
            queue: VecDeque::new(),
        }
    }

    /// Serve `symbols` in order, then random shapes.
    pub fn with_sequence<S: AsRef<str>>(
        family: PieceFamily,
        symbols: &[S],
        seed: u64,
    ) -> Result<Self, UnknownSymbol> {
        let queue = symbols
            .iter()
            .map(|s| resolve(family, s.as_ref()))
            .collect::<Result<VecDeque<_>, _>>()?;
        Ok(Self {
            family,
            rng: Pcg32::seed_from_u64(seed),
            queue,
        })
    }

    pub fn family(&self) -> PieceFamily {
        self.family
    }

    /// Shapes still queued from an assigned sequence.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn next_shape(&mut self) -> &'static ShapeDef {
        match self.queue.pop_front() {
            Some(shape) => shape,
            None => random_shape(self.family, &mut self.rng),
        }
    }
}

/// Seeded symbol sequence, as handed to each side at match start.
pub fn generate_sequence(family: PieceFamily, len: usize, seed: u64) -> Vec<&'static str> {
    let mut rng = Pcg32::seed_from_u64(seed);
    (0..len)
        .map(|_| random_shape(family, &mut rng).symbol)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_pieces() {
        let mut a = PieceSource::random(PieceFamily::Tetromino, 42);
        let mut b = PieceSource::random(PieceFamily::Tetromino, 42);
        for _ in 0..50 {
            assert_eq!(a.next_shape().symbol, b.next_shape().symbol);
        }
    }

    #[test]
    fn test_sequence_is_served_first() {
        let mut source =
            PieceSource::with_sequence(PieceFamily::Tetromino, &["T", "i", "O"], 3).unwrap();
        assert_eq!(source.queued(), 3);
        assert_eq!(source.next_shape().symbol, "T");
        assert_eq!(source.next_shape().symbol, "I");
        assert_eq!(source.next_shape().symbol, "O");
        assert_eq!(source.queued(), 0);
        let fallback = source.next_shape();
        assert!(lookup(PieceFamily::Tetromino, fallback.symbol).is_some());
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = PieceSource::with_sequence(PieceFamily::Tetromino, &["T", "Q"], 0).unwrap_err();
        assert_eq!(err.symbol, "Q");
        assert_eq!(err.to_string(), "unknown piece symbol \"Q\"");
    }

    #[test]
    fn test_generate_sequence_is_deterministic() {
        let a = generate_sequence(PieceFamily::Tetromino, 100, 7);
        let b = generate_sequence(PieceFamily::Tetromino, 100, 7);
        assert_eq!(a.len(), 100);
        assert_eq!(a, b);
        assert_ne!(a, generate_sequence(PieceFamily::Tetromino, 100, 8));
    }

    #[test]
    fn test_random_covers_family() {
        let mut source = PieceSource::random(PieceFamily::Tetromino, 1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..500 {
            seen.insert(source.next_shape().symbol);
        }
        assert_eq!(seen.len(), 7);
    }
}
