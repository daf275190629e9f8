// tumbler-client-rs
// Copyright (C) 2022  Straylight <straylight_orbit@protonmail.com>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Opaque puzzle material and the cut-and-choose batch that hides the real puzzle among fakes.
//! None of the values here are interpreted by the crate; the arithmetic behind them belongs to
//! the [`PuzzleCrypto`](crate::PuzzleCrypto) implementation.

use bitcoin::hashes::hex::ToHex;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec::Message;
use crate::util;

macro_rules! opaque_bytes {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde(with = "crate::util::hex")] Vec<u8>);

        impl From<Vec<u8>> for $name {
            fn from(value: Vec<u8>) -> Self {
                $name(value)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0.to_hex()).finish()
            }
        }

        impl Message for $name {}
    };
}

opaque_bytes!(
    /// A blinded challenge submitted to the tumbler.
    PuzzleValue
);
opaque_bytes!(
    /// The solution of a puzzle.
    PuzzleSolution
);
opaque_bytes!(
    /// Secret a fake promise-phase puzzle was derived from.
    Salt
);
opaque_bytes!(
    /// Blinding value of a single solver-phase puzzle.
    BlindFactor
);
opaque_bytes!(
    /// Key decrypting the tumbler's committed solution of a solver-phase puzzle.
    SolutionKey
);

/// A decoy puzzle and the secret that lets the tumbler check that it is a decoy.
#[derive(Debug, Clone, PartialEq)]
pub struct Fake<S> {
    pub puzzle: PuzzleValue,
    pub secret: S,
}

/// An ordered batch of puzzles with exactly one real puzzle at a random position. The position
/// is never exposed outside the crate and never printed.
#[derive(Clone)]
pub struct PuzzleBatch<S> {
    puzzles: Vec<PuzzleValue>,
    secrets: Vec<Option<S>>,
    real: usize,
    index_salt: [u8; 32],
}

impl<S> PuzzleBatch<S> {
    /// Hides `real` at a uniformly random position among `fakes`. The relative order of the
    /// fakes is kept.
    pub fn new(real: PuzzleValue, fakes: Vec<Fake<S>>) -> Self {
        let position = rand::thread_rng().gen_range(0..=fakes.len());
        Self::with_real_at(real, fakes, position)
    }

    pub(crate) fn with_real_at(real: PuzzleValue, fakes: Vec<Fake<S>>, position: usize) -> Self {
        let position = position.min(fakes.len());

        let mut puzzles = Vec::with_capacity(fakes.len() + 1);
        let mut secrets = Vec::with_capacity(fakes.len() + 1);
        for fake in fakes {
            puzzles.push(fake.puzzle);
            secrets.push(Some(fake.secret));
        }
        puzzles.insert(position, real);
        secrets.insert(position, None);

        Self {
            puzzles,
            secrets,
            real: position,
            index_salt: rand::thread_rng().gen(),
        }
    }

    pub fn len(&self) -> usize {
        self.puzzles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.puzzles.is_empty()
    }

    /// All puzzles in submission order.
    pub fn puzzles(&self) -> &[PuzzleValue] {
        &self.puzzles
    }

    /// Positions of the fake puzzles, ascending.
    pub fn fake_indexes(&self) -> Vec<usize> {
        (0..self.puzzles.len()).filter(|i| *i != self.real).collect()
    }

    /// Fake puzzles with their positions and secrets, ascending by position.
    pub fn fakes(&self) -> impl Iterator<Item = (usize, &PuzzleValue, &S)> {
        self.puzzles
            .iter()
            .zip(self.secrets.iter())
            .enumerate()
            .filter_map(|(i, (puzzle, secret))| secret.as_ref().map(|s| (i, puzzle, s)))
    }

    /// Salt blinding [`fake_indexes_hash`](Self::fake_indexes_hash). Stays secret until the
    /// fakes are revealed.
    pub fn index_salt(&self) -> &[u8; 32] {
        &self.index_salt
    }

    /// Commitment to the set of fake positions, sent along with the batch so the client cannot
    /// change its mind about which puzzles are fake once it sees the tumbler's answers. Salted,
    /// otherwise the tumbler could hash each of the N candidate sets.
    pub fn fake_indexes_hash(&self) -> [u8; 32] {
        fake_indexes_hash(&self.index_salt, &self.fake_indexes())
    }

    /// Whether `other` is this very batch: same puzzles in the same order, same real position
    /// and same index salt.
    pub fn same_as(&self, other: &PuzzleBatch<S>) -> bool {
        self.puzzles == other.puzzles
            && self.real == other.real
            && self.index_salt == other.index_salt
    }

    pub(crate) fn real_index(&self) -> usize {
        self.real
    }
}

/// `sha256(salt || le32(index)...)`, the tumbler's check of a revealed fake set.
pub fn fake_indexes_hash(salt: &[u8; 32], fake_indexes: &[usize]) -> [u8; 32] {
    let mut preimage = Vec::with_capacity(32 + 4 * fake_indexes.len());
    preimage.extend_from_slice(salt);
    for index in fake_indexes {
        preimage.extend_from_slice(&(*index as u32).to_le_bytes());
    }
    util::hashes::sha256_bytes(&preimage)
}

impl<S> std::fmt::Debug for PuzzleBatch<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PuzzleBatch")
            .field("len", &self.puzzles.len())
            .finish_non_exhaustive()
    }
}
