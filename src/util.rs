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

pub mod backoff;
pub mod hex;

pub mod hashes {
    use bitcoin::hashes::{sha256, Hash};

    /// Digests some data through a single sha256.
    pub fn sha256(b: &[u8]) -> sha256::Hash {
        sha256::Hash::hash(b)
    }

    /// Same as [`sha256`] but returns the raw digest bytes.
    pub fn sha256_bytes(b: &[u8]) -> [u8; 32] {
        sha256(b).into_inner()
    }
}
