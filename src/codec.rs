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

//! JSON wire codec. Decoding is tied to the Bitcoin network the session operates on so that
//! messages meant for another network are refused before they reach the protocol logic.

use bitcoin::Network;
use serde::de::DeserializeOwned;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Codec {
    network: Network,
}

impl Codec {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(value)?)
    }

    /// Decodes and structurally validates a message.
    pub fn decode<T: Message>(&self, data: &[u8]) -> Result<T, Error> {
        // capture the whole body as a String if we fail to decode
        let message: T = serde_json::from_slice(data).map_err(|error| Error::UnexpectedBody {
            error,
            body: String::from_utf8_lossy(data).to_string(),
        })?;
        message.validate(self)?;
        Ok(message)
    }
}

/// Anything the tumbler may send back. `validate` runs right after deserialization and is where
/// structural checks that serde cannot express belong.
pub trait Message: DeserializeOwned {
    fn validate(&self, _codec: &Codec) -> Result<(), Error> {
        Ok(())
    }
}

impl<T: Message> Message for Vec<T> {
    fn validate(&self, codec: &Codec) -> Result<(), Error> {
        self.iter().try_for_each(|message| message.validate(codec))
    }
}

impl Message for bitcoin::PublicKey {}

impl Message for bitcoin::Txid {}

#[derive(Debug)]
pub enum Error {
    Json(serde_json::Error),
    UnexpectedBody {
        error: serde_json::Error,
        body: String,
    },
    UnsupportedNetwork(String),
    NetworkMismatch {
        expected: Network,
        actual: Network,
    },
    Malformed(&'static str),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Json(inner) => write!(f, "JSON: {}", inner),
            Error::UnexpectedBody { error, body } => write!(f, "{} in body: {}", error, body),
            Error::UnsupportedNetwork(network) => write!(f, "unsupported network: {}", network),
            Error::NetworkMismatch { expected, actual } => {
                write!(f, "expected network {}, got {}", expected, actual)
            }
            Error::Malformed(what) => write!(f, "malformed message: {}", what),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(error)
    }
}

/// Network names as the tumbler spells them.
pub mod network {
    use bitcoin::Network;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Error;

    pub fn parse(value: &str) -> Result<Network, Error> {
        match value {
            "main" => Ok(Network::Bitcoin),
            "test" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(Error::UnsupportedNetwork(other.to_owned())),
        }
    }

    pub fn name(network: Network) -> Result<&'static str, Error> {
        match network {
            Network::Bitcoin => Ok("main"),
            Network::Testnet => Ok("test"),
            Network::Regtest => Ok("regtest"),
            other => Err(Error::UnsupportedNetwork(other.to_string())),
        }
    }

    pub fn serialize<S: Serializer>(network: &Network, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::Error;
        serializer.serialize_str(name(*network).map_err(S::Error::custom)?)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Network, D::Error> {
        let s = String::deserialize(deserializer)?;

        use serde::de::Error;
        parse(&s).map_err(D::Error::custom)
    }
}
