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

use bitcoin::hashes::hex::ToHex;
use bitcoin::{PublicKey, Script};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::{self, Codec, Message};
use crate::puzzle::PuzzleSolution;
use crate::{endpoints::Endpoints, http};

/// Identifies a channel: the escrow script both parties agreed on.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ChannelId(Script);

impl ChannelId {
    pub fn script(&self) -> &Script {
        &self.0
    }

    /// Lowercase hex of the escrow script, as used in request paths.
    pub fn to_hex(&self) -> String {
        self.0.as_bytes().to_hex()
    }
}

impl From<Script> for ChannelId {
    fn from(script: Script) -> Self {
        ChannelId(script)
    }
}

impl From<Vec<u8>> for ChannelId {
    fn from(bytes: Vec<u8>) -> Self {
        ChannelId(Script::from(bytes))
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::fmt::Debug for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChannelId({})", self.to_hex())
    }
}

impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        crate::util::hex::serialize(&self.0.as_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = crate::util::hex::deserialize(deserializer)?;
        Ok(ChannelId::from(bytes))
    }
}

/// What the client proposes when asking the tumbler to open a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientEscrowInfo {
    pub escrow_key: PublicKey,
    pub redeem_key: PublicKey,
    pub cycle_start: u32,
    /// Solution obtained by redeeming a voucher, authorizing the channel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<PuzzleSolution>,
}

impl Message for ClientEscrowInfo {}

/// The tumbler's side of an opened channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TumblerEscrowInfo {
    pub tumbler_key: PublicKey,
    pub channel_id: ChannelId,
}

impl Message for TumblerEscrowInfo {
    fn validate(&self, _codec: &Codec) -> Result<(), codec::Error> {
        if self.channel_id.script().is_empty() {
            return Err(codec::Error::Malformed("empty channel id"));
        }
        Ok(())
    }
}

/// The session's record of the opened channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscrowInfo {
    pub channel_id: ChannelId,
    pub client_key: PublicKey,
    pub tumbler_key: PublicKey,
}

/// Asks the tumbler for the key it will use in the client's escrow.
pub fn escrow_key_request(
    endpoints: &Endpoints,
    codec: &Codec,
    info: &ClientEscrowInfo,
) -> Result<http::Request<PublicKey>, codec::Error> {
    Ok(http::Request::post(
        endpoints.escrow_key(),
        http::Body::json(codec, info)?,
    ))
}

/// Asks the tumbler to open a channel.
pub fn open_channel_request(
    endpoints: &Endpoints,
    codec: &Codec,
    info: &ClientEscrowInfo,
) -> Result<http::Request<TumblerEscrowInfo>, codec::Error> {
    Ok(http::Request::post(
        endpoints.open_channel(),
        http::Body::json(codec, info)?,
    ))
}
