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

//! Contains datastructures for describing HTTP requests without forcing a particular HTTP
//! library on the user of the crate, and the [`Transport`] trait through which a session
//! executes them.
use std::marker::PhantomData;

use crate::codec::{self, Codec, Message};

#[derive(Debug)]
pub struct Request<T: Message> {
    /// Path relative to the tumbler's base address.
    pub path: String,
    pub method: Method,
    pub body: Option<Body>,
    pub de_type: PhantomData<T>,
}

impl<T: Message> Request<T> {
    pub fn get(path: String) -> Self {
        Request {
            path,
            method: Method::GET,
            body: None,
            de_type: PhantomData,
        }
    }

    pub fn post(path: String, body: Body) -> Self {
        Request {
            path,
            method: Method::POST,
            body: Some(body),
            de_type: PhantomData,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    POST,
}

#[derive(Debug, Clone)]
pub struct Body {
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Body {
    pub fn json<T: serde::Serialize>(codec: &Codec, value: &T) -> Result<Self, codec::Error> {
        Ok(Body {
            body: codec.encode(value)?,
            content_type: "application/json",
        })
    }
}

/// Raw answer of the tumbler.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

/// A decoded answer, distinguishing an absent resource (HTTP 404) from a present one.
#[derive(Debug)]
pub enum Reply<T> {
    Found(T),
    Absent,
}

/// Synchronous request/response channel to a tumbler. Implementations own the base address
/// and resolve the relative paths handed to them.
pub trait Transport: std::fmt::Debug + Send {
    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Body>,
    ) -> Result<Response, TransportError>;
}

/// Failures below the HTTP layer. None of these say anything about whether the tumbler
/// processed the request.
#[derive(Debug)]
pub enum TransportError {
    Timeout,
    Connection(Box<dyn std::error::Error + Send + Sync>),
    Io(std::io::Error),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "request timed out"),
            TransportError::Connection(inner) => write!(f, "Connection: {}", inner),
            TransportError::Io(inner) => write!(f, "IO: {}", inner),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => TransportError::Timeout,
            _ => TransportError::Io(error),
        }
    }
}
