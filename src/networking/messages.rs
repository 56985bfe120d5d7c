/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The message envelope exchanged with the P2P network.
//!
//! Every consensus message travels as a [`WireMessage`]: a triple of a command tag, a map of named
//! text body fields, and an opaque binary payload. Typed consensus messages convert to and from this
//! envelope in [`crate::dbft::messages`].

use std::{collections::BTreeMap, fmt, io};

use borsh::{BorshDeserialize, BorshSerialize};

/// Command tags understood by the consensus engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandTag {
    PrepareRequest,
    PrepareResponse,
    ChangeView,
}

impl CommandTag {
    /// Get the tag as it appears on the wire.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CommandTag::PrepareRequest => "prepareRequest",
            CommandTag::PrepareResponse => "prepareResponse",
            CommandTag::ChangeView => "changeview",
        }
    }

    /// Parse a wire tag. Returns `None` for tags that are not consensus commands.
    pub fn parse(tag: &str) -> Option<CommandTag> {
        match tag {
            "prepareRequest" => Some(CommandTag::PrepareRequest),
            "prepareResponse" => Some(CommandTag::PrepareResponse),
            "changeview" => Some(CommandTag::ChangeView),
            _ => None,
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `(commandTag, bodyFields, binaryPayload)` triple, as sent to and received from the network.
///
/// `WireMessage` implements Borsh so that network providers that do not have their own framing can
/// send it as a single byte string.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct WireMessage {
    pub command: String,
    pub body: BTreeMap<String, String>,
    pub payload: Vec<u8>,
}

impl WireMessage {
    /// Create a message with the given `command`, no body fields, and `payload`.
    pub fn new(command: CommandTag, payload: Vec<u8>) -> Self {
        Self {
            command: command.as_str().to_string(),
            body: BTreeMap::new(),
            payload,
        }
    }

    /// Set the body field `name` to `value`.
    pub fn with_field(mut self, name: &str, value: String) -> Self {
        self.body.insert(name.to_string(), value);
        self
    }

    /// Get the parsed command tag of this message.
    pub fn command_tag(&self) -> Result<CommandTag, DecodeError> {
        CommandTag::parse(&self.command)
            .ok_or_else(|| DecodeError::UnknownCommand(self.command.clone()))
    }

    /// Get the body field `name`.
    pub fn field(&self, name: &'static str) -> Result<&str, DecodeError> {
        self.body
            .get(name)
            .map(String::as_str)
            .ok_or(DecodeError::MissingField(name))
    }
}

/// Enumerates the ways a [`WireMessage`] can fail to decode into a typed consensus message.
#[derive(Debug)]
pub enum DecodeError {
    /// The command tag is not a consensus command.
    UnknownCommand(String),

    /// A required body field is absent.
    MissingField(&'static str),

    /// A body field is present but cannot be parsed.
    InvalidField { field: &'static str, value: String },

    /// The binary payload does not have the length the command requires.
    InvalidPayloadLength { expected: usize, actual: usize },

    /// The binary payload of a `prepareRequest` is not an encoded block.
    InvalidBlock(io::Error),
}

impl From<io::Error> for DecodeError {
    fn from(value: io::Error) -> Self {
        DecodeError::InvalidBlock(value)
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownCommand(command) => write!(f, "unknown command {}", command),
            DecodeError::MissingField(field) => write!(f, "missing field {}", field),
            DecodeError::InvalidField { field, value } => {
                write!(f, "invalid field {}: {}", field, value)
            }
            DecodeError::InvalidPayloadLength { expected, actual } => {
                write!(f, "payload length {}, expected {}", actual, expected)
            }
            DecodeError::InvalidBlock(err) => write!(f, "invalid block: {}", err),
        }
    }
}
