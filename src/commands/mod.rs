pub mod executable;
pub mod get;
pub mod hget;
pub mod hset;
pub mod lindex;
pub mod llen;
pub mod lpop;
pub mod lpush;
pub mod set;
pub mod unknown;

use bytes::Bytes;
use std::{str, vec};
use thiserror::Error as ThisError;

use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

use get::Get;
use hget::Hget;
use hset::Hset;
use lindex::Lindex;
use llen::Llen;
use lpop::Lpop;
use lpush::Lpush;
use set::Set;
use unknown::Unknown;

#[derive(Debug, PartialEq)]
pub enum Command {
    Set(Set),
    Get(Get),
    Lpush(Lpush),
    Lpop(Lpop),
    Llen(Llen),
    Lindex(Lindex),
    Hset(Hset),
    Hget(Hget),
    Unknown(Unknown),
}

impl Executable for Command {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match self {
            Command::Set(cmd) => cmd.exec(store),
            Command::Get(cmd) => cmd.exec(store),
            Command::Lpush(cmd) => cmd.exec(store),
            Command::Lpop(cmd) => cmd.exec(store),
            Command::Llen(cmd) => cmd.exec(store),
            Command::Lindex(cmd) => cmd.exec(store),
            Command::Hset(cmd) => cmd.exec(store),
            Command::Hget(cmd) => cmd.exec(store),
            Command::Unknown(cmd) => cmd.exec(store),
        }
    }
}

impl TryFrom<Frame> for Command {
    type Error = Error;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        // Clients send commands to the server as RESP arrays.
        let frames = match frame {
            Frame::Array(array) => array,
            frame => {
                return Err(Box::new(CommandParserError::InvalidFrame {
                    expected: "array".to_string(),
                    actual: frame,
                }))
            }
        };

        let parser = &mut CommandParser {
            parts: frames.into_iter(),
            command: String::new(),
        };

        let command_name = parser.parse_command_name()?;

        let command = match &command_name[..] {
            "set" => Set::try_from(&mut *parser).map(Command::Set),
            "get" => Get::try_from(&mut *parser).map(Command::Get),
            "lpush" => Lpush::try_from(&mut *parser).map(Command::Lpush),
            "lpop" => Lpop::try_from(&mut *parser).map(Command::Lpop),
            "llen" => Llen::try_from(&mut *parser).map(Command::Llen),
            "lindex" => Lindex::try_from(&mut *parser).map(Command::Lindex),
            "hset" => Hset::try_from(&mut *parser).map(Command::Hset),
            "hget" => Hget::try_from(&mut *parser).map(Command::Hget),
            // The frame reader turns an empty inbound statement into the
            // "null" sentinel; it reports an empty command name.
            "null" => {
                return Ok(Command::Unknown(Unknown {
                    name: String::new(),
                }))
            }
            _ => return Ok(Command::Unknown(Unknown { name: command_name })),
        }?;

        // Arguments left unconsumed by the handler are an arity error, the
        // same as running out of them.
        if parser.remaining() > 0 {
            return Err(Box::new(CommandParserError::WrongNumberOfArguments {
                command: command_name,
            }));
        }

        Ok(command)
    }
}

struct CommandParser {
    parts: vec::IntoIter<Frame>,
    command: String,
}

impl CommandParser {
    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        let frame = self.parts.next().ok_or(CommandParserError::EndOfStream)?;

        // Lowercased ASCII is the registry's canonical form. Lossy decoding
        // keeps a garbage name on the unknown-command reply path rather than
        // dropping the connection.
        let name = match frame {
            Frame::Simple(s) => s.to_lowercase(),
            Frame::Bulk(bytes) => String::from_utf8_lossy(&bytes).to_lowercase(),
            frame => {
                return Err(CommandParserError::InvalidFrame {
                    expected: "simple or bulk string".to_string(),
                    actual: frame,
                })
            }
        };

        self.command = name.clone();
        Ok(name)
    }

    fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        let frame = self
            .parts
            .next()
            .ok_or_else(|| CommandParserError::WrongNumberOfArguments {
                command: self.command.clone(),
            })?;

        match frame {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        let bytes = self.next_bytes()?;

        str::from_utf8(&bytes)
            .ok()
            .and_then(|digits| digits.parse::<i64>().ok())
            .ok_or(CommandParserError::NotAnInteger)
    }

    fn remaining(&self) -> usize {
        self.parts.len()
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub(crate) enum CommandParserError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual:?}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("protocol error; attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
    #[error("ERR wrong number of arguments for '{command}' command")]
    WrongNumberOfArguments { command: String },
    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,
}

impl CommandParserError {
    /// Errors the client is told about in a reply; the connection keeps
    /// serving. Everything else means the inbound stream cannot be trusted.
    pub(crate) fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::WrongNumberOfArguments { .. } | Self::NotAnInteger
        )
    }
}
