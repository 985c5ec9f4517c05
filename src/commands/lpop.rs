use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Removes and returns the head of the list at `key`. Popping the last
/// element deletes the key; a missing key replies with the nil bulk string.
///
/// Ref: <https://redis.io/docs/latest/commands/lpop/>
#[derive(Debug, PartialEq)]
pub struct Lpop {
    pub key: Bytes,
}

impl Executable for Lpop {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match store.list_head_pop(&self.key) {
            Ok(Some(value)) => Ok(Frame::Bulk(value)),
            Ok(None) => Ok(Frame::Null),
            Err(err) => Ok(Frame::Error(err.to_string())),
        }
    }
}

impl TryFrom<&mut CommandParser> for Lpop {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;

        Ok(Self { key })
    }
}
