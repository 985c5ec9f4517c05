use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Sets `field` to `value` in the hash at `key`, creating the hash when the
/// key is absent. Replies 1 when the field is new, 0 when it was updated.
///
/// Ref: <https://redis.io/docs/latest/commands/hset/>
#[derive(Debug, PartialEq)]
pub struct Hset {
    pub key: Bytes,
    pub field: Bytes,
    pub value: Bytes,
}

impl Executable for Hset {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match store.hash_set(self.key, self.field, self.value) {
            Ok(is_new) => Ok(Frame::Integer(i64::from(is_new))),
            Err(err) => Ok(Frame::Error(err.to_string())),
        }
    }
}

impl TryFrom<&mut CommandParser> for Hset {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        let field = parser.next_bytes()?;
        let value = parser.next_bytes()?;

        Ok(Self { key, field, value })
    }
}
