use bytes::Bytes;

use crate::commands::executable::Executable;
use crate::commands::CommandParser;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Prepends each value to the list at `key`, creating it when absent. The
/// values are inserted at the head in argument order, so the last one given
/// ends up at index 0. Replies with the number of values pushed.
///
/// Ref: <https://redis.io/docs/latest/commands/lpush/>
#[derive(Debug, PartialEq)]
pub struct Lpush {
    pub key: Bytes,
    pub values: Vec<Bytes>,
}

impl Executable for Lpush {
    fn exec(self, store: Store) -> Result<Frame, Error> {
        match store.list_head_push(self.key, self.values) {
            Ok(pushed) => Ok(Frame::Integer(pushed as i64)),
            Err(err) => Ok(Frame::Error(err.to_string())),
        }
    }
}

impl TryFrom<&mut CommandParser> for Lpush {
    type Error = Error;

    fn try_from(parser: &mut CommandParser) -> Result<Self, Self::Error> {
        let key = parser.next_bytes()?;
        // At least one value is required.
        let mut values = vec![parser.next_bytes()?];
        while parser.remaining() > 0 {
            values.push(parser.next_bytes()?);
        }

        Ok(Self { key, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Command;

    fn lpush(parts: &[&str]) -> Command {
        let mut frames = vec![Frame::Bulk(Bytes::from("LPUSH"))];
        frames.extend(
            parts
                .iter()
                .map(|part| Frame::Bulk(Bytes::copy_from_slice(part.as_bytes()))),
        );
        Command::try_from(Frame::Array(frames)).unwrap()
    }

    #[test]
    fn creates_the_list_and_counts_pushes() {
        let store = Store::new();

        let result = lpush(&["mylist", "a", "b", "c"]).exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(3));
        assert_eq!(store.list_len(b"mylist"), Ok(3));
        assert_eq!(store.list_index(b"mylist", 0), Ok(Some(Bytes::from("c"))));
        assert_eq!(store.list_index(b"mylist", 2), Ok(Some(Bytes::from("a"))));
    }

    #[test]
    fn prepends_to_an_existing_list() {
        let store = Store::new();

        lpush(&["mylist", "a"]).exec(store.clone()).unwrap();
        let result = lpush(&["mylist", "b"]).exec(store.clone()).unwrap();

        assert_eq!(result, Frame::Integer(1));
        assert_eq!(store.list_index(b"mylist", 0), Ok(Some(Bytes::from("b"))));
        assert_eq!(store.list_index(b"mylist", 1), Ok(Some(Bytes::from("a"))));
    }

    #[test]
    fn string_key_is_a_type_error_and_stays_intact() {
        let store = Store::new();
        store.set(Bytes::from("k"), Bytes::from("v"));

        let result = lpush(&["k", "x"]).exec(store.clone()).unwrap();

        assert_eq!(
            result,
            Frame::Error(
                "ERR Operation against a key holding the wrong kind of value".to_string()
            )
        );
        assert_eq!(store.get(b"k"), Ok(Some(Bytes::from("v"))));
    }
}
