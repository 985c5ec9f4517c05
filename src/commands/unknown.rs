use crate::commands::executable::Executable;
use crate::frame::Frame;
use crate::store::Store;
use crate::Error;

/// Catch-all for names with no registered handler, including the empty
/// statement sentinel (which carries an empty name). Replies with an error
/// and never touches the store.
#[derive(Debug, PartialEq)]
pub struct Unknown {
    pub name: String,
}

impl Executable for Unknown {
    fn exec(self, _store: Store) -> Result<Frame, Error> {
        Ok(Frame::Error(format!("ERR unknown command '{}'", self.name)))
    }
}
