use bytes::{Buf, Bytes, BytesMut};
use std::io::Cursor;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::frame::{self, Frame};
use crate::Error;

pub struct Connection {
    stream: TcpStream,
    // Data is read from the socket into the read buffer. When a frame is
    // parsed, the corresponding data is removed from the buffer, so bytes of
    // pipelined frames that arrived in the same read are served next without
    // touching the socket again.
    buffer: BytesMut,
}

impl Connection {
    pub fn new(stream: TcpStream) -> Connection {
        Connection {
            stream,
            // Allocate the buffer with 4kb of capacity.
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Reads one complete statement from the peer. Returns `None` on a clean
    /// end-of-stream between frames; an end-of-stream in the middle of a
    /// frame is a reset by peer.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, Error> {
        loop {
            if let Some(frame) = self.parse_frame()? {
                return Ok(Some(frame));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err("connection reset by peer".into());
            }
        }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), Error> {
        self.stream.write_all(&frame.serialize()).await?;
        Ok(())
    }

    fn parse_frame(&mut self) -> Result<Option<Frame>, Error> {
        let mut cursor = Cursor::new(&self.buffer[..]);

        match Frame::parse(&mut cursor) {
            Ok(frame) => {
                let consumed = cursor.position() as usize;
                self.buffer.advance(consumed);
                Ok(Some(statement_or_sentinel(frame)))
            }
            // Not enough buffered data yet to parse a whole frame.
            Err(frame::Error::Incomplete) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

// An inbound `*0` carries no command name at all. It is coerced to a
// one-element statement so dispatch takes the unknown-command path instead
// of every consumer having to handle an empty statement.
fn statement_or_sentinel(frame: Frame) -> Frame {
    match frame {
        Frame::Array(items) if items.is_empty() => {
            Frame::Array(vec![Frame::Bulk(Bytes::from_static(b"null"))])
        }
        frame => frame,
    }
}
