// https://redis.io/docs/reference/protocol-spec

use bytes::Buf;
use bytes::Bytes;
use std::io::Cursor;
use thiserror::Error as ThisError;

static CRLF: &[u8; 2] = b"\r\n";

#[derive(Debug, ThisError, PartialEq)]
pub enum Error {
    #[error("not enough data is available to parse an entire frame")]
    Incomplete,
    #[error("protocol error; invalid leading byte: {0:#04x}")]
    InvalidSigil(u8),
    #[error("protocol error; invalid length header")]
    InvalidLength,
    #[error("protocol error; bulk payload not terminated by CRLF")]
    MissingTerminator,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    Null,
    Array(Vec<Frame>),
}

impl Frame {
    /// Parses one inbound statement out of `src`. Clients may only send
    /// arrays of bulk strings; any other leading byte is a protocol error.
    ///
    /// `Error::Incomplete` means the buffer holds a prefix of a valid frame
    /// and the caller should read more bytes before retrying.
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<Self, Error> {
        expect_sigil(src, b'*')?;
        let count = get_length(src)?;

        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            expect_sigil(src, b'$')?;
            let length = get_length(src)?;
            let payload = get_payload(src, length)?;
            items.push(Frame::Bulk(payload));
        }

        Ok(Frame::Array(items))
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            Frame::Simple(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(b'+');
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Error(s) => {
                let mut bytes = Vec::with_capacity(1 + s.len() + CRLF.len());
                bytes.push(b'-');
                bytes.extend_from_slice(s.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Integer(i) => {
                let digits = i.to_string();
                let mut bytes = Vec::with_capacity(1 + digits.len() + CRLF.len());
                bytes.push(b':');
                bytes.extend_from_slice(digits.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes
            }
            Frame::Bulk(payload) => {
                let length = payload.len().to_string();
                let mut bytes = Vec::with_capacity(
                    1 + length.len() + CRLF.len() + payload.len() + CRLF.len(),
                );
                bytes.push(b'$');
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                bytes.extend_from_slice(payload);
                bytes.extend_from_slice(CRLF);
                bytes
            }
            // The RESP2 null bulk string.
            Frame::Null => b"$-1\r\n".to_vec(),
            Frame::Array(items) => {
                let length = items.len().to_string();
                let mut bytes = Vec::with_capacity(1 + length.len() + CRLF.len());
                bytes.push(b'*');
                bytes.extend_from_slice(length.as_bytes());
                bytes.extend_from_slice(CRLF);
                for item in items {
                    bytes.extend(item.serialize());
                }
                bytes
            }
        }
    }
}

fn expect_sigil(src: &mut Cursor<&[u8]>, expected: u8) -> Result<(), Error> {
    if !src.has_remaining() {
        return Err(Error::Incomplete);
    }

    let byte = src.get_u8();
    if byte != expected {
        return Err(Error::InvalidSigil(byte));
    }

    Ok(())
}

/// Reads one CRLF-terminated header line and parses it as a base-10
/// non-negative integer. Signs, blanks, and anything non-numeric (including
/// a stray `\r` inside the line) fail the parse.
fn get_length(src: &mut Cursor<&[u8]>) -> Result<usize, Error> {
    let line = get_line(src)?;

    if line.is_empty() || !line.iter().all(u8::is_ascii_digit) {
        return Err(Error::InvalidLength);
    }

    std::str::from_utf8(line)
        .ok()
        .and_then(|digits| digits.parse::<usize>().ok())
        .ok_or(Error::InvalidLength)
}

fn get_line<'a>(src: &mut Cursor<&'a [u8]>) -> Result<&'a [u8], Error> {
    let start = src.position() as usize;
    let end = src.get_ref().len();

    let line_end = src.get_ref()[start..end]
        .windows(2)
        .position(|window| window == CRLF)
        .map(|index| start + index)
        .ok_or(Error::Incomplete)?;

    src.set_position((line_end + CRLF.len()) as u64);

    Ok(&src.get_ref()[start..line_end])
}

/// Reads exactly `length` payload bytes plus the trailing CRLF. The payload
/// is taken length-prefixed, never scanned, so it may contain any bytes
/// including `\r` and `\n`.
fn get_payload(src: &mut Cursor<&[u8]>, length: usize) -> Result<Bytes, Error> {
    let start = src.position() as usize;
    let available = src.get_ref().len() - start;

    if available < length.saturating_add(CRLF.len()) {
        return Err(Error::Incomplete);
    }

    let payload = &src.get_ref()[start..start + length];
    if &src.get_ref()[start + length..start + length + CRLF.len()] != CRLF {
        return Err(Error::MissingTerminator);
    }

    let payload = Bytes::copy_from_slice(payload);
    src.set_position((start + length + CRLF.len()) as u64);

    Ok(payload)
}
