//! RESP2 protocol implementation
//!
//! Requests are always written as arrays of bulk strings; replies are decoded
//! incrementally from a read buffer so a partial frame simply yields `None`.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use redis_cacher_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::io::Cursor;

const CRLF: &[u8] = b"\r\n";

/// Encodes requests into RESP bytes
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a command and its arguments into `buf`
    ///
    /// Integer and simple-string arguments are sent as bulk strings, which is
    /// the only argument form the server accepts.
    pub fn encode_command_into(
        command: &str,
        args: &[RespValue],
        buf: &mut BytesMut,
    ) -> RedisResult<()> {
        Self::put_header(buf, b'*', 1 + args.len());
        Self::put_bulk(buf, command.as_bytes());

        for arg in args {
            match arg {
                RespValue::BulkString(data) => Self::put_bulk(buf, data),
                RespValue::SimpleString(s) => Self::put_bulk(buf, s.as_bytes()),
                RespValue::Integer(i) => Self::put_bulk(buf, i.to_string().as_bytes()),
                other => {
                    return Err(RedisError::Protocol(format!(
                        "{other:?} cannot be sent as a command argument"
                    )))
                }
            }
        }
        Ok(())
    }

    /// Encode a command with arguments into a fresh buffer
    pub fn encode_command(command: &str, args: &[RespValue]) -> RedisResult<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        Self::encode_command_into(command, args, &mut buf)?;
        Ok(buf.freeze())
    }

    /// Encode an arbitrary RESP value, as a server would send it
    pub fn encode(value: &RespValue, buf: &mut BytesMut) {
        match value {
            RespValue::SimpleString(s) => Self::put_line(buf, b'+', s.as_bytes()),
            RespValue::Error(e) => Self::put_line(buf, b'-', e.as_bytes()),
            RespValue::Integer(i) => Self::put_line(buf, b':', i.to_string().as_bytes()),
            RespValue::BulkString(data) => Self::put_bulk(buf, data),
            RespValue::Null => buf.put_slice(b"$-1\r\n"),
            RespValue::Array(items) => {
                Self::put_header(buf, b'*', items.len());
                for item in items {
                    Self::encode(item, buf);
                }
            }
        }
    }

    fn put_header(buf: &mut BytesMut, kind: u8, len: usize) {
        Self::put_line(buf, kind, len.to_string().as_bytes());
    }

    fn put_line(buf: &mut BytesMut, kind: u8, line: &[u8]) {
        buf.put_u8(kind);
        buf.put_slice(line);
        buf.put_slice(CRLF);
    }

    fn put_bulk(buf: &mut BytesMut, data: &[u8]) {
        Self::put_header(buf, b'$', data.len());
        buf.put_slice(data);
        buf.put_slice(CRLF);
    }
}

/// Decodes RESP values from bytes
pub struct RespDecoder;

impl RespDecoder {
    /// Decode one value from the cursor
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete frame;
    /// the cursor position is then meaningless and the caller must retry
    /// from the same start once more bytes arrive.
    pub fn decode(buf: &mut Cursor<&[u8]>) -> RedisResult<Option<RespValue>> {
        if !buf.has_remaining() {
            return Ok(None);
        }

        let kind = buf.chunk()[0];
        buf.advance(1);

        let Some(line) = Self::read_line(buf) else {
            return Ok(None);
        };

        match kind {
            b'+' => Ok(Some(RespValue::SimpleString(Self::utf8(line)?))),
            b'-' => Ok(Some(RespValue::Error(Self::utf8(line)?))),
            b':' => Ok(Some(RespValue::Integer(Self::parse_int(line)?))),
            b'$' => {
                let Some(len) = Self::parse_len(line)? else {
                    return Ok(Some(RespValue::Null));
                };
                if buf.remaining() < len + 2 {
                    return Ok(None);
                }
                let data = Bytes::copy_from_slice(&buf.chunk()[..len]);
                buf.advance(len);
                if &buf.chunk()[..2] != CRLF {
                    return Err(RedisError::Protocol(
                        "bulk string not terminated by CRLF".to_string(),
                    ));
                }
                buf.advance(2);
                Ok(Some(RespValue::BulkString(data)))
            }
            b'*' => {
                let Some(len) = Self::parse_len(line)? else {
                    return Ok(Some(RespValue::Null));
                };
                let mut items = Vec::with_capacity(len.min(1024));
                for _ in 0..len {
                    match Self::decode(buf)? {
                        Some(item) => items.push(item),
                        None => return Ok(None),
                    }
                }
                Ok(Some(RespValue::Array(items)))
            }
            other => Err(RedisError::Protocol(format!(
                "Invalid RESP type byte: {:?}",
                other as char
            ))),
        }
    }

    fn read_line<'a>(buf: &mut Cursor<&'a [u8]>) -> Option<&'a [u8]> {
        let start = buf.position() as usize;
        let slice: &'a [u8] = *buf.get_ref();
        let end = slice[start..]
            .windows(2)
            .position(|w| w == CRLF)
            .map(|offset| start + offset)?;
        buf.set_position((end + 2) as u64);
        Some(&slice[start..end])
    }

    fn utf8(line: &[u8]) -> RedisResult<String> {
        String::from_utf8(line.to_vec())
            .map_err(|e| RedisError::Protocol(format!("Invalid UTF-8: {e}")))
    }

    fn parse_int(line: &[u8]) -> RedisResult<i64> {
        let text = std::str::from_utf8(line)
            .map_err(|e| RedisError::Protocol(format!("Invalid UTF-8: {e}")))?;
        text.parse::<i64>()
            .map_err(|e| RedisError::Protocol(format!("Invalid integer {text:?}: {e}")))
    }

    /// `None` for the -1 null marker
    fn parse_len(line: &[u8]) -> RedisResult<Option<usize>> {
        match Self::parse_int(line)? {
            -1 => Ok(None),
            n if n < 0 => Err(RedisError::Protocol(format!("Invalid length: {n}"))),
            n => Ok(Some(n as usize)),
        }
    }
}
