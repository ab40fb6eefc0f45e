//! `ZBXD\x01` framing: 5-byte magic, little-endian u64 payload length, JSON payload.

use super::connection::ConnectionError;
use crate::domain::Item;
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use std::borrow::Cow;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const ZBX_HEADER: &[u8; 5] = b"ZBXD\x01";
pub const ZBX_HEADER_SIZE: usize = 13;
pub const SENDER_REQUEST: &str = "sender data";
/// Upper bound on a payload length read off the wire.
pub const MAX_PAYLOAD_SIZE: u64 = 128 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Wrong zabbix response: invalid header")]
    InvalidHeader,
    #[error("Truncated frame: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("Payload of {0} bytes exceeds the 128 MiB limit")]
    PayloadTooLarge(u64),
    #[error("{count} unexpected bytes after frame body")]
    TrailingBytes { count: usize },
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Trapper request body.
#[derive(Debug, Serialize)]
pub struct SenderRequest<'a> {
    pub data: Cow<'a, [Item]>,
    pub request: Cow<'a, str>,
    pub clock: i64,
}

/// Wraps `payload` in a frame.
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ZBX_HEADER_SIZE + payload.len());
    buf.put_slice(ZBX_HEADER);
    buf.put_u64_le(payload.len() as u64);
    buf.put_slice(payload);
    buf.freeze()
}

/// Serializes a request for `items` and frames it.
pub fn encode_request(items: &[Item], request: &str, clock: i64) -> Result<Bytes, FrameError> {
    let body = SenderRequest {
        data: Cow::Borrowed(items),
        request: Cow::Borrowed(request),
        clock,
    };
    let payload = serde_json::to_vec(&body)?;
    Ok(encode_frame(&payload))
}

/// Validates a 13-byte header and returns the declared payload length.
fn parse_header(header: &[u8]) -> Result<u64, FrameError> {
    if header.len() < ZBX_HEADER_SIZE {
        return Err(FrameError::Truncated {
            expected: ZBX_HEADER_SIZE,
            actual: header.len(),
        });
    }
    if &header[..ZBX_HEADER.len()] != ZBX_HEADER {
        return Err(FrameError::InvalidHeader);
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&header[ZBX_HEADER.len()..ZBX_HEADER_SIZE]);
    let len = u64::from_le_bytes(len);
    if len > MAX_PAYLOAD_SIZE {
        return Err(FrameError::PayloadTooLarge(len));
    }
    Ok(len)
}

/// Decodes one complete frame held in memory. The buffer must contain
/// exactly one frame.
pub fn decode_frame(buf: &[u8]) -> Result<&[u8], FrameError> {
    let len = parse_header(buf)? as usize;
    let body = &buf[ZBX_HEADER_SIZE..];
    if body.len() < len {
        return Err(FrameError::Truncated {
            expected: len,
            actual: body.len(),
        });
    }
    if body.len() > len {
        return Err(FrameError::TrailingBytes {
            count: body.len() - len,
        });
    }
    Ok(body)
}

/// Reads until `buf` is full or EOF, returning the number of bytes read.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConnectionError::Io(e).into()),
        }
    }
    Ok(filled)
}

/// Reads one frame and returns its payload.
///
/// A short header or body yields [`FrameError::Truncated`]. Bytes already
/// waiting after the body yield [`FrameError::TrailingBytes`].
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; ZBX_HEADER_SIZE];
    let got = read_full(reader, &mut header).await?;
    // A wrong magic is reported as such even when the header is short
    let magic = got.min(ZBX_HEADER.len());
    if header[..magic] != ZBX_HEADER[..magic] {
        return Err(FrameError::InvalidHeader);
    }
    let len = parse_header(&header[..got])? as usize;

    let mut body = vec![0u8; len];
    let got = read_full(reader, &mut body).await?;
    if got < len {
        return Err(FrameError::Truncated {
            expected: len,
            actual: got,
        });
    }

    // Non-blocking probe: only data already buffered counts as trailing
    let mut probe = [0u8; 64];
    match tokio::time::timeout(Duration::ZERO, reader.read(&mut probe)).await {
        Ok(Ok(0)) | Err(_) | Ok(Err(_)) => {}
        Ok(Ok(count)) => return Err(FrameError::TrailingBytes { count }),
    }

    Ok(body)
}

/// Writes a complete frame and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer.write_all(frame).await.map_err(ConnectionError::Io)?;
    writer.flush().await.map_err(ConnectionError::Io)?;
    Ok(())
}
