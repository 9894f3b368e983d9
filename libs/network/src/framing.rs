//! Length-Prefixed Framing
//!
//! Every frame on the wire is a 4-byte big-endian length followed by exactly
//! that many payload bytes:
//!
//! ```text
//! +------------------+------------------------+
//! | length (u32 BE)  |  payload (length bytes)|
//! +------------------+------------------------+
//! ```
//!
//! Valid lengths are `1..=max_frame_len`. [`FrameReader`] enforces the limit before
//! allocating anything for the payload, so a hostile length prefix cannot reserve
//! memory it will never fill.

use bytes::{Bytes, BytesMut};
use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use types::{FRAME_HEADER_LEN, MAX_FRAME_LEN};

use crate::error::FramingError;

/// Payload buffer growth step. A large declared length is only backed by memory
/// as bytes actually arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Reads successive frames from one byte stream.
pub struct FrameReader<R> {
    reader: R,
    max_frame_len: usize,
    frames_read: u64,
    bytes_read: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_frame_len(reader, MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(reader: R, max_frame_len: usize) -> Self {
        Self {
            reader,
            max_frame_len,
            frames_read: 0,
            bytes_read: 0,
        }
    }

    /// Read the next frame payload.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a frame boundary. Any
    /// error means the stream is unusable and the caller should drop it.
    pub async fn read_frame(&mut self) -> Result<Option<Bytes>, FramingError> {
        let len = match self.read_header().await? {
            Some(len) => len,
            None => return Ok(None),
        };

        if len == 0 {
            return Err(FramingError::ZeroLength);
        }
        if len > self.max_frame_len {
            return Err(FramingError::Oversized {
                declared: len,
                max: self.max_frame_len,
            });
        }

        let payload = self.read_payload(len).await?;
        self.frames_read += 1;
        self.bytes_read += (FRAME_HEADER_LEN + len) as u64;
        Ok(Some(payload))
    }

    async fn read_header(&mut self) -> Result<Option<usize>, FramingError> {
        let mut header = [0u8; FRAME_HEADER_LEN];
        let mut filled = 0;

        while filled < FRAME_HEADER_LEN {
            match self.reader.read(&mut header[filled..]).await {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(FramingError::TruncatedHeader { received: filled }),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(Some(u32::from_be_bytes(header) as usize))
    }

    async fn read_payload(&mut self, len: usize) -> Result<Bytes, FramingError> {
        let mut payload = BytesMut::with_capacity(len.min(READ_CHUNK));

        while payload.len() < len {
            let remaining = len - payload.len();
            payload.reserve(remaining.min(READ_CHUNK));

            let n = match (&mut self.reader)
                .take(remaining as u64)
                .read_buf(&mut payload)
                .await
            {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };

            if n == 0 {
                return Err(FramingError::TruncatedPayload {
                    expected: len,
                    received: payload.len(),
                });
            }
        }

        Ok(payload.freeze())
    }

    /// Frames fully read so far
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Bytes consumed by complete frames, headers included
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Writes frames to one byte stream, reusing a single buffer.
pub struct FrameWriter<W> {
    writer: W,
    max_frame_len: usize,
    write_buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self::with_max_frame_len(writer, MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(writer: W, max_frame_len: usize) -> Self {
        Self {
            writer,
            max_frame_len,
            write_buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Write one frame and flush it.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<(), FramingError> {
        check_len(payload.len(), self.max_frame_len)?;

        self.write_buffer.clear();
        self.write_buffer
            .extend_from_slice(&(payload.len() as u32).to_be_bytes());
        self.write_buffer.extend_from_slice(payload);

        self.writer.write_all(&self.write_buffer).await?;
        self.writer.flush().await?;
        Ok(())
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Encode a single frame into a fresh buffer.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, FramingError> {
    check_len(payload.len(), MAX_FRAME_LEN)?;

    let mut buf = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    buf.extend_from_slice(payload);
    Ok(buf.freeze())
}

fn check_len(len: usize, max: usize) -> Result<(), FramingError> {
    if len == 0 {
        return Err(FramingError::ZeroLength);
    }
    if len > max {
        return Err(FramingError::Oversized { declared: len, max });
    }
    Ok(())
}
