//! Length-prefixed framing: each frame is a 4-byte big-endian length
//! followed by that many bytes of CBOR payload, mirroring the wire shape
//! the peer-to-peer protocol this server replaces used (`struct.pack(">I",
//! len(data))`).

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FramingError, FramingResult};

/// Frames above this size are rejected before the payload is read, so a
/// corrupt or hostile length prefix cannot force an unbounded allocation.
pub const MAX_FRAME_LEN: u32 = 16 * 1024 * 1024;

/// Reads one length-prefixed frame's payload from `reader`.
///
/// Returns `Ok(None)` on a clean EOF between frames (the peer closed the
/// connection); any other I/O error, or an oversized length prefix, is
/// returned as an error.
pub async fn read_frame<R>(reader: &mut R) -> FramingResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(FramingError::Io(err)),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_LEN {
        return Err(FramingError::FrameTooLarge(len));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await.map_err(FramingError::Io)?;
    Ok(Some(payload))
}

/// Writes `payload` to `writer` as one length-prefixed frame.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).expect("payload exceeds u32::MAX");
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_single_frame() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        let payload = read_frame(&mut cursor).await.unwrap().unwrap();
        assert_eq!(payload, b"hello");
    }

    #[tokio::test]
    async fn reads_consecutive_frames_in_order() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"first").await.unwrap();
        write_frame(&mut buf, b"second").await.unwrap();
        let mut cursor = std::io::Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap().unwrap(), b"first");
        assert_eq!(read_frame(&mut cursor).await.unwrap().unwrap(), b"second");
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_an_oversized_length_prefix() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(MAX_FRAME_LEN + 1).to_be_bytes());
        let mut cursor = std::io::Cursor::new(buf);
        let err = read_frame(&mut cursor).await.unwrap_err();
        assert!(matches!(err, FramingError::FrameTooLarge(_)));
    }

    #[tokio::test]
    async fn empty_stream_is_a_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }
}
