use super::TransportError;

use serde::{de::DeserializeOwned, Serialize};
use std::convert::TryFrom;
use tokio::io::{self, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame either side will send or accept
pub const MAX_FRAME_LENGTH: usize = 64 * 1024 * 1024;

pub async fn write_frame<W, T>(stream: &mut W, message: &T) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let buf = serde_json::to_vec(message)?;
    if buf.len() > MAX_FRAME_LENGTH {
        return Err(TransportError::FrameTooLarge(buf.len()));
    }
    let length = u32::try_from(buf.len()).map_err(|_| TransportError::FrameTooLarge(buf.len()))?;

    stream.write_u32(length).await?;
    stream.write_all(&buf).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one frame. Returns `Ok(None)` if the peer closed the connection
/// cleanly between frames.
pub async fn read_frame<R, T>(stream: &mut R) -> Result<Option<T>, TransportError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let length = match stream.read_u32().await {
        Ok(length) => length as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if length > MAX_FRAME_LENGTH {
        return Err(TransportError::FrameTooLarge(length));
    }

    let mut buf = vec![0; length];
    stream.read_exact(&mut buf).await?;

    Ok(Some(serde_json::from_slice(&buf)?))
}
