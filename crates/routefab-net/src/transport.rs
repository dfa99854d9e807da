use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::NetError;

/// Upper bound on one frame. Large transfers are chunked above this layer,
/// so anything bigger is a protocol violation, not data.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Open a TCP connection with a deadline.
pub async fn connect(addr: &str, deadline: Duration) -> Result<TcpStream, NetError> {
    match timeout(deadline, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(NetError::Connect {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(NetError::Timeout {
            operation: "connect",
            after_ms: deadline.as_millis() as u64,
        }),
    }
}

/// Write one length-prefixed frame within the deadline.
pub async fn send_frame<W>(stream: &mut W, payload: &[u8], deadline: Duration) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_FRAME_LEN {
        return Err(NetError::FrameTooLarge {
            len: payload.len(),
            max: MAX_FRAME_LEN,
        });
    }
    let write = async {
        stream.write_u32(payload.len() as u32).await?;
        stream.write_all(payload).await?;
        stream.flush().await?;
        Ok::<(), std::io::Error>(())
    };
    match timeout(deadline, write).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(NetError::Timeout {
            operation: "send frame",
            after_ms: deadline.as_millis() as u64,
        }),
    }
}

/// Read one length-prefixed frame within the deadline.
pub async fn recv_frame<R>(stream: &mut R, deadline: Duration) -> Result<Vec<u8>, NetError>
where
    R: AsyncRead + Unpin,
{
    let read = async {
        let len = stream.read_u32().await? as usize;
        if len > MAX_FRAME_LEN {
            return Err(NetError::FrameTooLarge {
                len,
                max: MAX_FRAME_LEN,
            });
        }
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf).await?;
        Ok(buf)
    };
    match timeout(deadline, read).await {
        Ok(result) => result,
        Err(_) => Err(NetError::Timeout {
            operation: "recv frame",
            after_ms: deadline.as_millis() as u64,
        }),
    }
}

/// Serialize a message to JSON and send it as one frame.
pub async fn send_message<W, T>(stream: &mut W, message: &T, deadline: Duration) -> Result<(), NetError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(message)?;
    send_frame(stream, &bytes, deadline).await
}

/// Receive one frame and decode it as JSON.
pub async fn recv_message<R, T>(stream: &mut R, deadline: Duration) -> Result<T, NetError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let bytes = recv_frame(stream, deadline).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
