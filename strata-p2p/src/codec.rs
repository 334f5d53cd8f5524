use strata_common::{Message, Payload};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::NetworkError;

/// Limite de um frame; qualquer coisa maior é tratada como lixo na conexão.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const LEN_PREFIX: usize = 4;

/// Serializes a message into `len (u32 BE) || bincode(message)`.
pub fn encode_frame(message: &Message) -> Result<Vec<u8>, NetworkError> {
    let body = bincode::serialize(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(NetworkError::FrameTooLarge(body.len()));
    }

    let mut frame = Vec::with_capacity(LEN_PREFIX + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes one complete frame. Trailing bytes after the declared length are rejected.
pub fn decode_frame(frame: &[u8]) -> Result<Message, NetworkError> {
    if frame.len() < LEN_PREFIX {
        return Err(NetworkError::Serialization("frame truncado".to_string()));
    }

    let mut len_buf = [0u8; LEN_PREFIX];
    len_buf.copy_from_slice(&frame[..LEN_PREFIX]);
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetworkError::FrameTooLarge(len));
    }

    let body = &frame[LEN_PREFIX..];
    if body.len() != len {
        return Err(NetworkError::Serialization(format!(
            "tamanho declarado {} difere do corpo {}",
            len,
            body.len()
        )));
    }

    Ok(bincode::deserialize(body)?)
}

/// Reads the next frame. `Ok(None)` means the peer closed the stream cleanly.
pub async fn read_frame<R>(io: &mut R) -> Result<Option<Message>, NetworkError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; LEN_PREFIX];
    match io.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(NetworkError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    io.read_exact(&mut buf).await?;
    Ok(Some(bincode::deserialize(&buf)?))
}

pub async fn write_frame<W>(io: &mut W, message: &Message) -> Result<(), NetworkError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message)?;
    io.write_all(&frame).await?;
    io.flush().await?;
    Ok(())
}

/// Wraps an outgoing message in the `NETWORK_MESSAGE` envelope.
///
/// A `PL_SEND` is unwrapped: only its inner message travels, while the
/// envelope keeps the outer abstraction and system ids so the receiving
/// perfect link can hand it to the right layer.
pub fn envelope(message: Message, sender_host: &str, sender_listening_port: u16) -> Message {
    let Message {
        system_id,
        abstraction_id,
        payload,
    } = message;

    let inner = match payload {
        Payload::PlSend { message, .. } => message,
        other => Box::new(Message {
            system_id: system_id.clone(),
            abstraction_id: abstraction_id.clone(),
            payload: other,
        }),
    };

    Message {
        system_id,
        abstraction_id,
        payload: Payload::NetworkMessage {
            sender_host: sender_host.to_string(),
            sender_listening_port,
            message: inner,
        },
    }
}
