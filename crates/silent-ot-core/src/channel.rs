//! The transport between the two parties.
//!
//! The channel is assumed to deliver messages reliably and in order, and to fail-stop.
//! Sending never blocks: it queues an owned copy of the data. Receiving blocks until the
//! next message arrives or the peer hangs up.

use futures::{
    channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender},
    StreamExt,
};
use silent_core::Block;

/// A transport failure.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the channel.
    #[error("channel closed")]
    Closed,
    /// A message did not have the expected shape.
    #[error("malformed message: {0}")]
    Malformed(String),
}

/// A message channel to the other party.
pub trait Channel {
    /// Queues a copy of `data` for delivery and returns immediately.
    fn send_copy(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Blocks until the next message is received.
    fn recv(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Queues a copy of `blocks` for delivery. The wire format is the raw 16-byte image of
    /// each block, with no header.
    fn send_blocks(&mut self, blocks: &[Block]) -> Result<(), TransportError> {
        self.send_copy(bytemuck::cast_slice(blocks))
    }

    /// Blocks until the next message is received and parses it as blocks.
    fn recv_blocks(&mut self) -> Result<Vec<Block>, TransportError> {
        let bytes = self.recv()?;
        if bytes.len() % Block::LEN != 0 {
            return Err(TransportError::Malformed(format!(
                "message of {} bytes is not a whole number of blocks",
                bytes.len()
            )));
        }

        Ok(bytes
            .chunks_exact(Block::LEN)
            .map(|chunk| {
                let mut b = [0u8; 16];
                b.copy_from_slice(chunk);
                Block::new(b)
            })
            .collect())
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn send_copy(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).send_copy(data)
    }

    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).recv()
    }
}

/// One end of an in-memory duplex channel.
#[derive(Debug)]
pub struct MemoryChannel {
    sink: UnboundedSender<Vec<u8>>,
    stream: UnboundedReceiver<Vec<u8>>,
    bytes_sent: usize,
    bytes_received: usize,
}

impl MemoryChannel {
    /// Returns the number of bytes sent on this end.
    pub fn bytes_sent(&self) -> usize {
        self.bytes_sent
    }

    /// Returns the number of bytes received on this end.
    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }
}

impl Channel for MemoryChannel {
    fn send_copy(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.sink
            .unbounded_send(data.to_vec())
            .map_err(|_| TransportError::Closed)?;
        self.bytes_sent += data.len();
        Ok(())
    }

    fn recv(&mut self) -> Result<Vec<u8>, TransportError> {
        let msg = pollster::block_on(self.stream.next()).ok_or(TransportError::Closed)?;
        self.bytes_received += msg.len();
        Ok(msg)
    }
}

/// Creates a pair of connected in-memory channels.
pub fn duplex() -> (MemoryChannel, MemoryChannel) {
    let (a_sink, b_stream) = unbounded();
    let (b_sink, a_stream) = unbounded();

    (
        MemoryChannel {
            sink: a_sink,
            stream: a_stream,
            bytes_sent: 0,
            bytes_received: 0,
        },
        MemoryChannel {
            sink: b_sink,
            stream: b_stream,
            bytes_sent: 0,
            bytes_received: 0,
        },
    )
}
