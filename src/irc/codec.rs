//! Line codec for IRC connections.

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};

use crate::common::error::ConnectionError;
use crate::irc::message::IrcMessage;

/// Longest line accepted from the server (tags included).
pub const MAX_INBOUND_LINE: usize = 8192;

/// Codec for CRLF-terminated IRC lines.
///
/// Bare `\n` terminators are accepted. Invalid UTF-8 is replaced rather than
/// rejected, and blank lines are skipped.
#[derive(Debug, Default)]
pub struct IrcCodec {
    /// Bytes already scanned for a terminator.
    scanned: usize,
}

impl IrcCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for IrcCodec {
    type Item = IrcMessage;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.scanned..].iter().position(|b| *b == b'\n');

            let Some(offset) = newline else {
                if src.len() > MAX_INBOUND_LINE {
                    return Err(ConnectionError::Protocol {
                        message: format!("line exceeds {} bytes", MAX_INBOUND_LINE),
                    });
                }
                self.scanned = src.len();
                return Ok(None);
            };

            let line = src.split_to(self.scanned + offset + 1);
            self.scanned = 0;

            let text = String::from_utf8_lossy(&line);
            if let Some(message) = IrcMessage::parse(&text) {
                return Ok(Some(message));
            }
        }
    }
}

impl Encoder<IrcMessage> for IrcCodec {
    type Error = ConnectionError;

    fn encode(&mut self, item: IrcMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.to_string();
        if line.contains(['\r', '\n']) {
            return Err(ConnectionError::Protocol {
                message: "outgoing line contains a line break".to_string(),
            });
        }

        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// A framed IRC connection.
pub type IrcConnection<S> = Framed<S, IrcCodec>;

/// Create a new IRC connection from a stream.
pub fn new_irc_connection<S: AsyncRead + AsyncWrite>(stream: S) -> IrcConnection<S> {
    Framed::new(stream, IrcCodec::new())
}
