//! Framing for the OVSDB connection.
//!
//! OVSDB peers exchange bare JSON values back to back on the stream
//! with no length prefix or delimiter, so the decoder parses
//! incrementally and waits for more bytes on a mid-value EOF.

use bytes::{Buf, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

/// Codec for back-to-back JSON values on a byte stream.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl Decoder for JsonCodec {
    type Item = Value;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Value>, Self::Error> {
        let mut values = serde_json::Deserializer::from_slice(src).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                let consumed = values.byte_offset();
                src.advance(consumed);
                Ok(Some(value))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            None => Ok(None),
        }
    }
}

impl Encoder<Value> for JsonCodec {
    type Error = std::io::Error;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes = serde_json::to_vec(&item)?;
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}
