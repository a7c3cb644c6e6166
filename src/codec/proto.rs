//! Protobuf codec using `prost`.

use bytes::Bytes;
use prost::Message;

use crate::error::Result;

/// Protobuf codec for structured payloads.
pub struct ProtoCodec;

impl ProtoCodec {
    /// Encode a message to protobuf bytes.
    #[inline]
    pub fn encode<M: Message>(message: &M) -> Bytes {
        Bytes::from(message.encode_to_vec())
    }

    /// Decode protobuf bytes to a message.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a valid encoding of `M`.
    #[inline]
    pub fn decode<M: Message + Default>(bytes: &[u8]) -> Result<M> {
        Ok(M::decode(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AyiError;
    use crate::protocol::messages::{AccessGranted, OkResponse};

    #[test]
    fn test_encode_decode_message() {
        let original = AccessGranted {
            user_id: "u1".into(),
            auth_token: "t1".into(),
        };
        let decoded: AccessGranted = ProtoCodec::decode(&ProtoCodec::encode(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_empty_payload_decodes_to_default() {
        let decoded: OkResponse = ProtoCodec::decode(&[]).unwrap();
        assert_eq!(decoded.r#type, 0);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn test_truncated_payload_fails() {
        // Field 1, length-delimited, claims 10 bytes but carries 1.
        let result: Result<AccessGranted> = ProtoCodec::decode(&[0x0A, 0x0A, b'x']);
        assert!(matches!(result, Err(AyiError::Decode(_))));
    }
}
