//! The `CLOSE_WEBTRANSPORT_SESSION` capsule.
//!
//! The only capsule this core reads or writes. Wire form:
//! `type varint || length varint || 32-bit error code || UTF-8 message`.
//! The capsule is always written with FIN; a bare FIN with no preceding
//! capsule means the peer closed with code 0 and an empty message.

use crate::error::{Error, Result, SessionErrorCode};
use crate::frame;
use crate::varint;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseCapsule {
    pub error_code: SessionErrorCode,
    pub error_message: String,
}

impl CloseCapsule {
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<usize> {
        if self.error_message.len() > frame::MAX_CLOSE_MESSAGE_LEN {
            return Err(Error::CloseMessageTooLong);
        }
        let start = buf.len();
        varint::encode(frame::CAPSULE_CLOSE_SESSION, buf)?;
        varint::encode((4 + self.error_message.len()) as u64, buf)?;
        buf.extend_from_slice(&self.error_code.to_be_bytes());
        buf.extend_from_slice(self.error_message.as_bytes());
        Ok(buf.len() - start)
    }

    /// Decode a close capsule from `buf`, returning `(capsule, consumed)`.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        let (capsule_type, n) = varint::decode(buf)?;
        if capsule_type != frame::CAPSULE_CLOSE_SESSION {
            return Err(Error::CapsuleError(format!(
                "unexpected capsule type: {capsule_type:#x}"
            )));
        }
        let mut offset = n;

        let (payload_len, n) = varint::decode(&buf[offset..])?;
        offset += n;
        let payload_len = payload_len as usize;
        if buf.len() < offset + payload_len {
            return Err(Error::BufferTooShort);
        }
        if payload_len < 4 {
            return Err(Error::CapsuleError("close payload too short".into()));
        }

        let payload = &buf[offset..offset + payload_len];
        let error_code = SessionErrorCode::from_be_bytes([
            payload[0], payload[1], payload[2], payload[3],
        ]);
        let msg = &payload[4..];
        if msg.len() > frame::MAX_CLOSE_MESSAGE_LEN {
            return Err(Error::CloseMessageTooLong);
        }
        let error_message = std::str::from_utf8(msg)
            .map_err(|_| Error::CapsuleError("close message is not valid UTF-8".into()))?
            .to_string();

        Ok((
            Self {
                error_code,
                error_message,
            },
            offset + payload_len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(capsule: &CloseCapsule) {
        let mut buf = Vec::new();
        capsule.encode(&mut buf).unwrap();
        let (decoded, consumed) = CloseCapsule::decode(&buf).unwrap();
        assert_eq!(consumed, buf.len());
        assert_eq!(&decoded, capsule);
    }

    #[test]
    fn close_roundtrip() {
        roundtrip(&CloseCapsule {
            error_code: 42,
            error_message: "goodbye".into(),
        });
    }

    #[test]
    fn close_empty_message() {
        roundtrip(&CloseCapsule {
            error_code: 0,
            error_message: String::new(),
        });
    }

    #[test]
    fn message_too_long_rejected() {
        let capsule = CloseCapsule {
            error_code: 0,
            error_message: "x".repeat(1025),
        };
        let mut buf = Vec::new();
        assert!(matches!(
            capsule.encode(&mut buf),
            Err(Error::CloseMessageTooLong)
        ));
    }

    #[test]
    fn truncated_payload_reports_too_short() {
        let mut buf = Vec::new();
        CloseCapsule {
            error_code: 7,
            error_message: "bye".into(),
        }
        .encode(&mut buf)
        .unwrap();
        assert!(matches!(
            CloseCapsule::decode(&buf[..buf.len() - 1]),
            Err(Error::BufferTooShort)
        ));
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut buf = Vec::new();
        varint::encode(frame::CAPSULE_CLOSE_SESSION, &mut buf).unwrap();
        varint::encode(6, &mut buf).unwrap();
        buf.extend_from_slice(&[0, 0, 0, 1, 0xff, 0xfe]);
        assert!(matches!(
            CloseCapsule::decode(&buf),
            Err(Error::CapsuleError(_))
        ));
    }
}
