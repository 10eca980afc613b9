//! Frame encode/decode — the stateful binary framing layer described in
//! `spec.md` §4.1.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::crypto;
use crate::error::CodecError;
use crate::frame::{AppKey, DevId, PacketType, SecureKey, APP_KEY_SIZE, HEADER_SIZE, MAX_FRAME_SIZE, TAG_SIZE};
use crate::keycache::KeyResolver;
use crate::tag;

/// Per-application encryption configuration carried alongside a request.
/// Refreshed by the checkup callback on every decode, per `spec.md` §4.1.
#[derive(Debug, Clone, Copy)]
pub struct ProtocolConf {
    pub app_key: AppKey,
    pub dev_id: DevId,
    pub secure_key: SecureKey,
    pub secure: bool,
}

/// The result of a successful [`decode`]: the parsed packet plus the
/// per-application conf the checkup callback resolved for this frame.
pub struct Decoded {
    pub conf: ProtocolConf,
    pub packet_type: PacketType,
    pub payload: Vec<u8>,
}

fn write_header(buf: &mut Vec<u8>, app_key: &AppKey, dev_id: DevId, packet_type: PacketType, payload_len: u8) {
    buf.extend_from_slice(app_key.as_bytes());
    buf.push(dev_id);
    buf.push(packet_type as u8);
    buf.push(payload_len);
}

/// Encodes a frame. Encrypts `payload` first (AES-128-ECB) when
/// `conf.secure` is set, then prepends the header and appends the integrity
/// tag. Fails with [`CodecError::EncodeOverflow`] if the result would exceed
/// [`MAX_FRAME_SIZE`] bytes.
pub fn encode(conf: &ProtocolConf, packet_type: PacketType, payload: &[u8]) -> Result<Vec<u8>, CodecError> {
    let wire_payload = if conf.secure {
        crypto::encrypt(payload, &conf.secure_key)
    } else {
        payload.to_vec()
    };

    let payload_len: u8 = wire_payload
        .len()
        .try_into()
        .map_err(|_| CodecError::EncodeOverflow(wire_payload.len()))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + wire_payload.len() + TAG_SIZE);
    write_header(&mut frame, &conf.app_key, conf.dev_id, packet_type, payload_len);
    frame.extend_from_slice(&wire_payload);

    let frame_tag = tag::compute(&conf.secure_key, &frame[..HEADER_SIZE], &wire_payload);
    frame.extend_from_slice(&frame_tag);

    if frame.len() > MAX_FRAME_SIZE {
        return Err(CodecError::EncodeOverflow(frame.len()));
    }

    Ok(frame)
}

/// Decodes a raw frame. Parses `app_key` out of the header, calls
/// `resolver.resolve` to refresh the secure key/flag (the checkup callback),
/// validates the integrity tag, and decrypts the payload when secure.
pub fn decode(frame: &[u8], resolver: &dyn KeyResolver) -> Result<Decoded, CodecError> {
    if frame.len() < HEADER_SIZE + TAG_SIZE {
        return Err(CodecError::DecodeShort);
    }

    let mut app_key_bytes = [0u8; APP_KEY_SIZE];
    app_key_bytes.copy_from_slice(&frame[0..APP_KEY_SIZE]);
    let app_key = AppKey(app_key_bytes);

    let dev_id = frame[APP_KEY_SIZE];
    let packet_type_byte = frame[APP_KEY_SIZE + 1];
    let payload_len = frame[APP_KEY_SIZE + 2] as usize;
    let packet_type = PacketType::from_byte(packet_type_byte)?;

    let body_start = HEADER_SIZE;
    let body_end = body_start + payload_len;
    if frame.len() < body_end + TAG_SIZE || frame.len() != body_end + TAG_SIZE {
        return Err(CodecError::DecodeShort);
    }

    let wire_payload = &frame[body_start..body_end];
    let received_tag = &frame[body_end..body_end + TAG_SIZE];

    let (secure_key, secure) = resolver.resolve(&app_key)?;

    if !tag::verify(&secure_key, &frame[..HEADER_SIZE], wire_payload, received_tag) {
        return Err(CodecError::TagMismatch);
    }

    let payload = if secure {
        crypto::decrypt(wire_payload, &secure_key).ok_or(CodecError::TagMismatch)?
    } else {
        wire_payload.to_vec()
    };

    Ok(Decoded {
        conf: ProtocolConf {
            app_key,
            dev_id,
            secure_key,
            secure,
        },
        packet_type,
        payload,
    })
}

/// Little-endian encodes a `u32` UTC timestamp, the payload shape of
/// `TIME_SEND` (`spec.md` §6).
pub fn encode_utc_payload(utc: u32) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4);
    buf.write_u32::<LittleEndian>(utc).expect("writing to a Vec cannot fail");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keycache::StaticResolver;

    fn conf(secure: bool) -> ProtocolConf {
        ProtocolConf {
            app_key: AppKey(*b"APP00001"),
            dev_id: 1,
            secure_key: [5u8; 16],
            secure,
        }
    }

    #[test]
    fn round_trips_insecure() {
        let c = conf(false);
        let resolver = StaticResolver { key: c.secure_key, secure: false };
        let frame = encode(&c, PacketType::DataSend, b"temp=23").unwrap();
        let decoded = decode(&frame, &resolver).unwrap();
        assert_eq!(decoded.packet_type, PacketType::DataSend);
        assert_eq!(decoded.payload, b"temp=23");
    }

    #[test]
    fn round_trips_secure() {
        let c = conf(true);
        let resolver = StaticResolver { key: c.secure_key, secure: true };
        let frame = encode(&c, PacketType::DataSend, b"temp=23").unwrap();
        let decoded = decode(&frame, &resolver).unwrap();
        assert_eq!(decoded.payload, b"temp=23");
    }

    #[test]
    fn rejects_tampered_frame() {
        let c = conf(false);
        let resolver = StaticResolver { key: c.secure_key, secure: false };
        let mut frame = encode(&c, PacketType::DataSend, b"temp=23").unwrap();
        let last = frame.len() - 1;
        frame[last] ^= 0xFF;
        assert_eq!(decode(&frame, &resolver).unwrap_err(), CodecError::TagMismatch);
    }

    #[test]
    fn rejects_short_frame() {
        let resolver = StaticResolver { key: [0u8; 16], secure: false };
        assert_eq!(decode(&[1, 2, 3], &resolver).unwrap_err(), CodecError::DecodeShort);
    }

    #[test]
    fn rejects_bad_packet_type() {
        let c = conf(false);
        let resolver = StaticResolver { key: c.secure_key, secure: false };
        let mut frame = encode(&c, PacketType::DataSend, b"x").unwrap();
        frame[APP_KEY_SIZE + 1] = 0xFF;
        assert!(matches!(decode(&frame, &resolver), Err(CodecError::BadPacketType(0xFF))));
    }

    #[test]
    fn encode_overflow_on_oversized_payload() {
        let c = conf(false);
        let payload = vec![0u8; MAX_FRAME_SIZE];
        assert!(matches!(encode(&c, PacketType::DataSend, &payload), Err(CodecError::EncodeOverflow(_))));
    }

    #[test]
    fn boundary_payload_fits_exactly() {
        let c = conf(false);
        let max_payload = MAX_FRAME_SIZE - HEADER_SIZE - TAG_SIZE;
        let payload = vec![7u8; max_payload];
        let frame = encode(&c, PacketType::DataSend, &payload).unwrap();
        assert_eq!(frame.len(), MAX_FRAME_SIZE);
    }

    #[test]
    fn boundary_payload_one_byte_over_is_overflow() {
        let c = conf(false);
        let max_payload = MAX_FRAME_SIZE - HEADER_SIZE - TAG_SIZE + 1;
        let payload = vec![7u8; max_payload];
        assert!(matches!(encode(&c, PacketType::DataSend, &payload), Err(CodecError::EncodeOverflow(_))));
    }
}
