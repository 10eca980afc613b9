//! The gateway-to-platform telemetry/auth wire format (`spec.md` §6.2),
//! a second, simpler framed protocol than the device-facing one in
//! `gw_protocol`. The original source's `gateway_telemetry_protocol` module
//! is outside the retrieval pack; this is the minimal shape this gateway
//! needs to speak: one packet type, `Auth`, with no payload.
//!
//! ```text
//! gw_id[6] | packet_type[1] | payload_len[2 LE] | payload[payload_len]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

use crate::config::{GatewayId, GW_ID_SIZE};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum TelemetryPacketType {
    Auth = 0x01,
    AuthResponse = 0x02,
}

impl TelemetryPacketType {
    fn from_byte(byte: u8) -> Option<TelemetryPacketType> {
        match byte {
            0x01 => Some(TelemetryPacketType::Auth),
            0x02 => Some(TelemetryPacketType::AuthResponse),
            _ => None,
        }
    }
}

pub fn encode_packet(gw_id: GatewayId, packet_type: TelemetryPacketType, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(GW_ID_SIZE + 1 + 2 + payload.len());
    buf.extend_from_slice(&gw_id.0);
    buf.push(packet_type as u8);
    buf.write_u16::<LittleEndian>(payload.len() as u16).expect("Vec writes cannot fail");
    buf.extend_from_slice(payload);
    buf
}

pub fn write_packet<W: Write>(mut stream: W, gw_id: GatewayId, packet_type: TelemetryPacketType, payload: &[u8]) -> io::Result<()> {
    stream.write_all(&encode_packet(gw_id, packet_type, payload))
}

pub struct DecodedPacket {
    pub packet_type: TelemetryPacketType,
    pub payload: Vec<u8>,
}

pub fn read_packet<R: Read>(mut stream: R) -> io::Result<DecodedPacket> {
    let mut gw_id = [0u8; GW_ID_SIZE];
    stream.read_exact(&mut gw_id)?;
    let packet_type_byte = stream.read_u8()?;
    let packet_type = TelemetryPacketType::from_byte(packet_type_byte)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unrecognised telemetry packet type"))?;
    let payload_len = stream.read_u16::<LittleEndian>()? as usize;
    let mut payload = vec![0u8; payload_len];
    stream.read_exact(&mut payload)?;
    Ok(DecodedPacket { packet_type, payload })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_auth_packet() {
        let gw_id = GatewayId([1, 2, 3, 4, 5, 6]);
        let encoded = encode_packet(gw_id, TelemetryPacketType::Auth, &[]);
        let decoded = read_packet(Cursor::new(encoded)).unwrap();
        assert_eq!(decoded.packet_type, TelemetryPacketType::Auth);
        assert!(decoded.payload.is_empty());
    }

    #[test]
    fn round_trips_response_with_payload() {
        let gw_id = GatewayId([9, 9, 9, 9, 9, 9]);
        let payload = br#"{"db_addr":"10.0.0.2"}"#;
        let encoded = encode_packet(gw_id, TelemetryPacketType::AuthResponse, payload);
        let decoded = read_packet(Cursor::new(encoded)).unwrap();
        assert_eq!(decoded.payload, payload);
    }
}
