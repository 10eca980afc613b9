//! Wire-level constants and small value types shared by the codec.
//!
//! The header layout is fixed and precedes the (possibly encrypted) payload
//! and the trailing integrity tag:
//!
//! ```text
//! app_key[8] | dev_id[1] | packet_type[1] | payload_len[1] | payload[..] | tag[TAG_SIZE]
//! ```

use crate::error::CodecError;

pub const APP_KEY_SIZE: usize = 8;
pub const TAG_SIZE: usize = 8;
pub const HEADER_SIZE: usize = APP_KEY_SIZE + 1 /* dev_id */ + 1 /* type */ + 1 /* len */;
pub const MAX_FRAME_SIZE: usize = 256;
pub const AES_BLOCK_SIZE: usize = 16;
pub const SECURE_KEY_SIZE: usize = 16;

/// 8-byte ASCII application identifier, used verbatim as a table-name suffix.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct AppKey(pub [u8; APP_KEY_SIZE]);

impl AppKey {
    #[inline]
    pub fn as_bytes(&self) -> &[u8; APP_KEY_SIZE] {
        &self.0
    }

    /// Renders the key as a `str`, lossily replacing non-ASCII bytes. Used only
    /// for logging; SQL interpolation goes through [`crate::validate_app_key`].
    pub fn display(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl std::fmt::Display for AppKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Device id, unique within an application.
pub type DevId = u8;

pub type SecureKey = [u8; SECURE_KEY_SIZE];

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum PacketType {
    TimeReq = 0x01,
    TimeSend = 0x02,
    DataSend = 0x03,
    PendReq = 0x04,
    PendSend = 0x05,
    Stat = 0x06,
}

impl PacketType {
    #[inline]
    pub fn from_byte(byte: u8) -> Result<PacketType, CodecError> {
        Ok(match byte {
            0x01 => PacketType::TimeReq,
            0x02 => PacketType::TimeSend,
            0x03 => PacketType::DataSend,
            0x04 => PacketType::PendReq,
            0x05 => PacketType::PendSend,
            0x06 => PacketType::Stat,
            other => return Err(CodecError::BadPacketType(other)),
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
#[repr(u8)]
pub enum StatCode {
    Ack = 0x00,
    AckPend = 0x01,
    Nack = 0x02,
}

impl StatCode {
    #[inline]
    pub fn from_byte(byte: u8) -> Option<StatCode> {
        match byte {
            0x00 => Some(StatCode::Ack),
            0x01 => Some(StatCode::AckPend),
            0x02 => Some(StatCode::Nack),
            _ => None,
        }
    }
}
