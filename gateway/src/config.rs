//! Static and dynamic configuration loading.
//!
//! Field order and names follow `spec.md` §6 exactly, and match the
//! original source's `process_static_conf`/`process_dynamic_conf` reading
//! order. Unlike the original (a hand-rolled positional walk over a JSON
//! value tree), this parses through `serde`/`serde_json` derive, the way
//! the teacher's `authenticator::core::Config` and `util::gen_keys` parse
//! their JSON inputs.

use std::fmt;
use std::fs;
use std::path::Path;

use gw_protocol::frame::{SecureKey, SECURE_KEY_SIZE};
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

pub const GW_ID_SIZE: usize = 6;

/// 6-byte gateway identity, immutable for the process lifetime.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct GatewayId(pub [u8; GW_ID_SIZE]);

impl GatewayId {
    /// Base64 textual form, used as the `gateways` table primary key
    /// (`spec.md` §3).
    pub fn to_base64(self) -> String {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        STANDARD.encode(self.0)
    }
}

/// Parses a colon-hex string (`"AA:BB:CC:..."`) into a fixed-size byte array.
fn parse_colon_hex<const N: usize>(s: &str) -> Result<[u8; N], String> {
    let mut out = [0u8; N];
    let mut parts = s.split(':');
    for slot in out.iter_mut() {
        let part = parts
            .next()
            .ok_or_else(|| format!("expected {} colon-hex octets, got fewer", N))?;
        *slot = u8::from_str_radix(part, 16).map_err(|e| e.to_string())?;
    }
    if parts.next().is_some() {
        return Err(format!("expected {} colon-hex octets, got more", N));
    }
    Ok(out)
}

struct ColonHexVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for ColonHexVisitor<N> {
    type Value = [u8; N];

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "a colon-separated hex string of {} bytes", N)
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        parse_colon_hex(v).map_err(de::Error::custom)
    }
}

fn deserialize_colon_hex<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_str(ColonHexVisitor::<N>)
}

fn deserialize_gw_id<'de, D>(deserializer: D) -> Result<GatewayId, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_colon_hex::<D, GW_ID_SIZE>(deserializer).map(GatewayId)
}

fn deserialize_secure_key<'de, D>(deserializer: D) -> Result<SecureKey, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_colon_hex::<D, SECURE_KEY_SIZE>(deserializer)
}

/// `conf/static.conf` — immutable for the process lifetime once loaded.
#[derive(Debug, Clone, Deserialize)]
pub struct StaticConf {
    #[serde(rename = "gw_id", deserialize_with = "deserialize_gw_id")]
    pub gw_id: GatewayId,
    #[serde(rename = "secure_key", deserialize_with = "deserialize_secure_key")]
    pub gw_secure_key: SecureKey,
    pub gw_port: u16,
    pub db_type: String,
    pub platform_gw_manager_ip: String,
    pub platform_gw_manager_port: u16,
    pub thread_pool_size: u8,
}

/// `conf/dynamic.conf` — obtained from the platform during authentication,
/// immutable thereafter for the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynamicConf {
    pub db_addr: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_pass: String,
    pub telemetry_send_period: u32,
}

pub fn read_static_conf(path: &Path) -> Result<StaticConf, GatewayError> {
    let contents = fs::read_to_string(path).map_err(|e| GatewayError::ConfigRead(path.to_path_buf(), e))?;
    serde_json::from_str(&contents).map_err(|e| GatewayError::ConfigParse(path.to_path_buf(), e))
}

pub fn read_dynamic_conf(path: &Path) -> Result<DynamicConf, GatewayError> {
    let contents = fs::read_to_string(path).map_err(|e| GatewayError::ConfigRead(path.to_path_buf(), e))?;
    serde_json::from_str(&contents).map_err(|e| GatewayError::ConfigParse(path.to_path_buf(), e))
}

pub fn write_dynamic_conf(path: &Path, raw: &[u8]) -> Result<(), GatewayError> {
    fs::write(path, raw).map_err(|e| GatewayError::ConfigRead(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_static_conf_shape() {
        let json = r#"{
            "gw_id": "aa:bb:cc:dd:ee:ff",
            "secure_key": "00:01:02:03:04:05:06:07:08:09:0a:0b:0c:0d:0e:0f",
            "gw_port": 9000,
            "db_type": "postgres",
            "platform_gw_manager_ip": "10.0.0.1",
            "platform_gw_manager_port": 9100,
            "thread_pool_size": 4
        }"#;
        let conf: StaticConf = serde_json::from_str(json).unwrap();
        assert_eq!(conf.gw_id.0, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(conf.gw_secure_key[0], 0x00);
        assert_eq!(conf.gw_secure_key[15], 0x0f);
        assert_eq!(conf.gw_port, 9000);
        assert_eq!(conf.thread_pool_size, 4);
    }

    #[test]
    fn rejects_malformed_colon_hex() {
        let json = r#"{
            "gw_id": "not-hex",
            "secure_key": "00:01:02:03:04:05:06:07:08:09:0a:0b:0c:0d:0e:0f",
            "gw_port": 9000,
            "db_type": "postgres",
            "platform_gw_manager_ip": "10.0.0.1",
            "platform_gw_manager_port": 9100,
            "thread_pool_size": 4
        }"#;
        assert!(serde_json::from_str::<StaticConf>(json).is_err());
    }

    #[test]
    fn gateway_id_base64_round_trips() {
        let id = GatewayId([1, 2, 3, 4, 5, 6]);
        let b64 = id.to_base64();
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        assert_eq!(STANDARD.decode(b64).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }
}
