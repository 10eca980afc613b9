//! One-shot platform authentication handshake (`spec.md` §6.2), run once at
//! startup before the dynamic configuration exists.

use std::net::TcpStream;
use std::path::Path;

use slog::{info, o, Logger};

use crate::config::{write_dynamic_conf, GatewayId};
use crate::error::GatewayError;
use crate::telemetry_proto::{read_packet, write_packet, TelemetryPacketType};

/// Connects to `(platform_ip, platform_port)`, sends an `Auth` frame, and
/// writes the response payload verbatim to `dynamic_conf_path`.
pub fn authenticate(
    gw_id: GatewayId,
    platform_ip: &str,
    platform_port: u16,
    dynamic_conf_path: &Path,
    log: &Logger,
) -> Result<(), GatewayError> {
    let log = log.new(o!("component" => "auth"));

    let mut stream = TcpStream::connect((platform_ip, platform_port))
        .map_err(|e| GatewayError::AuthFailed(format!("connect to platform manager failed: {e}")))?;

    write_packet(&mut stream, gw_id, TelemetryPacketType::Auth, &[])
        .map_err(|e| GatewayError::AuthFailed(format!("failed to send auth frame: {e}")))?;

    let response = read_packet(&mut stream)
        .map_err(|e| GatewayError::AuthFailed(format!("failed to read auth response: {e}")))?;

    write_dynamic_conf(dynamic_conf_path, &response.payload)?;

    info!(log, "gateway authenticated"; "dynamic_conf" => %dynamic_conf_path.display());

    Ok(())
}
