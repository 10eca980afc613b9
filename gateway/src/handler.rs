//! Per-packet dispatch (`spec.md` §4.5) and the downlink retry loop
//! (`spec.md` §4.6). Each branch either replies exactly once or doesn't reply
//! at all; DB and encode failures increment [`crate::error_counter::ErrorCounter`]
//! and are otherwise swallowed, since a single bad request must never bring
//! down a worker thread.

use std::io::Write;
use std::net::TcpStream;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Local;
use gw_protocol::{decode, encode, encode_utc_payload, validate_app_key, Decoded, PacketType, ProtocolConf, StatCode};
use slog::{error, o, warn, Logger};

use crate::context::Context;
use crate::db::DbKeyResolver;

const MAX_RETRY_ATTEMPTS: u32 = 5;
const RETRY_INTERVAL: Duration = Duration::from_millis(300);

pub fn handle(mut stream: TcpStream, bytes: &[u8], ctx: &Context) -> std::io::Result<()> {
    let log = ctx.log.new(o!("component" => "handler"));
    let resolver = DbKeyResolver { db: &ctx.db };

    let decoded = match decode(bytes, &resolver) {
        Ok(d) => d,
        Err(e) => {
            warn!(log, "decode failed"; "error" => %e);
            ctx.error_counter.increment();
            return Ok(());
        }
    };

    match decoded.packet_type {
        PacketType::TimeReq => handle_time_req(&mut stream, &decoded.conf, &log),
        PacketType::DataSend => handle_data_send(&mut stream, &decoded, ctx, &log),
        PacketType::PendReq => handle_pend_req(&mut stream, &decoded.conf, ctx, &log),
        PacketType::Stat => handle_stat(&decoded, ctx, &log),
        PacketType::TimeSend | PacketType::PendSend => {
            warn!(log, "device sent a server-only packet type"; "packet_type" => ?decoded.packet_type);
            ctx.error_counter.increment();
            send_stat(&mut stream, &decoded.conf, StatCode::Nack, &log);
        }
    }

    Ok(())
}

fn current_utc() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs() as u32
}

fn respond(stream: &mut TcpStream, conf: &ProtocolConf, packet_type: PacketType, payload: &[u8], log: &Logger) {
    match encode(conf, packet_type, payload) {
        Ok(frame) => {
            if let Err(e) = stream.write_all(&frame) {
                warn!(log, "failed to write response"; "error" => %e);
            }
        }
        Err(e) => {
            error!(log, "failed to encode response"; "error" => %e);
        }
    }
}

fn send_stat(stream: &mut TcpStream, conf: &ProtocolConf, code: StatCode, log: &Logger) {
    respond(stream, conf, PacketType::Stat, &[code as u8], log);
}

fn handle_time_req(stream: &mut TcpStream, conf: &ProtocolConf, log: &Logger) {
    let payload = encode_utc_payload(current_utc());
    respond(stream, conf, PacketType::TimeSend, &payload, log);
}

fn handle_data_send(stream: &mut TcpStream, decoded: &Decoded, ctx: &Context, log: &Logger) {
    let conf = &decoded.conf;

    if decoded.payload.len() < 4 {
        warn!(log, "DATA_SEND payload shorter than the 4-byte utc field");
        ctx.error_counter.increment();
        return;
    }

    if !validate_app_key(&conf.app_key) {
        warn!(log, "rejecting request with malformed app_key"; "app_key" => %conf.app_key);
        ctx.error_counter.increment();
        return;
    }

    let mut utc_bytes = [0u8; 4];
    utc_bytes.copy_from_slice(&decoded.payload[0..4]);
    let mut utc = u32::from_le_bytes(utc_bytes);
    if utc == 0 {
        utc = current_utc();
    }
    let data = &decoded.payload[4..];

    let timedate = Local::now().format("%d/%m/%Y %H:%M:%S").to_string();

    if let Err(e) = ctx.db.insert_reading(&conf.app_key, conf.dev_id, utc, &timedate, data) {
        error!(log, "failed to insert sensor reading"; "error" => %e);
        ctx.error_counter.increment();
        return;
    }

    ctx.activity_log.add(conf.app_key, conf.dev_id);

    let has_pending = match ctx.db.has_unacked_pending(&conf.app_key, conf.dev_id) {
        Ok(v) => v,
        Err(e) => {
            error!(log, "failed to query pending messages"; "error" => %e);
            ctx.error_counter.increment();
            return;
        }
    };

    let code = if has_pending { StatCode::AckPend } else { StatCode::Ack };
    send_stat(stream, conf, code, log);
}

fn handle_pend_req(stream: &mut TcpStream, conf: &ProtocolConf, ctx: &Context, log: &Logger) {
    let row = match ctx.db.first_unacked_pending(&conf.app_key, conf.dev_id) {
        Ok(Some(row)) => row,
        Ok(None) => {
            send_stat(stream, conf, StatCode::Nack, log);
            return;
        }
        Err(e) => {
            error!(log, "failed to query pending messages"; "error" => %e);
            ctx.error_counter.increment();
            return;
        }
    };

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    let payload = match STANDARD.decode(&row.body_b64) {
        Ok(p) => p,
        Err(e) => {
            error!(log, "stored pending message body is not valid base64"; "error" => %e);
            ctx.error_counter.increment();
            return;
        }
    };

    retry_until_acked(
        MAX_RETRY_ATTEMPTS,
        RETRY_INTERVAL,
        || respond(stream, conf, PacketType::PendSend, &payload, log),
        || match ctx.db.top_unacked_body(&conf.app_key, conf.dev_id) {
            Ok(Some(top)) => top != row.body_b64,
            Ok(None) => true,
            Err(e) => {
                error!(log, "failed to re-check pending message during retry"; "error" => %e);
                true
            }
        },
    );
}

/// Sends via `send` up to `max_attempts` times, sleeping `interval` between
/// attempts, stopping as soon as `was_acknowledged` reports the message has
/// left the pending table (`spec.md` §4.6). Kept generic over both closures
/// so the delivery transport and the acknowledgement check can vary
/// independently of the retry policy itself.
fn retry_until_acked(max_attempts: u32, interval: Duration, mut send: impl FnMut(), mut was_acknowledged: impl FnMut() -> bool) {
    for _ in 0..max_attempts {
        send();
        std::thread::sleep(interval);
        if was_acknowledged() {
            return;
        }
    }
}

/// `STAT`'s sub-code acknowledges the *most recent* unacknowledged row for
/// `(app_key, dev_id)` rather than re-validating the delivered body, matching
/// the original source's literal behavior (resolved Open Question, `spec.md`
/// §9 / SPEC_FULL.md §9.2). `STAT` never elicits a reply.
fn handle_stat(decoded: &Decoded, ctx: &Context, log: &Logger) {
    let conf = &decoded.conf;
    let sub_code = decoded.payload.first().copied().and_then(StatCode::from_byte);

    match sub_code {
        Some(StatCode::Ack) | Some(StatCode::AckPend) => match ctx.db.first_unacked_pending(&conf.app_key, conf.dev_id) {
            Ok(Some(row)) => {
                if let Err(e) = ctx.db.ack_pending(&conf.app_key, conf.dev_id, &row.body_b64) {
                    error!(log, "failed to acknowledge pending message"; "error" => %e);
                    ctx.error_counter.increment();
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(log, "failed to look up pending message to acknowledge"; "error" => %e);
                ctx.error_counter.increment();
            }
        },
        Some(StatCode::Nack) | None => {
            warn!(log, "ignoring STAT with nack or unrecognised sub-code");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn retry_stops_as_soon_as_acknowledged() {
        let sends = Cell::new(0);
        let acked_after = 2;

        retry_until_acked(
            MAX_RETRY_ATTEMPTS,
            Duration::from_millis(0),
            || sends.set(sends.get() + 1),
            || sends.get() >= acked_after,
        );

        assert_eq!(sends.get(), acked_after);
    }

    #[test]
    fn retry_gives_up_after_max_attempts() {
        let sends = Cell::new(0);

        retry_until_acked(
            MAX_RETRY_ATTEMPTS,
            Duration::from_millis(0),
            || sends.set(sends.get() + 1),
            || false,
        );

        assert_eq!(sends.get(), MAX_RETRY_ATTEMPTS);
    }
}
