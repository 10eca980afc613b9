//! Database surface: the small set of parameterised queries `spec.md` §6
//! names, behind a single mutex-guarded `postgres::Client`.
//!
//! `spec.md` §3/§5 require a single process-wide DB mutex with no two calls
//! overlapping in wall-clock time; that is realized literally here as a
//! `Mutex<postgres::Client>` rather than a connection pool, since pooling
//! would violate the serialization invariant the spec is testing for.

use std::sync::Mutex;

use gw_protocol::{AppKey, CodecError, DevId, KeyResolver, SecureKey};
use postgres::{Client, NoTls};

use crate::config::DynamicConf;
use crate::error::GatewayError;

pub struct PendingRow {
    pub body_b64: String,
    pub ack: bool,
}

pub struct Db {
    client: Mutex<Client>,
}

impl Db {
    pub fn connect(conf: &DynamicConf) -> Result<Db, GatewayError> {
        let conninfo = format!(
            "host={} port={} dbname={} user={} password={}",
            conf.db_addr, conf.db_port, conf.db_name, conf.db_user, conf.db_pass
        );
        let client = Client::connect(&conninfo, NoTls)?;
        Ok(Db {
            client: Mutex::new(client),
        })
    }

    /// `INSERT INTO dev_<app_key>_<dev_id> VALUES ($utc, $timedate, $bindata)`.
    /// Callers MUST validate `app_key` with [`gw_protocol::validate_app_key`]
    /// before calling this — the table name is interpolated, not bound.
    pub fn insert_reading(
        &self,
        app_key: &AppKey,
        dev_id: DevId,
        utc: u32,
        timedate: &str,
        data: &[u8],
    ) -> Result<(), postgres::Error> {
        let table = format!("dev_{}_{}", app_key.display(), dev_id);
        let query = format!("INSERT INTO {table} VALUES ($1, $2, $3)");
        let mut client = self.client.lock().expect("db mutex poisoned");
        client.execute(&query, &[&(utc as i64), &timedate, &data])?;
        Ok(())
    }

    /// `SELECT * FROM pend_msgs WHERE app_key=? AND dev_id=? AND ack=false`,
    /// returning only whether any row matched (used by the `DATA_SEND` path
    /// to decide `ACK` vs `ACK_PEND`).
    pub fn has_unacked_pending(&self, app_key: &AppKey, dev_id: DevId) -> Result<bool, postgres::Error> {
        let mut client = self.client.lock().expect("db mutex poisoned");
        let row_count = client.query(
            "SELECT 1 FROM pend_msgs WHERE app_key = $1 AND dev_id = $2 AND ack = false",
            &[&app_key.display(), &(dev_id as i32)],
        )?;
        Ok(!row_count.is_empty())
    }

    /// Same query as [`has_unacked_pending`], returning the first row's body
    /// for delivery (the `PEND_REQ` path).
    pub fn first_unacked_pending(
        &self,
        app_key: &AppKey,
        dev_id: DevId,
    ) -> Result<Option<PendingRow>, postgres::Error> {
        let mut client = self.client.lock().expect("db mutex poisoned");
        let rows = client.query(
            "SELECT msg, ack FROM pend_msgs WHERE app_key = $1 AND dev_id = $2 AND ack = false",
            &[&app_key.display(), &(dev_id as i32)],
        )?;
        Ok(rows.first().map(|row| PendingRow {
            body_b64: row.get(0),
            ack: row.get(1),
        }))
    }

    /// Re-checks the top unacknowledged row for the downlink retry loop
    /// (`spec.md` §4.6): returns `None` once the result set is empty or the
    /// top row's body no longer matches what was last sent.
    pub fn top_unacked_body(&self, app_key: &AppKey, dev_id: DevId) -> Result<Option<String>, postgres::Error> {
        Ok(self
            .first_unacked_pending(app_key, dev_id)?
            .map(|row| row.body_b64))
    }

    /// `UPDATE pend_msgs SET ack=true WHERE app_key=? AND dev_id=? AND msg=?`
    /// for the most recently seen unacknowledged row's body.
    pub fn ack_pending(&self, app_key: &AppKey, dev_id: DevId, body_b64: &str) -> Result<(), postgres::Error> {
        let mut client = self.client.lock().expect("db mutex poisoned");
        client.execute(
            "UPDATE pend_msgs SET ack = true WHERE app_key = $1 AND dev_id = $2 AND msg = $3",
            &[&app_key.display(), &(dev_id as i32), &body_b64],
        )?;
        Ok(())
    }

    /// `UPDATE gateways SET num_errors=?, last_keep_alive=?, last_report=? WHERE id=?`.
    pub fn update_telemetry(
        &self,
        gw_id_b64: &str,
        num_errors: u64,
        last_keep_alive: i64,
        last_report: &str,
    ) -> Result<(), postgres::Error> {
        let mut client = self.client.lock().expect("db mutex poisoned");
        client.execute(
            "UPDATE gateways SET num_errors = $1, last_keep_alive = $2, last_report = $3 WHERE id = $4",
            &[&(num_errors as i64), &last_keep_alive, &last_report, &gw_id_b64],
        )?;
        Ok(())
    }

    /// `SELECT secure_key, secure FROM applications WHERE app_key=?` — the
    /// checkup callback's query, performed under the same DB mutex as every
    /// other call (`spec.md` §4.2).
    fn lookup_application(&self, app_key: &AppKey) -> Result<Option<(String, bool)>, postgres::Error> {
        let mut client = self.client.lock().expect("db mutex poisoned");
        let rows = client.query(
            "SELECT secure_key, secure FROM applications WHERE app_key = $1",
            &[&app_key.display()],
        )?;
        Ok(rows.first().map(|row| (row.get(0), row.get(1))))
    }
}

/// Adapts [`Db`] to the codec's [`KeyResolver`] capability, performing the
/// base64-decode of the stored key the way the original source's
/// `gateway_protocol_checkup_callback` does.
pub struct DbKeyResolver<'a> {
    pub db: &'a Db,
}

impl<'a> KeyResolver for DbKeyResolver<'a> {
    fn resolve(&self, app_key: &AppKey) -> Result<(SecureKey, bool), CodecError> {
        let (secure_key_b64, secure) = self
            .db
            .lookup_application(app_key)
            .map_err(|e| CodecError::KeyResolution(e.to_string()))?
            .ok_or_else(|| CodecError::KeyResolution(format!("unknown application key {app_key}")))?;

        use base64::engine::general_purpose::STANDARD;
        use base64::Engine;
        let decoded = STANDARD
            .decode(secure_key_b64.trim_end_matches('\n'))
            .map_err(|e| CodecError::KeyResolution(e.to_string()))?;

        let mut key = [0u8; 16];
        if decoded.len() != key.len() {
            return Err(CodecError::KeyResolution(format!(
                "expected a {}-byte secure key, got {}",
                key.len(),
                decoded.len()
            )));
        }
        key.copy_from_slice(&decoded);

        Ok((key, secure))
    }
}
