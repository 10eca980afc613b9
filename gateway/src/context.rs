//! Shared, read-mostly state every worker and the telemetry reporter need a
//! handle to: the DB connection, the activity log, the error counter, and
//! this gateway's identity (`spec.md` §3).

use slog::Logger;

use crate::activity_log::ActivityLog;
use crate::config::GatewayId;
use crate::db::Db;
use crate::error_counter::ErrorCounter;

pub struct Context {
    pub gw_id: GatewayId,
    pub db: Db,
    pub activity_log: ActivityLog,
    pub error_counter: ErrorCounter,
    pub log: Logger,
}
