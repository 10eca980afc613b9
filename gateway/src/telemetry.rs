//! Telemetry reporter: a dedicated thread ticking every
//! `telemetry_send_period` seconds (`spec.md` §4.7).
//!
//! Per `DESIGN NOTES` §9 / REDESIGN FLAGS, this replaces the original
//! source's `SIGALRM`/`setitimer`/`sigwait` timer with a plain
//! `std::thread::sleep` loop: only this thread ever observes the tick, by
//! construction, with no signal-mask juggling required to get there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use slog::{error, info, o, Logger};

use crate::context::Context;

/// Runs the reporter loop until `working` becomes false. Each tick: flush
/// the activity log, read the error counter, and write the error count, the
/// current time, and the flushed activity log into the `gateways` row for
/// this gateway. Failures are logged and do not touch the shared error
/// counter (`spec.md` §4.7/§7) — a failed telemetry push is not a
/// device-facing protocol error.
pub fn run(ctx: Arc<Context>, period_secs: u32, working: Arc<AtomicBool>) {
    let log = ctx.log.new(o!("component" => "telemetry"));
    let period = Duration::from_secs(period_secs.max(1) as u64);

    while working.load(Ordering::SeqCst) {
        std::thread::sleep(period);
        if !working.load(Ordering::SeqCst) {
            break;
        }
        tick(&ctx, &log);
    }
}

fn tick(ctx: &Context, log: &Logger) {
    let activity_report = ctx.activity_log.flush();
    let num_errors = ctx.error_counter.get();
    let now = chrono::Local::now();

    match ctx.db.update_telemetry(&ctx.gw_id.to_base64(), num_errors, now.timestamp(), &activity_report) {
        Ok(()) => info!(log, "telemetry reported"; "num_errors" => num_errors, "activity" => %activity_report),
        Err(e) => error!(log, "telemetry update failed"; "error" => %e),
    }
}
