//! Gateway binary entry point: loads configuration, authenticates with the
//! platform manager, connects to the database, and serves devices until
//! `SIGINT` (`spec.md` §6).

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use slog::{error, info};

use gateway::activity_log::ActivityLog;
use gateway::config;
use gateway::context::Context;
use gateway::db::Db;
use gateway::error::GatewayError;
use gateway::error_counter::ErrorCounter;
use gateway::listener::Listener;
use gateway::logging;
use gateway::pool::WorkerPool;
use gateway::{auth, telemetry};

/// IoT edge gateway: bridges sensor devices to the platform database.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory containing static.conf and dynamic.conf.
    #[arg(long, default_value = "conf")]
    conf_dir: PathBuf,

    /// sloggers level string ("critical".."trace").
    #[arg(long, default_value = "debug")]
    log_level: String,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let log = logging::init(&args.log_level);

    match run(&args, &log) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(log, "gateway exiting"; "error" => %e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, log: &slog::Logger) -> Result<(), GatewayError> {
    let static_conf_path = args.conf_dir.join("static.conf");
    let dynamic_conf_path = args.conf_dir.join("dynamic.conf");

    let static_conf = config::read_static_conf(&static_conf_path)?;

    auth::authenticate(
        static_conf.gw_id,
        &static_conf.platform_gw_manager_ip,
        static_conf.platform_gw_manager_port,
        &dynamic_conf_path,
        log,
    )?;

    let dynamic_conf = config::read_dynamic_conf(&dynamic_conf_path)?;

    let db = Db::connect(&dynamic_conf)?;

    let ctx = Arc::new(Context {
        gw_id: static_conf.gw_id,
        db,
        activity_log: ActivityLog::new(),
        error_counter: ErrorCounter::new(),
        log: log.clone(),
    });

    let listener = Listener::bind(static_conf.gw_port, log)?;
    let pool = WorkerPool::new(static_conf.thread_pool_size, Arc::clone(&ctx));

    let working = Arc::new(AtomicBool::new(true));

    {
        let working = Arc::clone(&working);
        ctrlc::set_handler(move || working.store(false, Ordering::SeqCst))
            .expect("failed to install SIGINT handler");
    }

    let telemetry_handle = {
        let ctx = Arc::clone(&ctx);
        let working = Arc::clone(&working);
        let period = dynamic_conf.telemetry_send_period;
        std::thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || telemetry::run(ctx, period, working))
            .map_err(GatewayError::ThreadSpawn)?
    };

    info!(log, "gateway listening"; "port" => static_conf.gw_port);
    listener.run(&pool, Arc::clone(&working));

    info!(log, "shutting down");
    pool.shutdown();
    let _ = telemetry_handle.join();

    Ok(())
}
