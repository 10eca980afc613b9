//! IoT edge gateway: mediates between sensor devices speaking
//! [`gw_protocol`]'s binary framing over TCP and a platform-managed
//! relational database.

pub mod activity_log;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod error_counter;
pub mod handler;
pub mod listener;
pub mod logging;
pub mod pool;
pub mod telemetry;
pub mod telemetry_proto;
