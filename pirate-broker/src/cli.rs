//! Command-line surface. Ordinary plumbing: parsing only, no validation beyond what `clap`
//! itself enforces — see [`crate::config::Config::from_cli`] for the semantic checks.

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "pirate-broker",
    about = "Preforking ZeroMQ load-balancing job broker",
    version
)]
pub struct Cli {
    /// Frontend and backend TCP ports, e.g. `--port 6660 6661`.
    #[arg(long, num_args = 2, value_names = ["FRONTEND_PORT", "BACKEND_PORT"])]
    pub port: Vec<u16>,

    /// Minimum number of worker processes to keep alive.
    #[arg(long = "min-servers", env = "PIRATE_MIN_SERVERS", default_value_t = 5)]
    pub min_servers: usize,

    /// Maximum number of worker processes to keep alive.
    #[arg(long = "max-servers", env = "PIRATE_MAX_SERVERS", default_value_t = 20)]
    pub max_servers: usize,

    /// Fork more workers when the idle pool drops below this count.
    #[arg(long = "min-spare-servers", env = "PIRATE_MIN_SPARE_SERVERS", default_value_t = 2)]
    pub min_spare_servers: usize,

    /// Stop idle workers when the idle pool exceeds this count.
    #[arg(long = "max-spare-servers", env = "PIRATE_MAX_SPARE_SERVERS", default_value_t = 10)]
    pub max_spare_servers: usize,

    /// Requests a single worker serves before it retires itself. `0` means unlimited.
    #[arg(long = "max-requests", env = "PIRATE_MAX_REQUESTS", default_value_t = 0)]
    pub max_requests: u64,

    /// Seconds between housekeeping passes when neither socket is readable: reap, top up or
    /// trim the spare pool, scrub the idle-worker queue.
    #[arg(long = "check-for-waiting", env = "PIRATE_CHECK_FOR_WAITING", default_value_t = 5)]
    pub check_for_waiting: u64,

    /// Drop privileges to this user after binding. Defaults to the invoking process's effective
    /// user (no-op) when omitted.
    #[arg(long, env = "PIRATE_USER")]
    pub user: Option<String>,

    /// Drop privileges to this group after binding. Defaults to the invoking process's effective
    /// group (no-op) when omitted.
    #[arg(long, env = "PIRATE_GROUP")]
    pub group: Option<String>,

    /// Log verbosity passed to the tracing env-filter (e.g. `info`, `debug`, `trace`).
    #[arg(long = "log-level", env = "PIRATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}
