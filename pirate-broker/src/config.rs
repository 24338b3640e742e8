//! Validated configuration. Where [`cli::Cli`](crate::cli::Cli) is what the user typed,
//! [`Config`] is what the broker is guaranteed to be able to run with.

use crate::{
    app::{self, AppCallback},
    cli::Cli,
    error::{BrokerError, BrokerResult},
};

#[derive(Clone)]
pub struct Config {
    pub frontend_port: u16,
    pub backend_port: u16,
    pub min_servers: usize,
    pub max_servers: usize,
    pub min_spare_servers: usize,
    pub max_spare_servers: usize,
    pub max_requests_per_worker: u64,
    pub check_for_waiting_secs: u64,
    pub user: Option<String>,
    pub group: Option<String>,
    pub log_level: String,
    pub app: AppCallback,
}

impl Config {
    /// Validates a parsed [`Cli`] against a default `echo` application callback.
    pub fn from_cli(cli: Cli) -> BrokerResult<Self> {
        Self::from_cli_with_app(cli, app::echo())
    }

    /// Validates a parsed [`Cli`] against an explicit application callback.
    pub fn from_cli_with_app(cli: Cli, app: AppCallback) -> BrokerResult<Self> {
        let [frontend_port, backend_port]: [u16; 2] =
            cli.port.clone().try_into().map_err(|_| {
                BrokerError::Configuration(
                    "--port requires exactly two values: <frontend_port> <backend_port>".into(),
                )
            })?;

        if frontend_port == 0 || backend_port == 0 {
            return Err(BrokerError::Configuration(
                "frontend and backend ports must be positive".into(),
            ));
        }
        if frontend_port == backend_port {
            return Err(BrokerError::Configuration(
                "frontend and backend ports must be distinct".into(),
            ));
        }
        if cli.min_servers == 0 {
            return Err(BrokerError::Configuration(
                "min_servers must be at least 1".into(),
            ));
        }
        if cli.min_servers > cli.max_servers {
            return Err(BrokerError::Configuration(
                "min_servers must not exceed max_servers".into(),
            ));
        }
        if cli.min_spare_servers > cli.max_spare_servers {
            return Err(BrokerError::Configuration(
                "min_spare_servers must not exceed max_spare_servers".into(),
            ));
        }

        Ok(Self {
            frontend_port,
            backend_port,
            min_servers: cli.min_servers,
            max_servers: cli.max_servers,
            min_spare_servers: cli.min_spare_servers,
            max_spare_servers: cli.max_spare_servers,
            max_requests_per_worker: cli.max_requests,
            check_for_waiting_secs: cli.check_for_waiting,
            user: cli.user,
            group: cli.group,
            log_level: cli.log_level,
            app,
        })
    }
}

#[cfg(test)]
mod config_tests {
    use clap::Parser;

    use super::Config;
    use crate::cli::Cli;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["pirate-broker"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn accepts_well_formed_config() {
        let config = Config::from_cli(cli(&["--port", "6660", "6661"])).unwrap();
        assert_eq!(config.frontend_port, 6660);
        assert_eq!(config.backend_port, 6661);
    }

    #[test]
    fn rejects_identical_ports() {
        let err = Config::from_cli(cli(&["--port", "6660", "6660"])).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn rejects_zero_min_servers() {
        let err =
            Config::from_cli(cli(&["--port", "6660", "6661", "--min-servers", "0"])).unwrap_err();
        assert!(err.to_string().contains("min_servers"));
    }

    #[test]
    fn rejects_min_servers_above_max() {
        let err = Config::from_cli(cli(&[
            "--port",
            "6660",
            "6661",
            "--min-servers",
            "10",
            "--max-servers",
            "5",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("max_servers"));
    }

    #[test]
    fn rejects_spare_bounds_inverted() {
        let err = Config::from_cli(cli(&[
            "--port",
            "6660",
            "6661",
            "--min-spare-servers",
            "8",
            "--max-spare-servers",
            "2",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("min_spare_servers"));
    }
}
