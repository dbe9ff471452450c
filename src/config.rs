//! CLI surface: one required-by-spec flag (`-d`/`--daemon`) plus two
//! test-tooling overrides for the bind port and ring capacity, both also
//! settable via environment variables.

use clap::Parser;

pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_CAPACITY: usize = 10;

#[derive(Parser, Debug, Clone)]
#[command(name = "ringlogd", about = "Concurrent line-oriented TCP accumulator server")]
pub struct Args {
    /// Fork and detach after binding the listening socket.
    #[arg(short = 'd', long = "daemon")]
    pub daemon: bool,

    /// TCP port to listen on.
    #[arg(long, env = "RINGLOGD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Number of most-recent complete records retained in the ring.
    #[arg(long, env = "RINGLOGD_CAPACITY", default_value_t = DEFAULT_CAPACITY)]
    pub capacity: usize,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_defaults_match_spec() {
        Args::command().debug_assert();
        let args = Args::parse_from(["ringlogd"]);
        assert!(!args.daemon);
        assert_eq!(args.port, DEFAULT_PORT);
        assert_eq!(args.capacity, DEFAULT_CAPACITY);
    }

    #[test]
    fn daemon_flag_parses() {
        let args = Args::parse_from(["ringlogd", "-d"]);
        assert!(args.daemon);
    }

    #[test]
    fn port_and_capacity_overridable() {
        let args = Args::parse_from(["ringlogd", "--port", "9100", "--capacity", "3"]);
        assert_eq!(args.port, 9100);
        assert_eq!(args.capacity, 3);
    }
}
