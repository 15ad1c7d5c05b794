use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Read-through caching reverse proxy",
    long_about = "A caching reverse proxy that sits in front of an HTTP origin,\n\
                  forwards requests it has not seen before, stores the origin's\n\
                  responses on disk, and serves repeat requests from that store.\n\
                  Every response carries an X-Cache header set to HIT or MISS."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable detailed debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the caching proxy server
    Start {
        /// http/https URL of the origin server whose responses are cached
        #[arg(value_parser = parse_origin)]
        origin: Url,

        /// Port number on which this server will listen
        #[arg(short, long)]
        port: u16,

        /// Directory used as the cache store root
        #[arg(long, default_value = "./cache")]
        cache_dir: PathBuf,
    },

    /// Delete the entire cache store
    ClearCache {
        /// Directory used as the cache store root
        #[arg(long, default_value = "./cache")]
        cache_dir: PathBuf,
    },
}

fn parse_origin(value: &str) -> Result<Url, String> {
    let url = Url::parse(value).map_err(|e| format!("'{value}' is not a valid URL: {e}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("origin must be http or https, got '{other}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_parses_origin_and_port() {
        let args =
            CliArgs::try_parse_from(["hoard", "start", "http://localhost:8080", "-p", "3000"])
                .unwrap();
        match args.command {
            Command::Start { origin, port, .. } => {
                assert_eq!(origin.as_str(), "http://localhost:8080/");
                assert_eq!(port, 3000);
            }
            _ => panic!("expected start command"),
        }
    }

    #[test]
    fn invalid_origin_is_rejected() {
        assert!(CliArgs::try_parse_from(["hoard", "start", "not a url", "-p", "3000"]).is_err());
        assert!(
            CliArgs::try_parse_from(["hoard", "start", "ftp://example.com", "-p", "3000"]).is_err()
        );
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        assert!(
            CliArgs::try_parse_from(["hoard", "start", "http://localhost", "-p", "70000"]).is_err()
        );
    }

    #[test]
    fn clear_cache_needs_no_arguments() {
        let args = CliArgs::try_parse_from(["hoard", "clear-cache"]).unwrap();
        assert!(matches!(args.command, Command::ClearCache { .. }));
    }
}
