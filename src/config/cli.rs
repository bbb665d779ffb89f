use crate::domain::model::ValueKind;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "restlink")]
#[command(about = "Typed RPC over plain HTTP: serve services or call an endpoint")]
pub struct CliConfig {
    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit JSON logs")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start the embedded server with the built-in status service
    Serve {
        #[arg(long, short, help = "Path to restlink.toml")]
        config: Option<PathBuf>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long, help = "Enable SSL with this PEM keystore")]
        keystore: Option<PathBuf>,
    },

    /// Fetch a URL once and decode the body as the given kind
    Get {
        url: String,

        #[arg(long, default_value = "text/plain")]
        media_type: String,

        #[arg(long, value_enum, default_value_t = KindArg::Text)]
        kind: KindArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Bool,
    Int,
    Long,
    Double,
    Text,
    TextArray,
    IntArray,
    Json,
}

impl From<KindArg> for ValueKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Bool => ValueKind::Bool,
            KindArg::Int => ValueKind::Int,
            KindArg::Long => ValueKind::Long,
            KindArg::Double => ValueKind::Double,
            KindArg::Text => ValueKind::Text,
            KindArg::TextArray => ValueKind::TextArray,
            KindArg::IntArray => ValueKind::IntArray,
            KindArg::Json => ValueKind::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get_command() {
        let cli = CliConfig::parse_from([
            "restlink",
            "get",
            "http://localhost:8080/status/ping",
            "--kind",
            "bool",
            "-v",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Command::Get { url, media_type, kind } => {
                assert_eq!(url, "http://localhost:8080/status/ping");
                assert_eq!(media_type, "text/plain");
                assert_eq!(ValueKind::from(kind), ValueKind::Bool);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_command() {
        let cli = CliConfig::parse_from(["restlink", "serve", "--port", "9000"]);
        match cli.command {
            Command::Serve { port, config, .. } => {
                assert_eq!(port, Some(9000));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
