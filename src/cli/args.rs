//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::path::PathBuf;

/// Keeps two UI representations of one app in sync through a versioned IR
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Show debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: twinsync.toml)
    #[arg(short = 'C', long, default_value = "twinsync.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Watch both roots, sync on change and push updates to live clients
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<std::net::IpAddr>,

        /// WebSocket port for live clients
        #[arg(short, long)]
        port: Option<u16>,

        /// Enable file watching
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,
    },

    /// Sync the given files once (every component if omitted)
    Sync {
        /// Source files under either root
        #[arg(value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },

    /// Show stored components and their versions
    #[command(visible_alias = "st")]
    Status,

    /// Resolve a conflicting component
    Resolve {
        /// Logical component id (root-relative path without extension)
        component: String,

        /// use-a, use-b, manual-merge or skip
        #[arg(value_parser = parse_strategy)]
        strategy: crate::conflict::ResolutionStrategy,
    },
}

fn parse_strategy(s: &str) -> Result<crate::conflict::ResolutionStrategy, String> {
    crate::conflict::ResolutionStrategy::parse(s)
        .ok_or_else(|| format!("expected use-a, use-b, manual-merge or skip, got `{s}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conflict::ResolutionStrategy;

    #[test]
    fn test_parse_serve_overrides() {
        let cli = Cli::parse_from(["twinsync", "serve", "-p", "9000", "--watch", "false"]);
        let Commands::Serve { port, watch, interface } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(9000));
        assert_eq!(watch, Some(false));
        assert!(interface.is_none());
        assert_eq!(cli.config, PathBuf::from("twinsync.toml"));
    }

    #[test]
    fn test_parse_resolve() {
        let cli = Cli::parse_from(["twinsync", "-v", "resolve", "screens/home", "use-b"]);
        assert!(cli.verbose);
        let Commands::Resolve { component, strategy } = cli.command else {
            panic!("expected resolve");
        };
        assert_eq!(component, "screens/home");
        assert_eq!(strategy, ResolutionStrategy::UseB);
    }

    #[test]
    fn test_rejects_unknown_strategy() {
        assert!(Cli::try_parse_from(["twinsync", "resolve", "home", "newest"]).is_err());
    }

    #[test]
    fn test_parse_sync_files() {
        let cli = Cli::parse_from(["twinsync", "sync", "a/home.dart", "b/card.tsx"]);
        let Commands::Sync { files } = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(files.len(), 2);
    }
}
