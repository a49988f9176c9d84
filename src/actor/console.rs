//! Serve console
//!
//! Reads operator commands from stdin while serving:
//!
//! ```text
//! resolve <component> <use-a|use-b|manual-merge|skip>
//! status
//! ```
//!
//! Commands go to the SyncActor, which owns the conflict detector that
//! blocks the component.

use std::io::{self, BufRead};

use tokio::sync::mpsc;

use super::messages::SyncMsg;
use crate::conflict::ResolutionStrategy;

const USAGE: &str = "commands: resolve <component> <use-a|use-b|manual-merge|skip>, status";

/// Start the console thread.
pub fn spawn(sync_tx: mpsc::Sender<SyncMsg>) -> io::Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .spawn(move || read_loop(io::stdin().lock(), &sync_tx))?;
    Ok(())
}

fn read_loop(input: impl BufRead, sync_tx: &mpsc::Sender<SyncMsg>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if crate::core::is_shutdown() {
            break;
        }
        match parse_command(&line) {
            Ok(Some(msg)) => {
                if sync_tx.blocking_send(msg).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => crate::log!("error"; "{}", e),
        }
    }
    crate::debug!("console"; "stdin closed");
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<SyncMsg>, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let msg = match command {
        "resolve" => {
            let (Some(logical_id), Some(strategy)) = (words.next(), words.next()) else {
                return Err(format!("usage: resolve <component> <strategy>\n{USAGE}"));
            };
            let strategy = ResolutionStrategy::parse(strategy)
                .ok_or_else(|| format!("unknown strategy `{strategy}`\n{USAGE}"))?;
            SyncMsg::Resolve {
                logical_id: logical_id.to_owned(),
                strategy,
            }
        }
        "status" => SyncMsg::Status,
        "help" | "?" => {
            crate::log!("console"; "{}", USAGE);
            return Ok(None);
        }
        other => return Err(format!("unknown command `{other}`\n{USAGE}")),
    };

    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument `{extra}`"));
    }
    Ok(Some(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolve() {
        let msg = parse_command("resolve screens/home use-a").unwrap();
        assert!(matches!(
            msg,
            Some(SyncMsg::Resolve { ref logical_id, strategy: ResolutionStrategy::UseA })
                if logical_id == "screens/home"
        ));
    }

    #[test]
    fn test_parse_status_and_blank() {
        assert!(matches!(parse_command("  status "), Ok(Some(SyncMsg::Status))));
        assert!(parse_command("").unwrap().is_none());
        assert!(parse_command("help").unwrap().is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("resolve home").unwrap_err().contains("usage"));
        assert!(parse_command("resolve home newest").unwrap_err().contains("unknown strategy"));
        assert!(parse_command("status now").unwrap_err().contains("unexpected"));
        assert!(parse_command("deploy").unwrap_err().contains("unknown command"));
    }

    #[test]
    fn test_read_loop_forwards_commands() {
        let (tx, mut rx) = mpsc::channel(4);
        let input = io::Cursor::new("status\nbogus\nresolve home skip\n");

        read_loop(input, &tx);

        assert!(matches!(rx.try_recv(), Ok(SyncMsg::Status)));
        assert!(matches!(
            rx.try_recv(),
            Ok(SyncMsg::Resolve { strategy: ResolutionStrategy::Skip, .. })
        ));
        assert!(rx.try_recv().is_err());
    }
}
