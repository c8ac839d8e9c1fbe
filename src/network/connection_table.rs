use std::collections::HashMap;

use log::{info, warn};
use regex::Regex;
use tokio::process::Command;

use crate::session_management::SessionKey;

/// Established TCP connections owned by a per-user sshd process, as printed by
/// `netstat -antp`. Captures the foreign address, its port and the user.
const NETSTAT_SSHD_LINE: &str = r"tcp\s+\d+\s+\d+\s+\d+\.\d+\.\d+\.\d+:\d+\s+(\d+\.\d+\.\d+\.\d+):(\d+)\s+ESTABLISHED\s+\d+/sshd(?:-session)?: (\S+)";

/// Extracts the SSH sessions already open in a `netstat -antp` listing.
///
/// Privilege separation entries such as `sshd: alice [priv]` yield the same
/// key and user as the session line, so duplicates collapse.
pub fn parse_netstat(output: &str) -> Result<HashMap<SessionKey, String>, regex::Error> {
    let line = Regex::new(NETSTAT_SSHD_LINE)?;
    let mut sessions = HashMap::new();

    for caps in output.lines().filter_map(|l| line.captures(l)) {
        if let Some(key) = SessionKey::parse(&caps[1], &caps[2]) {
            // netstat truncates the title, `alice@pts/0` may end up as `alice@pt`
            let user = caps[3].split('@').next().unwrap_or_default();
            sessions.insert(key, user.to_string());
        }
    }
    Ok(sessions)
}

/// Snapshot of the SSH sessions open at startup.
///
/// Failing to run netstat is not fatal; the engine then starts from an empty
/// table and learns sessions from the log.
pub async fn established_ssh_sessions() -> Result<HashMap<SessionKey, String>, regex::Error> {
    let output = match Command::new("netstat").arg("-antp").output().await {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!("netstat exited with {}, starting with no sessions", output.status);
            return Ok(HashMap::new());
        }
        Err(e) => {
            warn!("Unable to run netstat: {}, starting with no sessions", e);
            return Ok(HashMap::new());
        }
    };

    let sessions = parse_netstat(&String::from_utf8_lossy(&output.stdout))?;
    for (key, user) in &sessions {
        info!("[+] existing ssh session {} ({})", key, user);
    }
    Ok(sessions)
}
