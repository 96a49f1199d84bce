use std::fmt;
use std::process::{Command, Stdio};

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn runs(binary: &str, args: &[&str]) -> bool {
    Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

/// Check prerequisites for the docker engine on this host.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_docker_prereqs(binary: &str) -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !runs(binary, &["--version"]) {
        missing.push(MissingPrereq {
            name: "docker client",
            purpose: "talking to the container engine",
            install_hint: "zypper install docker | apt install docker.io | dnf install moby-engine | pacman -S docker",
        });
    } else if !runs(binary, &["info", "--format", "{{.ServerVersion}}"]) {
        missing.push(MissingPrereq {
            name: "docker daemon",
            purpose: "running containers",
            install_hint: "systemctl start docker, and make sure your user can reach the socket",
        });
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nBerth needs these to manage containers through the docker engine.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prereq_display() {
        let m = MissingPrereq {
            name: "docker client",
            purpose: "talking to the engine",
            install_hint: "apt install docker.io",
        };
        let s = format!("{m}");
        assert!(s.contains("docker client"));
        assert!(s.contains("talking to the engine"));
        assert!(s.contains("apt install docker.io"));
    }

    #[test]
    fn absent_binary_reports_client_only() {
        let missing = check_docker_prereqs("berth-no-such-binary");
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "docker client");
    }

    #[test]
    fn format_missing_produces_readable_output() {
        let items = vec![MissingPrereq {
            name: "docker daemon",
            purpose: "running containers",
            install_hint: "systemctl start docker",
        }];
        let output = format_missing(&items);
        assert!(output.contains("missing prerequisites:"));
        assert!(output.contains("docker daemon"));
        assert!(output.contains("Berth"));
    }
}
