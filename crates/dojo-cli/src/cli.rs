use clap::{Parser, Subcommand};
use dojo_common::Service;

/// Command-line client for the dojo training platform.
#[derive(Parser, Debug)]
#[command(name = "dojo", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Log directive override (e.g. `dojo=debug`).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// API base URL override.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Challenges and routes accept either a path
/// (`/dojo/intro/module/shell/challenge/cat`) or `dojo/module/challenge`.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List dojos.
    Dojos,
    /// List the modules and challenges of a dojo.
    Modules { dojo: String },
    /// List solves in a dojo.
    Solves {
        dojo: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Print a challenge description.
    Describe { challenge: String },
    /// Show the active session and workspace state.
    Status { route: Option<String> },
    /// Start a challenge workspace.
    Start {
        challenge: String,
        #[arg(long)]
        practice: bool,
    },
    /// Wait for a workspace service and print its URL.
    Open {
        service: Service,
        route: Option<String>,
    },
    /// Submit a flag.
    Submit { challenge: String, flag: String },
    /// Stop the running workspace.
    Terminate,
    /// Reset the workspace home directory.
    ResetHome,
    Login {
        name: String,
        #[arg(long)]
        password: String,
    },
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        affiliation: Option<String>,
        #[arg(long)]
        country: Option<String>,
    },
    ForgotPassword { email: String },
    Logout,
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "dojo",
            "start",
            "intro/shell/cat",
            "--practice",
            "--log-level",
            "dojo=debug",
        ])
        .unwrap();
        assert_eq!(args.log_level.as_deref(), Some("dojo=debug"));
        assert_eq!(
            args.command,
            Command::Start {
                challenge: "intro/shell/cat".into(),
                practice: true,
            }
        );
    }

    #[test]
    fn open_parses_service_names() {
        let args = Args::try_parse_from(["dojo", "open", "vscode"]).unwrap();
        assert_eq!(
            args.command,
            Command::Open {
                service: Service::Code,
                route: None,
            }
        );
        assert!(Args::try_parse_from(["dojo", "open", "browser"]).is_err());
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Args::try_parse_from(["dojo", "--api-url", "http://x"]).is_err());
    }

    #[test]
    fn kebab_case_subcommands() {
        let args = Args::try_parse_from(["dojo", "reset-home"]).unwrap();
        assert_eq!(args.command, Command::ResetHome);
        let args = Args::try_parse_from(["dojo", "forgot-password", "a@b.c"]).unwrap();
        assert_eq!(
            args.command,
            Command::ForgotPassword {
                email: "a@b.c".into()
            }
        );
    }
}
