//! Command-line surface.

use clap::{Parser, Subcommand};

/// azdash - terminal dashboard for the users API
#[derive(Parser, Debug)]
#[command(name = "azdash", author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// API root, overriding the config file
    #[arg(long, env = "AZDASH_API_ROOT", global = true)]
    pub api_root: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show users, audit log and health (default)
    Dashboard,
    /// List users
    Users,
    /// Show the audit log
    Audit,
    /// Show backend health
    Health,
    /// Print the auth policy the backend serves, as JSON
    Policy,
    /// Sign in with the identity provider
    SignIn,
    /// Manage the APIM base URL sent with every request
    Apim {
        #[command(subcommand)]
        action: ApimAction,
    },
    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ApimAction {
    /// Print the stored APIM base URL
    Show,
    /// Store an APIM base URL
    Set { url: String },
    /// Forget the stored APIM base URL
    Clear,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Show the resolved config file path
    Path,
    /// Get a value by dotted key
    Get { key: String },
    /// Set a value by dotted key
    Set { key: String, value: String },
    /// Write a default config file
    Init {
        /// Where to write it (defaults to the platform config dir)
        #[arg(long)]
        file: Option<String>,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand() {
        let args = Args::try_parse_from(["azdash"]).unwrap();
        assert!(args.command.is_none());
        assert!(!args.verbose);
    }

    #[test]
    fn test_apim_set() {
        let args = Args::try_parse_from(["azdash", "apim", "set", "https://apim.example.net"])
            .unwrap();
        assert_eq!(
            args.command,
            Some(Command::Apim {
                action: ApimAction::Set {
                    url: "https://apim.example.net".into()
                }
            })
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "azdash",
            "users",
            "--api-root",
            "http://h/api",
            "-v",
        ])
        .unwrap();
        assert_eq!(args.command, Some(Command::Users));
        assert_eq!(args.api_root.as_deref(), Some("http://h/api"));
        assert!(args.verbose);
    }

    #[test]
    fn test_config_init_flags() {
        let args =
            Args::try_parse_from(["azdash", "config", "init", "--file", "/tmp/c.toml", "--force"])
                .unwrap();
        assert_eq!(
            args.command,
            Some(Command::Config {
                action: ConfigAction::Init {
                    file: Some("/tmp/c.toml".into()),
                    force: true
                }
            })
        );
    }

    #[test]
    fn test_sign_in_kebab_case() {
        let args = Args::try_parse_from(["azdash", "sign-in"]).unwrap();
        assert_eq!(args.command, Some(Command::SignIn));
    }
}
