//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

/// Surveyboard - survey intake with live result dashboards
///
/// Collect short survey responses and follow the results as they come in.
///
/// Examples:
///   surveyboard submit --name "Sd Silva" --group "1st Battery" --contact "(11) 99999-9999" --category Employee
///   surveyboard results --watch
///   surveyboard dashboard --email admin@example.com --search silva
///   surveyboard export --email admin@example.com --output responses.csv
///   surveyboard init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .surveyboard.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT", global = true)]
    pub format: OutputFormat,

    /// Directory holding the response collections
    #[arg(long, value_name = "DIR", env = "SURVEYBOARD_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Collection the responses are stored in
    #[arg(long, value_name = "NAME", global = true)]
    pub collection: Option<String>,

    /// How often live views check for new responses, in milliseconds
    #[arg(long, value_name = "MS", global = true)]
    pub poll_interval: Option<u64>,
}

/// Subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Submit a survey response
    Submit {
        /// Name you go by
        #[arg(long, default_value = "")]
        name: String,

        /// Your group or unit
        #[arg(long, default_value = "")]
        group: String,

        /// Phone number (digits, spaces, '+', '-', parentheses)
        #[arg(long, default_value = "")]
        contact: String,

        /// Area of interest, one of the configured categories
        #[arg(long, default_value = "")]
        category: String,
    },

    /// Show the public results (shares per category)
    Results {
        /// Keep running and re-render on every change
        #[arg(long)]
        watch: bool,
    },

    /// Show the detail dashboard (requires administrator sign-in)
    Dashboard {
        #[command(flatten)]
        login: LoginArgs,

        /// Only list responses whose name or group contains this text
        #[arg(long, default_value = "", value_name = "TEXT")]
        search: String,

        /// Keep running and re-render on every change
        #[arg(long)]
        watch: bool,
    },

    /// Export all responses as CSV (requires administrator sign-in)
    Export {
        #[command(flatten)]
        login: LoginArgs,

        /// Output file for the CSV export
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate a default .surveyboard.toml configuration file
    InitConfig,
}

/// Administrator credentials.
#[derive(clap::Args, Clone)]
pub struct LoginArgs {
    /// Administrator email
    #[arg(long, env = "SURVEYBOARD_ADMIN_EMAIL")]
    pub email: String,

    /// Administrator password
    #[arg(long, env = "SURVEYBOARD_ADMIN_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Identity provider API key (overrides the config file)
    #[arg(long, env = "SURVEYBOARD_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

impl fmt::Debug for LoginArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginArgs")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Output format for views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref collection) = self.collection {
            if collection.trim().is_empty() {
                return Err("Collection name must not be empty".to_string());
            }
        }

        if self.poll_interval == Some(0) {
            return Err("Poll interval must be at least 1 ms".to_string());
        }

        if let Command::Dashboard { login, .. } | Command::Export { login, .. } = &self.command {
            if login.email.trim().is_empty() {
                return Err("Administrator email must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            verbose: false,
            quiet: false,
            format: OutputFormat::Text,
            data_dir: None,
            collection: None,
            poll_interval: None,
        }
    }

    fn login() -> LoginArgs {
        LoginArgs {
            email: "admin@example.com".to_string(),
            password: "secret".to_string(),
            api_key: None,
        }
    }

    #[test]
    fn test_parse_submit() {
        let args = Args::parse_from([
            "surveyboard",
            "submit",
            "--name",
            "Sd Silva",
            "--contact",
            "(11) 99999-9999",
        ]);

        match args.command {
            Command::Submit {
                name,
                group,
                contact,
                ..
            } => {
                assert_eq!(name, "Sd Silva");
                assert_eq!(group, "");
                assert_eq!(contact, "(11) 99999-9999");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::parse_from(["surveyboard", "results", "--watch", "--format", "json"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(matches!(args.command, Command::Results { watch: true }));
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Results { watch: false });
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_collection() {
        let mut args = make_args(Command::Results { watch: false });
        args.collection = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_poll_interval() {
        let mut args = make_args(Command::Results { watch: true });
        args.poll_interval = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_blank_admin_email() {
        let mut credentials = login();
        credentials.email = " ".to_string();
        let args = make_args(Command::Export {
            login: credentials,
            output: None,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_login_debug_redacts_password() {
        let args = make_args(Command::Dashboard {
            login: login(),
            search: String::new(),
            watch: false,
        });
        let rendered = format!("{:?}", args);
        assert!(rendered.contains("admin@example.com"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
