use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for the wolk enclave bridge
#[derive(Parser, Debug)]
#[command(
    name = "wolk",
    version,
    about = "Seal, unseal, hash and sign through the wolk enclave"
)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short = 'c', long, default_value = "wolk.toml", value_name = "PATH")]
    pub config: PathBuf,

    /// Overrides the configured enclave image.
    #[arg(long, value_name = "PATH", env = "WOLK_ENCLAVE")]
    pub enclave: Option<PathBuf>,

    /// Overrides the sealed blob directory.
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Overrides the configured log level.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// SHA-256 of a string or file, computed inside the enclave
    Digest {
        /// Text to hash
        text: Option<String>,
        /// Hash the contents of a file instead
        #[arg(long, value_name = "PATH", conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Generate a P-256 key pair and print both halves
    Keygen,

    /// Seal a file into the store
    Seal {
        /// File to seal
        #[arg(long, value_name = "PATH")]
        input: PathBuf,
        /// Name of the sealed blob in the store
        #[arg(long, value_name = "NAME")]
        output: String,
        /// Free-form label kept in the sidecar
        #[arg(long)]
        label: Option<String>,
    },

    /// Unseal a blob from the store into a file
    Unseal {
        /// Name of the sealed blob in the store
        #[arg(long, value_name = "NAME")]
        name: String,
        /// Where to write the plaintext
        #[arg(long, value_name = "PATH")]
        output: PathBuf,
    },

    /// Sign a message with a hex-encoded private key
    Sign {
        /// 32-byte private key, hex
        #[arg(long, value_name = "HEX")]
        key: String,
        #[command(flatten)]
        message: MessageArgs,
    },

    /// Verify a signature against a hex-encoded public key
    Verify {
        /// 64-byte public key (x || y), hex
        #[arg(long, value_name = "HEX")]
        public: String,
        /// 64-byte signature (r || s), hex
        #[arg(long, value_name = "HEX")]
        signature: String,
        #[command(flatten)]
        message: MessageArgs,
    },
}

/// Message source for sign and verify
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct MessageArgs {
    /// Message text
    #[arg(long, value_name = "TEXT")]
    pub message: Option<String>,
    /// Read the message from a file
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// Log level enumeration
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_seal() {
        let cli = Cli::try_parse_from([
            "wolk", "--store", "/tmp/s", "seal", "--input", "in.bin", "--output", "key",
        ])
        .unwrap();
        assert_eq!(cli.store, Some(PathBuf::from("/tmp/s")));
        assert!(matches!(
            cli.command,
            Command::Seal { ref output, label: None, .. } if output == "key"
        ));
    }

    #[test]
    fn test_sign_requires_one_message_source() {
        assert!(Cli::try_parse_from(["wolk", "sign", "--key", "00"]).is_err());
        assert!(Cli::try_parse_from([
            "wolk", "sign", "--key", "00", "--message", "a", "--file", "b"
        ])
        .is_err());
    }
}
