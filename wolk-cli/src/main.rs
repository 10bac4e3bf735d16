mod args;

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use args::{Cli, Command, MessageArgs};
use clap::Parser;
use tracing::{debug, info};
use wolk_host::format::{from_hex, to_hex};
use wolk_host::logging::init_tracing;
use wolk_host::{load_enclave_with_config, BoundaryHandle, BridgeConfig, SealedStore};
use zeroize::Zeroizing;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = BridgeConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    apply_overrides(&mut config, &cli);
    config.validate().context("invalid configuration")?;

    init_tracing(&config.logging);
    debug!(config = %cli.config.display(), "configuration loaded");

    let mut handle = load_enclave_with_config(&config).with_context(|| {
        format!(
            "failed to load enclave {}",
            config.enclave.image_path.display()
        )
    })?;

    run(cli.command, &config, &mut handle)
}

fn apply_overrides(config: &mut BridgeConfig, cli: &Cli) {
    if let Some(enclave) = &cli.enclave {
        config.enclave.image_path = enclave.clone();
    }

    if let Some(store) = &cli.store {
        config.enclave.store_dir = store.clone();
    }

    if let Some(level) = cli.log_level {
        config.logging.level = level.as_directive().to_string();
    }
}

fn run(command: Command, config: &BridgeConfig, handle: &mut BoundaryHandle) -> Result<()> {
    match command {
        Command::Digest { text, file } => {
            let input = match (text, file) {
                (_, Some(path)) => read_file(&path)?,
                (Some(text), None) => text.into_bytes(),
                (None, None) => Vec::new(),
            };
            let digest = handle.call_digest(&input).context("digest failed")?;
            println!("{}", to_hex(&digest));
        }

        Command::Keygen => {
            let (private_key, public_key) = handle
                .call_generate_keypair()
                .context("key generation failed")?;
            println!("private: {}", to_hex(private_key.as_slice()));
            println!("public:  {}", to_hex(&public_key));
        }

        Command::Seal {
            input,
            output,
            label,
        } => {
            let plaintext = Zeroizing::new(read_file(&input)?);
            let blob = handle.call_seal(&plaintext).context("seal failed")?;

            let store = open_store(config)?;
            store
                .save(&output, &blob, plaintext.len(), label)
                .with_context(|| format!("failed to store sealed blob {output}"))?;

            info!(name = %output, sealed_len = blob.len(), "sealed");
            println!("sealed {} bytes into {output}", plaintext.len());
        }

        Command::Unseal { name, output } => {
            let store = open_store(config)?;
            let (blob, metadata) = store
                .load(&name)
                .with_context(|| format!("failed to read sealed blob {name}"))?;

            let plaintext = handle
                .call_unseal(&blob, metadata.plaintext_len)
                .with_context(|| format!("failed to unseal {name}"))?;
            write_private(&output, plaintext.as_slice())
                .with_context(|| format!("failed to write {}", output.display()))?;

            println!("unsealed {} bytes to {}", plaintext.len(), output.display());
        }

        Command::Sign { key, message } => {
            let private_key = Zeroizing::new(from_hex(&key).context("invalid private key")?);
            let message = read_message(message)?;

            let signature = handle
                .call_sign(&message, &private_key)
                .context("signing failed")?;
            println!("{}", to_hex(&signature));
        }

        Command::Verify {
            public,
            signature,
            message,
        } => {
            let public_key = from_hex(&public).context("invalid public key")?;
            let signature = from_hex(&signature).context("invalid signature")?;
            let message = read_message(message)?;

            if handle
                .call_verify(&message, &public_key, &signature)
                .context("verification failed")?
            {
                println!("valid");
            } else {
                bail!("signature does not verify");
            }
        }
    }

    Ok(())
}

fn open_store(config: &BridgeConfig) -> Result<SealedStore> {
    SealedStore::open(&config.enclave.store_dir).with_context(|| {
        format!(
            "failed to open store {}",
            config.enclave.store_dir.display()
        )
    })
}

fn read_message(args: MessageArgs) -> Result<Vec<u8>> {
    match (args.message, args.file) {
        (Some(text), _) => Ok(text.into_bytes()),
        (None, Some(path)) => read_file(&path),
        (None, None) => bail!("either --message or --file is required"),
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Write recovered plaintext readable by the owner only.
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.sync_all()
}
