use anyhow::Context;
use clap::{Parser, Subcommand};
use fhir::InputKind;
use healthdid_core::{
    fetch_profile, register_uri, resolve, Collaborators, CoreConfig, DidName, ProfileForm,
    ProfileService, ProfileUri, ResourceKind,
};
use healthdid_crypto::{AccessControlCondition, Wallet, WalletAddress};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "healthdid")]
#[command(about = "Create, encrypt and register health DID profiles")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the form fields of a resource kind
    Fields {
        /// Patient or Organization
        kind: ResourceKind,
    },
    /// Generate a wallet key
    Keygen {
        /// Where to write the PKCS#8 PEM key (must not exist)
        path: PathBuf,
    },
    /// Print the wallet address of a key
    Address {
        /// PKCS#8 PEM key file
        key: PathBuf,
    },
    /// Fill in a profile form, encrypt it and upload it
    Create {
        /// Patient or Organization
        kind: ResourceKind,
        /// DID suffix; the DID becomes did:health:<chain><suffix>
        #[arg(long)]
        did_suffix: String,
        /// Wallet key that signs and owns the profile
        #[arg(long)]
        key: PathBuf,
        /// Field assignment as path=value, e.g. name.0.family=Williams (repeatable)
        #[arg(long = "set", value_name = "PATH=VALUE")]
        fields: Vec<String>,
        /// Wallet address that may also decrypt the profile (repeatable)
        #[arg(long = "allow", value_name = "ADDRESS")]
        allow: Vec<String>,
        /// Register the DID right after uploading
        #[arg(long)]
        register: bool,
    },
    /// Register a DID for a profile uploaded earlier
    Register {
        /// Registry id, e.g. 000005sarah
        registry_id: String,
        /// Profile URI printed by `create`
        uri: String,
        /// Wallet key of the new owner
        #[arg(long)]
        key: PathBuf,
    },
    /// Show the registry entry of a DID
    Resolve {
        /// Registry id or full DID
        registry_id: String,
    },
    /// Download and decrypt the profile of a DID
    Fetch {
        /// Registry id or full DID
        registry_id: String,
        /// Wallet key allowed to decrypt the profile
        #[arg(long)]
        key: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("healthdid_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Fields { kind }) => {
            for field in kind.fields() {
                println!("{:<40} {:<28} {}", field.name, field.label, describe(&field.input));
            }
        }
        Some(Commands::Keygen { path }) => {
            let wallet = Wallet::generate();
            wallet
                .save(&path)
                .with_context(|| format!("writing key to {}", path.display()))?;
            println!("Wrote key for {} to {}", wallet.address(), path.display());
        }
        Some(Commands::Address { key }) => {
            println!("{}", load_wallet(&key)?.address());
        }
        Some(Commands::Create {
            kind,
            did_suffix,
            key,
            fields,
            allow,
            register,
        }) => {
            let (cfg, collaborators) = startup()?;
            let wallet = load_wallet(&key)?;

            let mut form = ProfileForm::new(kind);
            for assignment in &fields {
                let (path, value) = parse_assignment(assignment)?;
                let outcome = form.set_field(path, value)?;
                if !outcome.is_applied() {
                    eprintln!("warning: {path} could not be written and was skipped");
                }
            }
            form.set_did_suffix(&did_suffix)?;
            let grants = parse_grants(&allow)?;

            let auth = wallet.sign_auth_message(cfg.chain_id(), None);
            let submitted =
                ProfileService::new(cfg.clone(), collaborators, form).submit(&auth, &grants)?;
            let submission = submitted.submission();
            println!("DID:     {}", submission.did);
            println!("Profile: {}", submission.summary);
            println!("Export:  {}", submission.export_path.display());
            println!("URI:     {}", submission.uri);

            if register {
                let registered = submitted.register(&auth)?;
                let receipt = registered.receipt();
                println!(
                    "Registered in block {} (tx {})",
                    receipt.block_number, receipt.tx_hash
                );
            }
        }
        Some(Commands::Register {
            registry_id,
            uri,
            key,
        }) => {
            let (cfg, collaborators) = startup()?;
            let wallet = load_wallet(&key)?;
            let did = DidName::parse(&registry_id)?;
            let uri = ProfileUri::parse(&uri, cfg.gateway())?;

            let auth = wallet.sign_auth_message(cfg.chain_id(), None);
            let receipt = register_uri(&cfg, &collaborators, &did, &uri, &auth)?;
            println!(
                "Registered {} in block {} (tx {})",
                did, receipt.block_number, receipt.tx_hash
            );
        }
        Some(Commands::Resolve { registry_id }) => {
            let (cfg, collaborators) = startup()?;
            let entry = resolve(&cfg, &collaborators, &registry_id)?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Some(Commands::Fetch { registry_id, key }) => {
            let (cfg, collaborators) = startup()?;
            let wallet = load_wallet(&key)?;
            let auth = wallet.sign_auth_message(cfg.chain_id(), None);

            let fetched = fetch_profile(&cfg, &collaborators, &registry_id, &auth)?;
            println!("{}", serde_json::to_string_pretty(&fetched.record)?);
        }
        None => {
            println!("Use 'healthdid --help' for commands");
        }
    }

    Ok(())
}

fn startup() -> anyhow::Result<(Arc<CoreConfig>, Collaborators)> {
    let cfg = Arc::new(CoreConfig::from_env()?);
    let collaborators = Collaborators::local(&cfg)?;
    Ok((cfg, collaborators))
}

fn load_wallet(path: &Path) -> anyhow::Result<Wallet> {
    Wallet::load(path).with_context(|| format!("reading key {}", path.display()))
}

/// Splits `path=value` at the first `=`; the value may be empty.
fn parse_assignment(input: &str) -> anyhow::Result<(&str, &str)> {
    match input.split_once('=') {
        Some((path, value)) if !path.trim().is_empty() => Ok((path.trim(), value)),
        _ => anyhow::bail!("expected PATH=VALUE, got '{input}'"),
    }
}

fn parse_grants(addresses: &[String]) -> anyhow::Result<Vec<AccessControlCondition>> {
    addresses
        .iter()
        .map(|a| {
            let address = WalletAddress::parse(a)?;
            Ok(AccessControlCondition::wallet_owner(&address))
        })
        .collect()
}

fn describe(input: &InputKind) -> String {
    match input {
        InputKind::Text => "text".into(),
        InputKind::Date => "date (YYYY-MM-DD)".into(),
        InputKind::Tel => "tel".into(),
        InputKind::Email => "email".into(),
        InputKind::Select(options) => {
            let values: Vec<&str> = options.iter().map(|o| o.value).collect();
            format!("one of {}", values.join(", "))
        }
    }
}
