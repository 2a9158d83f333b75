//! DidRegistry CLI — `didreg` command.
//!
//! Manages signing keys and drives a registry whose event journal lives in
//! a data directory. Every mutation replays the journal, executes one
//! operation, and appends the resulting event.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use did_registry::event::EventKind;
use did_registry::storage::{load_key, read_key_info, save_key, EventJournal, KEY_FILE_EXTENSION};
use did_registry::{
    Authorization, DidRegistry, Ed25519KeyPair, Identity, Operation, RegistryConfig,
    SignedAuthorization, SystemClock, Tag,
};

const DATA_DIR_ENV: &str = "DID_REGISTRY_HOME";
const PASSPHRASE_ENV: &str = "DID_REGISTRY_PASSPHRASE";

// ── Directory helpers ─────────────────────────────────────────────────────────

fn data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let home = std::env::var_os("HOME")
        .ok_or_else(|| anyhow!("HOME not set; pass --data-dir or set {DATA_DIR_ENV}"))?;
    Ok(PathBuf::from(home).join(".did-registry"))
}

struct Paths {
    root: PathBuf,
}

impl Paths {
    fn config(&self) -> PathBuf {
        self.root.join("registry.json")
    }

    fn journal(&self) -> EventJournal {
        EventJournal::new(self.root.join("journal.json"))
    }

    fn keys(&self) -> PathBuf {
        self.root.join("keys")
    }

    fn key(&self, name: &str) -> PathBuf {
        self.keys().join(format!("{name}.{KEY_FILE_EXTENSION}"))
    }
}

// ── Passphrase helper ─────────────────────────────────────────────────────────

fn read_passphrase(prompt: &str) -> Result<String> {
    if let Ok(passphrase) = std::env::var(PASSPHRASE_ENV) {
        return Ok(passphrase);
    }
    eprint!("{prompt}");
    let mut passphrase = String::new();
    std::io::stdin()
        .read_line(&mut passphrase)
        .context("failed to read passphrase")?;
    Ok(passphrase.trim().to_string())
}

// ── Parsing helpers ───────────────────────────────────────────────────────────

fn secs_to_datetime(secs: u64) -> String {
    i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{secs}s"))
}

/// Parse a duration like "30s", "10m", "24h", "7d", "1h30m", or plain
/// seconds. Returns seconds. Zero is allowed.
fn parse_duration_secs(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() {
        bail!("empty duration");
    }
    if let Ok(n) = s.parse::<u64>() {
        return Ok(n);
    }

    let mut total: u64 = 0;
    let mut current = String::new();
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            current.push(ch);
            continue;
        }
        let val: u64 = current
            .parse()
            .map_err(|_| anyhow!("invalid duration: {s}"))?;
        current.clear();
        let unit = match ch {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => bail!("unknown duration unit '{ch}' in '{s}'"),
        };
        total = val
            .checked_mul(unit)
            .and_then(|v| total.checked_add(v))
            .ok_or_else(|| anyhow!("duration '{s}' is too large"))?;
    }
    if !current.is_empty() {
        bail!("duration '{s}' is missing a unit (s/m/h/d)");
    }
    Ok(total)
}

/// Attribute values: `0x`-prefixed hex, otherwise the UTF-8 bytes.
fn parse_value(s: &str) -> Result<Vec<u8>> {
    match s.strip_prefix("0x") {
        Some(digits) => hex::decode(digits).with_context(|| format!("invalid hex value '{s}'")),
        None => Ok(s.as_bytes().to_vec()),
    }
}

fn parse_tag(s: &str) -> Result<Tag> {
    s.parse::<Tag>()
        .with_context(|| format!("invalid tag '{s}'"))
}

// ── CLI structure ─────────────────────────────────────────────────────────────

/// DidRegistry CLI — manage owners, delegates and attributes of
/// decentralized identities.
#[derive(Parser, Debug)]
#[command(
    name = "didreg",
    about = "DidRegistry CLI",
    version,
    long_about = "didreg — DidRegistry CLI\n\nManage signing keys and the owners, delegates and attributes\nof decentralized identities recorded in an event journal."
)]
struct Cli {
    /// Data directory (default: $DID_REGISTRY_HOME or ~/.did-registry)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Signing key to act with
    #[arg(long, global = true, default_value = "default")]
    key: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Authorization flags shared by every mutation.
#[derive(clap::Args, Debug)]
struct AuthArgs {
    /// Identity to act on (default: the key's own identity)
    #[arg(long)]
    identity: Option<String>,

    /// Authorize with an off-line signature instead of a direct call
    #[arg(long)]
    signed: bool,

    /// Nonce to sign (default: the identity's current nonce); implies --signed
    #[arg(long)]
    nonce: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a new signing key
    Keygen {
        /// Name for the new key (overrides --key)
        #[arg(long)]
        name: Option<String>,
    },

    /// List stored keys
    Keys,

    /// Show the identity controlled by the current key
    Whoami,

    /// Show the owner of an identity
    Owner {
        /// Identity (address, DID, or key name)
        identity: String,
    },

    /// Show the nonce of an identity
    Nonce {
        identity: String,
    },

    /// Check whether a delegate is currently valid
    DelegateValid {
        identity: String,
        /// Delegate type (e.g. veriKey, sigAuth)
        delegate_type: String,
        delegate: String,
    },

    /// Check whether an attribute claim is currently valid
    AttributeValid {
        identity: String,
        name: String,
        /// Value (UTF-8, or 0x-prefixed hex)
        value: String,
    },

    /// Resolve the DID document of an identity
    Resolve {
        identity: String,
    },

    /// List recorded events
    Events {
        /// Only events touching this identity
        #[arg(long)]
        identity: Option<String>,

        /// Only events with sequence >= N
        #[arg(long, default_value_t = 0)]
        since: u64,

        /// Print events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Verify the journal hash chain
    Verify,

    /// Transfer control of an identity
    ChangeOwner {
        new_owner: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Grant a typed, time-bounded delegate
    AddDelegate {
        delegate_type: String,
        delegate: String,
        /// Validity from now (e.g. 3600, 24h, 7d)
        #[arg(long)]
        validity: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Revoke a delegate
    RevokeDelegate {
        delegate_type: String,
        delegate: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Record an attribute claim
    SetAttribute {
        name: String,
        value: String,
        /// Validity from now (e.g. 3600, 24h, 7d)
        #[arg(long)]
        validity: String,
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Revoke an attribute claim
    RevokeAttribute {
        name: String,
        value: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
}

// ── Main entry point ──────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let paths = Paths {
        root: data_dir(cli.data_dir.as_deref())?,
    };
    let ctx = Session {
        paths,
        key_name: cli.key,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Keygen { name } => {
            let name = name.unwrap_or_else(|| ctx.key_name.clone());
            cmd_keygen(&ctx, &name)
        }
        Commands::Keys => cmd_keys(&ctx),
        Commands::Whoami => cmd_whoami(&ctx),
        Commands::Owner { identity } => cmd_owner(&ctx, &identity),
        Commands::Nonce { identity } => cmd_nonce(&ctx, &identity),
        Commands::DelegateValid {
            identity,
            delegate_type,
            delegate,
        } => cmd_delegate_valid(&ctx, &identity, &delegate_type, &delegate),
        Commands::AttributeValid {
            identity,
            name,
            value,
        } => cmd_attribute_valid(&ctx, &identity, &name, &value),
        Commands::Resolve { identity } => cmd_resolve(&ctx, &identity),
        Commands::Events {
            identity,
            since,
            json,
        } => cmd_events(&ctx, identity.as_deref(), since, json),
        Commands::Verify => cmd_verify(&ctx),
        Commands::ChangeOwner { new_owner, auth } => {
            let new_owner = ctx.identity(&new_owner)?;
            cmd_mutate(&ctx, &auth, Operation::ChangeOwner { new_owner })
        }
        Commands::AddDelegate {
            delegate_type,
            delegate,
            validity,
            auth,
        } => {
            let operation = Operation::AddDelegate {
                delegate_type: parse_tag(&delegate_type)?,
                delegate: ctx.identity(&delegate)?,
                validity: parse_duration_secs(&validity)
                    .with_context(|| format!("invalid --validity value: '{validity}'"))?,
            };
            cmd_mutate(&ctx, &auth, operation)
        }
        Commands::RevokeDelegate {
            delegate_type,
            delegate,
            auth,
        } => {
            let operation = Operation::RevokeDelegate {
                delegate_type: parse_tag(&delegate_type)?,
                delegate: ctx.identity(&delegate)?,
            };
            cmd_mutate(&ctx, &auth, operation)
        }
        Commands::SetAttribute {
            name,
            value,
            validity,
            auth,
        } => {
            let operation = Operation::SetAttribute {
                name: parse_tag(&name)?,
                value: parse_value(&value)?,
                validity: parse_duration_secs(&validity)
                    .with_context(|| format!("invalid --validity value: '{validity}'"))?,
            };
            cmd_mutate(&ctx, &auth, operation)
        }
        Commands::RevokeAttribute { name, value, auth } => {
            let operation = Operation::RevokeAttribute {
                name: parse_tag(&name)?,
                value: parse_value(&value)?,
            };
            cmd_mutate(&ctx, &auth, operation)
        }
    }
}

/// Resolved global options.
struct Session {
    paths: Paths,
    key_name: String,
    verbose: bool,
}

impl Session {
    fn config(&self) -> Result<RegistryConfig> {
        RegistryConfig::load(&self.paths.config()).context("failed to load registry config")
    }

    fn open(&self) -> Result<DidRegistry<SystemClock>> {
        self.paths
            .journal()
            .open_registry(self.config()?, SystemClock)
            .context("failed to open event journal")
    }

    /// An identity argument: address, DID, or the name of a stored key.
    fn identity(&self, arg: &str) -> Result<Identity> {
        if let Ok(identity) = arg.parse::<Identity>() {
            return Ok(identity);
        }
        let path = self.paths.key(arg);
        if path.exists() {
            return Ok(read_key_info(&path)
                .with_context(|| format!("failed to read key '{arg}'"))?
                .identity);
        }
        bail!("'{arg}' is neither an identity nor a known key name")
    }

    fn load_key(&self) -> Result<Ed25519KeyPair> {
        let path = self.paths.key(&self.key_name);
        if !path.exists() {
            bail!(
                "key '{}' not found — run `didreg keygen --name {}` first",
                self.key_name,
                self.key_name
            );
        }
        let passphrase = read_passphrase(&format!("Passphrase for key '{}': ", self.key_name))?;
        load_key(&path, &passphrase).context("failed to load key (wrong passphrase?)")
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `didreg keygen [--name NAME]`
fn cmd_keygen(ctx: &Session, name: &str) -> Result<()> {
    let path = ctx.paths.key(name);
    if path.exists() {
        bail!("key '{}' already exists at {}", name, path.display());
    }

    let passphrase = read_passphrase("Enter passphrase for new key: ")?;
    if passphrase.is_empty() {
        bail!("passphrase cannot be empty");
    }
    if std::env::var_os(PASSPHRASE_ENV).is_none() {
        let confirm = read_passphrase("Confirm passphrase: ")?;
        if passphrase != confirm {
            bail!("passphrases do not match");
        }
    }

    let key = Ed25519KeyPair::generate();
    let info = save_key(&key, Some(name), &path, &passphrase).context("failed to save key")?;
    let config = ctx.config()?;

    println!("Created key '{name}'");
    println!("  Identity: {}", info.identity);
    println!("  DID:      {}", config.did(&info.identity));
    println!("  File:     {}", path.display());
    if ctx.verbose {
        println!("  Key:      {}", info.public_key);
        println!("  Created:  {}", secs_to_datetime(info.created_at));
    }
    Ok(())
}

/// `didreg keys`
fn cmd_keys(ctx: &Session) -> Result<()> {
    let dir = ctx.paths.keys();
    if !dir.exists() {
        println!("No keys found (directory {} does not exist)", dir.display());
        return Ok(());
    }

    let mut entries: Vec<(String, PathBuf)> = std::fs::read_dir(&dir)
        .context("failed to read key directory")?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            if path.extension().is_some_and(|x| x == KEY_FILE_EXTENSION) {
                let stem = path.file_stem()?.to_string_lossy().into_owned();
                Some((stem, path))
            } else {
                None
            }
        })
        .collect();
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if entries.is_empty() {
        println!("No keys found in {}", dir.display());
        return Ok(());
    }

    println!("{:<20} {:<44} CREATED", "NAME", "IDENTITY");
    println!("{}", "-".repeat(88));
    for (name, path) in &entries {
        match read_key_info(path) {
            Ok(info) => println!(
                "{:<20} {:<44} {}",
                name,
                info.identity.to_string(),
                secs_to_datetime(info.created_at)
            ),
            Err(e) => println!("{:<20} (failed to read: {e})", name),
        }
    }
    Ok(())
}

/// `didreg whoami`
fn cmd_whoami(ctx: &Session) -> Result<()> {
    let path = ctx.paths.key(&ctx.key_name);
    let info = read_key_info(&path)
        .with_context(|| format!("failed to read key '{}'", ctx.key_name))?;
    let config = ctx.config()?;
    println!("Key: {}", ctx.key_name);
    println!("  Identity:   {}", info.identity);
    println!("  DID:        {}", config.did(&info.identity));
    println!("  Public Key: {}", info.public_key);
    Ok(())
}

/// `didreg owner IDENTITY`
fn cmd_owner(ctx: &Session, identity: &str) -> Result<()> {
    let identity = ctx.identity(identity)?;
    println!("{}", ctx.open()?.owner_of(&identity));
    Ok(())
}

/// `didreg nonce IDENTITY`
fn cmd_nonce(ctx: &Session, identity: &str) -> Result<()> {
    let identity = ctx.identity(identity)?;
    println!("{}", ctx.open()?.nonce_of(&identity));
    Ok(())
}

/// `didreg delegate-valid IDENTITY TYPE DELEGATE`
fn cmd_delegate_valid(ctx: &Session, identity: &str, delegate_type: &str, delegate: &str) -> Result<()> {
    let identity = ctx.identity(identity)?;
    let delegate_type = parse_tag(delegate_type)?;
    let delegate = ctx.identity(delegate)?;
    let registry = ctx.open()?;

    let valid = registry.is_valid_delegate(&identity, &delegate_type, &delegate);
    println!("{valid}");
    if ctx.verbose {
        let expiry = registry.delegate_expiry(&identity, &delegate_type, &delegate);
        if expiry == 0 {
            println!("  never granted");
        } else {
            println!("  expires: {}", secs_to_datetime(expiry));
        }
    }
    Ok(())
}

/// `didreg attribute-valid IDENTITY NAME VALUE`
fn cmd_attribute_valid(ctx: &Session, identity: &str, name: &str, value: &str) -> Result<()> {
    let identity = ctx.identity(identity)?;
    let name = parse_tag(name)?;
    let value = parse_value(value)?;
    println!("{}", ctx.open()?.is_currently_valid(&identity, &name, &value));
    Ok(())
}

/// `didreg resolve IDENTITY`
fn cmd_resolve(ctx: &Session, identity: &str) -> Result<()> {
    let identity = ctx.identity(identity)?;
    let document = ctx.open()?.resolve(&identity);
    let json = serde_json::to_string_pretty(&document).context("failed to serialize document")?;
    println!("{json}");
    Ok(())
}

/// `didreg events [--identity ID] [--since N] [--json]`
fn cmd_events(ctx: &Session, identity: Option<&str>, since: u64, json: bool) -> Result<()> {
    let registry = ctx.open()?;
    let events: Vec<_> = match identity {
        Some(arg) => {
            let identity = ctx.identity(arg)?;
            registry
                .events()
                .for_identity(&identity)
                .into_iter()
                .filter(|e| e.sequence >= since)
                .collect()
        }
        None => registry.events().since(since).iter().collect(),
    };

    if json {
        let out = serde_json::to_string_pretty(&events).context("failed to serialize events")?;
        println!("{out}");
        return Ok(());
    }

    if events.is_empty() {
        println!("No events recorded");
        return Ok(());
    }

    println!("{:<6} {:<44} {:<6} {:<24} CHANGE", "SEQ", "IDENTITY", "NONCE", "TIME");
    println!("{}", "-".repeat(110));
    for event in events {
        let change = match &event.kind {
            EventKind::OwnerChanged { owner } => format!("owner -> {owner}"),
            EventKind::DelegateChanged {
                delegate_type,
                delegate,
                valid_to,
                change,
            } => format!(
                "delegate {} {delegate_type} {delegate} until {}",
                change.as_str(),
                secs_to_datetime(*valid_to)
            ),
            EventKind::AttributeChanged {
                name,
                value,
                valid_to,
            } => format!(
                "attribute {name} = 0x{} until {}",
                hex::encode(value),
                secs_to_datetime(*valid_to)
            ),
        };
        println!(
            "{:<6} {:<44} {:<6} {:<24} {}",
            event.sequence,
            event.identity.to_string(),
            event.nonce,
            secs_to_datetime(event.timestamp),
            change
        );
        if ctx.verbose {
            println!("       hash: {}", event.hash);
        }
    }
    Ok(())
}

/// `didreg verify`
fn cmd_verify(ctx: &Session) -> Result<()> {
    let journal = ctx.paths.journal();
    let events = journal.load().context("journal verification failed")?;
    let registry = DidRegistry::from_events(ctx.config()?, SystemClock, events)
        .context("journal replay failed")?;
    println!("Journal OK");
    println!("  Events: {}", registry.events().len());
    println!("  Head:   {}", registry.events().head_hash());
    Ok(())
}

/// Shared path of every mutation: replay, authorize, execute, persist.
fn cmd_mutate(ctx: &Session, auth: &AuthArgs, operation: Operation) -> Result<()> {
    let key = ctx.load_key()?;
    let identity = match auth.identity.as_deref() {
        Some(arg) => ctx.identity(arg)?,
        None => key.identity(),
    };

    let journal = ctx.paths.journal();
    let mut registry = ctx.open()?;
    debug!(
        "replayed {} events from {}",
        registry.events().len(),
        journal.path().display()
    );

    let authorization = if auth.signed || auth.nonce.is_some() {
        let nonce = auth.nonce.unwrap_or_else(|| registry.nonce_of(&identity));
        Authorization::Signed(SignedAuthorization::sign(
            &key,
            registry.registry_id(),
            &identity,
            nonce,
            &operation,
        ))
    } else {
        Authorization::direct(key.identity())
    };

    let op_name = operation.name();
    debug!(
        "authorizing {op_name} on {identity} via {} path",
        authorization.as_str()
    );
    let event = registry
        .execute(identity, operation, &authorization)
        .with_context(|| format!("{op_name} on {identity} failed"))?
        .clone();
    journal
        .commit(&registry)
        .context("failed to save event journal")?;
    debug!("journal committed to {}", journal.path().display());

    println!("{op_name} applied");
    println!("  Identity: {identity}");
    println!("  Path:     {}", authorization.as_str());
    println!("  Nonce:    {}", event.nonce);
    println!("  Event:    #{}", event.sequence);
    if ctx.verbose {
        println!("  Hash:     {}", event.hash);
    }
    Ok(())
}
