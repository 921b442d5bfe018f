//! oct-cli: command-line wallet for Octra.
//!
//! Manages the encrypted vault, signs transactions and handles private
//! transfers. The vault lives in a JSON file (default `~/.octra/wallet.json`);
//! nothing is sent over the network.

mod file_store;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use zeroize::Zeroizing;

use oct_core::address::validate_address_format;
use oct_core::{Address, Amount, FeeTier, KeyPair, PublicKey, SignedTransaction, TransactionDraft};
use oct_wallet::keys::keypair_from_mnemonic;
use oct_wallet::mnemonic::{DEFAULT_ENTROPY_BITS, generate_mnemonic, parse_mnemonic};
use oct_wallet::private_transfer::{claim_private_transfer, create_private_transfer};
use oct_wallet::store::stored_wallet_count;
use oct_wallet::{
    PendingTransfer, SealedVault, SessionManager, SystemClock, Vault, WalletConfig, WalletId,
    WalletSource,
};

use file_store::FileStore;

/// Octra command-line wallet.
#[derive(Parser)]
#[command(name = "oct-cli")]
#[command(version, about = "Octra wallet: keys, encrypted vault, signing")]
struct Cli {
    /// Path to the wallet store (default: ~/.octra/wallet.json).
    #[arg(short, long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recovery phrase utilities.
    Mnemonic {
        #[command(subcommand)]
        action: MnemonicAction,
    },
    /// Wallet management subcommands.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Address utilities.
    Address {
        #[command(subcommand)]
        action: AddressAction,
    },
    /// Sign a transaction and print it as JSON.
    Sign(SignArgs),
    /// Private transfers.
    Private {
        #[command(subcommand)]
        action: PrivateAction,
    },
}

#[derive(Subcommand)]
enum MnemonicAction {
    /// Print a fresh recovery phrase.
    Generate(WordsArg),
    /// Check a recovery phrase (read without echo).
    Check,
}

#[derive(Args)]
struct WordsArg {
    /// Number of words: 12, 15, 18, 21 or 24.
    #[arg(short, long, default_value_t = 12)]
    words: usize,
}

#[derive(Subcommand)]
enum WalletAction {
    /// Create a wallet from a fresh recovery phrase.
    Create {
        /// Display name.
        #[arg(short, long, default_value = "Main")]
        name: String,
        #[command(flatten)]
        words: WordsArg,
    },
    /// Import a wallet from a base64 private key (read without echo).
    ImportKey {
        #[arg(short, long, default_value = "Imported")]
        name: String,
    },
    /// Import a wallet from a recovery phrase (read without echo).
    ImportMnemonic {
        #[arg(short, long, default_value = "Restored")]
        name: String,
    },
    /// List wallets.
    List,
    /// Rename a wallet.
    Rename {
        /// Wallet name or id.
        wallet: String,
        new_name: String,
    },
    /// Make a wallet the active one.
    Activate {
        /// Wallet name or id.
        wallet: String,
    },
    /// Remove a wallet from the vault.
    Remove {
        /// Wallet name or id.
        wallet: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Confirm a recovery phrase backup by re-entering it.
    VerifyBackup {
        /// Wallet name or id.
        wallet: String,
    },
    /// Change the vault password.
    Passwd,
}

#[derive(Subcommand)]
enum AddressAction {
    /// Check that a string is a well-formed Octra address.
    Validate { address: String },
}

#[derive(Args)]
struct SignArgs {
    /// Signing wallet name or id (default: active wallet).
    #[arg(short, long)]
    wallet: Option<String>,

    /// Recipient address.
    #[arg(short, long)]
    to: String,

    /// Amount in OCT (e.g., 10.5).
    #[arg(short, long)]
    amount: String,

    /// Account nonce from the balance query.
    #[arg(short, long)]
    nonce: u64,

    /// Fee tier in operation units (default: by amount).
    #[arg(long)]
    fee_tier: Option<u32>,

    /// Unsigned free-text message.
    #[arg(short, long)]
    message: Option<String>,
}

#[derive(Subcommand)]
enum PrivateAction {
    /// Encrypt an amount for a recipient public key.
    Create {
        /// Sending wallet name or id (default: active wallet).
        #[arg(short, long)]
        wallet: Option<String>,
        /// Recipient Ed25519 public key, base64.
        #[arg(long)]
        to_key: String,
        /// Amount in OCT.
        #[arg(short, long)]
        amount: String,
    },
    /// Decrypt a pending private transfer.
    Claim {
        /// Receiving wallet name or id (default: active wallet).
        #[arg(short, long)]
        wallet: Option<String>,
        /// JSON file with `id`, `sender`, `ephemeral_key`, `encrypted_data`.
        #[arg(short, long)]
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let store_path = resolve_store_path(cli.store)?;
    let config = WalletConfig::from_env().context("Invalid wallet configuration")?;

    match cli.command {
        Commands::Mnemonic { action } => match action {
            MnemonicAction::Generate(args) => mnemonic_generate(args),
            MnemonicAction::Check => mnemonic_check(),
        },
        Commands::Wallet { action } => {
            let ctx = Ctx { store_path, config };
            match action {
                WalletAction::Create { name, words } => wallet_create(&ctx, &name, words),
                WalletAction::ImportKey { name } => wallet_import_key(&ctx, &name),
                WalletAction::ImportMnemonic { name } => wallet_import_mnemonic(&ctx, &name),
                WalletAction::List => wallet_list(&ctx),
                WalletAction::Rename { wallet, new_name } => wallet_rename(&ctx, &wallet, &new_name),
                WalletAction::Activate { wallet } => wallet_activate(&ctx, &wallet),
                WalletAction::Remove { wallet, yes } => wallet_remove(&ctx, &wallet, yes),
                WalletAction::VerifyBackup { wallet } => wallet_verify_backup(&ctx, &wallet),
                WalletAction::Passwd => wallet_passwd(&ctx),
            }
        }
        Commands::Address { action } => match action {
            AddressAction::Validate { address } => address_validate(&address),
        },
        Commands::Sign(args) => sign(&Ctx { store_path, config }, args),
        Commands::Private { action } => {
            let ctx = Ctx { store_path, config };
            match action {
                PrivateAction::Create { wallet, to_key, amount } => {
                    private_create(&ctx, wallet.as_deref(), &to_key, &amount)
                }
                PrivateAction::Claim { wallet, file } => private_claim(&ctx, wallet.as_deref(), &file),
            }
        }
    }
}

struct Ctx {
    store_path: PathBuf,
    config: WalletConfig,
}

/// An unlocked vault plus everything needed to write it back.
struct Unlocked {
    store: FileStore,
    sealed: SealedVault,
    session: SessionManager<SystemClock>,
}

impl Unlocked {
    fn open(ctx: &Ctx) -> Result<Self> {
        Self::open_with(ctx, || prompt_secret("Vault password"))
    }

    /// Open the vault, asking for the password only once a vault is found.
    fn open_with(ctx: &Ctx, password: impl FnOnce() -> Result<Zeroizing<String>>) -> Result<Self> {
        let store = FileStore::open(&ctx.store_path)?;
        let sealed = SealedVault::load_from(&store)?.with_context(|| {
            format!(
                "No vault at {}; run `oct-cli wallet create` first",
                store.path().display()
            )
        })?;
        let password = password()?;
        let mut session = SessionManager::with_system_clock(ctx.config.clone());
        session.unlock(&password, &sealed).context("Failed to unlock vault")?;
        Ok(Self {
            store,
            sealed,
            session,
        })
    }

    fn vault(&mut self) -> Result<&Vault> {
        Ok(self.session.vault()?)
    }

    /// Apply `f` to the vault and write the re-encrypted envelope.
    fn update<T>(
        &mut self,
        f: impl FnOnce(&mut Vault) -> Result<T, oct_wallet::WalletError>,
    ) -> Result<T> {
        let (out, envelope) = self.session.update_vault(f)?;
        let count = self.session.vault()?.len();
        SealedVault::save_vault_envelope(&mut self.store, &envelope, count)?;
        self.sealed.vault = envelope;
        Ok(out)
    }

    fn keypair(&mut self, selector: Option<&str>) -> Result<(WalletId, KeyPair)> {
        let vault = self.vault()?;
        let id = match selector {
            Some(s) => resolve_wallet(vault, s)?,
            None => vault
                .active_wallet_id()
                .cloned()
                .context("Vault has no wallets")?,
        };
        let kp = vault.keypair_for(&id)?;
        Ok((id, kp))
    }
}

impl Drop for Unlocked {
    fn drop(&mut self) {
        self.session.lock();
    }
}

// --- mnemonic ---

fn mnemonic_generate(args: WordsArg) -> Result<()> {
    let mnemonic = generate_mnemonic(words_to_bits(args.words)?)?;
    println!("{}", mnemonic.phrase().as_str());
    Ok(())
}

fn mnemonic_check() -> Result<()> {
    let phrase = prompt_secret("Recovery phrase")?;
    match parse_mnemonic(&phrase) {
        Ok(m) => {
            println!("valid ({} words)", m.word_count());
            Ok(())
        }
        Err(_) => bail!("Invalid recovery phrase"),
    }
}

// --- wallet ---

fn wallet_create(ctx: &Ctx, name: &str, words: WordsArg) -> Result<()> {
    let mnemonic = generate_mnemonic(words_to_bits(words.words)?)?;
    let keypair = keypair_from_mnemonic(&mnemonic, "");
    let address = add_wallet(ctx, name, &keypair, WalletSource::Generated)?;

    println!("\n=== WALLET CREATED ===");
    println!("Name:    {}", name.trim());
    println!("Address: {address}");
    println!("\nRECOVERY PHRASE ({} WORDS):", mnemonic.word_count());
    println!("  {}", mnemonic.phrase().as_str());
    println!("\nWARNING: This phrase will NOT be shown again.");
    println!("Write it down, then run `oct-cli wallet verify-backup \"{}\"`.", name.trim());
    Ok(())
}

fn wallet_import_key(ctx: &Ctx, name: &str) -> Result<()> {
    let encoded = prompt_secret("Private key (base64)")?;
    let keypair = KeyPair::from_private_key_base64(&encoded).context("Invalid private key")?;
    let address = add_wallet(ctx, name, &keypair, WalletSource::ImportedKey)?;
    println!("Imported {address}");
    Ok(())
}

fn wallet_import_mnemonic(ctx: &Ctx, name: &str) -> Result<()> {
    let phrase = prompt_secret("Recovery phrase")?;
    let mnemonic = parse_mnemonic(&phrase).context("Invalid recovery phrase")?;
    let keypair = keypair_from_mnemonic(&mnemonic, "");
    let address = add_wallet(ctx, name, &keypair, WalletSource::ImportedMnemonic)?;
    println!("Restored {address}");
    Ok(())
}

/// Add a wallet, creating the vault on first use.
fn add_wallet(ctx: &Ctx, name: &str, keypair: &KeyPair, source: WalletSource) -> Result<Address> {
    let mut store = FileStore::open(&ctx.store_path)?;
    let max = ctx.config.max_wallets;

    match SealedVault::load_from(&store)? {
        None => {
            let mut vault = Vault::new();
            vault.add_wallet(name, keypair, source, max)?;
            let password = prompt_new_password()?;
            let mut session = SessionManager::with_system_clock(ctx.config.clone());
            let sealed = session.create_vault(&password, vault)?;
            session.lock();
            sealed.save_to(&mut store, 1)?;
            info!(path = %store.path().display(), "vault created");
        }
        Some(_) => {
            drop(store);
            let mut unlocked = Unlocked::open(ctx)?;
            unlocked.update(|v| v.add_wallet(name, keypair, source, max))?;
        }
    }
    Ok(keypair.address())
}

fn wallet_list(ctx: &Ctx) -> Result<()> {
    let store = FileStore::open(&ctx.store_path)?;
    if stored_wallet_count(&store)?.unwrap_or(0) == 0 {
        println!("No wallets.");
        return Ok(());
    }
    drop(store);

    let mut unlocked = Unlocked::open(ctx)?;
    let vault = unlocked.vault()?;
    let active = vault.active_wallet_id().cloned();
    for w in vault.wallets() {
        let marker = if Some(&w.id) == active.as_ref() { "*" } else { " " };
        let backup = if w.backup_verified { "" } else { "  (backup not verified)" };
        println!("{marker} {:<32} {}  {}{backup}", w.name, w.address, w.id);
    }
    Ok(())
}

fn wallet_rename(ctx: &Ctx, selector: &str, new_name: &str) -> Result<()> {
    let mut unlocked = Unlocked::open(ctx)?;
    let id = resolve_wallet(unlocked.vault()?, selector)?;
    unlocked.update(|v| v.rename_wallet(&id, new_name))?;
    println!("Renamed to {}", new_name.trim());
    Ok(())
}

fn wallet_activate(ctx: &Ctx, selector: &str) -> Result<()> {
    let mut unlocked = Unlocked::open(ctx)?;
    let id = resolve_wallet(unlocked.vault()?, selector)?;
    unlocked.update(|v| v.set_active(&id))?;
    println!("Active wallet: {selector}");
    Ok(())
}

fn wallet_remove(ctx: &Ctx, selector: &str, yes: bool) -> Result<()> {
    let mut unlocked = Unlocked::open(ctx)?;
    let id = resolve_wallet(unlocked.vault()?, selector)?;
    if !yes {
        let answer = prompt_line(&format!(
            "Remove wallet {selector}? Funds are lost without its recovery phrase [y/N]"
        ))?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            bail!("Aborted");
        }
    }
    let removed = unlocked.update(|v| v.remove_wallet(&id))?;
    println!("Removed {} ({})", removed.name, removed.address);
    Ok(())
}

fn wallet_verify_backup(ctx: &Ctx, selector: &str) -> Result<()> {
    let mut unlocked = Unlocked::open(ctx)?;
    let vault = unlocked.vault()?;
    let id = resolve_wallet(vault, selector)?;
    let expected = vault.keypair_for(&id)?.address();

    let phrase = prompt_secret("Recovery phrase")?;
    let mnemonic = parse_mnemonic(&phrase).context("Invalid recovery phrase")?;
    if keypair_from_mnemonic(&mnemonic, "").address() != expected {
        bail!("Recovery phrase does not match this wallet");
    }
    unlocked.update(|v| v.mark_backup_verified(&id))?;
    println!("Backup verified.");
    Ok(())
}

fn wallet_passwd(ctx: &Ctx) -> Result<()> {
    let mut current = Zeroizing::new(String::new());
    let mut unlocked = Unlocked::open_with(ctx, || {
        current = prompt_secret("Current password")?;
        Ok(current.clone())
    })?;
    let new_password = prompt_new_password()?;
    let resealed = unlocked
        .session
        .change_password(&current, &new_password, &unlocked.sealed)?;
    let count = unlocked.vault()?.len();
    resealed.save_to(&mut unlocked.store, count)?;
    unlocked.sealed = resealed;
    println!("Password changed.");
    Ok(())
}

// --- address ---

fn address_validate(address: &str) -> Result<()> {
    if !validate_address_format(address) {
        bail!("Invalid address: {address}");
    }
    println!("valid");
    Ok(())
}

// --- signing ---

fn sign(ctx: &Ctx, args: SignArgs) -> Result<()> {
    let to = Address::parse(&args.to).context("Invalid recipient address")?;
    let amount = Amount::from_oct_str(&args.amount).context("Invalid amount")?;
    let fee_tier = match args.fee_tier {
        Some(units) => FeeTier::new(units)?,
        None => FeeTier::for_amount(amount),
    };

    let mut unlocked = Unlocked::open(ctx)?;
    let (_, keypair) = unlocked.keypair(args.wallet.as_deref())?;

    let now = chrono::Utc::now();
    let mut draft = TransactionDraft::new()
        .from(keypair.address())
        .to(to)
        .amount(amount)
        .nonce(args.nonce)
        .fee_tier(fee_tier)
        .timestamp(now.timestamp_micros() as f64 / 1_000_000.0);
    if let Some(message) = args.message {
        draft = draft.message(message);
    }

    let signed = SignedTransaction::sign(&keypair, &draft)?;
    let hash = signed.hash()?;
    info!(hash = %hash, "transaction signed");
    println!("{}", serde_json::to_string_pretty(&signed)?);
    Ok(())
}

// --- private transfers ---

fn private_create(ctx: &Ctx, wallet: Option<&str>, to_key: &str, amount: &str) -> Result<()> {
    let recipient = PublicKey::from_base64(to_key).context("Invalid recipient public key")?;
    let amount = Amount::from_oct_str(amount).context("Invalid amount")?;

    let mut unlocked = Unlocked::open(ctx)?;
    let (_, keypair) = unlocked.keypair(wallet)?;
    let transfer = create_private_transfer(&keypair, &recipient, amount)?;
    let wire = PendingTransfer::from_private_transfer(&transfer);

    let json = serde_json::json!({
        "id": wire.id,
        "sender": wire.sender,
        "ephemeral_key": wire.ephemeral_key,
        "encrypted_data": wire.encrypted_data,
    });
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn private_claim(ctx: &Ctx, wallet: Option<&str>, file: &Path) -> Result<()> {
    let body = std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let pending: PendingTransfer =
        serde_json::from_slice(&body).context("Not a pending transfer JSON object")?;
    let transfer = pending.to_private_transfer()?;

    let mut unlocked = Unlocked::open(ctx)?;
    let (_, keypair) = unlocked.keypair(wallet)?;
    let amount = claim_private_transfer(&keypair, &transfer)
        .context("Transfer is not addressed to this wallet or was altered")?;

    println!("Transfer {} from {}", pending.id_string(), transfer.sender);
    println!("Amount: {amount} ({} micro)", amount.micro());
    Ok(())
}

// --- helpers ---

/// Find a wallet by id or case-insensitive name.
fn resolve_wallet(vault: &Vault, selector: &str) -> Result<WalletId> {
    let by_id = WalletId::from(selector.trim());
    if vault.get(&by_id).is_some() {
        return Ok(by_id);
    }
    vault
        .find_by_name(selector)
        .map(|w| w.id.clone())
        .with_context(|| format!("No wallet named or with id {selector:?}"))
}

fn words_to_bits(words: usize) -> Result<usize> {
    match words {
        12 | 15 | 18 | 21 | 24 => Ok(words * 32 / 3),
        _ => bail!("Word count must be 12, 15, 18, 21 or 24"),
    }
}

/// Prompt for a secret without echo.
fn prompt_secret(prompt: &str) -> Result<Zeroizing<String>> {
    rpassword::prompt_password(format!("{prompt}: "))
        .map(Zeroizing::new)
        .context("Failed to read input")
}

fn prompt_new_password() -> Result<Zeroizing<String>> {
    let password = prompt_secret("New vault password")?;
    let confirm = prompt_secret("Confirm password")?;
    if *password != *confirm {
        bail!("Passwords do not match");
    }
    Ok(password)
}

fn prompt_line(prompt: &str) -> Result<String> {
    eprint!("{prompt}: ");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read input")?;
    Ok(line)
}

/// Resolve the store path, using the default if not provided.
fn resolve_store_path(path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(p) = path {
        return Ok(p);
    }
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".octra").join("wallet.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    fn ctx_with_vault(dir: &Path, password: &str) -> Ctx {
        let ctx = Ctx {
            store_path: dir.join("wallet.json"),
            config: WalletConfig::default(),
        };
        let mut vault = Vault::new();
        vault
            .add_wallet("Main", &KeyPair::from_secret_bytes([1u8; 32]), WalletSource::Generated, 5)
            .unwrap();
        let (sealed, _) = SealedVault::create(password, &vault).unwrap();
        let mut store = FileStore::open(&ctx.store_path).unwrap();
        sealed.save_to(&mut store, 1).unwrap();
        ctx
    }

    #[test]
    fn open_asks_for_password_once() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_vault(dir.path(), "correct-horse");
        let mut asked = 0;
        let mut unlocked = Unlocked::open_with(&ctx, || {
            asked += 1;
            Ok(Zeroizing::new("correct-horse".to_string()))
        })
        .unwrap();
        assert_eq!(asked, 1);
        assert_eq!(unlocked.vault().unwrap().len(), 1);
    }

    #[test]
    fn open_without_vault_does_not_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Ctx {
            store_path: dir.path().join("wallet.json"),
            config: WalletConfig::default(),
        };
        let result = Unlocked::open_with(&ctx, || panic!("prompted without a vault"));
        assert!(result.is_err());
    }

    #[test]
    fn open_with_wrong_password_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ctx_with_vault(dir.path(), "correct-horse");
        assert!(Unlocked::open_with(&ctx, || Ok(Zeroizing::new("wrong-horse".into()))).is_err());
    }

    #[test]
    fn words_map_to_entropy_bits() {
        assert_eq!(words_to_bits(12).unwrap(), DEFAULT_ENTROPY_BITS);
        assert_eq!(words_to_bits(24).unwrap(), 256);
        assert!(words_to_bits(13).is_err());
    }

    #[test]
    fn resolve_by_name_or_id() {
        let mut vault = Vault::new();
        let id = vault
            .add_wallet("Main", &KeyPair::from_secret_bytes([1u8; 32]), WalletSource::Generated, 5)
            .unwrap();
        assert_eq!(resolve_wallet(&vault, "main").unwrap(), id);
        assert_eq!(resolve_wallet(&vault, id.as_str()).unwrap(), id);
        assert!(resolve_wallet(&vault, "other").is_err());
    }

    #[test]
    fn parse_sign_command() {
        let cli = Cli::try_parse_from([
            "oct-cli", "sign", "--to", "octabc", "--amount", "1.5", "--nonce", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Sign(args) => {
                assert_eq!(args.amount, "1.5");
                assert_eq!(args.nonce, 3);
                assert!(args.wallet.is_none());
            }
            _ => panic!("expected sign"),
        }
    }
}
