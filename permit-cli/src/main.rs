use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy_primitives::{Address, U256};
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use permit_client::{
    build_and_sign, hexfmt, permit2_domain, HttpLedgerReader, Layout, LocalSigningKey,
    NonceBitmap, PackedField, PermissionMessage, ScalarKind, StorageDecoder, Value,
    DEFAULT_MAX_WORDS, PERMIT2_ADDRESS,
};

/// Inspect remote storage, allocate replay nonces and sign Permit2
/// permissions, all without sending a transaction.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON-RPC endpoint used for storage reads.
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode a `_locks`-style dynamic array (packed owner + start time in
    /// one word, amount in the next) straight from contract storage.
    ReadLocks {
        /// Contract holding the array.
        #[arg(long)]
        program: Address,

        /// Declared slot of the array (its length word).
        #[arg(long, default_value_t = 0)]
        slot: u64,

        /// Historical block number (defaults to latest).
        #[arg(long)]
        block: Option<u64>,
    },

    /// Find the first unused Permit2 nonce for an owner.
    FindNonce {
        /// Owner whose nonce bitmap is scanned.
        #[arg(long)]
        owner: Address,

        /// Permit2 deployment to scan.
        #[arg(long, default_value_t = PERMIT2_ADDRESS)]
        permit2: Address,

        /// Bitmap words to scan before giving up (256 nonces each).
        #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
        max_words: u64,
    },

    /// Allocate a nonce and produce a signed PermitTransferFrom permission.
    SignPermit {
        /// Asset to move.
        #[arg(long)]
        token: Address,

        /// Amount, decimal or 0x-hex.
        #[arg(long)]
        amount: U256,

        /// Delegate allowed to execute the movement.
        #[arg(long)]
        spender: Address,

        /// Chain id bound into the signing domain.
        #[arg(long)]
        chain_id: u64,

        /// Permit2 deployment verifying the signature.
        #[arg(long, default_value_t = PERMIT2_ADDRESS)]
        permit2: Address,

        /// Validity window in seconds from now.
        #[arg(long, default_value_t = 3600)]
        valid_for: u64,

        /// Bitmap words to scan for an unused nonce.
        #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
        max_words: u64,

        /// Holder private key (hex string, 0x...).
        #[arg(long, env = "PKEY", conflicts_with = "private_key_path")]
        private_key: Option<String>,

        /// Path to a file containing the holder private key.
        #[arg(long, env = "PRIV_KEY_PATH", conflicts_with = "private_key")]
        private_key_path: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let reader = HttpLedgerReader::connect(&cli.rpc_url).context("connecting rpc endpoint")?;

    match cli.command {
        Command::ReadLocks {
            program,
            slot,
            block,
        } => read_locks(&reader, program, slot, block).await,
        Command::FindNonce {
            owner,
            permit2,
            max_words,
        } => find_nonce(&reader, permit2, owner, max_words).await,
        Command::SignPermit {
            token,
            amount,
            spender,
            chain_id,
            permit2,
            valid_for,
            max_words,
            private_key,
            private_key_path,
        } => {
            let key = load_key(private_key, private_key_path)?;
            sign_permit(
                &reader, permit2, chain_id, token, amount, spender, valid_for, max_words, &key,
            )
            .await
        }
    }
}

/// `_locks` layout from the lesson contract: `(address user, uint64
/// startTime)` sharing the first word, `uint256 amount` in the second.
fn locks_layout(declared_slot: u64) -> Layout {
    Layout::DynamicArray {
        declared_slot: U256::from(declared_slot),
        element_words: vec![
            Layout::packed(vec![
                PackedField::new("user", 0, 20, ScalarKind::Address),
                PackedField::new("startTime", 20, 8, ScalarKind::Uint),
            ]),
            Layout::whole_word("amount", ScalarKind::Uint),
        ],
    }
}

async fn read_locks(
    reader: &HttpLedgerReader,
    program: Address,
    slot: u64,
    block: Option<u64>,
) -> Result<()> {
    let mut decoder = StorageDecoder::new(reader, program);
    if let Some(block) = block {
        decoder = decoder.at_block(block);
    }

    let elements = decoder
        .decode_array(&locks_layout(slot))
        .await
        .context("decoding locks array")?;

    let locks: Vec<_> = elements
        .iter()
        .map(|fields| {
            let mut obj = serde_json::Map::new();
            for field in fields {
                obj.insert(field.name.clone(), value_json(&field.value));
            }
            serde_json::Value::Object(obj)
        })
        .collect();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "program": hexfmt::address(program),
            "length": locks.len(),
            "locks": locks,
        }))?
    );
    Ok(())
}

async fn find_nonce(
    reader: &HttpLedgerReader,
    permit2: Address,
    owner: Address,
    max_words: u64,
) -> Result<()> {
    let bitmap = NonceBitmap::new(reader, permit2);
    let nonce = bitmap
        .find_unused_nonce(owner, max_words)
        .await
        .context("scanning nonce bitmap")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "owner": hexfmt::address(owner),
            "permit2": hexfmt::address(permit2),
            "nonce": nonce.to_string(),
        }))?
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn sign_permit(
    reader: &HttpLedgerReader,
    permit2: Address,
    chain_id: u64,
    token: Address,
    amount: U256,
    spender: Address,
    valid_for: u64,
    max_words: u64,
    key: &LocalSigningKey,
) -> Result<()> {
    let owner = key.address().context("deriving holder address")?;

    let bitmap = NonceBitmap::new(reader, permit2);
    let nonce = bitmap
        .find_unused_nonce(owner, max_words)
        .await
        .context("scanning nonce bitmap")?;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock before the unix epoch")?
        .as_secs();
    let permission = PermissionMessage {
        token,
        amount,
        spender,
        nonce,
        deadline: now + valid_for,
    };

    let domain = permit2_domain(chain_id, permit2);
    let signed = build_and_sign(&domain, &permission, key).context("signing permission")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "owner": hexfmt::address(owner),
            "token": hexfmt::address(token),
            "amount": amount.to_string(),
            "spender": hexfmt::address(spender),
            "nonce": nonce.to_string(),
            "deadline": permission.deadline,
            "digest": hexfmt::word(&signed.digest),
            "signature": signed.signature.to_string(),
        }))?
    );
    Ok(())
}

fn load_key(
    private_key: Option<String>,
    private_key_path: Option<String>,
) -> Result<LocalSigningKey> {
    let hex = if let Some(key) = private_key {
        key
    } else if let Some(path) = private_key_path {
        fs::read_to_string(&path).with_context(|| format!("reading key file `{path}`"))?
    } else {
        return Err(anyhow!(
            "missing holder key: provide --private-key or --private-key-path (or set PKEY/PRIV_KEY_PATH)"
        ));
    };
    LocalSigningKey::from_hex(&hex).context("parsing private key")
}

fn value_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Uint(u) => json!(u.to_string()),
        Value::Address(a) => json!(hexfmt::address(*a)),
        Value::Bytes(b) => json!(hexfmt::bytes(b)),
    }
}
