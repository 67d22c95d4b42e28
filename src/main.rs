use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use yx_client::codec::{encode_varint, Name};
use yx_client::crypto::{sha256, signing_digest, PrivateKey};
use yx_client::Bytes32;

/// Offline helpers for names, keys and transaction digests
#[derive(Parser, Debug)]
#[command(name = "yx-cli", version, about)]
struct Cli {
    /// Print machine-readable JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Account and action name conversion
    Name {
        #[command(subcommand)]
        op: NameOp,
    },
    /// Key utilities
    Key {
        #[command(subcommand)]
        op: KeyOp,
    },
    /// Signing digest and id of a packed transaction
    Digest {
        /// Chain id, 64 hex characters
        #[arg(long)]
        chain_id: String,
        /// Packed transaction bytes in hex
        #[arg(long)]
        tx: String,
    },
    /// Variable-length encoding of an unsigned integer
    Varint { value: u64 },
}

#[derive(Subcommand, Debug)]
enum NameOp {
    Encode { name: String },
    Decode { value: u64 },
}

#[derive(Subcommand, Debug)]
enum KeyOp {
    /// Derive the public key of a WIF or PVT_K1_ private key
    Public { private_key: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let output = match cli.command {
        Command::Name { op: NameOp::Encode { name } } => {
            let encoded = Name::new(&name).with_context(|| format!("invalid name '{}'", name))?;
            (
                json!({ "name": encoded.as_str(), "value": encoded.value() }),
                encoded.value().to_string(),
            )
        }
        Command::Name { op: NameOp::Decode { value } } => {
            let decoded = Name::from_value(value);
            (
                json!({ "name": decoded.as_str(), "value": value }),
                decoded.as_str().to_string(),
            )
        }
        Command::Key { op: KeyOp::Public { private_key } } => {
            let private: PrivateKey = private_key.parse().context("invalid private key")?;
            let public = private.public_key()?;
            let legacy = public.to_legacy_string("EOS");
            (
                json!({ "public_key": public.to_k1_string(), "legacy": legacy }),
                format!("{}\n{}", public.to_k1_string(), legacy),
            )
        }
        Command::Digest { chain_id, tx } => {
            let chain_id: Bytes32 = chain_id.parse().context("chain id must be 32 bytes of hex")?;
            let packed = hex::decode(&tx).context("transaction must be hex")?;
            let digest = Bytes32::new(signing_digest(&chain_id, &packed, &[]));
            let id = Bytes32::new(sha256(&packed));
            (
                json!({ "digest": digest, "transaction_id": id }),
                format!("digest: {}\ntransaction_id: {}", digest, id),
            )
        }
        Command::Varint { value } => {
            let encoded = hex::encode(encode_varint(value));
            (json!({ "value": value, "hex": encoded }), encoded)
        }
    };

    let (as_json, as_text) = output;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&as_json)?);
    } else {
        println!("{}", as_text);
    }
    Ok(())
}
