//! Seals a JSON document for the decryption gateway, the way a client would.
//!
//! $ cargo run --bin envelope_demo -- --public-key keys/public.pem '{"hello":"world"}'
//!
//! The output is the `{"data": ...}` body to POST with `Content-Type: application/json`.

use clap::Parser;
use keystone::application_impl::{KeyWrapPadding, seal_envelope};
use keystone::infra_keys::load_public_key;

#[derive(Debug, Parser)]
struct Args {
    #[arg(long, default_value = "keys/public.pem")]
    public_key: String,
    /// "oaep_sha256" or "pkcs1v15"; must match the server's envelope.padding
    #[arg(long, default_value = "oaep_sha256")]
    padding: String,
    json: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    serde_json::from_str::<serde_json::Value>(&args.json)?;
    let padding: KeyWrapPadding = args.padding.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let public_key = load_public_key(&args.public_key)?;

    let envelope = seal_envelope(&public_key, padding, args.json.as_bytes())?;
    println!("{}", serde_json::json!({ "data": envelope }));
    Ok(())
}
