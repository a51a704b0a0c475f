//! Writes a fresh RSA-2048 pair: `private.pem` (PKCS#1) and `public.pem` (SPKI).
//!
//! $ cargo run --bin generate_keys -- --output ./keys

use clap::Parser;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs;
use std::path::PathBuf;

const KEY_BITS: usize = 2048;

#[derive(Debug, Parser)]
struct Args {
    /// Output directory for keys
    #[arg(long, default_value = "./keys")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fs::create_dir_all(&args.output)?;

    let private_key = RsaPrivateKey::new(&mut rand::rngs::OsRng, KEY_BITS)?;
    let public_key = RsaPublicKey::from(&private_key);

    let private_path = args.output.join("private.pem");
    private_key.write_pkcs1_pem_file(&private_path, LineEnding::LF)?;
    restrict_permissions(&private_path)?;

    let public_path = args.output.join("public.pem");
    public_key.write_public_key_pem_file(&public_path, LineEnding::LF)?;

    println!(
        "Successfully generated key pair:\n  Private key: {}\n  Public key:  {}",
        private_path.display(),
        public_path.display()
    );
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &std::path::Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &std::path::Path) -> std::io::Result<()> {
    Ok(())
}
