use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Token lifecycle and envelope decryption gateway")]
pub struct Cli {
    /// Path to a settings file, without or with the `.toml` extension.
    #[arg(long)]
    pub settings: Option<String>,
}
