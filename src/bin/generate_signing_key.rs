//! Prints a random 256-bit token signing secret as a `.env` line.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

fn main() {
    let mut key = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut key);
    println!("JWT_SIGNING_KEY={}", URL_SAFE_NO_PAD.encode(key));
}
