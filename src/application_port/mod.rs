mod auth_service;
mod envelope_cipher;
mod token_codec;
mod token_manager;

pub use auth_service::*;
pub use envelope_cipher::*;
pub use token_codec::*;
pub use token_manager::*;
