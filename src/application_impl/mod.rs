mod auth_service_impl;
mod credential_hasher_argon2;
mod envelope_cipher_impl;
mod signup_validator;
mod token_codec_jwt;
mod token_manager_impl;

pub use auth_service_impl::*;
pub use credential_hasher_argon2::*;
pub use envelope_cipher_impl::*;
pub use signup_validator::*;
pub use token_codec_jwt::*;
pub use token_manager_impl::*;
