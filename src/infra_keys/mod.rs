mod key_provider;

pub use key_provider::*;
