mod envelope;
mod principal;
mod token;

pub use envelope::*;
pub use principal::*;
pub use token::*;
