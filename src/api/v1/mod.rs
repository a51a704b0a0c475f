mod error;
mod gateway;
mod handler;
mod router;

pub use error::{ApiErrorCode, recover_error};
pub use gateway::{GatewayRejection, decrypted_body, open_body};
pub use handler::ApiResponse;
pub use router::routes;
