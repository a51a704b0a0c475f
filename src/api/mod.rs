pub mod v1;

use crate::server::Server;
use std::sync::Arc;
use warp::Filter;

/// The whole HTTP surface: `/api/...` routes plus rejection recovery.
pub fn api(
    server: Arc<Server>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = std::convert::Infallible> + Clone {
    warp::path("api")
        .and(v1::routes(server))
        .recover(v1::recover_error)
        .with(warp::trace::request())
}
