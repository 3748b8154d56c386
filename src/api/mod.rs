pub mod routes;
pub mod handlers;
pub mod state;

pub use routes::{configure_routes, cors_headers, json_config};
pub use state::AppState;
