mod execute;
mod health;

pub use execute::{execute, execute_batch, preflight};
pub use health::health_check;
