pub mod loader;
pub mod model;

pub use loader::from_env;
pub use model::{DbConfig, TlsMode};
