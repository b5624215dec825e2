// cpx-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::MetaCpanClient;
pub use validation::validate_registry_url;
