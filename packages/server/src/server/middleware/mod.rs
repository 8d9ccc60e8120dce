// HTTP middleware
pub mod trigger_auth;

pub use trigger_auth::*;
