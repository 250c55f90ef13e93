mod helpers;
mod middleware;
mod token;

pub use helpers::{TokenValidationError, extract_token_from_header, validate_token};
pub use middleware::{AuthError, MaybeUser, RequireAdmin, RequireUser};
pub use token::{TokenGenerator, parse_token};
