/// Middleware module
///
/// Token guards that turn a bearer header into typed, verified claims.

mod token_guard;

pub use token_guard::{PresentedRefreshToken, TokenGuard};
