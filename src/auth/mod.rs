/// Authentication module
///
/// Secret hashing, token issuance/verification and the session core that
/// ties them to the user store.

mod claims;
mod jwt;
mod password;
mod session;

pub use claims::{TokenClaims, TokenPurpose};
pub use jwt::{Clock, SystemClock, TokenCodec, TokenPair};
pub use password::{SecretHasher, MAX_COST, MIN_COST};
pub use session::{AuthCore, Credentials};
