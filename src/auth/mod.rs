pub mod extract;
pub mod password;
pub mod tokens;

pub use extract::{AuthUser, StaffUser};
pub use tokens::{TokenIssuer, TokenPair};
