//! Bearer token issuing and verification

mod jwt;

pub use jwt::{AuthError, Claims, IssuedToken, JwtService};
