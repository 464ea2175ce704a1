//! Token and password cryptography

mod jwt;
mod password;
mod secret;

pub use jwt::{AccessClaims, AccessTokenService, IssuedAccessToken};
pub use password::{
    validate_password_policy, Argon2PasswordHasher, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN,
};
pub use secret::{generate_secret, hash_reset_token, RefreshTokenHasher, SECRET_BYTES};
