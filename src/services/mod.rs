pub mod auth;
pub mod envelope;
pub mod identity;
pub mod password;
pub mod token;
pub mod totp;

pub use auth::{AuthService, Enrollment, LoginOutcome, TwoFactorStatus};
pub use envelope::SecretEnvelope;
pub use identity::IdentityResolver;
pub use token::{TokenIssuer, TokenPair, TokenType};
pub use totp::TotpEngine;
