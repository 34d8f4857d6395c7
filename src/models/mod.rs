pub mod secret;
pub mod session;
pub mod two_factor;
pub mod user;

pub use secret::SealedSecret;
pub use session::SessionRecord;
pub use two_factor::TwoFactorRecord;
pub use user::{UserRecord, UserStatus};
