pub mod client;
pub mod token;
pub mod types;

pub use client::{TokenSource, WeChatTokenClient};
pub use token::{Clock, Credential, ManualClock, SystemClock, TokenCache};
pub use types::{AccessTokenResponse, IssuedToken};
