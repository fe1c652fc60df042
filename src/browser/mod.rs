pub mod raw_cdp;
pub mod session;

pub use session::{BrowserSessionManager, BrowserStatus, CdpSession};
