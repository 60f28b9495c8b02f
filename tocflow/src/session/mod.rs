//! Authenticated, stateful access to the primary catalog site.

mod context;
mod cookies;

pub use context::{first_detail_id, DetailPage, SessionContext, SessionState};
pub use cookies::{parse_set_cookie, CookieJar, SetCookie};
