mod proxy_session;
mod reauth_manager;

pub use proxy_session::ProxySessionPlugin;
pub use reauth_manager::{Identity, IdentityConnection, ReauthManager};
