#![allow(async_fn_in_trait)]

#[macro_use]
mod defer;
pub mod config;
pub mod driver;
pub mod error;
pub mod guard;
pub mod plugin;
pub mod pool;
pub mod state;

use crate::driver::{DriverLoader, DriverObject};

/// Manager opens physical connections for the [`Pool`] and validates them on checkout
pub trait Manager {
    type Connection;

    type Error: for<'a> From<&'a str>;

    ///open a new physical connection
    async fn connect(&self) -> Result<Self::Connection, Self::Error>;
    ///check Connection is alive? if not return Error(Connection will be dropped)
    async fn check(&self, conn: &mut Self::Connection) -> Result<(), Self::Error>;
}

/// Changes the database identity of an open connection in place.
///
/// One instance serves every connection of a pool. The pool calls
/// [`initialize`](ReauthPlugin::initialize) once at startup and
/// [`reauthenticate`](ReauthPlugin::reauthenticate) on checkouts that need a
/// different identity than the connection currently holds.
pub trait ReauthPlugin: Send + Sync {
    /// Binds the driver capability through `loader`. An error here is a
    /// configuration error and must fail pool startup.
    fn initialize(&self, loader: &dyn DriverLoader) -> Result<(), InitializationError>;

    /// Switches `connection` to `username`. `None` omits the password,
    /// which is not the same as an empty one.
    ///
    /// Never opens, closes or replaces the connection. Calls on different
    /// connections may run concurrently.
    fn reauthenticate(
        &self,
        connection: &dyn DriverObject,
        username: &str,
        password: Option<&str>,
    ) -> Result<(), ReauthError>;
}

impl<P: ReauthPlugin + ?Sized> ReauthPlugin for std::sync::Arc<P> {
    fn initialize(&self, loader: &dyn DriverLoader) -> Result<(), InitializationError> {
        (**self).initialize(loader)
    }

    fn reauthenticate(
        &self,
        connection: &dyn DriverObject,
        username: &str,
        password: Option<&str>,
    ) -> Result<(), ReauthError> {
        (**self).reauthenticate(connection, username, password)
    }
}

pub use config::ProxySessionConfig;
pub use error::{DatabaseError, DriverError, InitializationError, InvocationError, ReauthError};
pub use guard::ConnectionGuard;
pub use plugin::{Identity, IdentityConnection, ProxySessionPlugin, ReauthManager};
pub use pool::Pool;
pub use state::State;
