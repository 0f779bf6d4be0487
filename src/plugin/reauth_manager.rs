use std::fmt::{Debug, Formatter};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use log::{debug, warn};

use crate::driver::{DriverLoader, DriverObject};
use crate::error::{InitializationError, ReauthError};
use crate::{ConnectionGuard, Manager, Pool, ReauthPlugin};

/// Database identity a checkout should run as.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    username: String,
    password: Option<String>,
}

impl Identity {
    /// Identity without a password; the password key is left out of the
    /// driver call.
    pub fn new<S: Into<String>>(username: S) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn with_password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl Debug for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Pooled connection plus the identity it currently runs as.
pub struct IdentityConnection<C> {
    inner: C,
    identity: Option<Identity>,
}

impl<C> IdentityConnection<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            identity: None,
        }
    }

    /// `None` until the first successful reauthentication, i.e. the
    /// connection still runs as the user it logged in with.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn runs_as(&self, identity: &Identity) -> bool {
        self.identity.as_ref() == Some(identity)
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C> Deref for IdentityConnection<C> {
    type Target = C;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<C> DerefMut for IdentityConnection<C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<C: Debug> Debug for IdentityConnection<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConnection")
            .field("inner", &self.inner)
            .field("identity", &self.identity)
            .finish()
    }
}

/// Manager wrapper that lets checkouts switch the identity of a pooled
/// connection through a [`ReauthPlugin`] instead of opening a new one.
///
/// # Example
/// ```no_run
/// use reauth_pool::driver::DriverRegistry;
/// use reauth_pool::{Identity, Manager, Pool, ProxySessionPlugin, ReauthError, ReauthManager};
///
/// struct OracleManager;
/// struct OracleConnection;
///
/// #[derive(Debug)]
/// enum Error {
///     Pool(String),
///     Reauth(ReauthError),
/// }
///
/// impl From<&str> for Error {
///     fn from(s: &str) -> Self {
///         Error::Pool(s.to_string())
///     }
/// }
///
/// impl From<ReauthError> for Error {
///     fn from(e: ReauthError) -> Self {
///         Error::Reauth(e)
///     }
/// }
///
/// impl Manager for OracleManager {
///     type Connection = OracleConnection;
///     type Error = Error;
///
///     async fn connect(&self) -> Result<Self::Connection, Self::Error> {
///         Ok(OracleConnection)
///     }
///
///     async fn check(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
///
/// # async fn run(registry: DriverRegistry) -> Result<(), Error> {
/// let manager = ReauthManager::new(OracleManager, ProxySessionPlugin::oracle(), &registry)
///     .expect("oracle driver missing");
/// let pool = Pool::new(manager);
/// let conn = pool.get_as(&Identity::new("alice").with_password("secret")).await?;
/// # Ok(())
/// # }
/// ```
pub struct ReauthManager<M: Manager, P: ReauthPlugin> {
    /// The underlying connection manager
    pub manager: M,
    plugin: P,
    default_identity: Option<Identity>,
}

impl<M: Manager, P: ReauthPlugin> ReauthManager<M, P> {
    /// Initializes `plugin` against `loader`. Fails pool setup if the driver
    /// capability cannot be bound.
    pub fn new(
        manager: M,
        plugin: P,
        loader: &dyn DriverLoader,
    ) -> Result<Self, InitializationError> {
        plugin.initialize(loader)?;
        Ok(Self {
            manager,
            plugin,
            default_identity: None,
        })
    }

    /// Identity that [`Pool::get_default`] switches connections back to.
    /// Without one, connections left on another identity are discarded
    /// instead.
    pub fn with_default_identity(mut self, identity: Identity) -> Self {
        self.default_identity = Some(identity);
        self
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn default_identity(&self) -> Option<&Identity> {
        self.default_identity.as_ref()
    }
}

impl<M, P> ReauthManager<M, P>
where
    M: Manager,
    M::Connection: DriverObject,
    P: ReauthPlugin,
{
    /// Switches `conn` to `identity` unless it already runs as it. Returns
    /// whether the driver was called.
    ///
    /// On error the recorded identity is left unchanged.
    pub fn reauthenticate(
        &self,
        conn: &mut IdentityConnection<M::Connection>,
        identity: &Identity,
    ) -> Result<bool, ReauthError> {
        if conn.runs_as(identity) {
            return Ok(false);
        }
        self.plugin
            .reauthenticate(&conn.inner, identity.username(), identity.password())?;
        conn.identity = Some(identity.clone());
        Ok(true)
    }
}

impl<M: Manager, P: ReauthPlugin> Manager for ReauthManager<M, P> {
    type Connection = IdentityConnection<M::Connection>;
    type Error = M::Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Ok(IdentityConnection::new(self.manager.connect().await?))
    }

    async fn check(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        self.manager.check(&mut conn.inner).await
    }
}

impl<M, P> Pool<ReauthManager<M, P>>
where
    M: Manager,
    M::Connection: DriverObject,
    M::Error: From<ReauthError>,
    P: ReauthPlugin,
{
    /// Checks out a connection running as `identity`.
    pub async fn get_as(
        &self,
        identity: &Identity,
    ) -> Result<ConnectionGuard<ReauthManager<M, P>>, M::Error> {
        self.get_timeout_as(identity, None).await
    }

    /// Like [`get_as`](Self::get_as) with a timeout on the checkout itself.
    /// The driver call is not covered by the timeout.
    ///
    /// A rejected identity change (database error) puts the connection back
    /// into the pool. Any other failure discards it, since the session state
    /// is unknown.
    pub async fn get_timeout_as(
        &self,
        identity: &Identity,
        d: Option<Duration>,
    ) -> Result<ConnectionGuard<ReauthManager<M, P>>, M::Error> {
        let guard = self.get_timeout(d).await?;
        self.switch(guard, identity)
    }

    /// Checks out a connection running as the pool's own identity.
    ///
    /// [`get`](Pool::get) hands out connections as they were left, possibly
    /// still running as the identity of an earlier [`get_as`](Self::get_as).
    /// This switches such a connection to the manager's default identity,
    /// or discards it when no default identity is configured.
    pub async fn get_default(&self) -> Result<ConnectionGuard<ReauthManager<M, P>>, M::Error> {
        self.get_timeout_default(None).await
    }

    pub async fn get_timeout_default(
        &self,
        d: Option<Duration>,
    ) -> Result<ConnectionGuard<ReauthManager<M, P>>, M::Error> {
        let manager: &ReauthManager<M, P> = &self.manager;
        loop {
            let guard = self.get_timeout(d).await?;
            let current = match guard.identity() {
                None => return Ok(guard),
                Some(current) => current.username().to_string(),
            };
            match manager.default_identity() {
                Some(default) => return self.switch(guard, default),
                None => {
                    debug!("connection runs as {}, discarding it", current);
                    guard.discard();
                }
            }
        }
    }

    fn switch(
        &self,
        mut guard: ConnectionGuard<ReauthManager<M, P>>,
        identity: &Identity,
    ) -> Result<ConnectionGuard<ReauthManager<M, P>>, M::Error> {
        let manager: &ReauthManager<M, P> = &self.manager;
        match manager.reauthenticate(&mut guard, identity) {
            Ok(_) => Ok(guard),
            Err(e) if e.should_discard_connection() => {
                warn!(
                    "reauthentication as {} failed, discarding connection: {}",
                    identity.username(),
                    e
                );
                guard.discard();
                Err(e.into())
            }
            Err(e) => {
                debug!("reauthentication as {} rejected: {}", identity.username(), e);
                drop(guard);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_debug_hides_password() {
        let id = Identity::new("alice").with_password("secret");
        let s = format!("{:?}", id);
        assert!(s.contains("alice"));
        assert!(!s.contains("secret"));
        assert_eq!(
            format!("{:?}", Identity::new("bob")),
            "Identity { username: \"bob\", password: None }"
        );
    }

    #[test]
    fn identity_equality_includes_password() {
        let a = Identity::new("alice").with_password("secret");
        assert_eq!(a, Identity::new("alice").with_password("secret"));
        assert_ne!(a, Identity::new("alice"));
        assert_ne!(Identity::new("alice"), Identity::new("alice").with_password(""));
    }

    #[test]
    fn fresh_connection_runs_as_login_user() {
        let conn = IdentityConnection::new(5u8);
        assert!(conn.identity().is_none());
        assert!(!conn.runs_as(&Identity::new("alice")));
        assert_eq!(*conn, 5);
        assert_eq!(conn.into_inner(), 5);
    }
}
