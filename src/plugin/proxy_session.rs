use std::fmt::{Debug, Formatter};
use std::sync::OnceLock;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::config::ProxySessionConfig;
use crate::driver::{
    BoundField, BoundOperation, DriverLoader, DriverObject, ParamKind, Properties, Resolver,
    Signature, Value,
};
use crate::error::{DatabaseError, DriverError, InitializationError, InvocationError, ReauthError};
use crate::ReauthPlugin;

/// Reauthenticates through the driver's "open proxy session" operation.
///
/// `initialize` binds the operation and the three selector/key fields once;
/// `reauthenticate` reads the field values from the connection it is given
/// and calls the operation with a fresh property map. Database errors raised
/// by the driver are passed through untouched.
///
/// # Example
/// ```no_run
/// use reauth_pool::driver::DriverRegistry;
/// use reauth_pool::{ProxySessionPlugin, ReauthPlugin};
///
/// // the driver crate fills the registry with its connection types
/// let registry = DriverRegistry::new();
/// let plugin = ProxySessionPlugin::oracle();
/// plugin.initialize(&registry).expect("oracle driver not available");
/// ```
pub struct ProxySessionPlugin {
    config: ProxySessionConfig,
    init_lock: Mutex<()>,
    binding: OnceLock<ProxySessionBinding>,
}

/// Members resolved by `initialize`. Either all present or not published.
struct ProxySessionBinding {
    open_proxy_session: BoundOperation,
    proxy_type: BoundField,
    user_name_key: BoundField,
    password_key: BoundField,
}

impl ProxySessionPlugin {
    pub fn new(config: ProxySessionConfig) -> Self {
        Self {
            config,
            init_lock: Mutex::new(()),
            binding: OnceLock::new(),
        }
    }

    pub fn oracle() -> Self {
        Self::new(ProxySessionConfig::oracle())
    }

    pub fn config(&self) -> &ProxySessionConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.binding.get().is_some()
    }

    fn resolve(&self, loader: &dyn DriverLoader) -> Result<ProxySessionBinding, DriverError> {
        let resolver = Resolver::new(loader);
        let ty = resolver.load(&self.config.connection_type)?;
        let signature = Signature::new(
            self.config.operation.as_str(),
            &[ParamKind::Int, ParamKind::Properties],
        );
        let key_kinds = [ParamKind::Int, ParamKind::Str];
        Ok(ProxySessionBinding {
            open_proxy_session: resolver.bind_signature(&ty, &signature)?,
            proxy_type: resolver.bind_field(&ty, &self.config.proxy_type_field, &[ParamKind::Int])?,
            user_name_key: resolver.bind_field(&ty, &self.config.user_name_key_field, &key_kinds)?,
            password_key: resolver.bind_field(&ty, &self.config.password_key_field, &key_kinds)?,
        })
    }

    fn internal(&self, cause: InvocationError) -> ReauthError {
        ReauthError::Internal {
            operation: self.config.operation.clone(),
            cause,
        }
    }

    /// Driver-raised database errors become [`ReauthError::Database`]; all
    /// other failures are wrapped as [`ReauthError::Internal`].
    fn classify(&self, err: InvocationError) -> ReauthError {
        match err {
            InvocationError::Raised(cause) => match cause.downcast::<DatabaseError>() {
                Ok(db) => ReauthError::Database(*db),
                Err(other) => self.internal(InvocationError::Raised(other)),
            },
            binding => self.internal(binding),
        }
    }
}

impl Default for ProxySessionPlugin {
    fn default() -> Self {
        Self::oracle()
    }
}

impl Debug for ProxySessionPlugin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxySessionPlugin")
            .field("config", &self.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl ReauthPlugin for ProxySessionPlugin {
    /// Repeated calls after a successful one return `Ok(())` without
    /// resolving again.
    fn initialize(&self, loader: &dyn DriverLoader) -> Result<(), InitializationError> {
        let _lock = self.init_lock.lock();
        if self.binding.get().is_some() {
            debug!(
                "{} {} already bound, skipping initialize",
                self.config.connection_type, self.config.operation
            );
            return Ok(());
        }
        let binding = self.resolve(loader).map_err(|cause| {
            warn!(
                "cannot resolve {} {}: {}",
                self.config.connection_type, self.config.operation, cause
            );
            InitializationError {
                connection_type: self.config.connection_type.clone(),
                operation: self.config.operation.clone(),
                cause,
            }
        })?;
        // init_lock is held, nobody else can have set it
        let _ = self.binding.set(binding);
        debug!(
            "bound {} {}",
            self.config.connection_type, self.config.operation
        );
        Ok(())
    }

    fn reauthenticate(
        &self,
        connection: &dyn DriverObject,
        username: &str,
        password: Option<&str>,
    ) -> Result<(), ReauthError> {
        let binding = self.binding.get().ok_or(ReauthError::Uninitialized)?;

        // values live on the connection and may differ between connections
        let proxy_type = binding
            .proxy_type
            .read_int(connection)
            .map_err(|e| self.internal(e.into()))?;
        let user_name_key = binding
            .user_name_key
            .read_key(connection)
            .map_err(|e| self.internal(e.into()))?;
        let password_key = binding
            .password_key
            .read_key(connection)
            .map_err(|e| self.internal(e.into()))?;

        let mut props = Properties::new();
        props.insert(user_name_key, username.to_string());
        if let Some(password) = password {
            props.insert(password_key, password.to_string());
        }

        trace!(
            "{} as {} (password {})",
            binding.open_proxy_session.name(),
            username,
            if password.is_some() { "set" } else { "omitted" }
        );
        binding
            .open_proxy_session
            .invoke(connection, &[Value::Int(proxy_type), Value::Properties(props)])
            .map(|_| ())
            .map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::{DriverRegistry, TypeBuilder};
    use crate::error::BoxError;

    struct Conn;

    fn registry(raise: fn() -> BoxError) -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register(
            TypeBuilder::<Conn>::new("oracle.jdbc.OracleConnection")
                .operation(
                    "openProxySession",
                    &[ParamKind::Int, ParamKind::Properties],
                    move |_, _| Err(raise()),
                )
                .field("PROXYTYPE_USER_NAME", ParamKind::Int, |_| Value::Int(1))
                .field("PROXY_USER_NAME", ParamKind::Str, |_| {
                    Value::Str("PROXY_USER_NAME".into())
                })
                .field("PROXY_PASSWORD", ParamKind::Str, |_| {
                    Value::Str("PROXY_PASSWORD".into())
                }),
        );
        registry
    }

    #[test]
    fn classify_database_error() {
        let plugin = ProxySessionPlugin::oracle();
        plugin
            .initialize(&registry(|| -> BoxError {
                Box::new(DatabaseError::new("ORA-01017").with_vendor_code(1017))
            }))
            .unwrap();
        let err = plugin.reauthenticate(&Conn, "scott", None).unwrap_err();
        let db = err.database_error().unwrap();
        assert_eq!(db.message(), "ORA-01017");
        assert_eq!(db.vendor_code(), 1017);
    }

    #[test]
    fn classify_other_error() {
        let plugin = ProxySessionPlugin::oracle();
        plugin
            .initialize(&registry(|| -> BoxError { "socket closed".into() }))
            .unwrap();
        let err = plugin.reauthenticate(&Conn, "scott", Some("tiger")).unwrap_err();
        match err {
            ReauthError::Internal { operation, cause } => {
                assert_eq!(operation, "openProxySession");
                assert_eq!(cause.to_string(), "operation raised an error: socket closed");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
