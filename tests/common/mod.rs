#![allow(dead_code)]

use parking_lot::Mutex;
use reauth_pool::driver::{
    DriverLoader, DriverRegistry, DriverType, ParamKind, Properties, PropertyKey, TypeBuilder,
    Value,
};
use reauth_pool::error::BoxError;
use reauth_pool::{DatabaseError, DriverError, Manager, ProxySessionConfig, ReauthError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// What `changeSession` should raise.
#[derive(Debug, Clone)]
pub enum Failure {
    Database(DatabaseError),
    Other(String),
}

impl Failure {
    fn to_error(&self) -> BoxError {
        match self {
            Failure::Database(e) => Box::new(e.clone()),
            Failure::Other(msg) => msg.clone().into(),
        }
    }
}

pub struct Keys {
    pub selector: i32,
    pub user: i32,
    pub password: i32,
}

/// Fake vendor connection registered as "TestConn".
pub struct TestConn {
    pub keys: Mutex<Keys>,
    pub calls: Mutex<Vec<(i32, Properties)>>,
    pub failure: Arc<Mutex<Option<Failure>>>,
    pub broken: bool,
}

impl TestConn {
    pub fn new() -> Self {
        Self::with_failure(Arc::new(Mutex::new(None)))
    }

    pub fn with_failure(failure: Arc<Mutex<Option<Failure>>>) -> Self {
        Self {
            keys: Mutex::new(Keys {
                selector: 7,
                user: 1,
                password: 2,
            }),
            calls: Mutex::new(vec![]),
            failure,
            broken: false,
        }
    }

    pub fn fail_with(&self, failure: Failure) {
        *self.failure.lock() = Some(failure);
    }

    pub fn calls(&self) -> Vec<(i32, Properties)> {
        self.calls.lock().clone()
    }

    pub fn last_call(&self) -> Option<(i32, Properties)> {
        self.calls.lock().last().cloned()
    }

    fn change_session(&self, args: &[Value]) -> Result<Value, BoxError> {
        if let [Value::Int(selector), Value::Properties(props)] = args {
            self.calls.lock().push((*selector, props.clone()));
        }
        match &*self.failure.lock() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(Value::Null),
        }
    }
}

pub fn props(entries: &[(i32, &str)]) -> Properties {
    entries
        .iter()
        .map(|(k, v)| (PropertyKey::Int(*k), v.to_string()))
        .collect()
}

pub fn test_conn_type() -> TypeBuilder<TestConn> {
    TypeBuilder::<TestConn>::new("TestConn")
        .operation(
            "changeSession",
            &[ParamKind::Int, ParamKind::Properties],
            |conn, args| conn.change_session(args),
        )
        .field("PROXYTYPE_USER_NAME", ParamKind::Int, |c| {
            Value::Int(c.keys.lock().selector)
        })
        .field("PROXY_USER_NAME", ParamKind::Int, |c| Value::Int(c.keys.lock().user))
        .field("PROXY_PASSWORD", ParamKind::Int, |c| {
            Value::Int(c.keys.lock().password)
        })
}

pub fn test_registry() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register(test_conn_type());
    registry
}

pub fn test_config() -> ProxySessionConfig {
    ProxySessionConfig::oracle()
        .with_connection_type("TestConn")
        .with_operation("changeSession")
}

/// Loader that counts type lookups.
pub struct CountingLoader {
    pub inner: DriverRegistry,
    pub loads: AtomicUsize,
}

impl CountingLoader {
    pub fn new(inner: DriverRegistry) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl DriverLoader for CountingLoader {
    fn load_type(&self, name: &str) -> Result<Arc<dyn DriverType>, DriverError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load_type(name)
    }
}

#[derive(Debug)]
pub enum TestError {
    Pool(String),
    Reauth(ReauthError),
}

impl From<&str> for TestError {
    fn from(s: &str) -> Self {
        TestError::Pool(s.to_string())
    }
}

impl From<ReauthError> for TestError {
    fn from(e: ReauthError) -> Self {
        TestError::Reauth(e)
    }
}

/// Opens `TestConn`s that share one failure switch.
#[derive(Clone)]
pub struct TestManager {
    pub failure: Arc<Mutex<Option<Failure>>>,
    pub opened: Arc<AtomicUsize>,
}

impl TestManager {
    pub fn new() -> Self {
        Self {
            failure: Arc::new(Mutex::new(None)),
            opened: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn fail_with(&self, failure: Option<Failure>) {
        *self.failure.lock() = failure;
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

impl Manager for TestManager {
    type Connection = TestConn;
    type Error = TestError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(TestConn::with_failure(self.failure.clone()))
    }

    async fn check(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        if conn.broken {
            return Err(TestError::from("broken"));
        }
        Ok(())
    }
}
