use reauth_pool::driver::{DriverRegistry, ParamKind, Properties, TypeBuilder, Value};
use reauth_pool::{
    DatabaseError, Identity, Manager, Pool, ProxySessionPlugin, ReauthError, ReauthManager,
};
use std::sync::Mutex;

/// Stand-in for a vendor connection that supports proxy sessions.
pub struct OracleConnection {
    session_user: Mutex<String>,
}

impl OracleConnection {
    fn open_proxy_session(
        &self,
        proxy_type: i32,
        props: &Properties,
    ) -> Result<Value, DatabaseError> {
        let user = props
            .iter()
            .find(|(k, _)| k.to_string() == "PROXY_USER_NAME")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        if proxy_type != 1 || user == "mallory" {
            return Err(DatabaseError::new("ORA-01017: invalid username/password; logon denied")
                .with_sql_state("28000")
                .with_vendor_code(1017));
        }
        *self.session_user.lock().unwrap() = user;
        Ok(Value::Null)
    }
}

fn oracle_driver() -> DriverRegistry {
    let mut registry = DriverRegistry::new();
    registry.register(
        TypeBuilder::<OracleConnection>::new("oracle.jdbc.OracleConnection")
            .operation(
                "openProxySession",
                &[ParamKind::Int, ParamKind::Properties],
                |conn, args| match args {
                    [Value::Int(t), Value::Properties(p)] => Ok(conn.open_proxy_session(*t, p)?),
                    _ => Err("bad arguments".into()),
                },
            )
            .field("PROXYTYPE_USER_NAME", ParamKind::Int, |_| Value::Int(1))
            .field("PROXY_USER_NAME", ParamKind::Str, |_| Value::Str("PROXY_USER_NAME".into()))
            .field("PROXY_PASSWORD", ParamKind::Str, |_| Value::Str("PROXY_PASSWORD".into())),
    );
    registry
}

#[derive(Debug)]
pub enum Error {
    Pool(String),
    Reauth(ReauthError),
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Pool(s.to_string())
    }
}

impl From<ReauthError> for Error {
    fn from(e: ReauthError) -> Self {
        Error::Reauth(e)
    }
}

pub struct OracleManager {}

impl Manager for OracleManager {
    type Connection = OracleConnection;
    type Error = Error;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Ok(OracleConnection {
            session_user: Mutex::new("app_pool".to_string()),
        })
    }

    async fn check(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let registry = oracle_driver();
    let manager = ReauthManager::new(OracleManager {}, ProxySessionPlugin::oracle(), &registry)
        .expect("oracle driver not registered");
    let p = Pool::new(manager);
    p.set_max_open(2);
    println!("status = {}", p.state());

    let alice = Identity::new("alice").with_password("secret");
    let conn = p.get_as(&alice).await.unwrap();
    println!("session user = {}", conn.session_user.lock().unwrap());
    drop(conn);

    match p.get_as(&Identity::new("mallory")).await {
        Ok(_) => println!("unexpected success"),
        Err(e) => println!("rejected: {:?}", e),
    }
    println!("status = {}", p.state());
}
