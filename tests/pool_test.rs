use reauth_pool::{Manager, Pool};
use std::ops::Deref;
use std::time::Duration;

#[derive(Debug)]
pub struct TestManager {}

impl Manager for TestManager {
    type Connection = String;
    type Error = String;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        Ok(String::new())
    }

    async fn check(&self, conn: &mut Self::Connection) -> Result<(), Self::Error> {
        if conn == "error" {
            return Err(Self::Error::from(conn.as_str()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_debug() {
    let p = Pool::new(TestManager {});
    let s = format!("{:?}", p);
    assert!(s.contains("max_open"));
}

#[tokio::test]
async fn test_pool_get() {
    let p = Pool::new(TestManager {});
    p.set_max_open(10);
    let mut arr = vec![];
    for _ in 0..10 {
        let v = p.get().await.unwrap();
        assert_eq!(v.deref(), "");
        arr.push(v);
    }
    assert_eq!(p.state().in_use, 10);
}

#[tokio::test]
async fn test_pool_get_timeout() {
    let p = Pool::new(TestManager {});
    p.set_max_open(10);
    let mut arr = vec![];
    for _ in 0..10 {
        arr.push(p.get().await.unwrap());
    }
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_err());
}

#[tokio::test]
async fn test_pool_check_drops_bad_connection() {
    let p = Pool::new(TestManager {});
    p.set_max_open(10);
    let mut v = p.get().await.unwrap();
    *v.inner.as_mut().unwrap() = "error".to_string();
    drop(v);
    for _ in 0..10 {
        let v = p.get().await.unwrap();
        assert_ne!(v.deref(), "error");
    }
    assert_eq!(p.state().in_use, 0);
}

#[tokio::test]
async fn test_pool_resize() {
    let p = Pool::new(TestManager {});
    p.set_max_open(10);
    let mut arr = vec![];
    for _ in 0..10 {
        arr.push(p.get().await.unwrap());
    }
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_err());
    p.set_max_open(11);
    arr.push(p.get_timeout(Some(Duration::from_secs(0))).await.unwrap());
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_err());
}

#[tokio::test]
async fn test_pool_shrink() {
    let p = Pool::new(TestManager {});
    p.set_max_open(2);
    let mut arr = vec![];
    for _ in 0..2 {
        arr.push(p.get().await.unwrap());
    }
    p.set_max_open(1);
    drop(arr);
    assert_eq!(p.state().idle, 1);
    assert_eq!(p.state().connections, 1);
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_access() {
    let p = Pool::new(TestManager {});
    p.set_max_open(10);
    let mut handles = vec![];
    for _ in 0..10 {
        let pool = p.clone();
        handles.push(tokio::spawn(async move {
            let _conn = pool.get().await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
    assert!(p.state().connections <= 10);
    assert_eq!(p.state().in_use, 0);
}

#[tokio::test]
async fn test_discard_frees_slot() {
    let p = Pool::new(TestManager {});
    p.set_max_open(1);
    let conn = p.get().await.unwrap();
    assert_eq!(p.state().connections, 1);
    conn.discard();
    assert_eq!(p.state().connections, 0);
    assert_eq!(p.state().in_use, 0);
    assert_eq!(p.state().idle, 0);
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_ok());
}

#[tokio::test]
async fn test_boundary_conditions() {
    let p = Pool::new(TestManager {});
    p.set_max_open(2);

    let conn_1 = p.get().await.unwrap();
    let _conn_2 = p.get().await.unwrap();
    assert_eq!(p.state().in_use, 2);
    assert!(p.get_timeout(Some(Duration::from_secs(0))).await.is_err());

    drop(conn_1);
    assert_eq!(p.state().in_use, 1);
    let _conn_3 = p.get().await.unwrap();
    assert_eq!(p.state().in_use, 2);

    p.set_max_open(3);
    let _conn_4 = p.get().await.unwrap();
    assert_eq!(p.state().in_use, 3);
}

#[tokio::test]
async fn test_timeout_check_setting() {
    let p = Pool::new(TestManager {});
    assert_eq!(p.get_timeout_check(), Some(Duration::from_secs(10)));
    p.set_timeout_check(None);
    assert_eq!(p.get_timeout_check(), None);
    assert!(p.get().await.is_ok());
}
