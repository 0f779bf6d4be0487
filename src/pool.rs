use crate::guard::ConnectionGuard;
use crate::state::State;
use crate::Manager;
use dark_std::sync::AtomicDuration;
use flume::{Receiver, Sender};
use log::debug;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Pool have manager, get/get_timeout Connection from Pool
pub struct Pool<M: Manager> {
    pub manager: Arc<M>,
    pub idle_send: Arc<Sender<M::Connection>>,
    pub idle_recv: Arc<Receiver<M::Connection>>,
    pub max_open: Arc<AtomicU64>,
    pub(crate) in_use: Arc<AtomicU64>,
    pub(crate) waits: Arc<AtomicU64>,
    pub(crate) connecting: Arc<AtomicU64>,
    pub(crate) checking: Arc<AtomicU64>,
    pub(crate) connections: Arc<AtomicU64>,
    //timeout check connection default 10s
    pub timeout_check: Arc<AtomicDuration>,
}

impl<M: Manager> Debug for Pool<M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.state(), f)
    }
}

impl<M: Manager> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
            idle_send: self.idle_send.clone(),
            idle_recv: self.idle_recv.clone(),
            max_open: self.max_open.clone(),
            in_use: self.in_use.clone(),
            waits: self.waits.clone(),
            connecting: self.connecting.clone(),
            checking: self.checking.clone(),
            connections: self.connections.clone(),
            timeout_check: self.timeout_check.clone(),
        }
    }
}

impl<M: Manager> Pool<M> {
    pub fn new(m: M) -> Self {
        let default_max = num_cpus::get() as u64;
        let (s, r) = flume::unbounded();
        Self {
            manager: Arc::new(m),
            idle_send: Arc::new(s),
            idle_recv: Arc::new(r),
            max_open: Arc::new(AtomicU64::new(default_max)),
            in_use: Arc::new(AtomicU64::new(0)),
            waits: Arc::new(AtomicU64::new(0)),
            connecting: Arc::new(AtomicU64::new(0)),
            checking: Arc::new(AtomicU64::new(0)),
            connections: Arc::new(AtomicU64::new(0)),
            timeout_check: Arc::new(AtomicDuration::new(Some(Duration::from_secs(10)))),
        }
    }

    pub async fn get(&self) -> Result<ConnectionGuard<M>, M::Error> {
        self.get_timeout(None).await
    }

    /// Checks out a connection that passed `Manager::check`. Connections
    /// failing the check are dropped and the next one is tried.
    pub async fn get_timeout(&self, d: Option<Duration>) -> Result<ConnectionGuard<M>, M::Error> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        defer!(|| {
            self.waits.fetch_sub(1, Ordering::SeqCst);
        });
        let f = async {
            let v: Result<ConnectionGuard<M>, M::Error> = loop {
                let opened = self.connections.load(Ordering::SeqCst)
                    + self.connecting.load(Ordering::SeqCst);
                if opened < self.max_open.load(Ordering::SeqCst) {
                    //reserve a slot while the manager connects
                    self.connecting.fetch_add(1, Ordering::SeqCst);
                    defer!(|| {
                        self.connecting.fetch_sub(1, Ordering::SeqCst);
                    });
                    let conn = self.manager.connect().await?;
                    self.idle_send
                        .send(conn)
                        .map_err(|e| M::Error::from(&e.to_string()))?;
                    self.connections.fetch_add(1, Ordering::SeqCst);
                }
                let conn = self
                    .idle_recv
                    .recv_async()
                    .await
                    .map_err(|e| M::Error::from(&e.to_string()))?;
                let mut guard = ConnectionGuard::new(conn, self.clone());
                self.checking.fetch_add(1, Ordering::SeqCst);
                defer!(|| {
                    self.checking.fetch_sub(1, Ordering::SeqCst);
                });
                let check_result = match self.timeout_check.get() {
                    Some(limit) => tokio::time::timeout(limit, self.manager.check(&mut guard))
                        .await
                        .map_err(|e| M::Error::from(&format!("check_timeout={}", e)))?,
                    None => self.manager.check(&mut guard).await,
                };
                match check_result {
                    Ok(_) => break Ok(guard),
                    Err(_) => {
                        debug!("connection failed check, dropping it");
                        guard.discard();
                        continue;
                    }
                }
            };
            v
        };
        match d {
            None => f.await,
            Some(limit) => tokio::time::timeout(limit, f)
                .await
                .map_err(|_e| M::Error::from("get_timeout"))?,
        }
    }

    pub fn state(&self) -> State {
        State {
            max_open: self.max_open.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            in_use: self.in_use.load(Ordering::SeqCst),
            idle: self.idle_send.len() as u64,
            waits: self.waits.load(Ordering::SeqCst),
            connecting: self.connecting.load(Ordering::SeqCst),
            checking: self.checking.load(Ordering::SeqCst),
        }
    }

    pub fn set_max_open(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.max_open.store(n, Ordering::SeqCst);
        while self.idle_send.len() > n as usize {
            if self.idle_recv.try_recv().is_err() {
                break;
            }
            self.release_slot();
        }
    }

    pub fn get_max_open(&self) -> u64 {
        self.max_open.load(Ordering::SeqCst)
    }

    /// Returns a checked-out connection to the idle queue.
    pub fn recycle(&self, arg: M::Connection) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        if self.idle_send.len() < self.max_open.load(Ordering::SeqCst) as usize {
            _ = self.idle_send.send(arg);
        } else {
            self.release_slot();
        }
    }

    /// Closes a checked-out connection instead of returning it to the pool.
    pub fn discard(&self, arg: M::Connection) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        self.release_slot();
        drop(arg);
    }

    fn release_slot(&self) {
        _ = self
            .connections
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Set the timeout for checking connections in the pool.
    pub fn set_timeout_check(&self, duration: Option<Duration>) {
        self.timeout_check.store(duration);
    }

    /// Get the timeout for checking connections in the pool.
    pub fn get_timeout_check(&self) -> Option<Duration> {
        self.timeout_check.get()
    }
}
