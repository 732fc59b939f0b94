//! Per-user exclusive locks.
//!
//! One lock slot guards a user record together with the inventory keyed by the
//! same id. Operations spanning two users take both slots in ascending id order
//! so opposite-direction trades between the same pair cannot deadlock.
use crate::error::{Result, TradeError};
use crate::types::UserId;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct LockTable {
    slots: DashMap<UserId, Arc<Mutex<()>>>,
    timeout: Duration,
}

impl LockTable {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            timeout,
        }
    }

    fn slot(&self, user: &UserId) -> Arc<Mutex<()>> {
        // the shard guard is released before the slot is locked
        let entry = self
            .slots
            .entry(user.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())));
        Arc::clone(entry.value())
    }

    /// Run `f` while holding the locks of every user in `users`.
    ///
    /// Duplicates are collapsed, so passing the same id twice is safe. If any
    /// slot cannot be taken within the timeout the slots already held are
    /// released and [`TradeError::LockTimeout`] is returned without running `f`.
    pub fn with_users<T>(&self, users: &[&UserId], f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mut ordered: Vec<&UserId> = users.to_vec();
        ordered.sort();
        ordered.dedup();

        let slots: Vec<Arc<Mutex<()>>> = ordered.iter().map(|user| self.slot(user)).collect();

        let mut guards = Vec::with_capacity(slots.len());
        for (user, slot) in ordered.iter().zip(&slots) {
            match slot.try_lock_for(self.timeout) {
                Some(guard) => guards.push(guard),
                None => {
                    warn!(user = %user, timeout = ?self.timeout, "lock wait timed out");
                    return Err(TradeError::LockTimeout(user.to_string()));
                }
            }
        }
        debug!(users = ?ordered, "locks acquired");

        let out = f();
        drop(guards);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn duplicate_ids_do_not_self_deadlock() {
        let table = LockTable::new(Duration::from_millis(50));
        let user = UserId::from("user_a");

        let out = table.with_users(&[&user, &user], || Ok(7)).unwrap();
        assert_eq!(out, 7);
    }

    #[test]
    fn held_lock_times_out_with_retryable_error() {
        let table = Arc::new(LockTable::new(Duration::from_millis(20)));
        let user = UserId::from("user_a");
        let (held_tx, held_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let holder = {
            let table = Arc::clone(&table);
            let user = user.clone();
            thread::spawn(move || {
                table
                    .with_users(&[&user], || {
                        held_tx.send(()).unwrap();
                        release_rx.recv().unwrap();
                        Ok(())
                    })
                    .unwrap();
            })
        };

        held_rx.recv().unwrap();
        let err = table.with_users(&[&user], || Ok(())).unwrap_err();
        assert!(err.is_retryable());

        release_tx.send(()).unwrap();
        holder.join().unwrap();

        // slot is free again
        assert!(table.with_users(&[&user], || Ok(())).is_ok());
    }

    #[test]
    fn opposite_order_requests_complete() {
        let table = Arc::new(LockTable::new(Duration::from_secs(5)));
        let a = UserId::from("user_a");
        let b = UserId::from("user_b");

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                let (a, b) = (a.clone(), b.clone());
                thread::spawn(move || {
                    for _ in 0..100 {
                        let pair = if i % 2 == 0 { [&a, &b] } else { [&b, &a] };
                        table.with_users(&pair, || Ok(())).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
