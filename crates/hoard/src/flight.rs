//! # Single-flight
//!
//! Per-path deduplication of concurrent misses. The first request for
//! a path becomes the leader and fetches the origin; followers wait
//! for the leader to finish and then re-probe the cache. A leader
//! that fails simply drops its permit, waking the followers so one of
//! them can take over.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

type FlightTable = Arc<Mutex<HashMap<String, watch::Receiver<()>>>>;

/// Registry of in-flight origin fetches, keyed by decoded URL path.
#[derive(Debug, Clone, Default)]
pub struct PathFlights {
    table: FlightTable,
}

/// Outcome of joining a flight for a path.
#[derive(Debug)]
pub enum Flight {
    /// This request fetches the origin; the permit releases the path
    /// on drop.
    Leader(FlightPermit),
    /// Another request is already fetching this path.
    Follower(watch::Receiver<()>),
}

/// RAII permit held by the leader of a flight.
#[derive(Debug)]
pub struct FlightPermit {
    key: String,
    // Dropped last: removing the table entry first means a request
    // arriving in between starts a fresh flight instead of waiting on
    // a finished one.
    _done: watch::Sender<()>,
    table: FlightTable,
}

impl PathFlights {
    pub fn join(&self, key: &str) -> Flight {
        let mut table = self.table.lock();
        if let Some(rx) = table.get(key) {
            return Flight::Follower(rx.clone());
        }
        let (tx, rx) = watch::channel(());
        table.insert(key.to_string(), rx);
        Flight::Leader(FlightPermit {
            key: key.to_string(),
            _done: tx,
            table: self.table.clone(),
        })
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        self.table.lock().remove(&self.key);
    }
}

/// Wait until the leader for this flight has finished, successfully
/// or not.
pub async fn wait(mut done: watch::Receiver<()>) {
    // Resolves with Err once the leader's sender is dropped.
    let _ = done.changed().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_join_leads_second_follows() {
        let flights = PathFlights::default();
        let leader = flights.join("/api/widgets");
        assert!(matches!(leader, Flight::Leader(_)));
        assert!(matches!(flights.join("/api/widgets"), Flight::Follower(_)));
        // Distinct paths fly independently.
        assert!(matches!(flights.join("/other"), Flight::Leader(_)));
    }

    #[tokio::test]
    async fn followers_wake_when_the_leader_finishes() {
        let flights = PathFlights::default();
        let Flight::Leader(permit) = flights.join("/api/widgets") else {
            panic!("expected leader");
        };
        let Flight::Follower(rx) = flights.join("/api/widgets") else {
            panic!("expected follower");
        };

        let waiter = tokio::spawn(wait(rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        drop(permit);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("follower must wake")
            .unwrap();

        // The path is free again.
        assert!(matches!(flights.join("/api/widgets"), Flight::Leader(_)));
    }
}
