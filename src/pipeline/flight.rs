//! Single-flight build coordination.
//!
//! At most one build runs per canonical output path. The first caller to
//! join an idle key becomes the lead and must run the build; everyone else
//! gets a receiver that resolves when the lead calls `complete`.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::path::PathBuf;

use crate::error::PipelineError;

type Outcome = Result<PathBuf, PipelineError>;

/// Role handed back by `join`.
pub enum Ticket {
    /// This caller runs the build and must call `complete` for the key.
    Lead,
    /// Another caller is already building; wait on the receiver.
    Wait(Receiver<Outcome>),
}

/// In-flight builds keyed by canonical output path.
#[derive(Default)]
pub struct FlightTable {
    inflight: Mutex<FxHashMap<String, Vec<Sender<Outcome>>>>,
}

impl FlightTable {
    /// Join the flight for `key`, becoming the lead if none is running.
    pub fn join(&self, key: &str) -> Ticket {
        let mut inflight = self.inflight.lock();
        match inflight.get_mut(key) {
            Some(waiters) => {
                let (tx, rx) = channel::bounded(1);
                waiters.push(tx);
                Ticket::Wait(rx)
            }
            None => {
                inflight.insert(key.to_string(), Vec::new());
                Ticket::Lead
            }
        }
    }

    /// Publish the lead's outcome to every waiter and clear the key.
    ///
    /// Waiters are notified in join order. Disconnected waiters are skipped.
    pub fn complete(&self, key: &str, outcome: &Outcome) {
        let waiters = self.inflight.lock().remove(key).unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_first_join_leads() {
        let flights = FlightTable::default();
        assert!(matches!(flights.join("a.js"), Ticket::Lead));
        assert!(matches!(flights.join("a.js"), Ticket::Wait(_)));
        // Separate keys fly separately
        assert!(matches!(flights.join("b.js"), Ticket::Lead));
    }

    #[test]
    fn test_complete_releases_key() {
        let flights = FlightTable::default();
        assert!(matches!(flights.join("a.js"), Ticket::Lead));
        flights.complete("a.js", &Ok(PathBuf::from("out")));
        assert!(matches!(flights.join("a.js"), Ticket::Lead));
    }

    #[test]
    fn test_waiters_receive_outcome() {
        let flights = Arc::new(FlightTable::default());
        let leads = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let flights = flights.clone();
                let leads = leads.clone();
                thread::spawn(move || match flights.join("all.js") {
                    Ticket::Lead => {
                        leads.fetch_add(1, Ordering::SeqCst);
                        // Let the other threads pile up as waiters
                        thread::sleep(std::time::Duration::from_millis(50));
                        let outcome = Ok(PathBuf::from("asset-1-all.js"));
                        flights.complete("all.js", &outcome);
                        outcome
                    }
                    Ticket::Wait(rx) => rx.recv().unwrap(),
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), PathBuf::from("asset-1-all.js"));
        }
        assert_eq!(leads.load(Ordering::SeqCst), 1);
    }
}
