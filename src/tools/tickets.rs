//! Deterministic in-memory ticket store.

use std::sync::RwLock;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};

/// In-memory ticket store; ids are derived from the ticket payload so runs
/// are reproducible.
#[derive(Default)]
pub struct TicketStore {
    tickets: RwLock<Vec<Value>>,
}

impl TicketStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ticket and return its id.
    pub fn create(&self, project: &str, title: &str, body: &str) -> Value {
        let payload = json!({"body": body, "project": project, "title": title});
        let digest = Sha256::digest(payload.to_string().as_bytes());
        let short = u64::from_be_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]) % 100_000;
        let ticket_id = format!("TICKET-{short:05}");

        if let Ok(mut tickets) = self.tickets.write() {
            tickets.push(json!({
                "ticket_id": ticket_id,
                "project": project,
                "title": title,
                "body": body,
            }));
        }
        json!({"ticket_id": ticket_id})
    }

    /// Number of tickets created so far.
    pub fn count(&self) -> usize {
        self.tickets.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Snapshot of all tickets.
    pub fn all(&self) -> Vec<Value> {
        self.tickets.read().map(|t| t.clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_deterministic() {
        let store = TicketStore::new();
        let a = store.create("SEC", "T", "body");
        let b = store.create("SEC", "T", "body");
        assert_eq!(a["ticket_id"], b["ticket_id"]);
        assert_eq!(store.count(), 2);
    }

    #[test]
    fn test_distinct_payloads_distinct_ids() {
        let store = TicketStore::new();
        let a = store.create("SEC", "T", "body one");
        let b = store.create("SEC", "T", "body two");
        assert_ne!(a["ticket_id"], b["ticket_id"]);
    }

    #[test]
    fn test_all_returns_full_tickets() {
        let store = TicketStore::new();
        store.create("IT", "Printer", "It is on fire.");
        let all = store.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["project"], "IT");
    }
}
