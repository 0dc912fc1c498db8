//! In-memory per-session turn history.
//!
//! The system persists nothing of its own; completed turns live in process
//! memory keyed by the caller's session id and feed the generation prompt
//! of follow-up questions.

use di::inject;
use di::injectable;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// How many completed turns are replayed into the generation prompt.
const HISTORY_WINDOW: usize = 5;

/// A completed turn: the question and the SQL that answered it.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub question: String,
    pub sql: String,
}

#[derive(Default)]
pub struct SessionStore {
    turns: Mutex<HashMap<Uuid, Vec<TurnRecord>>>,
}

#[injectable]
impl SessionStore {
    #[inject]
    pub fn create() -> SessionStore {
        SessionStore::default()
    }
}

impl SessionStore {
    /// The most recent turns of a session, oldest first.
    pub fn history(&self, session_id: Uuid) -> Vec<TurnRecord> {
        let turns = self.turns.lock().unwrap();
        let Some(session) = turns.get(&session_id) else {
            return Vec::new();
        };
        let skip = session.len().saturating_sub(HISTORY_WINDOW);
        session[skip..].to_vec()
    }

    pub fn record(&self, session_id: Uuid, question: String, sql: String) {
        let mut turns = self.turns.lock().unwrap();
        turns
            .entry(session_id)
            .or_default()
            .push(TurnRecord { question, sql });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session_has_no_history() {
        let store = SessionStore::default();
        assert!(store.history(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn test_record_and_replay() {
        let store = SessionStore::default();
        let session = Uuid::new_v4();
        store.record(session, "q1".to_owned(), "SELECT 1".to_owned());
        store.record(session, "q2".to_owned(), "SELECT 2".to_owned());

        let history = store.history(session);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].question, "q1");
        assert_eq!(history[1].sql, "SELECT 2");
    }

    #[test]
    fn test_history_window_keeps_most_recent() {
        let store = SessionStore::default();
        let session = Uuid::new_v4();
        for i in 0..8 {
            store.record(session, format!("q{i}"), format!("SELECT {i}"));
        }

        let history = store.history(session);
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history[0].question, "q3");
        assert_eq!(history.last().unwrap().question, "q7");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::default();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        store.record(a, "q".to_owned(), "SELECT 1".to_owned());
        assert!(store.history(b).is_empty());
    }
}
