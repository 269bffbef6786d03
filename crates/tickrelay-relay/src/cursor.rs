//! Per-topic read positions
//!
//! Cursors live in process memory only. A fresh relay starts every topic at
//! [`Cursor::Tail`], so after a restart it sees only records appended once its
//! tails are resolved; rows buffered but not flushed before a crash are not
//! re-read.

use tickrelay_schema::RecordId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Not yet resolved: start at whatever the log's last record is
    Tail,
    /// Last consumed record
    After(RecordId),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cursors {
    entries: Vec<(String, Cursor)>,
}

impl Cursors {
    /// One unresolved cursor per topic, in the given order
    pub fn at_tail<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: topics
                .into_iter()
                .map(|t| (t.into(), Cursor::Tail))
                .collect(),
        }
    }

    pub fn get(&self, topic: &str) -> Option<Cursor> {
        self.entries
            .iter()
            .find(|(t, _)| t == topic)
            .map(|(_, c)| *c)
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }

    /// Topics still at [`Cursor::Tail`]
    pub fn unresolved(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, c)| *c == Cursor::Tail)
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Pin a tail cursor to a concrete id. Resolved cursors are left alone.
    pub fn resolve(&mut self, topic: &str, tail: RecordId) {
        if let Some((_, cursor)) = self.entries.iter_mut().find(|(t, _)| t == topic) {
            if *cursor == Cursor::Tail {
                *cursor = Cursor::After(tail);
            }
        }
    }

    /// Move `topic` past `id`. Returns false if that would move it backwards
    /// or the topic is unknown.
    pub fn advance(&mut self, topic: &str, id: RecordId) -> bool {
        let Some((_, cursor)) = self.entries.iter_mut().find(|(t, _)| t == topic) else {
            return false;
        };
        match *cursor {
            Cursor::After(current) if id < current => false,
            _ => {
                *cursor = Cursor::After(id);
                true
            }
        }
    }

    /// Read positions for every topic, or `None` while any is unresolved
    pub fn positions(&self) -> Option<Vec<(String, RecordId)>> {
        self.entries
            .iter()
            .map(|(t, c)| match c {
                Cursor::After(id) => Some((t.clone(), *id)),
                Cursor::Tail => None,
            })
            .collect()
    }
}
