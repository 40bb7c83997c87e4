//! Placeholder compression for frequently repeated messages.
//!
//! A recurring message gets a one-character symbol. Within the repeat window
//! only the symbol is written; after it, the full line is written again.
//! Entries untouched for the removal window are forgotten and their symbol
//! goes back to the alphabet.

use chrono::{DateTime, Duration, Local};

/// What to write for one optimized trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compression {
    /// Full rendering, `[S] message`
    Full(String),
    /// The symbol alone, appended to the current line
    Placeholder(char),
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    text: String,
    full_at: Option<DateTime<Local>>,
    touched: DateTime<Local>,
    symbol: char,
}

/// Bounded, time-expiring map from message key to placeholder symbol.
#[derive(Debug, Clone)]
pub struct MessageCache {
    entries: Vec<Entry>,
    alphabet: Vec<char>,
    repeat_window: Duration,
    removal_window: Duration,
}

impl MessageCache {
    pub fn new(alphabet: Vec<char>, repeat_window: Duration, removal_window: Duration) -> Self {
        Self {
            entries: Vec::with_capacity(alphabet.len()),
            alphabet,
            repeat_window,
            removal_window,
        }
    }

    /// Look up `key` at `now` and decide what to write for `message`.
    pub fn lookup(&mut self, key: &str, message: &str, now: DateTime<Local>) -> Compression {
        let removal_window = self.removal_window;
        self.entries.retain(|entry| now - entry.touched <= removal_window);

        let Some(index) = self.slot_for(key, now) else {
            return Compression::Full(message.to_owned());
        };

        let repeat_window = self.repeat_window;
        let entry = &mut self.entries[index];
        entry.touched = now;
        let due = entry.full_at.map_or(true, |at| now - at > repeat_window);
        if due {
            entry.text = message.to_owned();
            entry.full_at = Some(now);
            Compression::Full(format!("[{}] {}", entry.symbol, message))
        } else {
            Compression::Placeholder(entry.symbol)
        }
    }

    /// Index of the entry for `key`, creating one (or taking over the least
    /// recently touched one) when absent.
    fn slot_for(&mut self, key: &str, now: DateTime<Local>) -> Option<usize> {
        if let Some(index) = self.entries.iter().position(|entry| entry.key == key) {
            return Some(index);
        }

        let free = self
            .alphabet
            .iter()
            .copied()
            .find(|symbol| !self.entries.iter().any(|entry| entry.symbol == *symbol));

        match free {
            Some(symbol) => {
                self.entries.push(Entry {
                    key: key.to_owned(),
                    text: String::new(),
                    full_at: None,
                    touched: now,
                    symbol,
                });
                Some(self.entries.len() - 1)
            }
            None => {
                let index = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, entry)| entry.touched)
                    .map(|(index, _)| index)?;
                let entry = &mut self.entries[index];
                entry.key = key.to_owned();
                entry.text.clear();
                entry.full_at = None;
                Some(index)
            }
        }
    }

    /// Symbol currently assigned to `key`, if any.
    pub fn symbol_of(&self, key: &str) -> Option<char> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.symbol)
    }

    /// Text of the last full rendering for `key`.
    pub fn last_text(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
