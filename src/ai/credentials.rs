//! Ordered API credential pool with an atomic rotation cursor

use std::sync::atomic::{AtomicUsize, Ordering};

/// Deduplicated, ordered API keys plus the index of the key in use.
///
/// The cursor only moves through [`CredentialPool::rotate_from`], which is a
/// compare-and-swap: when two workers see the same rate-limited key only one
/// of them advances the cursor.
#[derive(Debug, Default)]
pub struct CredentialPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool from raw configuration values.
    ///
    /// Each value may hold several comma-separated keys. Segments are trimmed
    /// and stripped of surrounding quotes; empty and repeated keys are dropped.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keys: Vec<String> = Vec::new();
        for value in values {
            for segment in value.as_ref().split(',') {
                let key = clean_key(segment);
                if !key.is_empty() && !keys.iter().any(|k| k == key) {
                    keys.push(key.to_string());
                }
            }
        }
        Self {
            keys,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Current cursor position and its key. `None` for an empty pool.
    pub fn current(&self) -> Option<(usize, &str)> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor.load(Ordering::Acquire) % self.keys.len();
        Some((index, self.keys[index].as_str()))
    }

    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Advance past `observed` if nobody else has moved the cursor yet.
    ///
    /// Returns the index now current.
    pub fn rotate_from(&self, observed: usize) -> usize {
        if self.keys.is_empty() {
            return 0;
        }
        let next = (observed + 1) % self.keys.len();
        match self
            .cursor
            .compare_exchange(observed, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => next,
            Err(actual) => actual,
        }
    }

    /// Log-safe rendering of the key at `index`
    pub fn masked(&self, index: usize) -> String {
        match self.keys.get(index) {
            Some(key) => mask(key),
            None => String::from("<none>"),
        }
    }
}

fn clean_key(raw: &str) -> &str {
    raw.trim().trim_matches(|c: char| c == '"' || c == '\'').trim()
}

fn mask(key: &str) -> String {
    let prefix: String = key.chars().take(4).collect();
    format!("{}***", prefix)
}
