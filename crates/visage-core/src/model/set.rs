use serde::{Serialize, Serializer};

/// Maximum number of encodings a single identity may hold.
pub const MAX_ENCODINGS_PER_IDENTITY: usize = 10;

/// An ordered collection with a hard capacity.
///
/// Inserts past capacity are rejected ([`EncodingSet::try_push`]) or
/// truncated ([`EncodingSet::extend_truncating`]); the collection never
/// grows beyond its limit.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodingSet<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> EncodingSet<T> {
    /// An empty set bounded by [`MAX_ENCODINGS_PER_IDENTITY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(MAX_ENCODINGS_PER_IDENTITY)
    }

    #[must_use]
    pub fn with_limit(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many more items fit.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity.saturating_sub(self.items.len())
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Append one item, handing it back if the set is full.
    ///
    /// # Errors
    /// Returns the rejected item when the set is at capacity.
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    /// Append from the head of `items` until full. Returns how many items
    /// were dropped from the tail.
    pub fn extend_truncating<I>(&mut self, items: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        let mut dropped = 0;
        for item in items {
            if self.try_push(item).is_err() {
                dropped += 1;
            }
        }
        dropped
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for EncodingSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a EncodingSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for EncodingSet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T: Serialize> Serialize for EncodingSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}
