use std::{
    hash::{BuildHasher, Hash},
    thread::{self, ThreadId},
};

use hashbrown::HashMap;
use parking_lot::{Mutex, MutexGuard};
use thiserror::Error;

use crate::Merge;

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CacheError {
    #[error("an entry with this key already exists")]
    DuplicateKey,
    #[error("no entry with this key")]
    NotFound,
}

/// A cacheable record: a key projection plus a way to synthesize an empty
/// record around a key for insert-on-update.
pub trait Record: Clone {
    type Key: Copy + Eq + Hash;
    type Hasher: BuildHasher + Default;

    fn key(&self) -> Self::Key;

    fn with_key(key: Self::Key) -> Self;
}

/// A keyed store, optionally bounded.
///
/// The bounded mode keeps a ring of the `limit` most recently written keys;
/// the write index only ever grows and the slot `index % limit` is
/// overwritten, so the oldest insertion is evicted first.
pub struct Store<T: Record> {
    name: &'static str,
    limit: Option<usize>,
    mutating: Mutex<Option<ThreadId>>,
    inner: Mutex<Inner<T>>,
}

struct Inner<T: Record> {
    entries: HashMap<T::Key, T, T::Hasher>,
    ring: Vec<Option<T::Key>>,
    write_idx: usize,
}

impl<T: Record> Store<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            limit: None,
            mutating: Mutex::new(None),
            inner: Mutex::new(Inner {
                entries: HashMap::default(),
                ring: Vec::new(),
                write_idx: 0,
            }),
        }
    }

    pub fn bounded(name: &'static str, limit: usize) -> Self {
        assert!(limit > 0, "store limit must be positive");

        Self {
            name,
            limit: Some(limit),
            mutating: Mutex::new(None),
            inner: Mutex::new(Inner {
                entries: HashMap::default(),
                ring: vec![None; limit],
                write_idx: 0,
            }),
        }
    }

    /// Acquires the store; panics instead of deadlocking when called from
    /// inside a mutator on the same thread.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        if let Some(owner) = *self.mutating.lock() {
            if owner == thread::current().id() {
                panic!(
                    "cache store `{}` must not be re-entered from inside a mutator",
                    self.name
                );
            }
        }

        self.inner.lock()
    }

    pub fn put(&self, value: T) -> Result<(), CacheError> {
        let mut inner = self.lock();

        if inner.entries.contains_key(&value.key()) {
            return Err(CacheError::DuplicateKey);
        }

        Self::insert(&mut inner, self.limit, value);

        Ok(())
    }

    fn insert(inner: &mut Inner<T>, limit: Option<usize>, value: T) {
        let key = value.key();

        if let Some(limit) = limit {
            let slot = inner.write_idx % limit;

            if let Some(evicted) = inner.ring[slot].replace(key) {
                inner.entries.remove(&evicted);
            }

            inner.write_idx += 1;
        }

        inner.entries.insert(key, value);
    }

    pub fn has(&self, key: T::Key) -> bool {
        self.lock().entries.contains_key(&key)
    }

    /// A cloned snapshot of the entry.
    pub fn get(&self, key: T::Key) -> Option<T> {
        self.lock().entries.get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cloned snapshot of every entry; taken under the lock, so no mutation
    /// is in progress while it is built.
    pub fn values(&self) -> Vec<T> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn remove(&self, key: T::Key) -> bool {
        self.lock().entries.remove(&key).is_some()
    }

    /// Removes every known key; returns the subset that was not present.
    pub fn remove_all(&self, keys: &[T::Key]) -> Vec<T::Key> {
        let mut inner = self.lock();

        keys.iter()
            .copied()
            .filter(|key| inner.entries.remove(key).is_none())
            .collect()
    }

    /// Runs `f` on the entry under the store lock.
    ///
    /// The mutator must not call back into this store; doing so panics.
    pub fn update(&self, key: T::Key, f: impl FnOnce(&mut T)) -> Result<(), CacheError> {
        let mut inner = self.lock();

        let Some(entry) = inner.entries.get_mut(&key) else {
            return Err(CacheError::NotFound);
        };

        self.run_mutator(entry, f);

        Ok(())
    }

    /// Like [`Self::update`], but synthesizes an empty record around `key`
    /// first when the entry is absent.
    pub fn upsert(&self, key: T::Key, f: impl FnOnce(&mut T)) {
        let mut inner = self.lock();

        if !inner.entries.contains_key(&key) {
            Self::insert(&mut inner, self.limit, T::with_key(key));
        }

        if let Some(entry) = inner.entries.get_mut(&key) {
            self.run_mutator(entry, f);
        }
    }

    fn run_mutator(&self, entry: &mut T, f: impl FnOnce(&mut T)) {
        *self.mutating.lock() = Some(thread::current().id());
        let _reset = ResetOnDrop(&self.mutating);

        f(entry);
    }

    pub fn patch(&self, value: T) -> Result<(), CacheError>
    where
        T: Merge,
    {
        self.update(value.key(), |entry| entry.merge(value))
    }

    pub fn patch_or_put(&self, value: T)
    where
        T: Merge,
    {
        self.upsert(value.key(), |entry| entry.merge(value));
    }
}

struct ResetOnDrop<'m>(&'m Mutex<Option<ThreadId>>);

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

#[cfg(test)]
mod tests {
    use ripcord_model::{Message, Snowflake};

    use super::{CacheError, Record, Store};

    fn message(id: u64) -> Message {
        Message {
            id: Snowflake::new(id),
            content: format!("message {id}"),
            ..Default::default()
        }
    }

    #[test]
    fn duplicate_put_fails() {
        let store = Store::new("messages");
        store.put(message(1)).unwrap();
        assert_eq!(store.put(message(1)), Err(CacheError::DuplicateKey));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_missing_fails_upsert_synthesizes() {
        let store = Store::<Message>::new("messages");

        assert_eq!(
            store.update(Snowflake::new(5), |_| unreachable!()),
            Err(CacheError::NotFound)
        );

        store.upsert(Snowflake::new(5), |msg| msg.content.push_str("hi"));

        let entry = store.get(Snowflake::new(5)).unwrap();
        assert_eq!(entry.id.get(), 5);
        assert_eq!(entry.content, "hi");
    }

    #[test]
    fn bounded_store_evicts_oldest_insertion() {
        let store = Store::bounded("messages", 3);

        for id in 1..=3 {
            store.put(message(id)).unwrap();
        }

        assert_eq!(store.len(), 3);

        store.put(message(4)).unwrap();
        assert_eq!(store.len(), 3);
        assert!(!store.has(Snowflake::new(1)));
        assert!(store.has(Snowflake::new(2)));
        assert!(store.has(Snowflake::new(4)));

        store.put(message(5)).unwrap();
        assert!(!store.has(Snowflake::new(2)));
    }

    #[test]
    fn remove_all_reports_misses() {
        let store = Store::new("messages");
        store.put(message(1)).unwrap();
        store.put(message(2)).unwrap();

        let keys: Vec<_> = [1u64, 2, 9].iter().map(|&id| Snowflake::new(id)).collect();
        let missing = store.remove_all(&keys);

        assert_eq!(missing, vec![Snowflake::new(9)]);
        assert!(store.is_empty());
    }

    #[test]
    #[should_panic(expected = "re-entered")]
    fn mutator_reentry_panics() {
        let store = Store::new("messages");
        store.put(message(1)).unwrap();

        store
            .update(Snowflake::new(1), |_| {
                let _ = store.has(Snowflake::new(1));
            })
            .unwrap();
    }

    #[test]
    fn composite_keys() {
        #[derive(Clone, Default)]
        struct Pair {
            a: Snowflake,
            b: Snowflake,
            n: u32,
        }

        impl Record for Pair {
            type Key = (Snowflake, Snowflake);
            type Hasher = hashbrown::hash_map::DefaultHashBuilder;

            fn key(&self) -> Self::Key {
                (self.a, self.b)
            }

            fn with_key((a, b): Self::Key) -> Self {
                Self {
                    a,
                    b,
                    ..Default::default()
                }
            }
        }

        let store = Store::<Pair>::new("pairs");
        let key = (Snowflake::new(1), Snowflake::new(2));

        store.upsert(key, |pair| pair.n += 1);
        store.upsert(key, |pair| pair.n += 1);

        assert_eq!(store.get(key).unwrap().n, 2);
        assert_eq!(store.len(), 1);
    }
}
