/*
 * Handle-keyed registry used to recover per-window state inside a subclassed
 * window procedure, which only receives the raw window handle.
 *
 * Entries live in one contiguous vector kept sorted by handle value, so lookups
 * are a binary search and inserts/removals shift the tail. The table holds at
 * most a few dozen windows, which keeps the shifting cheap. A single mutex guards
 * the whole table; values are cloned out so no caller ever runs with the lock
 * held.
 *
 * The registry does not own the per-window state in any meaningful sense: values
 * are typically `Arc`s and dropping an entry only releases the registry's
 * reference. Callers remove an entry before they retire the state it points to.
 */
use crate::error::{PlatformError, Result as PlatformResult};
use crate::types::{RegistryConfig, WindowHandle};

use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct Entry<V> {
    key: WindowHandle,
    value: V,
}

#[derive(Debug)]
pub struct HandleRegistry<V> {
    table: Mutex<Vec<Entry<V>>>,
    config: RegistryConfig,
}

impl<V: Clone> HandleRegistry<V> {
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    // Nothing is allocated until the first insertion.
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            table: Mutex::new(Vec::new()),
            config,
        }
    }

    pub fn get(&self, key: WindowHandle) -> Option<V> {
        let table = self.lock();
        binary_search(&table, key)
            .ok()
            .map(|index| table[index].value.clone())
    }

    pub fn contains(&self, key: WindowHandle) -> bool {
        binary_search(&self.lock(), key).is_ok()
    }

    /*
     * Associates `value` with `key`. An existing entry has its value replaced in
     * place; the previous value is dropped without further inspection.
     * Fails only when the backing storage cannot grow, in which case the table is
     * left exactly as it was and the caller must not rely on `get` finding `key`.
     */
    pub fn put(&self, key: WindowHandle, value: V) -> PlatformResult<()> {
        let mut table = self.lock();
        match binary_search(&table, key) {
            Ok(index) => {
                table[index].value = value;
            }
            Err(insertion_index) => {
                ensure_capacity(&mut table, &self.config)?;
                table.insert(insertion_index, Entry { key, value });
            }
        }
        Ok(())
    }

    /*
     * Inserts only if `key` is not registered yet, under a single lock acquisition.
     * Returns `Ok(false)` and leaves the existing value alone otherwise.
     */
    pub fn put_if_absent(&self, key: WindowHandle, value: V) -> PlatformResult<bool> {
        let mut table = self.lock();
        match binary_search(&table, key) {
            Ok(_) => Ok(false),
            Err(insertion_index) => {
                ensure_capacity(&mut table, &self.config)?;
                table.insert(insertion_index, Entry { key, value });
                Ok(true)
            }
        }
    }

    /*
     * Removes `key` and returns its value, or `None` if it was not registered.
     * Backing storage is never shrunk.
     */
    pub fn remove(&self, key: WindowHandle) -> Option<V> {
        let mut table = self.lock();
        let index = binary_search(&table, key).ok()?;
        Some(table.remove(index).value)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    /// Snapshot of all registered handles in ascending order.
    pub fn keys(&self) -> Vec<WindowHandle> {
        self.lock().iter().map(|entry| entry.key).collect()
    }

    // Every mutation leaves the table sorted and contiguous, so a panic in another
    // thread cannot leave it half-updated and the poison flag can be ignored.
    fn lock(&self) -> MutexGuard<'_, Vec<Entry<V>>> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for HandleRegistry<V> {
    fn default() -> Self {
        Self::new()
    }
}

/*
 * `Ok(index)` on an exact match, otherwise `Err(insertion_index)` where the key
 * would have to go to keep the table sorted.
 */
fn binary_search<V>(table: &[Entry<V>], key: WindowHandle) -> Result<usize, usize> {
    table.binary_search_by_key(&key, |entry| entry.key)
}

/*
 * Makes room for one more entry. The first allocation reserves the configured
 * initial capacity; later growth reserves `len + 1 + capacity_increment` slots.
 * `try_reserve_exact` either succeeds or leaves the vector untouched.
 */
fn ensure_capacity<V>(table: &mut Vec<Entry<V>>, config: &RegistryConfig) -> PlatformResult<()> {
    let min_capacity = table.len() + 1;
    if min_capacity <= table.capacity() {
        return Ok(());
    }

    let new_capacity = if table.capacity() == 0 {
        config.initial_capacity.max(min_capacity)
    } else {
        min_capacity
            .checked_add(config.capacity_increment)
            .ok_or_else(|| {
                PlatformError::AllocationFailed(format!(
                    "handle registry capacity overflows: {min_capacity} + {}",
                    config.capacity_increment
                ))
            })?
    };

    table
        .try_reserve_exact(new_capacity - table.len())
        .map_err(|err| {
            PlatformError::AllocationFailed(format!(
                "cannot grow handle registry to {new_capacity} entries: {err}"
            ))
        })
}
