//! Thread-safety bounds that relax on single-threaded targets.

/// Implemented by every `Send + Sync` type on native targets and by every
/// type on `wasm32`, where trait objects are never shared across threads.
///
/// Adapter and channel traits use this as a supertrait so that they can be
/// held as `Arc<dyn Trait>` on native targets without forcing `Send` on
/// browser implementations.
#[cfg(not(target_arch = "wasm32"))]
pub trait ConditionalSync: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<S> ConditionalSync for S where S: Send + Sync {}

#[allow(missing_docs)]
#[cfg(target_arch = "wasm32")]
pub trait ConditionalSync {}

#[cfg(target_arch = "wasm32")]
impl<S> ConditionalSync for S {}

/// A value behind a read-write lock that shrugs off poisoning.
///
/// A panic while the lock is held leaves the last written value in place;
/// later readers see it rather than a `PoisonError`.
///
/// ```
/// use warden_common::SharedCell;
///
/// let cell = SharedCell::new(1);
/// *cell.write() += 1;
///
/// assert_eq!(*cell.read(), 2);
/// ```
#[derive(Debug, Default)]
pub struct SharedCell<T>(std::sync::RwLock<T>);

impl<T> SharedCell<T> {
    /// Wrap `value`
    pub fn new(value: T) -> Self {
        Self(std::sync::RwLock::new(value))
    }

    /// Shared access to the value
    pub fn read(&self) -> std::sync::RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Exclusive access to the value
    pub fn write(&self) -> std::sync::RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_survives_a_panicking_writer() {
        let cell = std::sync::Arc::new(SharedCell::new(1));

        let writer = cell.clone();
        let outcome = std::thread::spawn(move || {
            let mut value = writer.write();
            *value = 2;
            panic!("writer gave up");
        })
        .join();

        assert!(outcome.is_err());
        assert_eq!(*cell.read(), 2);
    }
}
