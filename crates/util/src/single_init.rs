use std::{sync::atomic::{AtomicUsize, Ordering}, marker::PhantomData};

/// A process-global value which is initialized at most once.
///
/// Initialization does not take a lock. Instead several threads may race to
/// initialize the cell, in which case only one result is kept and the others
/// are dropped.
#[derive(Debug)]
pub struct SingleInit<T> {
    cell: AtomicUsize,
    _type: PhantomData<T>,
}

impl<T> SingleInit<T> {
    /// Create a new uninitialized cell.
    pub const fn uninit() -> Self {
        SingleInit {
            cell: AtomicUsize::new(0),
            _type: PhantomData,
        }
    }
}

impl<T> SingleInit<T>
where
    T: Sync,
    Self: 'static,
{
    /// Get stored value, or `None` if it hasn't been initialized yet.
    pub fn get(&self) -> Option<&'static T> {
        let ptr = self.cell.load(Ordering::Acquire);

        if ptr != 0 {
            Some(unsafe { &*(ptr as *const T) })
        } else {
            None
        }
    }

    /// Get stored value, initializing it if necessary.
    pub fn get_or_init<F>(&self, init: F) -> &'static T
    where
        F: FnOnce() -> T,
    {
        match self.get_or_try_init::<std::convert::Infallible, _>(|| Ok(init())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Same as [`get_or_init`] except that initialization can fail.
    ///
    /// If `init` fails the cell is left unchanged, and another attempt can be
    /// made later.
    pub fn get_or_try_init<E, F>(&self, init: F) -> Result<&'static T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.get() {
            return Ok(value);
        }

        // Leak the new value so that references to it can be 'static.
        let value = Box::leak(Box::new(init()?)) as *mut T;

        match self.cell.compare_exchange(
            0, value as usize, Ordering::AcqRel, Ordering::Acquire,
        ) {
            Ok(_) => Ok(unsafe { &*value }),
            Err(old) => {
                // Another thread won, drop our value and use theirs.
                std::mem::drop(unsafe { Box::from_raw(value) });
                Ok(unsafe { &*(old as *const T) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static CELL: SingleInit<String> = SingleInit::uninit();

    #[test]
    fn initializes_once() {
        assert!(CELL.get().is_none());

        let failed: Result<_, ()> = CELL.get_or_try_init(|| Err(()));
        assert!(failed.is_err());
        assert!(CELL.get().is_none());

        assert_eq!(CELL.get_or_init(|| "first".to_string()), "first");
        assert_eq!(CELL.get_or_init(|| "second".to_string()), "first");
        assert_eq!(CELL.get().map(String::as_str), Some("first"));
    }
}
