//! Functionality for lazy-loading per-chromosome data off disk into memory.
//!
//! The main functionality is the generic [`LazyLoader`], which holds an open reader and
//! at most one key's worth of loaded data in a [`RefCell`]. Requesting a different key
//! replaces the cached data, so memory use is bounded by the largest chromosome.
//!
use std::cell::{Ref, RefCell};

use crate::{error::GenofuseError, INTERNAL_ERROR_MESSAGE};

/// A lazy-loader function that takes a reader type `R` and
/// uses it to load in data of type `T` for key `K`.
type LoaderFunc<R, T, K> = Box<dyn Fn(&mut R, &K) -> Result<T, GenofuseError>>;

/// Lazy loader, which uses [`RefCell`] to store a mutable reader and the data of the
/// most recently requested key.
///
/// # Generics
///  * `R`: the reader type (e.g. an open `.npz` archive).
///  * `T`: the data type.
///  * `K`: the key type (e.g. a sequence name).
pub struct LazyLoader<R, T, K> {
    key: RefCell<Option<K>>,
    reader: RefCell<R>,
    loader: LoaderFunc<R, T, K>,
    data: RefCell<Option<T>>,
}

impl<R, T, K> std::fmt::Debug for LazyLoader<R, T, K>
where
    K: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoader")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<R, T, K> LazyLoader<R, T, K>
where
    K: Clone + PartialEq,
{
    pub fn new<F>(reader: R, loader: F) -> LazyLoader<R, T, K>
    where
        F: Fn(&mut R, &K) -> Result<T, GenofuseError> + 'static,
    {
        LazyLoader {
            key: RefCell::new(None),
            reader: RefCell::new(reader),
            loader: Box::new(loader),
            data: RefCell::new(None),
        }
    }

    /// Return a `bool` indicating whether the specified `key` is cached.
    pub fn is_loaded(&self, key: &K) -> bool {
        self.key.borrow().as_ref() == Some(key)
    }

    /// Clear out the cache.
    pub fn clear(&self) {
        *self.data.borrow_mut() = None;
        *self.key.borrow_mut() = None;
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.data.borrow().is_none()
    }

    /// Get the data corresponding to `key`, loading it with the loader function if
    /// another key (or nothing) is cached.
    ///
    /// A failed load leaves the cache empty.
    pub fn get_data(&self, key: &K) -> Result<Ref<'_, T>, GenofuseError> {
        if !self.is_loaded(key) {
            self.clear();
            let new_data = {
                let mut reader = self.reader.borrow_mut();
                (self.loader)(&mut reader, key)?
            };
            *self.data.borrow_mut() = Some(new_data);
            *self.key.borrow_mut() = Some(key.clone());
        }

        Ref::filter_map(self.data.borrow(), Option::as_ref).map_err(|_| {
            GenofuseError::InternalError(format!(
                "{}\nLazy-loaded data missing after load.",
                INTERNAL_ERROR_MESSAGE
            ))
        })
    }
}
