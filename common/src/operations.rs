//! Storage operations executed via [`Handler`]s.

use std::marker::PhantomData;

use crate::Handler;

/// Stores a new value.
#[derive(Clone, Copy, Debug)]
pub struct Insert<T>(pub T);

/// Overwrites an already stored value.
#[derive(Clone, Copy, Debug)]
pub struct Update<T>(pub T);

/// Reads stored values.
#[derive(Clone, Copy, Debug)]
pub struct Select<T>(pub T);

/// Locks stored values exclusively until the surrounding transaction ends.
///
/// Outside a transaction there is nothing to hold the lock, so it's released
/// immediately.
#[derive(Clone, Copy, Debug)]
pub struct Lock<T>(pub T);

/// Starts a transaction.
///
/// Starting a transaction inside another one reuses the outer transaction.
#[derive(Clone, Copy, Debug)]
pub struct Transact;

/// Handler a [`Transact`] operation results in.
pub type Transacted<T> = <T as Handler<Transact>>::Ok;

/// Commits a [`Transact`]ed handler.
///
/// Dropping a [`Transacted`] handler without committing it rolls its changes
/// back.
#[derive(Clone, Copy, Debug)]
pub struct Commit;

/// Selector of `W` values by a `B` key.
#[derive(Clone, Copy, Debug)]
pub struct By<W, B> {
    /// Type of the selected values.
    _what: PhantomData<W>,

    /// Key to select by.
    by: B,
}

impl<W, B> By<W, B> {
    /// Creates a new [`By`] selector with the provided key.
    #[must_use]
    pub fn new(by: B) -> Self {
        Self {
            _what: PhantomData,
            by,
        }
    }

    /// Unwraps the key of this [`By`] selector.
    #[must_use]
    pub fn into_inner(self) -> B {
        self.by
    }
}
