//! In-memory [`Database`] implementation.

mod impls;

use std::{
    collections::{BTreeMap, HashMap},
    future::Future,
    sync::Arc,
};

use derive_more::{Deref, Display, Error as StdError};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracerr::Traced;

use crate::{
    domain::{order, person, reply, Detail, Order, Person, Reply},
    infra::database,
};
#[cfg(doc)]
use crate::infra::Database;

/// In-memory [`Database`] client.
#[derive(Clone, Debug, Default, Deref)]
pub struct Memory<T = NonTx>(T);

impl Memory {
    /// Creates a new empty [`Memory`] client.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Stored data of a [`Memory`] client.
#[derive(Clone, Debug, Default)]
pub struct State {
    /// Registered [`Person`]s.
    pub(crate) people: HashMap<person::Id, Person>,

    /// Placed [`Order`]s.
    pub(crate) orders: HashMap<order::Id, Order>,

    /// [`Detail`]s of the placed [`Order`]s.
    pub(crate) details: HashMap<order::detail::Id, Detail>,

    /// [`Reply`]s to the [`Detail`]s.
    pub(crate) replies: BTreeMap<reply::Id, Reply>,
}

/// Access to the [`State`] of a [`Memory`] client.
pub trait Access {
    /// Runs the provided function over the accessible [`State`].
    ///
    /// # Errors
    ///
    /// If the [`State`] is not accessible anymore.
    fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> impl Future<Output = Result<R, Traced<database::Error>>>;
}

/// Non-transactional [`Memory`] client, applying changes immediately.
#[derive(Clone, Debug, Default)]
pub struct NonTx {
    /// Shared [`State`].
    state: Arc<Mutex<State>>,
}

impl NonTx {
    /// Starts a new [`Tx`] by acquiring the shared [`State`] exclusively.
    async fn begin(&self) -> Tx {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Tx {
            inner: Arc::new(Mutex::new(Some(Inner { guard, working }))),
        }
    }
}

impl Access for NonTx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        Ok(f(&mut *self.state.lock().await))
    }
}

/// Transactional [`Memory`] client.
///
/// Changes are made to a working copy of the [`State`], which replaces the
/// shared one on commit. Dropping an uncommitted [`Tx`] discards them.
#[derive(Clone, Debug)]
pub struct Tx {
    /// Inner representation of this client, [`None`] once committed.
    inner: Arc<Mutex<Option<Inner>>>,
}

/// Inner representation of a [`Tx`] client.
#[derive(Debug)]
struct Inner {
    /// Exclusively acquired shared [`State`].
    guard: OwnedMutexGuard<State>,

    /// Working copy of the [`State`].
    working: State,
}

impl Tx {
    /// Commits this [`Tx`] client.
    ///
    /// # Errors
    ///
    /// If this [`Tx`] client has been committed already.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Inner { mut guard, working } = self
            .inner
            .lock()
            .await
            .take()
            .ok_or_else(|| tracerr::new!(database::Error::from(Error::Committed)))?;
        *guard = working;
        Ok(())
    }
}

impl Access for Tx {
    async fn with<R>(
        &self,
        f: impl FnOnce(&mut State) -> R,
    ) -> Result<R, Traced<database::Error>> {
        let mut inner = self.inner.lock().await;
        let inner = inner
            .as_mut()
            .ok_or_else(|| tracerr::new!(database::Error::from(Error::Committed)))?;
        Ok(f(&mut inner.working))
    }
}

/// [`Memory`] database error.
#[derive(Clone, Copy, Debug, Display, StdError)]
pub enum Error {
    /// [`Tx`] has been committed already.
    #[display("`Tx` is committed already")]
    Committed,

    /// Referenced row doesn't exist.
    #[display("Foreign key `{_0}` is violated")]
    ForeignKeyViolation(#[error(not(source))] &'static str),

    /// Row with the same unique key exists already.
    #[display("Unique constraint `{_0}` is violated")]
    UniqueViolation(#[error(not(source))] &'static str),
}

impl Error {
    /// Checks if the error is a unique violation of the specified constraint.
    #[must_use]
    pub fn is_unique_violation(&self, constraint: Option<&str>) -> bool {
        match self {
            Self::UniqueViolation(c) => constraint.map_or(true, |x| x == *c),
            Self::Committed | Self::ForeignKeyViolation(_) => false,
        }
    }

    /// Checks if the error is a violation of any integrity constraint.
    #[must_use]
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            Self::ForeignKeyViolation(_) | Self::UniqueViolation(_) => true,
            Self::Committed => false,
        }
    }
}
