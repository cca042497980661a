//! Lazily connected Postgres database clients.

use std::{future::Future, sync::Arc};

use tokio::sync::{RwLock, RwLockReadGuard};
use tokio_postgres::{Row, ToStatement};
use tracerr::Traced;

use crate::infra::database::{
    self,
    postgres::{self, connection, connection::Params, Connection},
};

/// Returns the value stored in the provided `slot`, filling it with the
/// `init` result first, if empty.
///
/// `init` is awaited at most once, under the write lock.
async fn get_or_init<T, F, Fut>(
    slot: &RwLock<Option<T>>,
    init: F,
) -> Result<RwLockReadGuard<'_, T>, Traced<database::Error>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Traced<database::Error>>>,
{
    let read = slot.read().await;
    let guard = if read.is_some() {
        read
    } else {
        drop(read);

        let mut write = slot.write().await;
        if write.is_none() {
            *write = Some(init().await.map_err(tracerr::wrap!())?);
        }
        write.downgrade()
    };

    Ok(RwLockReadGuard::map(guard, |v| {
        v.as_ref().expect("cannot be emptied while guard is alive")
    }))
}

/// Non-transactional Postgres database client.
///
/// Checks a [`connection::NonTx`] out of the [`connection::Pool`] on first
/// use only.
#[derive(Clone, Debug)]
pub struct NonTx {
    /// [`connection::Pool`] to check connections out of.
    pub(crate) pool: connection::Pool,

    /// Checked out connection, if any.
    connection: Arc<RwLock<Option<connection::NonTx>>>,
}

impl NonTx {
    /// Creates a new [`NonTx`] client over the provided
    /// [`connection::Pool`].
    #[must_use]
    pub(crate) fn from_pool(pool: connection::Pool) -> Self {
        Self {
            pool,
            connection: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::NonTx`] of this client, checking it out of
    /// the [`connection::Pool`] if not yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::NonTx>, Traced<database::Error>>
    {
        get_or_init(&self.connection, || checkout(&self.pool)).await
    }

    /// Hands the checked out [`connection::NonTx`] over to the caller, so
    /// the next use of this client checks out a new one.
    async fn take_connection(&self) -> Option<connection::NonTx> {
        self.connection.write().await.take()
    }
}

/// Transactional Postgres database client.
///
/// Starts its transaction on first use only, reusing the connection of the
/// [`NonTx`] client it was created from, if that one has any.
#[derive(Clone, Debug)]
pub struct Tx {
    /// [`connection::Pool`] to check a connection out of, if the [`NonTx`]
    /// client has none.
    pool: connection::Pool,

    /// [`NonTx`] client this [`Tx`] client was created from.
    ///
    /// Taken out once the transaction is started.
    non_tx: Arc<RwLock<Option<NonTx>>>,

    /// Started transaction, if any.
    tx: Arc<RwLock<Option<connection::Tx>>>,
}

impl Tx {
    /// Creates a new [`Tx`] client out of the provided [`NonTx`] client.
    #[must_use]
    pub fn from_non_tx(client: NonTx) -> Self {
        Self {
            pool: client.pool.clone(),
            non_tx: Arc::new(RwLock::new(Some(client))),
            tx: Arc::new(RwLock::new(None)),
        }
    }

    /// Returns the [`connection::Tx`] of this client, starting it if not
    /// yet.
    async fn connection(
        &self,
    ) -> Result<RwLockReadGuard<'_, connection::Tx>, Traced<database::Error>>
    {
        get_or_init(&self.tx, || async {
            let reused = match self.non_tx.write().await.take() {
                Some(client) => client.take_connection().await,
                None => None,
            };
            let conn = match reused {
                Some(conn) => conn,
                None => checkout(&self.pool).await.map_err(tracerr::wrap!())?,
            };
            connection::Tx::from_non_tx(conn)
                .await
                .map_err(tracerr::wrap!())
        })
        .await
    }

    /// Commits the transaction of this [`Tx`] client, if it was started.
    ///
    /// # Errors
    ///
    /// If the database fails to commit the transaction.
    pub async fn commit(&self) -> Result<(), Traced<database::Error>> {
        let Some(tx) = self.tx.write().await.take() else {
            return Ok(());
        };
        tx.commit().await.map_err(tracerr::wrap!())
    }
}

/// Checks a new [`connection::NonTx`] out of the provided
/// [`connection::Pool`].
pub(crate) async fn checkout(
    pool: &connection::Pool,
) -> Result<connection::NonTx, Traced<database::Error>> {
    pool.get()
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
}

/// Implements [`Connection`] for a lazily connected client by delegating to
/// the connection its `connection()` method resolves.
macro_rules! impl_connection {
    ($client:ty) => {
        impl Connection for $client {
            async fn query<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Vec<Row>, Traced<database::Error>>
            where
                T: ToStatement + Send + Sync + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn query_opt<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<Option<Row>, Traced<database::Error>>
            where
                T: ToStatement + Send + Sync + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .query_opt(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }

            async fn exec<T>(
                &self,
                stmt: &T,
                params: &Params<'_>,
            ) -> Result<u64, Traced<database::Error>>
            where
                T: ToStatement + Send + Sync + ?Sized,
            {
                self.connection()
                    .await
                    .map_err(tracerr::wrap!())?
                    .exec(stmt, params)
                    .await
                    .map_err(tracerr::wrap!())
            }
        }
    };
}

impl_connection!(NonTx);
impl_connection!(Tx);
