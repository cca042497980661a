//! Raw Postgres [`Connection`]s pulled out of a [`Pool`].

use std::{fmt, future::Future};

use deadpool_postgres::GenericClient;
use futures::{FutureExt as _, TryFutureExt as _};
use ouroboros::self_referencing;
use tokio_postgres::{types::ToSql, Row, ToStatement};
use tracerr::Traced;
use tracing as log;

use crate::infra::database::{self, postgres};

pub use deadpool_postgres::{
    Client as NonTx, CreatePoolError as PoolCreationError, Pool, PoolError,
};
pub use tokio_postgres::Error;

/// SQL parameters bound to a statement.
pub type Params<'p> = [&'p (dyn ToSql + Sync)];

/// Pooled [`NonTx`] connection with a transaction started in it.
///
/// Rolls back on drop, unless [`Tx::commit()`]ed.
#[self_referencing]
pub struct Tx {
    /// Pooled connection owning the transaction.
    non_tx: NonTx,

    /// Started transaction, taken out once committed.
    #[borrows(mut non_tx)]
    #[not_covariant]
    tx: Option<deadpool_postgres::Transaction<'this>>,
}

impl fmt::Debug for Tx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tx")
            .field("committed", &self.with_tx(|tx| tx.is_none()))
            .finish_non_exhaustive()
    }
}

impl Tx {
    /// Starts a new [`Tx`] in the provided pooled [`NonTx`] connection.
    ///
    /// # Errors
    ///
    /// If the database refuses to start a transaction.
    pub async fn from_non_tx(
        client: NonTx,
    ) -> Result<Self, Traced<database::Error>> {
        Self::try_new_async_send(client, |c| {
            c.transaction().map_ok(Some).boxed()
        })
        .await
        .map_err(tracerr::from_and_wrap!(=> postgres::Error))
        .map_err(tracerr::map_from)
    }

    /// Commits this [`Tx`], releasing its row locks.
    ///
    /// # Errors
    ///
    /// If the database fails to commit the transaction.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    pub async fn commit(mut self) -> Result<(), Traced<database::Error>> {
        #[expect(
            clippy::redundant_closure_for_method_calls,
            reason = "different variance, see \
                      https://doc.rust-lang.org/nomicon/subtyping.html#variance"
        )]
        let tx = self.with_tx_mut(|tx| tx.take()).expect("committed once");
        tx.commit()
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)?;
        log::trace!("Postgres transaction is committed");
        Ok(())
    }

    /// Returns the started transaction of this [`Tx`].
    fn tx(&self) -> &deadpool_postgres::Transaction<'_> {
        self.with_tx(|tx| tx.as_ref().expect("not committed yet"))
    }
}

/// Connection to a Postgres database, either transactional or not.
pub trait Connection {
    /// Runs the provided statement and returns all its rows.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn query<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Vec<Row>, Traced<database::Error>>>
    where
        T: ToStatement + Send + Sync + ?Sized;

    /// Runs the provided statement and returns its single row, if any.
    ///
    /// # Errors
    ///
    /// If the statement fails or returns more than one row.
    fn query_opt<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<Option<Row>, Traced<database::Error>>>
    where
        T: ToStatement + Send + Sync + ?Sized;

    /// Runs the provided statement and returns the number of rows it
    /// affected.
    ///
    /// # Errors
    ///
    /// If the statement fails.
    fn exec<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> impl Future<Output = Result<u64, Traced<database::Error>>>
    where
        T: ToStatement + Send + Sync + ?Sized;
}

/// Runs the provided statement over any [`GenericClient`].
async fn query<C, T>(
    client: &C,
    stmt: &T,
    params: &Params<'_>,
) -> Result<Vec<Row>, Error>
where
    C: GenericClient + ?Sized,
    T: ToStatement + Send + Sync + ?Sized,
{
    client.query(stmt, params).await
}

/// Runs the provided single-row statement over any [`GenericClient`].
async fn query_opt<C, T>(
    client: &C,
    stmt: &T,
    params: &Params<'_>,
) -> Result<Option<Row>, Error>
where
    C: GenericClient + ?Sized,
    T: ToStatement + Send + Sync + ?Sized,
{
    client.query_opt(stmt, params).await
}

/// Runs the provided modifying statement over any [`GenericClient`].
async fn exec<C, T>(
    client: &C,
    stmt: &T,
    params: &Params<'_>,
) -> Result<u64, Error>
where
    C: GenericClient + ?Sized,
    T: ToStatement + Send + Sync + ?Sized,
{
    client.execute(stmt, params).await
}

impl Connection for NonTx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        query(self, stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        query_opt(self, stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        exec(self, stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}

impl Connection for Tx {
    async fn query<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<Vec<Row>, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        query(self.tx(), stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn query_opt<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<Option<Row>, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        query_opt(self.tx(), stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }

    async fn exec<T>(
        &self,
        stmt: &T,
        params: &Params<'_>,
    ) -> Result<u64, Traced<database::Error>>
    where
        T: ToStatement + Send + Sync + ?Sized,
    {
        exec(self.tx(), stmt, params)
            .await
            .map_err(tracerr::from_and_wrap!(=> postgres::Error))
            .map_err(tracerr::map_from)
    }
}
