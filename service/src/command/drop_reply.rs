//! [`Command`] for dropping a [`Reply`].

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        order::detail,
        reply::{self, Transition},
        Detail, Reply,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for dropping a [`Reply`], releasing its [`Worker`] and the
/// slot of its [`Detail`].
///
/// Dropping an already dropped [`Reply`] succeeds, leaving it untouched.
///
/// [`Worker`]: crate::domain::person::Worker
#[derive(Clone, Copy, Debug)]
pub struct DropReply(pub reply::Id);

impl<Db, Clk> Command<DropReply> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<Update<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Lock<By<Detail, detail::Id>>, Err = Traced<database::Error>>
        + Database<Lock<By<Reply, reply::Id>>, Err = Traced<database::Error>>,
{
    type Ok = Reply;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DropReply(id): DropReply,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let reply = self
            .database()
            .execute(Select(By::<Option<Reply>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReplyNotExists(id))
            .map_err(tracerr::wrap!())?;
        if reply.status == reply::Status::Dropped {
            return Ok(reply);
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        tx.execute(Lock(By::<Detail, _>::new(id.detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Reply, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut reply = tx
            .execute(Select(By::<Option<Reply>, _>::new(id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::ReplyNotExists(id))
            .map_err(tracerr::wrap!())?;
        let dropped = reply
            .dismiss()
            .map_err(E::InvalidTransition)
            .map_err(tracerr::wrap!())?;
        if !dropped {
            return Ok(reply);
        }

        tx.execute(Update(reply.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`Reply(id: {id})` is dropped");

        Ok(reply)
    }
}

/// Error of [`DropReply`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reply`] cannot be dropped in its current [`reply::Status`].
    #[display("{_0}")]
    InvalidTransition(#[error(not(source))] Transition),

    /// [`Reply`] with the provided ID does not exist.
    #[display("`Reply(id: {_0})` does not exist")]
    ReplyNotExists(#[error(not(source))] reply::Id),
}

#[cfg(test)]
mod spec {
    use time::macros::{date, datetime, time};

    use crate::{
        domain::{order, person::Gender, reply},
        fixture,
    };

    use super::{Command as _, DropReply, ExecutionError};

    #[tokio::test]
    async fn drops_idempotently() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            1,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;
        let accepted =
            fixture::reply(db, worker, &detail, reply::Status::Accepted).await;

        let dropped = service.execute(DropReply(accepted.id())).await.unwrap();
        assert_eq!(dropped.status, reply::Status::Dropped);

        let again = service.execute(DropReply(accepted.id())).await.unwrap();
        assert_eq!(again, dropped);
    }

    #[tokio::test]
    async fn keeps_paid_reply() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Fulfilled).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 05 - 10),
            (time!(09:00), time!(18:00)),
            1,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;
        let paid =
            fixture::reply(db, worker, &detail, reply::Status::Paid).await;

        let err = service.execute(DropReply(paid.id())).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::InvalidTransition(_)),
            "unexpected error: {err}",
        );
    }
}
