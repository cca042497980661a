//! [`Command`] for marking a [`Reply`] as paid.

use common::{
    operations::{By, Commit, Lock, Select, Transact, Transacted, Update},
    Clock,
};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        reply::{self, Transition},
        Reply,
    },
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for marking an accepted [`Reply`] as paid out at the current
/// moment.
#[derive(Clone, Copy, Debug)]
pub struct MarkReplyPaid(pub reply::Id);

impl<Db, Clk> Command<MarkReplyPaid> for Service<Db, Clk>
where
    Clk: Clock,
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<Update<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>:
        Database<Lock<By<Reply, reply::Id>>, Err = Traced<database::Error>>,
{
    type Ok = Reply;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        MarkReplyPaid(id): MarkReplyPaid,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

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
        reply
            .pay(self.now().coerce())
            .map_err(E::InvalidTransition)
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(reply.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!("`Reply(id: {id})` is paid");

        Ok(reply)
    }
}

/// Error of [`MarkReplyPaid`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reply`] is not [`reply::Status::Accepted`].
    #[display("{_0}")]
    InvalidTransition(#[error(not(source))] Transition),

    /// [`Reply`] with the provided ID does not exist.
    #[display("`Reply(id: {_0})` does not exist")]
    ReplyNotExists(#[error(not(source))] reply::Id),
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use time::macros::{date, datetime, time};

    use crate::{
        domain::{order, person::Gender, reply},
        fixture,
    };

    use super::{Command as _, ExecutionError, MarkReplyPaid};

    #[tokio::test]
    async fn pays_accepted_reply_only() {
        let service = fixture::service(datetime!(2024-06-20 12:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Fulfilled).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            2,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;
        let accepted =
            fixture::reply(db, worker, &detail, reply::Status::Accepted).await;
        let other = fixture::worker(db, Gender::Male).await;
        let created =
            fixture::reply(db, other, &detail, reply::Status::Created).await;

        let paid = service.execute(MarkReplyPaid(accepted.id())).await.unwrap();
        assert_eq!(paid.status, reply::Status::Paid);
        assert_eq!(
            paid.paid_at,
            Some(DateTime::from_primitive(datetime!(2024-06-20 12:00)).coerce()),
        );

        let err = service.execute(MarkReplyPaid(paid.id())).await.unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::InvalidTransition(t)
                    if t.from == reply::Status::Paid,
            ),
            "unexpected error: {err}",
        );

        let err = service
            .execute(MarkReplyPaid(created.id()))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidTransition(_)));
    }
}
