//! [`Command`] for submitting a new [`Reply`].

use common::{
    operations::{By, Commit, Insert, Lock, Select, Transact, Transacted},
    Clock,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        person, reply, Detail, Order, Person, Reply,
    },
    infra::{database, Database},
    query::can_apply::{self, Admissibility, Rejection},
    read::{
        capacity::ApprovedCount,
        reply::{Engagement, Schedule},
    },
    Service,
};
#[cfg(doc)]
use crate::domain::person::Worker;

use super::Command;

/// [`Command`] for submitting a new [`Reply`] of a [`Worker`] to a
/// [`Detail`].
#[derive(Clone, Copy, Debug)]
pub struct SubmitReply {
    /// ID of the [`Worker`] replying.
    pub worker_id: person::Id,

    /// ID of the [`Detail`] to reply to.
    pub detail_id: detail::Id,

    /// Hourly rate the [`Worker`] asks for.
    ///
    /// If [`None`], then the part of the [`Detail::wager`] paid to workers
    /// is used.
    pub wager: Option<Decimal>,
}

impl<Db, Clk> Command<SubmitReply> for Service<Db, Clk>
where
    Clk: Clock,
    Db: Database<
            Select<By<Option<Person>, person::Id>>,
            Ok = Option<Person>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Detail>, detail::Id>>,
            Ok = Option<Detail>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Option<Reply>, reply::Id>>,
            Ok = Option<Reply>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Engagement>, Schedule>>,
            Ok = Vec<Engagement>,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<ApprovedCount, detail::Id>>,
            Ok = ApprovedCount,
            Err = Traced<database::Error>,
        > + Database<Insert<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Lock<By<Person, person::Id>>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Detail, detail::Id>>, Err = Traced<database::Error>>,
{
    type Ok = Reply;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: SubmitReply) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let SubmitReply {
            worker_id,
            detail_id,
            wager,
        } = cmd;

        let worker = self
            .database()
            .execute(Select(By::<Option<Person>, _>::new(worker_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .as_ref()
            .and_then(Person::as_worker)
            .copied()
            .ok_or(E::WorkerNotExists(worker_id))
            .map_err(tracerr::wrap!())?;

        let detail = self
            .database()
            .execute(Select(By::<Option<Detail>, _>::new(detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::DetailNotExists(detail_id))
            .map_err(tracerr::wrap!())?;

        let wager = wager.unwrap_or_else(|| self.config().pay(detail.wager));
        if wager <= Decimal::ZERO {
            return Err(tracerr::new!(E::InvalidWager(wager)));
        }

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // Serialize replies of the same `Worker`, so busy dates are checked
        // consistently.
        tx.execute(Lock(By::<Person, _>::new(worker_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Lock(By::<Detail, _>::new(detail_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let now = self.now();
        let reply = Reply::new(worker_id, detail_id, wager, now.coerce());

        match can_apply::check(&tx, self.config(), now, worker_id, worker, &detail)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
        {
            Admissibility::Admissible => {}
            Admissibility::Rejected(Rejection::DuplicateReply) => {
                return Err(tracerr::new!(E::DuplicateEntry(reply.id())));
            }
            Admissibility::Rejected(r) => {
                return Err(tracerr::new!(E::Rejected(r)));
            }
        }

        tx.execute(Insert(reply.clone()))
            .await
            .map_err(|e| {
                if e.as_ref()
                    .is_unique_violation(Some(database::REPLY_ID_CONSTRAINT))
                {
                    tracerr::new!(E::DuplicateEntry(reply.id()))
                } else if e.as_ref().is_integrity_violation() {
                    tracerr::new!(E::IntegrityViolation(e.into_inner()))
                } else {
                    (tracerr::map_from_and_wrap!(=> E))(e)
                }
            })
            .map(drop)?;

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(reply)
    }
}

/// Error of [`SubmitReply`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Detail`] with the provided ID does not exist.
    #[display("`Detail(id: {_0})` does not exist")]
    DetailNotExists(#[error(not(source))] detail::Id),

    /// [`Reply`] with the same [`reply::Id`] exists already.
    #[display("`Reply(id: {_0})` exists already")]
    DuplicateEntry(#[error(not(source))] reply::Id),

    /// [`Database`] integrity constraint is violated.
    #[display("`Database` integrity is violated: {_0}")]
    IntegrityViolation(#[error(not(source))] database::Error),

    /// Provided wager is not positive.
    #[display("`{_0}` wager is not positive")]
    InvalidWager(#[error(not(source))] Decimal),

    /// [`Worker`] cannot reply to the [`Detail`].
    #[display("`Reply` is rejected: {_0}")]
    Rejected(#[error(not(source))] Rejection),

    /// [`Worker`] with the provided ID does not exist.
    #[display("`Worker(id: {_0})` does not exist")]
    WorkerNotExists(#[error(not(source))] person::Id),
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;
    use time::macros::{date, datetime, time};

    use crate::{
        command::DropReply,
        domain::{order, person::Gender, reply},
        fixture,
        query::can_apply::Rejection,
    };

    use super::{Command as _, ExecutionError, SubmitReply};

    #[tokio::test]
    async fn creates_reply_with_default_wager() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 03),
            (time!(22:00), time!(02:00)),
            2,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;

        let reply = service
            .execute(SubmitReply {
                worker_id: worker,
                detail_id: detail.id,
                wager: None,
            })
            .await
            .unwrap();

        assert_eq!(reply.status, reply::Status::Created);
        assert_eq!(reply.wager, Decimal::from(450));
        assert!(reply.paid_at.is_none());
    }

    #[tokio::test]
    async fn rejects_duplicates_even_after_drop() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 03),
            (time!(09:00), time!(18:00)),
            2,
        )
        .await;
        let worker = fixture::worker(db, Gender::Female).await;
        let cmd = SubmitReply {
            worker_id: worker,
            detail_id: detail.id,
            wager: Some(Decimal::from(400)),
        };

        let reply = service.execute(cmd).await.unwrap();

        let err = service.execute(cmd).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::DuplicateEntry(id) if *id == reply.id()),
            "unexpected error: {err}",
        );

        _ = service.execute(DropReply(reply.id())).await.unwrap();

        let err = service.execute(cmd).await.unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::DuplicateEntry(_)),
            "unexpected error: {err}",
        );
    }

    #[tokio::test]
    async fn rejects_overlapping_overnight_shift() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let first =
            fixture::order(db, customer, None, order::Status::Open).await;
        let second =
            fixture::order(db, customer, None, order::Status::Open).await;
        let night = fixture::detail(
            db,
            first,
            date!(2024 - 06 - 03),
            (time!(22:00), time!(02:00)),
            1,
        )
        .await;
        let morning = fixture::detail(
            db,
            second,
            date!(2024 - 06 - 04),
            (time!(08:00), time!(10:00)),
            1,
        )
        .await;
        let later = fixture::detail(
            db,
            second,
            date!(2024 - 06 - 06),
            (time!(08:00), time!(10:00)),
            1,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;

        _ = service
            .execute(SubmitReply {
                worker_id: worker,
                detail_id: night.id,
                wager: None,
            })
            .await
            .unwrap();

        let err = service
            .execute(SubmitReply {
                worker_id: worker,
                detail_id: morning.id,
                wager: None,
            })
            .await
            .unwrap_err();
        assert!(
            matches!(
                err.as_ref(),
                ExecutionError::Rejected(Rejection::WorkerBusy),
            ),
            "unexpected error: {err}",
        );

        _ = service
            .execute(SubmitReply {
                worker_id: worker,
                detail_id: later.id,
                wager: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejects_inadmissible_replies() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let open =
            fixture::order(db, customer, None, order::Status::Open).await;
        let created =
            fixture::order(db, customer, None, order::Status::Created).await;

        let closed_order = fixture::detail(
            db,
            created,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            1,
        )
        .await;
        let mut female_only = fixture::detail(
            db,
            open,
            date!(2024 - 06 - 12),
            (time!(09:00), time!(18:00)),
            1,
        )
        .await;
        female_only.gender = Some(Gender::Female);
        db.execute(common::operations::Insert(female_only.clone()))
            .await
            .unwrap();
        let soon = fixture::detail(
            db,
            open,
            date!(2024 - 06 - 01),
            (time!(09:30), time!(18:00)),
            1,
        )
        .await;
        let full = fixture::detail(
            db,
            open,
            date!(2024 - 06 - 14),
            (time!(09:00), time!(18:00)),
            1,
        )
        .await;
        let other = fixture::worker(db, Gender::Female).await;
        _ = fixture::reply(db, other, &full, reply::Status::Accepted).await;

        let worker = fixture::worker(db, Gender::Male).await;
        for (detail, expected) in [
            (closed_order.id, Rejection::OrderNotOpen),
            (female_only.id, Rejection::GenderMismatch),
            (soon.id, Rejection::ApplicationsClosed),
            (full.id, Rejection::SlotFull),
        ] {
            let err = service
                .execute(SubmitReply {
                    worker_id: worker,
                    detail_id: detail,
                    wager: None,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err.as_ref(), ExecutionError::Rejected(r) if *r == expected),
                "unexpected error: {err}",
            );
        }
    }

    #[tokio::test]
    async fn validates_arguments() {
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

        let err = service
            .execute(SubmitReply {
                worker_id: customer,
                detail_id: detail.id,
                wager: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::WorkerNotExists(_)));

        let err = service
            .execute(SubmitReply {
                worker_id: worker,
                detail_id: detail.id,
                wager: Some(Decimal::ZERO),
            })
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidWager(_)));
    }
}
