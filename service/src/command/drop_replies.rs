//! [`Command`] for dropping [`Reply`]s in bulk.

use std::collections::BTreeSet;

use common::operations::{By, Commit, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{person, reply::Transition, Reply},
    infra::{database, Database},
    read::reply::DropScope,
    Service,
};
#[cfg(doc)]
use crate::domain::person::Worker;

use super::Command;

/// [`Command`] for dropping all the [`Reply`]s in a [`DropScope`] at once.
///
/// Either all the [`Reply`]s are dropped, or none of them. Outputs distinct
/// IDs of the affected [`Worker`]s to be notified.
#[derive(Clone, Copy, Debug)]
pub struct DropReplies(pub DropScope);

impl<Db, Clk> Command<DropReplies> for Service<Db, Clk>
where
    Db: Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Vec<Reply>, DropScope>>,
            Ok = Vec<Reply>,
            Err = Traced<database::Error>,
        > + Database<Update<Reply>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Vec<person::Id>;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        DropReplies(scope): DropReplies,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        // `Reply`s are selected being locked.
        let replies = tx
            .execute(Select(By::<Vec<Reply>, _>::new(scope)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;

        let mut workers = BTreeSet::new();
        for mut reply in replies {
            if !reply
                .dismiss()
                .map_err(E::InvalidTransition)
                .map_err(tracerr::wrap!())?
            {
                continue;
            }
            _ = workers.insert(reply.worker_id);
            tx.execute(Update(reply))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }

        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::info!(
            "`Reply`s of {workers} `Worker`s are dropped in {scope:?}",
            workers = workers.len(),
        );

        Ok(workers.into_iter().collect())
    }
}

/// Error of [`DropReplies`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Reply`] cannot be dropped in its current status.
    #[display("{_0}")]
    InvalidTransition(#[error(not(source))] Transition),
}

#[cfg(test)]
mod spec {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use common::{
        operations::{By, Commit, Select, Transact, Update},
        DateTime,
    };
    use time::macros::{date, datetime, time};
    use tracerr::Traced;

    use crate::{
        domain::{order, person::Gender, reply, Reply},
        fixture,
        infra::{database, memory, Database, Memory},
        query::{replies, AvailableOfOrder},
        read::reply::DropScope,
        Config, Service,
    };

    use super::{Command as _, DropReplies, ExecutionError};

    /// [`Memory`] failing every [`Update`] of a [`Reply`] once the allowed
    /// number of them is exhausted.
    #[derive(Clone, Debug)]
    struct Flaky<T> {
        db: Memory<T>,
        updates_left: Arc<AtomicUsize>,
    }

    impl Database<Transact> for Flaky<memory::NonTx> {
        type Ok = Flaky<memory::Tx>;
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Transact) -> Result<Self::Ok, Self::Err> {
            Ok(Flaky {
                db: self.db.execute(op).await?,
                updates_left: Arc::clone(&self.updates_left),
            })
        }
    }

    impl Database<Select<By<Vec<Reply>, DropScope>>> for Flaky<memory::Tx> {
        type Ok = Vec<Reply>;
        type Err = Traced<database::Error>;

        async fn execute(
            &self,
            op: Select<By<Vec<Reply>, DropScope>>,
        ) -> Result<Self::Ok, Self::Err> {
            self.db.execute(op).await
        }
    }

    impl Database<Update<Reply>> for Flaky<memory::Tx> {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Update<Reply>) -> Result<(), Self::Err> {
            let left = self.updates_left.load(Ordering::SeqCst);
            if left == 0 {
                return Err(tracerr::new!(database::Error::from(
                    memory::Error::ForeignKeyViolation("replies_detail_id_fkey"),
                )));
            }
            self.updates_left.store(left - 1, Ordering::SeqCst);
            self.db.execute(op).await
        }
    }

    impl Database<Commit> for Flaky<memory::Tx> {
        type Ok = ();
        type Err = Traced<database::Error>;

        async fn execute(&self, op: Commit) -> Result<(), Self::Err> {
            self.db.execute(op).await
        }
    }

    #[tokio::test]
    async fn drops_unapproved_of_order() {
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
            2,
        )
        .await;
        let (first, second, third) = (
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Female).await,
        );
        let created =
            fixture::reply(db, first, &detail, reply::Status::Created).await;
        let accepted =
            fixture::reply(db, second, &detail, reply::Status::Accepted).await;
        let dropped =
            fixture::reply(db, third, &detail, reply::Status::Dropped).await;

        let workers = service
            .execute(DropReplies(DropScope::UnapprovedOfOrder(order)))
            .await
            .unwrap();
        assert_eq!(workers, vec![first]);

        for (id, expected) in [
            (created.id(), reply::Status::Dropped),
            (accepted.id(), reply::Status::Accepted),
            (dropped.id(), reply::Status::Dropped),
        ] {
            let reply = service
                .execute(replies::ById::by(id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(reply.status, expected);
        }
    }

    #[tokio::test]
    async fn drops_all_of_order() {
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
            2,
        )
        .await;
        let mut workers = vec![];
        for status in [reply::Status::Created, reply::Status::Accepted] {
            let worker = fixture::worker(db, Gender::Male).await;
            _ = fixture::reply(db, worker, &detail, status).await;
            workers.push(worker);
        }
        workers.sort();

        let mut dropped = service
            .execute(DropReplies(DropScope::AllOfOrder(order)))
            .await
            .unwrap();
        dropped.sort();
        assert_eq!(dropped, workers);
        assert_eq!(service.execute(AvailableOfOrder(order)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn drops_unapproved_of_worker_on_date() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let today = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(12:00)),
            1,
        )
        .await;
        let tomorrow = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 11),
            (time!(09:00), time!(12:00)),
            1,
        )
        .await;
        let worker = fixture::worker(db, Gender::Male).await;
        let dropped =
            fixture::reply(db, worker, &today, reply::Status::Created).await;
        let kept =
            fixture::reply(db, worker, &tomorrow, reply::Status::Created).await;

        let workers = service
            .execute(DropReplies(DropScope::UnapprovedOfWorkerOnDate {
                worker_id: worker,
                date: date!(2024 - 06 - 10),
            }))
            .await
            .unwrap();
        assert_eq!(workers, vec![worker]);

        let dropped = service
            .execute(replies::ById::by(dropped.id()))
            .await
            .unwrap()
            .unwrap();
        let kept = service
            .execute(replies::ById::by(kept.id()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dropped.status, reply::Status::Dropped);
        assert_eq!(kept.status, reply::Status::Created);
    }

    #[tokio::test]
    async fn drops_unapproved_of_detail() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let target = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(12:00)),
            2,
        )
        .await;
        let sibling = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(13:00), time!(18:00)),
            2,
        )
        .await;
        let (first, second) = (
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Male).await,
        );
        let created =
            fixture::reply(db, first, &target, reply::Status::Created).await;
        let accepted =
            fixture::reply(db, second, &target, reply::Status::Accepted).await;
        let kept =
            fixture::reply(db, second, &sibling, reply::Status::Created).await;

        let workers = service
            .execute(DropReplies(DropScope::UnapprovedOfDetail(target.id)))
            .await
            .unwrap();
        assert_eq!(workers, vec![first]);

        for (id, expected) in [
            (created.id(), reply::Status::Dropped),
            (accepted.id(), reply::Status::Accepted),
            (kept.id(), reply::Status::Created),
        ] {
            let reply = service
                .execute(replies::ById::by(id))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(reply.status, expected);
        }
    }

    #[tokio::test]
    async fn drops_nothing_when_any_update_fails() {
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
            3,
        )
        .await;
        let mut held = vec![];
        for status in [
            reply::Status::Created,
            reply::Status::Accepted,
            reply::Status::Created,
        ] {
            let worker = fixture::worker(db, Gender::Male).await;
            held.push(fixture::reply(db, worker, &detail, status).await);
        }
        let flaky = Service::with_clock(
            Config::default(),
            Flaky {
                db: db.clone(),
                updates_left: Arc::new(AtomicUsize::new(1)),
            },
            fixture::FixedClock(DateTime::UNIX_EPOCH),
        );

        let err = flaky
            .execute(DropReplies(DropScope::AllOfOrder(order)))
            .await
            .unwrap_err();
        assert!(
            matches!(err.as_ref(), ExecutionError::Db(_)),
            "unexpected error: {err}",
        );

        for before in held {
            let after = service
                .execute(replies::ById::by(before.id()))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(after.status, before.status);
        }
        assert_eq!(service.execute(AvailableOfOrder(order)).await.unwrap(), 2);
    }
}
