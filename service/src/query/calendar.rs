//! [`Query`] collection of a [`Worker`]'s calendar.

use std::{cmp::Reverse, collections::BTreeSet};

use common::{
    operations::{By, Select},
    Clock, DateTime,
};
use time::{Date, Duration};
use tracerr::Traced;

use crate::{
    domain::{person, reply},
    infra::{database, Database},
    read::reply::{Engagement, Schedule},
    Service,
};
#[cfg(doc)]
use crate::domain::{person::Worker, Reply};

use super::Query;

/// [`Query`] for the approved [`Reply`]s of a [`Worker`] whose shifts have
/// not ended yet, the latest starting first.
#[derive(Clone, Copy, Debug)]
pub struct WorkerFutureReplies(pub person::Id);

impl<Db, Clk> Query<WorkerFutureReplies> for Service<Db, Clk>
where
    Clk: Clock,
    Db: Database<
        Select<By<Vec<Engagement>, Schedule>>,
        Ok = Vec<Engagement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Engagement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        WorkerFutureReplies(worker_id): WorkerFutureReplies,
    ) -> Result<Self::Ok, Self::Err> {
        let now = self.now();

        // Overnight shifts of yesterday may still be running.
        let since = now.date().saturating_sub(Duration::DAY);

        let mut engagements = self
            .database()
            .execute(Select(By::<Vec<Engagement>, _>::new(Schedule {
                worker_id,
                statuses: reply::Status::APPROVED,
                dates: since..=Date::MAX,
            })))
            .await
            .map_err(tracerr::wrap!())?;
        engagements
            .retain(|e| DateTime::from_primitive(e.detail.shift().end) > now);
        engagements.sort_by_key(|e| Reverse((e.detail.shift().start, e.detail.id)));

        Ok(engagements)
    }
}

/// [`Query`] for the distinct calendar dates occupied by the
/// [`WorkerFutureReplies`], in ascending order.
#[derive(Clone, Copy, Debug)]
pub struct WorkerFutureBusyDates(pub person::Id);

impl<Db, Clk> Query<WorkerFutureBusyDates> for Service<Db, Clk>
where
    Self: Query<
        WorkerFutureReplies,
        Ok = Vec<Engagement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Vec<Date>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        WorkerFutureBusyDates(worker_id): WorkerFutureBusyDates,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .execute(WorkerFutureReplies(worker_id))
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .flat_map(|e| e.detail.occupied_dates())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect())
    }
}

#[cfg(test)]
mod spec {
    use time::macros::{date, datetime, time};

    use crate::{
        domain::{order, person::Gender, reply},
        fixture,
    };

    use super::{Query as _, WorkerFutureBusyDates, WorkerFutureReplies};

    #[tokio::test]
    async fn lists_upcoming_approved_shifts() {
        let service = fixture::service(datetime!(2024-06-10 12:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Active).await;
        let worker = fixture::worker(db, Gender::Female).await;

        let mut expected = vec![];
        for (date, shift, status, upcoming) in [
            (
                date!(2024 - 06 - 05),
                (time!(09:00), time!(18:00)),
                reply::Status::Accepted,
                false,
            ),
            (
                date!(2024 - 06 - 09),
                (time!(22:00), time!(02:00)),
                reply::Status::Accepted,
                false,
            ),
            (
                date!(2024 - 06 - 10),
                (time!(09:00), time!(18:00)),
                reply::Status::Accepted,
                true,
            ),
            (
                date!(2024 - 06 - 12),
                (time!(22:00), time!(02:00)),
                reply::Status::Paid,
                true,
            ),
            (
                date!(2024 - 06 - 15),
                (time!(09:00), time!(18:00)),
                reply::Status::Created,
                false,
            ),
        ] {
            let detail = fixture::detail(db, order, date, shift, 1).await;
            let reply = fixture::reply(db, worker, &detail, status).await;
            if upcoming {
                expected.push(reply.id());
            }
        }
        expected.reverse();

        let replies = service.execute(WorkerFutureReplies(worker)).await.unwrap();
        assert_eq!(
            replies.iter().map(|e| e.reply.id()).collect::<Vec<_>>(),
            expected,
        );

        let dates = service.execute(WorkerFutureBusyDates(worker)).await.unwrap();
        assert_eq!(
            dates,
            vec![
                date!(2024 - 06 - 10),
                date!(2024 - 06 - 12),
                date!(2024 - 06 - 13),
            ],
        );
    }
}
