//! [`Query`]s of a [`Worker`] admissibility to [`Detail`]s.

use common::{
    operations::{By, Select},
    Clock, DateTime,
};
use derive_more::{Display, Error, From};
use time::{Date, Duration};
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        person::{self, Worker},
        reply, Detail, Order, Person, Reply,
    },
    infra::{database, Database},
    read::{
        capacity::{ApprovedCount, AvailableReplies},
        reply::{Engagement, Schedule},
    },
    Config, Service,
};

use super::Query;

/// [`Query`] checking whether a [`Worker`] can reply to a [`Detail`].
#[derive(Clone, Copy, Debug)]
pub struct CanApply {
    /// ID of the [`Worker`] willing to reply.
    pub worker_id: person::Id,

    /// ID of the [`Detail`] to reply to.
    pub detail_id: detail::Id,
}

/// Result of a [`CanApply`] [`Query`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Admissibility {
    /// [`Worker`] can reply to the [`Detail`].
    Admissible,

    /// [`Worker`] cannot reply to the [`Detail`].
    Rejected(Rejection),
}

impl Admissibility {
    /// Indicates whether the [`Worker`] can reply to the [`Detail`].
    #[must_use]
    pub fn is_admissible(&self) -> bool {
        matches!(self, Self::Admissible)
    }
}

/// Reason of a [`Worker`] being unable to reply to a [`Detail`].
///
/// Variants are listed in the order they are checked in.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Rejection {
    /// [`Order`] of the [`Detail`] is not open.
    #[display("`Order` is not open")]
    OrderNotOpen,

    /// [`Worker`] holds a [`Reply`] to the [`Detail`] already.
    #[display("`Worker` has replied to the `Detail` already")]
    DuplicateReply,

    /// [`Worker`] holds a [`Reply`] to a conflicting [`Detail`].
    #[display("`Worker` is busy at the `Detail` time")]
    WorkerBusy,

    /// [`Detail`] has no free slots.
    #[display("`Detail` has no free slots")]
    SlotFull,

    /// [`Worker`] doesn't match the required [`Detail::gender`].
    #[display("`Worker` gender doesn't match")]
    GenderMismatch,

    /// [`Detail`] starts too soon to accept new [`Reply`]s.
    #[display("applications to the `Detail` are closed")]
    ApplicationsClosed,
}

/// Checks whether the provided [`Worker`] can reply to the provided
/// [`Detail`] at the provided moment.
///
/// Stops on the first failed check.
pub(crate) async fn check<Db>(
    db: &Db,
    config: &Config,
    now: DateTime,
    worker_id: person::Id,
    worker: Worker,
    detail: &Detail,
) -> Result<Admissibility, Traced<database::Error>>
where
    Db: Database<
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
        >,
{
    use Admissibility::Rejected;
    use Rejection as R;

    let order = db
        .execute(Select(By::<Option<Order>, _>::new(detail.order_id)))
        .await
        .map_err(tracerr::wrap!())?;
    if !order.as_ref().is_some_and(Order::is_open) {
        return Ok(Rejected(R::OrderNotOpen));
    }

    let reply_id = reply::Id {
        worker_id,
        detail_id: detail.id,
    };
    let replied = db
        .execute(Select(By::<Option<Reply>, _>::new(reply_id)))
        .await
        .map_err(tracerr::wrap!())?
        .is_some_and(|r| r.status != reply::Status::Dropped);
    if replied {
        return Ok(Rejected(R::DuplicateReply));
    }

    // Conflicting shifts start no further than a day away.
    let engagements = db
        .execute(Select(By::<Vec<Engagement>, _>::new(Schedule {
            worker_id,
            statuses: reply::Status::LIVE,
            dates: around(detail.date),
        })))
        .await
        .map_err(tracerr::wrap!())?;
    if engagements
        .iter()
        .any(|e| e.detail.id != detail.id && e.detail.conflicts_with(detail))
    {
        return Ok(Rejected(R::WorkerBusy));
    }

    let approved = db
        .execute(Select(By::<ApprovedCount, _>::new(detail.id)))
        .await
        .map_err(tracerr::wrap!())?;
    if AvailableReplies::new(detail, approved).is_full() {
        return Ok(Rejected(R::SlotFull));
    }

    if detail.gender.is_some_and(|g| g != worker.gender) {
        return Ok(Rejected(R::GenderMismatch));
    }

    let starts_at = DateTime::from_primitive(detail.shift().start);
    if now + config.reply_deadline >= starts_at {
        return Ok(Rejected(R::ApplicationsClosed));
    }

    Ok(Admissibility::Admissible)
}

/// Returns the range of dates from the day before the provided `date` to the
/// day after it.
fn around(date: Date) -> std::ops::RangeInclusive<Date> {
    date.saturating_sub(Duration::DAY)..=date.saturating_add(Duration::DAY)
}

impl<Db, Clk> Query<CanApply> for Service<Db, Clk>
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
        > + Database<
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
        >,
{
    type Ok = Admissibility;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        CanApply {
            worker_id,
            detail_id,
        }: CanApply,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

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

        check(
            self.database(),
            self.config(),
            self.now(),
            worker_id,
            worker,
            &detail,
        )
        .await
        .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// [`Query`] checking whether a [`Worker`] has an accepted [`Reply`] to a
/// [`Detail`] occupying the provided date.
///
/// Unlike [`CanApply`], it doesn't consider [`Reply`]s awaiting a review.
#[derive(Clone, Copy, Debug)]
pub struct IsWorkerBusy {
    /// ID of the [`Worker`].
    pub worker_id: person::Id,

    /// Calendar date to check.
    pub date: Date,
}

impl<Db, Clk> Query<IsWorkerBusy> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Vec<Engagement>, Schedule>>,
        Ok = Vec<Engagement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = bool;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        IsWorkerBusy { worker_id, date }: IsWorkerBusy,
    ) -> Result<Self::Ok, Self::Err> {
        Ok(self
            .database()
            .execute(Select(By::<Vec<Engagement>, _>::new(Schedule {
                worker_id,
                statuses: &[reply::Status::Accepted],
                dates: around(date),
            })))
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .any(|e| e.detail.occupies(date)))
    }
}

/// Error of [`CanApply`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Detail`] with the provided ID does not exist.
    #[display("`Detail(id: {_0})` does not exist")]
    DetailNotExists(#[error(not(source))] detail::Id),

    /// [`Worker`] with the provided ID does not exist.
    #[display("`Worker(id: {_0})` does not exist")]
    WorkerNotExists(#[error(not(source))] person::Id),
}
