//! Metrics [`Query`] collection.
//!
//! Amounts and hours are calculated over the worked shifts only: approved
//! [`Reply`]s to [`order::Status::Fulfilled`] [`Order`]s.

use std::ops::RangeInclusive;

use common::operations::{By, Select};
use rust_decimal::Decimal;
use time::Date;
use tracerr::Traced;

use crate::{
    domain::person,
    infra::{database, Database},
    read::metrics::{
        Engagement, OrderTally, PeopleCount, Scope, Selector, Totals,
        WagerTally,
    },
    Service,
};
#[cfg(doc)]
use crate::domain::{
    order::{self, Detail},
    person::{Customer, Supervisor, Worker},
    Order, Person, Reply,
};

use super::Query;

/// [`Query`] for the metrics of the whole marketplace.
#[derive(Clone, Debug, Default)]
pub struct AppMetrics {
    /// Range of [`Detail::date`]s to calculate the metrics within, if any.
    pub window: Option<RangeInclusive<Date>>,
}

/// Output of the [`AppMetrics`] [`Query`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct App {
    /// Number of registered [`Person`]s.
    pub people: PeopleCount,

    /// Numbers of [`Order`]s.
    pub orders: OrderTally,

    /// Number of [`Reply`]s.
    pub replies: u64,

    /// Amount paid for the worked shifts.
    pub amount: Decimal,

    /// Average [`Detail::wager`].
    pub average_wager: Decimal,
}

impl<Db, Clk> Query<AppMetrics> for Service<Db, Clk>
where
    Db: Database<
            Select<By<PeopleCount, ()>>,
            Ok = PeopleCount,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<OrderTally, Selector>>,
            Ok = OrderTally,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<WagerTally, Selector>>,
            Ok = WagerTally,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Engagement>, Selector>>,
            Ok = Vec<Engagement>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = App;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        AppMetrics { window }: AppMetrics,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = Selector {
            scope: Scope::All,
            window,
        };

        let people = self
            .database()
            .execute(Select(By::<PeopleCount, _>::new(())))
            .await
            .map_err(tracerr::wrap!())?;
        let orders = self
            .database()
            .execute(Select(By::<OrderTally, _>::new(selector.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let wagers = self
            .database()
            .execute(Select(By::<WagerTally, _>::new(selector.clone())))
            .await
            .map_err(tracerr::wrap!())?;
        let totals = self
            .database()
            .execute(Select(By::<Vec<Engagement>, _>::new(selector)))
            .await
            .map_err(tracerr::wrap!())
            .map(|e| Totals::of(&e))?;

        Ok(App {
            people,
            orders,
            replies: totals.replies,
            amount: totals.amount,
            average_wager: wagers.average(),
        })
    }
}

/// [`Query`] for the metrics of the [`Order`]s reviewed by a [`Supervisor`].
#[derive(Clone, Debug)]
pub struct SupervisorMetrics {
    /// ID of the [`Supervisor`].
    pub supervisor_id: person::Id,

    /// Range of [`Detail::date`]s to calculate the metrics within, if any.
    pub window: Option<RangeInclusive<Date>>,
}

/// [`Query`] for the metrics of the [`Order`]s placed by a [`Customer`].
#[derive(Clone, Debug)]
pub struct CustomerMetrics {
    /// ID of the [`Customer`].
    pub customer_id: person::Id,

    /// Range of [`Detail::date`]s to calculate the metrics within, if any.
    pub window: Option<RangeInclusive<Date>>,
}

/// Output of the [`SupervisorMetrics`] and [`CustomerMetrics`] [`Query`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Orders {
    /// Numbers of the [`Order`]s.
    pub orders: OrderTally,

    /// Number of [`Reply`]s to the [`Order`]s.
    pub replies: u64,

    /// Number of [`Reply`]s to the [`Order`]s awaiting a review.
    pub pending: u64,

    /// Amount spent on the worked shifts.
    pub amount: Decimal,

    /// Hours of the worked shifts.
    pub hours: Decimal,
}

impl<Db, Clk> Query<SupervisorMetrics> for Service<Db, Clk>
where
    Db: Database<
            Select<By<OrderTally, Selector>>,
            Ok = OrderTally,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Engagement>, Selector>>,
            Ok = Vec<Engagement>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Orders;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        SupervisorMetrics {
            supervisor_id,
            window,
        }: SupervisorMetrics,
    ) -> Result<Self::Ok, Self::Err> {
        orders_metrics(
            self.database(),
            Selector {
                scope: Scope::Supervisor(supervisor_id),
                window,
            },
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<Db, Clk> Query<CustomerMetrics> for Service<Db, Clk>
where
    Db: Database<
            Select<By<OrderTally, Selector>>,
            Ok = OrderTally,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Engagement>, Selector>>,
            Ok = Vec<Engagement>,
            Err = Traced<database::Error>,
        >,
{
    type Ok = Orders;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        CustomerMetrics {
            customer_id,
            window,
        }: CustomerMetrics,
    ) -> Result<Self::Ok, Self::Err> {
        orders_metrics(
            self.database(),
            Selector {
                scope: Scope::Customer(customer_id),
                window,
            },
        )
        .await
        .map_err(tracerr::wrap!())
    }
}

/// Calculates [`Orders`] metrics of the [`Order`]s falling into the provided
/// [`Selector`].
async fn orders_metrics<Db>(
    db: &Db,
    selector: Selector,
) -> Result<Orders, Traced<database::Error>>
where
    Db: Database<
            Select<By<OrderTally, Selector>>,
            Ok = OrderTally,
            Err = Traced<database::Error>,
        > + Database<
            Select<By<Vec<Engagement>, Selector>>,
            Ok = Vec<Engagement>,
            Err = Traced<database::Error>,
        >,
{
    let orders = db
        .execute(Select(By::<OrderTally, _>::new(selector.clone())))
        .await
        .map_err(tracerr::wrap!())?;
    let totals = db
        .execute(Select(By::<Vec<Engagement>, _>::new(selector)))
        .await
        .map_err(tracerr::wrap!())
        .map(|e| Totals::of(&e))?;

    Ok(Orders {
        orders,
        replies: totals.replies,
        pending: totals.pending,
        amount: totals.amount,
        hours: totals.hours,
    })
}

/// [`Query`] for the metrics of a [`Worker`].
#[derive(Clone, Debug)]
pub struct WorkerMetrics {
    /// ID of the [`Worker`].
    pub worker_id: person::Id,

    /// Range of [`Detail::date`]s to calculate the metrics within, if any.
    pub window: Option<RangeInclusive<Date>>,
}

/// Output of the [`WorkerMetrics`] [`Query`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Worked {
    /// Number of [`Reply`]s of the [`Worker`].
    pub replies: u64,

    /// Number of approved [`Reply`]s of the [`Worker`].
    pub approved: u64,

    /// Number of distinct [`Order`]s the [`Worker`] has approved [`Reply`]s
    /// to.
    pub orders: u64,

    /// Amount earned for the worked shifts.
    pub earned: Decimal,

    /// Hours of the worked shifts.
    pub hours: Decimal,

    /// Average hourly rate of the worked shifts.
    pub average_wager: Decimal,
}

impl<Db, Clk> Query<WorkerMetrics> for Service<Db, Clk>
where
    Db: Database<
        Select<By<Vec<Engagement>, Selector>>,
        Ok = Vec<Engagement>,
        Err = Traced<database::Error>,
    >,
{
    type Ok = Worked;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        WorkerMetrics { worker_id, window }: WorkerMetrics,
    ) -> Result<Self::Ok, Self::Err> {
        let totals = self
            .database()
            .execute(Select(By::<Vec<Engagement>, _>::new(Selector {
                scope: Scope::Worker(worker_id),
                window,
            })))
            .await
            .map_err(tracerr::wrap!())
            .map(|e| Totals::of(&e))?;

        Ok(Worked {
            replies: totals.replies,
            approved: totals.approved,
            orders: totals.orders_with_approved,
            earned: totals.amount,
            hours: totals.hours,
            average_wager: totals.average_wager(),
        })
    }
}
