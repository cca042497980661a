//! Metrics read models definitions.

use std::{collections::HashSet, ops::RangeInclusive};

use derive_more::{Display, From, Into};
use rust_decimal::Decimal;
use time::Date;

use crate::domain::{order, person, reply, Detail, Reply};
#[cfg(doc)]
use crate::domain::{
    person::{Customer, Supervisor, Worker},
    Order, Person,
};

/// Selector of the data metrics are calculated over.
#[derive(Clone, Debug)]
pub struct Selector {
    /// [`Scope`] of the metrics.
    pub scope: Scope,

    /// Range of [`Detail::date`]s the metrics are calculated within, if any.
    ///
    /// An [`Order`] falls into the range if any of its [`Detail`]s does.
    pub window: Option<RangeInclusive<Date>>,
}

/// Scope of metrics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    /// Whole marketplace.
    All,

    /// [`Order`]s reviewed by a [`Supervisor`].
    Supervisor(person::Id),

    /// [`Order`]s placed by a [`Customer`].
    Customer(person::Id),

    /// [`Order`]s a [`Worker`] replied to.
    Worker(person::Id),
}

/// Number of registered [`Person`]s.
#[derive(Clone, Copy, Debug, Default, Display, Eq, From, Into, PartialEq)]
pub struct PeopleCount(u64);

/// Numbers of [`Order`]s in some [`order::Status`]es.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct OrderTally {
    /// Total number of [`Order`]s.
    pub total: u64,

    /// Number of [`order::Status::Open`] [`Order`]s.
    pub open: u64,

    /// Number of [`order::Status::Active`] [`Order`]s.
    pub active: u64,

    /// Number of [`order::Status::Fulfilled`] [`Order`]s.
    pub fulfilled: u64,
}

/// Sum of [`Detail::wager`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct WagerTally {
    /// Number of summed [`Detail`]s.
    pub details: u64,

    /// Sum of the [`Detail::wager`]s.
    pub total: Decimal,
}

impl WagerTally {
    /// Returns the average [`Detail::wager`], or zero if there are no
    /// [`Detail`]s.
    #[must_use]
    pub fn average(&self) -> Decimal {
        average(self.total, self.details)
    }
}

/// [`Reply`] along with its [`Detail`] and the [`order::Status`] of its
/// [`Order`].
#[derive(Clone, Debug)]
pub struct Engagement {
    /// The [`Reply`] itself.
    pub reply: Reply,

    /// [`Detail`] the [`Reply`] was made to.
    pub detail: Detail,

    /// [`order::Status`] of the [`Order`] the [`Detail`] belongs to.
    pub order_status: order::Status,
}

impl Engagement {
    /// Indicates whether the [`Worker`] has worked the shift.
    ///
    /// That's an approved [`Reply`] to a fulfilled [`Order`].
    #[must_use]
    pub fn is_worked(&self) -> bool {
        self.reply.status.is_approved()
            && self.order_status == order::Status::Fulfilled
    }
}

/// Totals of [`Engagement`]s.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Totals {
    /// Number of [`Reply`]s.
    pub replies: u64,

    /// Number of [`Reply`]s awaiting a review.
    pub pending: u64,

    /// Number of approved [`Reply`]s.
    pub approved: u64,

    /// Number of distinct [`Order`]s with approved [`Reply`]s.
    pub orders_with_approved: u64,

    /// Number of worked shifts.
    pub worked: u64,

    /// Amount paid for the worked shifts.
    pub amount: Decimal,

    /// Hours of the worked shifts.
    pub hours: Decimal,
}

impl Totals {
    /// Calculates [`Totals`] of the provided [`Engagement`]s.
    #[must_use]
    pub fn of<'e>(engagements: impl IntoIterator<Item = &'e Engagement>) -> Self {
        let mut orders = HashSet::new();
        let mut totals = Self::default();
        for e in engagements {
            totals.replies += 1;
            if e.reply.status == reply::Status::Created {
                totals.pending += 1;
            }
            if e.reply.status.is_approved() {
                totals.approved += 1;
                _ = orders.insert(e.detail.order_id);
            }
            if e.is_worked() {
                let hours = e.detail.hours();
                totals.worked += 1;
                totals.hours += hours;
                totals.amount += e.reply.wager * hours;
            }
        }
        totals.orders_with_approved = orders.len() as u64;
        totals
    }

    /// Returns the average hourly rate of the worked shifts, or zero if there
    /// are none.
    #[must_use]
    pub fn average_wager(&self) -> Decimal {
        if self.hours.is_zero() {
            return Decimal::ZERO;
        }
        self.amount / self.hours
    }
}

/// Divides the provided `total` by the `count`, returning zero if the `count`
/// is zero.
fn average(total: Decimal, count: u64) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    total / Decimal::from(count)
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use rust_decimal::Decimal;
    use time::macros::{date, time};

    use crate::domain::{
        order::{self, detail},
        person, reply, Detail, Reply,
    };

    use super::{Engagement, Totals, WagerTally};

    fn engagement(
        status: reply::Status,
        order_status: order::Status,
        end_at: time::Time,
    ) -> Engagement {
        let detail = Detail {
            id: detail::Id::new(),
            order_id: order::Id::new(),
            date: date!(2024 - 06 - 01),
            start_at: time!(22:00),
            end_at,
            position: detail::Position::Installer,
            gender: None,
            count: detail::Count::new(1).unwrap(),
            wager: Decimal::from(500),
            fee: Decimal::from(50),
            created_at: DateTime::UNIX_EPOCH.coerce(),
        };
        let mut reply = Reply::new(
            person::Id::new(),
            detail.id,
            Decimal::from(450),
            DateTime::UNIX_EPOCH.coerce(),
        );
        reply.status = status;
        Engagement {
            reply,
            detail,
            order_status,
        }
    }

    #[test]
    fn counts_only_worked_shifts_into_amount() {
        let engagements = [
            engagement(reply::Status::Paid, order::Status::Fulfilled, time!(02:00)),
            engagement(
                reply::Status::Accepted,
                order::Status::Fulfilled,
                time!(23:00),
            ),
            engagement(reply::Status::Accepted, order::Status::Active, time!(02:00)),
            engagement(reply::Status::Created, order::Status::Fulfilled, time!(02:00)),
            engagement(reply::Status::Dropped, order::Status::Fulfilled, time!(02:00)),
        ];

        let totals = Totals::of(&engagements);

        assert_eq!(totals.replies, 5);
        assert_eq!(totals.pending, 1);
        assert_eq!(totals.approved, 3);
        assert_eq!(totals.orders_with_approved, 3);
        assert_eq!(totals.worked, 2);
        assert_eq!(totals.hours, Decimal::from(5));
        assert_eq!(totals.amount, Decimal::from(450 * 5));
        assert_eq!(totals.average_wager(), Decimal::from(450));
    }

    #[test]
    fn averages_empty_as_zero() {
        assert_eq!(Totals::default().average_wager(), Decimal::ZERO);
        assert_eq!(WagerTally::default().average(), Decimal::ZERO);
        assert_eq!(
            WagerTally {
                details: 4,
                total: Decimal::from(1000),
            }
            .average(),
            Decimal::from(250),
        );
    }
}
