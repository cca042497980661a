//! [`Reply`] read models definitions.

use std::ops::RangeInclusive;

use time::Date;

use crate::domain::{
    order::{self, detail},
    person, reply, Detail, Reply,
};
#[cfg(doc)]
use crate::domain::{person::Worker, Order};

/// [`Reply`] along with the [`Detail`] it was made to.
#[derive(Clone, Debug)]
pub struct Engagement {
    /// The [`Reply`] itself.
    pub reply: Reply,

    /// [`Detail`] the [`Reply`] was made to.
    pub detail: Detail,
}

/// Selector of a [`Worker`]'s [`Engagement`]s.
#[derive(Clone, Debug)]
pub struct Schedule {
    /// ID of the [`Worker`].
    pub worker_id: person::Id,

    /// [`reply::Status`]es of the selected [`Reply`]s.
    pub statuses: &'static [reply::Status],

    /// Range of [`Detail::date`]s of the selected [`Reply`]s.
    pub dates: RangeInclusive<Date>,
}

/// Selector of the earliest created [`reply::Status::Created`] [`Reply`].
///
/// Ties are broken by [`reply::Id`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FirstUnapproved {
    /// ID of the [`Order`] the [`Reply`] is made to, if any.
    pub order_id: Option<order::Id>,

    /// ID of the [`Worker`] who made the [`Reply`], if any.
    pub worker_id: Option<person::Id>,
}

/// Selector of distinct [`Worker`]s having an approved [`Reply`] to an
/// [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct ApprovedWorkers(pub order::Id);

/// Scope of [`Reply`]s dropped at once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DropScope {
    /// All the held [`Reply`]s of an [`Order`].
    AllOfOrder(order::Id),

    /// Unapproved [`Reply`]s of an [`Order`].
    UnapprovedOfOrder(order::Id),

    /// Unapproved [`Reply`]s of a [`Detail`].
    UnapprovedOfDetail(detail::Id),

    /// Unapproved [`Reply`]s of a [`Worker`] to [`Detail`]s on a date.
    UnapprovedOfWorkerOnDate {
        /// ID of the [`Worker`].
        worker_id: person::Id,

        /// [`Detail::date`] of the [`Reply`]s.
        date: Date,
    },
}

impl DropScope {
    /// Returns [`reply::Status`]es of [`Reply`]s in this [`DropScope`].
    #[must_use]
    pub fn statuses(&self) -> &'static [reply::Status] {
        match self {
            Self::AllOfOrder(_) => reply::Status::HELD,
            Self::UnapprovedOfOrder(_)
            | Self::UnapprovedOfDetail(_)
            | Self::UnapprovedOfWorkerOnDate { .. } => {
                &[reply::Status::Created]
            }
        }
    }
}

pub mod list {
    //! [`Reply`]s list definitions.

    use common::define_pagination;

    use crate::domain::{order, reply, Reply};
    #[cfg(doc)]
    use crate::domain::Order;

    define_pagination!(Reply, Filter);

    /// Filter for [`Selector`].
    ///
    /// [`Reply`]s are ordered by their creation [`DateTime`] and
    /// [`reply::Id`].
    ///
    /// [`DateTime`]: common::DateTime
    #[derive(Clone, Copy, Debug)]
    pub struct Filter {
        /// ID of the [`Order`] the [`Reply`]s are made to.
        pub order_id: order::Id,

        /// [`reply::Status`] of the [`Reply`]s, if any.
        pub status: Option<reply::Status>,
    }
}
