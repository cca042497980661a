//! [`Reply`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{Display, Error};
use rust_decimal::Decimal;

use crate::domain::{order::detail, person};
#[cfg(doc)]
use crate::domain::{order::Detail, person::Worker, Order};

/// Application of a [`Worker`] to a [`Detail`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    /// ID of the [`Worker`] who replied.
    pub worker_id: person::Id,

    /// ID of the [`Detail`] replied to.
    pub detail_id: detail::Id,

    /// Hourly rate offered to the [`Worker`].
    pub wager: Decimal,

    /// [`Status`] of this [`Reply`].
    pub status: Status,

    /// [`DateTime`] when this [`Reply`] was paid, if it was.
    pub paid_at: Option<PaymentDateTime>,

    /// [`DateTime`] when this [`Reply`] was created.
    pub created_at: CreationDateTime,
}

impl Reply {
    /// Creates a new [`Status::Created`] [`Reply`].
    #[must_use]
    pub fn new(
        worker_id: person::Id,
        detail_id: detail::Id,
        wager: Decimal,
        created_at: CreationDateTime,
    ) -> Self {
        Self {
            worker_id,
            detail_id,
            wager,
            status: Status::Created,
            paid_at: None,
            created_at,
        }
    }

    /// Returns [`Id`] of this [`Reply`].
    #[must_use]
    pub fn id(&self) -> Id {
        Id {
            worker_id: self.worker_id,
            detail_id: self.detail_id,
        }
    }

    /// Moves this [`Reply`] into [`Status::Accepted`].
    ///
    /// # Errors
    ///
    /// If this [`Reply`] is not [`Status::Created`].
    pub fn accept(&mut self) -> Result<(), Transition> {
        self.transit(Status::Accepted, &[Status::Created])
    }

    /// Moves this [`Reply`] into [`Status::Dropped`].
    ///
    /// Returns `false` if this [`Reply`] has been dropped already, leaving it
    /// untouched.
    ///
    /// # Errors
    ///
    /// If this [`Reply`] is [`Status::Paid`].
    pub fn dismiss(&mut self) -> Result<bool, Transition> {
        if self.status == Status::Dropped {
            return Ok(false);
        }
        self.transit(Status::Dropped, &[Status::Created, Status::Accepted])
            .map(|()| true)
    }

    /// Moves this [`Reply`] into [`Status::Paid`] at the provided
    /// [`DateTime`].
    ///
    /// # Errors
    ///
    /// If this [`Reply`] is not [`Status::Accepted`].
    pub fn pay(&mut self, at: PaymentDateTime) -> Result<(), Transition> {
        self.transit(Status::Paid, &[Status::Accepted])?;
        self.paid_at = Some(at);
        Ok(())
    }

    /// Moves this [`Reply`] into the provided [`Status`], if its current one
    /// is among the `allowed` ones.
    fn transit(
        &mut self,
        to: Status,
        allowed: &[Status],
    ) -> Result<(), Transition> {
        if !allowed.contains(&self.status) {
            return Err(Transition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// ID of a [`Reply`].
///
/// There is at most one [`Reply`] of a [`Worker`] to a [`Detail`].
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("{worker_id}:{detail_id}")]
pub struct Id {
    /// ID of the [`Worker`] who replied.
    pub worker_id: person::Id,

    /// ID of the [`Detail`] replied to.
    pub detail_id: detail::Id,
}

define_kind! {
    #[doc = "Status of a [`Reply`]."]
    enum Status {
        #[doc = "[`Reply`] awaits a review."]
        Created = 1,

        #[doc = "[`Reply`] is approved and occupies a slot of its [`Detail`]."]
        Accepted = 2,

        #[doc = "[`Reply`] is withdrawn or rejected."]
        Dropped = 3,

        #[doc = "[`Reply`] is paid out."]
        Paid = 4,
    }
}

impl Status {
    /// [`Status`]es of a [`Reply`] approved by the [`Order`] owner.
    pub const APPROVED: &'static [Self] = &[Self::Accepted, Self::Paid];

    /// [`Status`]es of a [`Reply`] still holding its [`Worker`].
    pub const HELD: &'static [Self] = &[Self::Created, Self::Accepted];

    /// [`Status`]es of a [`Reply`] not being dropped.
    pub const LIVE: &'static [Self] =
        &[Self::Created, Self::Accepted, Self::Paid];

    /// Indicates whether this [`Status`] is approved by the [`Order`] owner.
    #[must_use]
    pub fn is_approved(self) -> bool {
        Self::APPROVED.contains(&self)
    }

    /// Indicates whether this [`Status`] still holds a [`Worker`].
    #[must_use]
    pub fn is_held(self) -> bool {
        Self::HELD.contains(&self)
    }
}

/// Forbidden [`Status`] transition of a [`Reply`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`Reply` cannot move from `{from}` to `{to}`")]
pub struct Transition {
    /// Current [`Status`] of the [`Reply`].
    pub from: Status,

    /// Attempted [`Status`] of the [`Reply`].
    pub to: Status,
}

/// [`DateTime`] when a [`Reply`] was created.
pub type CreationDateTime = DateTimeOf<(Reply, unit::Creation)>;

/// [`DateTime`] when a [`Reply`] was paid.
pub type PaymentDateTime = DateTimeOf<(Reply, unit::Payment)>;

#[cfg(test)]
mod spec {
    use common::DateTime;
    use rust_decimal::Decimal;

    use crate::domain::{order::detail, person};

    use super::{Reply, Status, Transition};

    fn reply() -> Reply {
        Reply::new(
            person::Id::new(),
            detail::Id::new(),
            Decimal::from(450),
            DateTime::UNIX_EPOCH.coerce(),
        )
    }

    #[test]
    fn follows_happy_path() {
        let mut r = reply();
        assert_eq!(r.status, Status::Created);

        r.accept().unwrap();
        assert_eq!(r.status, Status::Accepted);

        let at = DateTime::from_unix_timestamp(1_700_000_000).unwrap();
        r.pay(at.coerce()).unwrap();
        assert_eq!(r.status, Status::Paid);
        assert_eq!(r.paid_at, Some(at.coerce()));
    }

    #[test]
    fn drops_idempotently() {
        let mut r = reply();
        r.accept().unwrap();

        assert_eq!(r.dismiss(), Ok(true));
        assert_eq!(r.status, Status::Dropped);
        assert_eq!(r.dismiss(), Ok(false));
        assert_eq!(r.status, Status::Dropped);
    }

    #[test]
    fn rejects_invalid_transitions() {
        let mut r = reply();
        assert_eq!(
            r.pay(DateTime::UNIX_EPOCH.coerce()),
            Err(Transition {
                from: Status::Created,
                to: Status::Paid,
            }),
        );

        r.dismiss().unwrap();
        assert_eq!(
            r.accept(),
            Err(Transition {
                from: Status::Dropped,
                to: Status::Accepted,
            }),
        );

        let mut paid = reply();
        paid.accept().unwrap();
        paid.pay(DateTime::UNIX_EPOCH.coerce()).unwrap();
        assert_eq!(
            paid.dismiss(),
            Err(Transition {
                from: Status::Paid,
                to: Status::Dropped,
            }),
        );
        assert_eq!(paid.accept().unwrap_err().from, Status::Paid);
    }
}
