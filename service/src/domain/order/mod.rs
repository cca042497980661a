//! [`Order`] definitions.

pub mod detail;

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, Error, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::person;
#[cfg(doc)]
use crate::domain::person::{Customer, Supervisor};

pub use self::detail::Detail;

/// Staffing order placed by a [`Customer`].
#[derive(Clone, Debug)]
pub struct Order {
    /// ID of this [`Order`].
    pub id: Id,

    /// ID of the [`Customer`] owning this [`Order`].
    pub customer_id: person::Id,

    /// ID of the [`Supervisor`] reviewing this [`Order`], if any.
    pub supervisor_id: Option<person::Id>,

    /// [`Status`] of this [`Order`].
    pub status: Status,

    /// [`Address`] where this [`Order`] takes place.
    pub address: Address,

    /// [`DateTime`] when this [`Order`] was created.
    pub created_at: CreationDateTime,
}

impl Order {
    /// Indicates whether this [`Order`] accepts new replies.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == Status::Open
    }

    /// Indicates whether a [`Supervisor`] may take this [`Order`] for a
    /// review.
    #[must_use]
    pub fn can_be_taken(&self) -> bool {
        self.status == Status::Created && self.supervisor_id.is_none()
    }

    /// Approves this [`Status::Created`] [`Order`] by the provided
    /// [`Supervisor`], so it accepts replies.
    ///
    /// The [`Supervisor`] is assigned to this [`Order`] unless it has one
    /// already.
    ///
    /// # Errors
    ///
    /// If this [`Order`] is not [`Status::Created`].
    pub fn approve(
        &mut self,
        supervisor_id: person::Id,
    ) -> Result<(), Transition> {
        self.transit(Status::Open, &[Status::Created])?;
        _ = self.supervisor_id.get_or_insert(supervisor_id);
        Ok(())
    }

    /// Moves this [`Order`] into the provided [`Status`].
    ///
    /// Returns the [`Status`] this [`Order`] has left.
    ///
    /// # Errors
    ///
    /// If the provided [`Status`] is not reachable from the current one:
    /// - [`Status::Open`] is reachable from [`Status::Closed`] only (see
    ///   [`Order::approve()`] for [`Status::Created`] ones);
    /// - [`Status::Closed`] is reachable from [`Status::Open`] only;
    /// - [`Status::Active`] is reachable from [`Status::Open`] or
    ///   [`Status::Closed`];
    /// - [`Status::Fulfilled`] is reachable from [`Status::Active`] only;
    /// - [`Status::Cancelled`] is reachable from any non-final [`Status`];
    /// - [`Status::Created`] is never reachable.
    pub fn change_status(&mut self, to: Status) -> Result<Status, Transition> {
        use Status as S;

        let from = self.status;
        let allowed: &[Status] = match to {
            S::Created => &[],
            S::Open => &[S::Closed],
            S::Closed => &[S::Open],
            S::Active => &[S::Open, S::Closed],
            S::Fulfilled => &[S::Active],
            S::Cancelled => &[S::Created, S::Open, S::Closed, S::Active],
        };
        self.transit(to, allowed)?;
        Ok(from)
    }

    /// Moves this [`Order`] into the provided [`Status`], if its current one
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

/// ID of an [`Order`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Address of an [`Order`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Address(String);

impl Address {
    /// Creates a new [`Address`] if the given `address` is valid.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Option<Self> {
        let address = address.into();
        Self::check(&address).then_some(Self(address))
    }

    /// Checks whether the given `address` is a valid [`Address`].
    fn check(address: impl AsRef<str>) -> bool {
        let address = address.as_ref();
        address.trim() == address
            && !address.is_empty()
            && address.len() <= 1024
    }
}

impl FromStr for Address {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Address`")
    }
}

define_kind! {
    #[doc = "Status of an [`Order`]."]
    enum Status {
        #[doc = "[`Order`] is created and awaits a review."]
        Created = 1,

        #[doc = "[`Order`] accepts replies."]
        Open = 2,

        #[doc = "[`Order`] doesn't accept replies anymore."]
        Closed = 3,

        #[doc = "[`Order`] is being performed."]
        Active = 4,

        #[doc = "[`Order`] is cancelled."]
        Cancelled = 5,

        #[doc = "[`Order`] is completed."]
        Fulfilled = 6,
    }
}

/// Forbidden [`Status`] transition of an [`Order`].
#[derive(Clone, Copy, Debug, Display, Eq, Error, PartialEq)]
#[display("`Order` cannot move from `{from}` to `{to}`")]
pub struct Transition {
    /// Current [`Status`] of the [`Order`].
    pub from: Status,

    /// Attempted [`Status`] of the [`Order`].
    pub to: Status,
}

/// [`DateTime`] when an [`Order`] was created.
pub type CreationDateTime = DateTimeOf<(Order, unit::Creation)>;

#[cfg(test)]
mod spec {
    use common::DateTime;

    use crate::domain::person;

    use super::{Address, Id, Order, Status, Transition};

    fn order(status: Status) -> Order {
        Order {
            id: Id::new(),
            customer_id: person::Id::new(),
            supervisor_id: None,
            status,
            address: Address::new("Main st. 1").unwrap(),
            created_at: DateTime::UNIX_EPOCH.coerce(),
        }
    }

    #[test]
    fn follows_lifecycle() {
        let supervisor = person::Id::new();
        let mut o = order(Status::Created);
        assert!(o.can_be_taken());

        o.approve(supervisor).unwrap();
        assert_eq!(o.status, Status::Open);
        assert_eq!(o.supervisor_id, Some(supervisor));
        assert!(!o.can_be_taken());

        for (to, from) in [
            (Status::Closed, Status::Open),
            (Status::Open, Status::Closed),
            (Status::Active, Status::Open),
            (Status::Fulfilled, Status::Active),
        ] {
            assert_eq!(o.change_status(to), Ok(from));
            assert_eq!(o.status, to);
        }
    }

    #[test]
    fn keeps_assigned_supervisor_on_approval() {
        let (assigned, approving) = (person::Id::new(), person::Id::new());
        let mut o = order(Status::Created);
        o.supervisor_id = Some(assigned);

        o.approve(approving).unwrap();
        assert_eq!(o.supervisor_id, Some(assigned));
    }

    #[test]
    fn rejects_forbidden_transitions() {
        for (from, to) in [
            (Status::Created, Status::Open),
            (Status::Created, Status::Closed),
            (Status::Created, Status::Active),
            (Status::Open, Status::Open),
            (Status::Open, Status::Fulfilled),
            (Status::Closed, Status::Closed),
            (Status::Active, Status::Open),
            (Status::Active, Status::Closed),
            (Status::Fulfilled, Status::Cancelled),
            (Status::Cancelled, Status::Cancelled),
            (Status::Cancelled, Status::Open),
            (Status::Open, Status::Created),
        ] {
            let mut o = order(from);
            assert_eq!(o.change_status(to), Err(Transition { from, to }));
            assert_eq!(o.status, from, "`{from}` -> `{to}` changed status");
        }

        for status in [Status::Open, Status::Cancelled] {
            let mut o = order(status);
            assert_eq!(
                o.approve(person::Id::new()),
                Err(Transition {
                    from: status,
                    to: Status::Open,
                }),
            );
            assert_eq!(o.supervisor_id, None);
        }
    }

    #[test]
    fn cancels_from_any_non_final_status() {
        for from in [
            Status::Created,
            Status::Open,
            Status::Closed,
            Status::Active,
        ] {
            let mut o = order(from);
            assert_eq!(o.change_status(Status::Cancelled), Ok(from));
            assert_eq!(o.status, Status::Cancelled);
        }
    }
}
