//! [`Person`] definitions.

#[cfg(doc)]
use common::DateTime;
use common::{define_kind, unit, DateTimeOf};
use derive_more::{AsRef, Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Registered participant of the marketplace.
#[derive(Clone, Debug)]
pub struct Person {
    /// ID of this [`Person`].
    pub id: Id,

    /// [`Name`] of this [`Person`].
    pub name: Name,

    /// [`Role`] this [`Person`] acts in.
    pub role: Role,

    /// [`DateTime`] when this [`Person`] was registered.
    pub created_at: CreationDateTime,
}

impl Person {
    /// Returns the [`Worker`] profile of this [`Person`], if any.
    #[must_use]
    pub fn as_worker(&self) -> Option<&Worker> {
        match &self.role {
            Role::Worker(w) => Some(w),
            Role::Customer(_) | Role::Supervisor(_) => None,
        }
    }

    /// Returns the [`Customer`] profile this [`Person`] orders with, if any.
    ///
    /// A [`Supervisor`] orders on behalf of its proxy [`Customer`] profile.
    #[must_use]
    pub fn as_customer(&self) -> Option<&Customer> {
        match &self.role {
            Role::Customer(c) => Some(c),
            Role::Supervisor(s) => s.proxy.as_ref(),
            Role::Worker(_) => None,
        }
    }
}

/// ID of a [`Person`].
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

/// Name of a [`Person`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Name(String);

impl Name {
    /// Creates a new [`Name`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        Self::check(&name).then_some(Self(name))
    }

    /// Checks whether the given `name` is a valid [`Name`].
    fn check(name: impl AsRef<str>) -> bool {
        let name = name.as_ref();
        name.trim() == name && !name.is_empty() && name.len() <= 512
    }
}

impl FromStr for Name {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or("invalid `Name`")
    }
}

/// Role a [`Person`] acts in, along with its role-specific profile.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Role {
    /// [`Person`] taking shifts.
    Worker(Worker),

    /// [`Person`] placing orders.
    Customer(Customer),

    /// [`Person`] reviewing orders and replies.
    Supervisor(Supervisor),
}

impl Role {
    /// Assembles a [`Role`] out of its stored parts.
    ///
    /// [`None`] is returned if the provided parts don't match the [`Kind`]:
    /// - a [`Worker`] requires a [`Gender`] and no [`Company`];
    /// - a [`Customer`] has no [`Gender`] and may have a [`Company`];
    /// - a [`Supervisor`] has no [`Gender`] and may have a [`Company`] only
    ///   along with a proxy [`Customer`] profile.
    #[must_use]
    pub fn from_parts(
        kind: Kind,
        gender: Option<Gender>,
        company: Option<Company>,
        has_proxy: bool,
    ) -> Option<Self> {
        match kind {
            Kind::Worker => {
                let gender = gender.filter(|_| company.is_none() && !has_proxy)?;
                Some(Self::Worker(Worker { gender }))
            }
            Kind::Customer => (gender.is_none() && !has_proxy)
                .then_some(Self::Customer(Customer { company })),
            Kind::Supervisor => {
                if gender.is_some() || (company.is_some() && !has_proxy) {
                    return None;
                }
                Some(Self::Supervisor(Supervisor {
                    proxy: has_proxy.then_some(Customer { company }),
                }))
            }
        }
    }

    /// Returns the stored parts of this [`Role`].
    #[must_use]
    pub fn to_parts(&self) -> (Kind, Option<Gender>, Option<&Company>, bool) {
        match self {
            Self::Worker(w) => (Kind::Worker, Some(w.gender), None, false),
            Self::Customer(c) => {
                (Kind::Customer, None, c.company.as_ref(), false)
            }
            Self::Supervisor(s) => (
                Kind::Supervisor,
                None,
                s.proxy.as_ref().and_then(|c| c.company.as_ref()),
                s.proxy.is_some(),
            ),
        }
    }

    /// Returns [`Kind`] of this [`Role`].
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.to_parts().0
    }
}

/// Profile of a [`Person`] taking shifts.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Worker {
    /// [`Gender`] of this [`Worker`].
    pub gender: Gender,
}

/// Profile of a [`Person`] placing orders.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Customer {
    /// [`Company`] this [`Customer`] represents, if any.
    pub company: Option<Company>,
}

/// Profile of a [`Person`] supervising orders.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Supervisor {
    /// [`Customer`] profile this [`Supervisor`] places orders with, if any.
    pub proxy: Option<Customer>,
}

/// Company name of a [`Customer`].
#[derive(AsRef, Clone, Debug, Display, Eq, PartialEq)]
#[as_ref(str, String)]
#[cfg_attr(feature = "postgres", derive(FromSql, ToSql), postgres(transparent))]
pub struct Company(String);

impl Company {
    /// Creates a new [`Company`] if the given `name` is valid.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        (name.trim() == name && !name.is_empty() && name.len() <= 512)
            .then_some(Self(name))
    }
}

define_kind! {
    #[doc = "Kind of a [`Role`]."]
    enum Kind {
        #[doc = "[`Worker`] role."]
        Worker = 1,

        #[doc = "[`Customer`] role."]
        Customer = 2,

        #[doc = "[`Supervisor`] role."]
        Supervisor = 3,
    }
}

define_kind! {
    #[doc = "Gender of a [`Worker`]."]
    enum Gender {
        #[doc = "Male [`Worker`]."]
        Male = 1,

        #[doc = "Female [`Worker`]."]
        Female = 2,
    }
}

/// [`DateTime`] when a [`Person`] was registered.
pub type CreationDateTime = DateTimeOf<(Person, unit::Creation)>;

#[cfg(test)]
mod spec {
    use super::{Company, Customer, Gender, Kind, Role, Supervisor, Worker};

    #[test]
    fn assembles_role_from_matching_parts() {
        assert_eq!(
            Role::from_parts(Kind::Worker, Some(Gender::Female), None, false),
            Some(Role::Worker(Worker {
                gender: Gender::Female,
            })),
        );

        let company = Company::new("Acme").unwrap();
        assert_eq!(
            Role::from_parts(Kind::Customer, None, Some(company.clone()), false),
            Some(Role::Customer(Customer {
                company: Some(company.clone()),
            })),
        );
        assert_eq!(
            Role::from_parts(Kind::Supervisor, None, Some(company.clone()), true),
            Some(Role::Supervisor(Supervisor {
                proxy: Some(Customer {
                    company: Some(company),
                }),
            })),
        );
        assert_eq!(
            Role::from_parts(Kind::Supervisor, None, None, false),
            Some(Role::Supervisor(Supervisor { proxy: None })),
        );
    }

    #[test]
    fn rejects_mismatching_parts() {
        let company = Company::new("Acme").unwrap();

        assert!(Role::from_parts(Kind::Worker, None, None, false).is_none());
        assert!(Role::from_parts(
            Kind::Worker,
            Some(Gender::Male),
            Some(company.clone()),
            false,
        )
        .is_none());
        assert!(
            Role::from_parts(Kind::Customer, Some(Gender::Male), None, false)
                .is_none()
        );
        assert!(Role::from_parts(Kind::Customer, None, None, true).is_none());
        assert!(Role::from_parts(
            Kind::Supervisor,
            None,
            Some(company),
            false,
        )
        .is_none());
    }

    #[test]
    fn round_trips_parts() {
        let role = Role::Supervisor(Supervisor {
            proxy: Some(Customer { company: None }),
        });
        let (kind, gender, company, has_proxy) = role.to_parts();

        assert_eq!(
            Role::from_parts(kind, gender, company.cloned(), has_proxy),
            Some(role),
        );
    }
}
