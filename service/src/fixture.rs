//! Fixtures for [`Service`] tests.

use common::{
    operations::Insert,
    Clock, DateTime,
};
use rust_decimal::Decimal;
use time::{Date, PrimitiveDateTime, Time};

use crate::{
    domain::{
        order::{self, detail},
        person::{self, Customer, Gender, Role, Supervisor, Worker},
        reply, Detail, Order, Person, Reply,
    },
    infra::{Database as _, Memory},
    Config, Service,
};

/// [`Clock`] always returning the same [`DateTime`].
#[derive(Clone, Copy, Debug)]
pub(crate) struct FixedClock(pub(crate) DateTime);

impl Clock for FixedClock {
    fn now(&self) -> DateTime {
        self.0
    }
}

/// Creates a new [`Service`] over an empty [`Memory`] database, frozen at the
/// provided moment.
pub(crate) fn service(now: PrimitiveDateTime) -> Service<Memory, FixedClock> {
    Service::with_clock(
        Config::default(),
        Memory::new(),
        FixedClock(DateTime::from_primitive(now)),
    )
}

/// Registers a new [`Person`] in the provided [`Role`].
pub(crate) async fn person(db: &Memory, role: Role) -> person::Id {
    let person = Person {
        id: person::Id::new(),
        name: person::Name::new("Alex").unwrap(),
        role,
        created_at: DateTime::UNIX_EPOCH.coerce(),
    };
    let id = person.id;
    db.execute(Insert(person)).await.unwrap();
    id
}

/// Registers a new [`Worker`] of the provided [`Gender`].
pub(crate) async fn worker(db: &Memory, gender: Gender) -> person::Id {
    person(db, Role::Worker(Worker { gender })).await
}

/// Registers a new [`Customer`].
pub(crate) async fn customer(db: &Memory) -> person::Id {
    person(db, Role::Customer(Customer { company: None })).await
}

/// Registers a new [`Supervisor`] without a proxy [`Customer`] profile.
pub(crate) async fn supervisor(db: &Memory) -> person::Id {
    person(db, Role::Supervisor(Supervisor { proxy: None })).await
}

/// Places a new [`Order`] of the provided [`Customer`] in the provided
/// [`order::Status`].
pub(crate) async fn order(
    db: &Memory,
    customer_id: person::Id,
    supervisor_id: Option<person::Id>,
    status: order::Status,
) -> order::Id {
    let order = Order {
        id: order::Id::new(),
        customer_id,
        supervisor_id,
        status,
        address: order::Address::new("Main st. 1").unwrap(),
        created_at: DateTime::UNIX_EPOCH.coerce(),
    };
    let id = order.id;
    db.execute(Insert(order)).await.unwrap();
    id
}

/// Adds a new [`Detail`] to the [`Order`] with a `500` wager.
pub(crate) async fn detail(
    db: &Memory,
    order_id: order::Id,
    date: Date,
    (start_at, end_at): (Time, Time),
    count: i32,
) -> Detail {
    let detail = Detail {
        id: detail::Id::new(),
        order_id,
        date,
        start_at,
        end_at,
        position: detail::Position::Helper,
        gender: None,
        count: detail::Count::new(count).unwrap(),
        wager: Decimal::from(500),
        fee: Decimal::from(50),
        created_at: DateTime::UNIX_EPOCH.coerce(),
    };
    db.execute(Insert(detail.clone())).await.unwrap();
    detail
}

/// Stores a [`Reply`] of the [`Worker`] to the [`Detail`] in the provided
/// [`reply::Status`] directly.
pub(crate) async fn reply(
    db: &Memory,
    worker_id: person::Id,
    detail: &Detail,
    status: reply::Status,
) -> Reply {
    reply_at(db, worker_id, detail, status, DateTime::UNIX_EPOCH).await
}

/// Stores a [`Reply`] like [`reply()`] does, but created at the provided
/// [`DateTime`].
pub(crate) async fn reply_at(
    db: &Memory,
    worker_id: person::Id,
    detail: &Detail,
    status: reply::Status,
    created_at: DateTime,
) -> Reply {
    let mut reply = Reply::new(
        worker_id,
        detail.id,
        Decimal::from(450),
        created_at.coerce(),
    );
    reply.status = status;
    db.execute(Insert(reply.clone())).await.unwrap();
    reply
}
