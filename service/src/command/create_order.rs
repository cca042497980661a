//! [`Command`] for creating a new [`Order`].

use std::time::Duration;

use common::{
    operations::{By, Commit, Insert, Select, Transact, Transacted},
    Clock,
};
use derive_more::{Display, Error, From};
use rust_decimal::Decimal;
use time::{Date, Time};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        order::{self, detail},
        person, Detail, Order, Person,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::person::{Customer, Supervisor};

use super::Command;

/// [`Command`] for creating a new [`Order`] along with its [`Detail`]s.
#[derive(Clone, Debug)]
pub struct CreateOrder {
    /// ID of the [`Customer`] placing the [`Order`].
    ///
    /// A [`Supervisor`] having a proxy [`Customer`] profile may place
    /// [`Order`]s too.
    pub customer_id: person::Id,

    /// ID of the [`Supervisor`] reviewing the [`Order`], if any.
    pub supervisor_id: Option<person::Id>,

    /// [`order::Address`] of the [`Order`].
    pub address: order::Address,

    /// [`NewDetail`]s of the [`Order`], in their creation order.
    pub details: Vec<NewDetail>,
}

/// [`Detail`] of a new [`Order`].
#[derive(Clone, Copy, Debug)]
pub struct NewDetail {
    /// Date of the shift.
    pub date: Date,

    /// Time the shift starts at.
    pub start_at: Time,

    /// Time the shift ends at, wrapping past midnight if before
    /// [`NewDetail::start_at`].
    pub end_at: Time,

    /// Required [`detail::Position`].
    pub position: detail::Position,

    /// Required [`person::Gender`], if any.
    pub gender: Option<person::Gender>,

    /// Number of required workers.
    pub count: i32,

    /// Hourly rate of the shift.
    pub wager: Decimal,
}

/// Output of the [`CreateOrder`] [`Command`].
#[derive(Clone, Debug)]
pub struct Output {
    /// Created [`Order`].
    pub order: Order,

    /// Created [`Detail`]s of the [`Order`].
    pub details: Vec<Detail>,
}

impl<Db, Clk> Command<CreateOrder> for Service<Db, Clk>
where
    Clk: Clock,
    Db: Database<
            Select<By<Option<Person>, person::Id>>,
            Ok = Option<Person>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<Insert<Order>, Err = Traced<database::Error>>
        + Database<Insert<Detail>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Output;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreateOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreateOrder {
            customer_id,
            supervisor_id,
            address,
            details,
        } = cmd;

        if details.is_empty() {
            return Err(tracerr::new!(E::NoDetails));
        }

        self.database()
            .execute(Select(By::<Option<Person>, _>::new(customer_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.as_customer().is_some())
            .ok_or(E::CustomerNotExists(customer_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        if let Some(id) = supervisor_id {
            self.database()
                .execute(Select(By::<Option<Person>, _>::new(id)))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))?
                .filter(|p| p.role.kind() == person::Kind::Supervisor)
                .ok_or(E::SupervisorNotExists(id))
                .map_err(tracerr::wrap!())
                .map(drop)?;
        }

        let now = self.now();
        let order = Order {
            id: order::Id::new(),
            customer_id,
            supervisor_id,
            status: order::Status::Created,
            address,
            created_at: now.coerce(),
        };

        let details = details
            .into_iter()
            .zip(0..)
            .map(|(d, n)| {
                let count = detail::Count::new(d.count)
                    .ok_or(E::InvalidCount(d.count))
                    .map_err(tracerr::wrap!())?;
                if d.wager <= Decimal::ZERO {
                    return Err(tracerr::new!(E::InvalidWager(d.wager)));
                }
                Ok(Detail {
                    id: detail::Id::new(),
                    order_id: order.id,
                    date: d.date,
                    start_at: d.start_at,
                    end_at: d.end_at,
                    position: d.position,
                    gender: d.gender,
                    count,
                    wager: d.wager,
                    fee: self.config().fee(d.wager),
                    // Keeps the `Detail`s ordered as provided.
                    created_at: (now + Duration::from_micros(n)).coerce(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Insert(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        for detail in &details {
            tx.execute(Insert(detail.clone()))
                .await
                .map_err(tracerr::map_from_and_wrap!(=> E))
                .map(drop)?;
        }
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`Order(id: {})` is created with {} `Detail`s",
            order.id,
            details.len(),
        );

        Ok(Output { order, details })
    }
}

/// Error of [`CreateOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Customer`] with the provided ID does not exist.
    #[display("`Customer(id: {_0})` does not exist")]
    CustomerNotExists(#[error(not(source))] person::Id),

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Detail`] requires less than a single worker.
    #[display("`{_0}` is not a valid `Detail` count")]
    InvalidCount(#[error(not(source))] i32),

    /// [`Detail`] wager is not positive.
    #[display("`{_0}` wager is not positive")]
    InvalidWager(#[error(not(source))] Decimal),

    /// No [`Detail`]s provided.
    #[display("`Order` must have at least one `Detail`")]
    NoDetails,

    /// [`Supervisor`] with the provided ID does not exist.
    #[display("`Supervisor(id: {_0})` does not exist")]
    SupervisorNotExists(#[error(not(source))] person::Id),
}

#[cfg(test)]
mod spec {
    use rust_decimal::Decimal;
    use time::macros::{date, datetime, time};

    use crate::{
        domain::{
            order::{self, detail},
            person::Gender,
        },
        fixture,
        query::order as orders,
    };

    use super::{Command as _, CreateOrder, ExecutionError, NewDetail};

    fn new_detail(count: i32, wager: i64) -> NewDetail {
        NewDetail {
            date: date!(2024 - 06 - 10),
            start_at: time!(09:00),
            end_at: time!(18:00),
            position: detail::Position::Installer,
            gender: None,
            count,
            wager: Decimal::from(wager),
        }
    }

    #[tokio::test]
    async fn creates_order_with_details_in_order() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let supervisor = fixture::supervisor(db).await;

        let out = service
            .execute(CreateOrder {
                customer_id: customer,
                supervisor_id: Some(supervisor),
                address: order::Address::new("Main st. 1").unwrap(),
                details: vec![new_detail(2, 500), new_detail(1, 333)],
            })
            .await
            .unwrap();

        assert_eq!(out.order.status, order::Status::Created);
        assert_eq!(out.order.supervisor_id, Some(supervisor));
        assert_eq!(out.details[0].fee, Decimal::from(50));
        assert_eq!(out.details[1].fee, Decimal::from(34));

        let stored = service
            .execute(orders::Details::by(out.order.id))
            .await
            .unwrap();
        assert_eq!(
            stored.iter().map(|d| d.id).collect::<Vec<_>>(),
            out.details.iter().map(|d| d.id).collect::<Vec<_>>(),
        );
    }

    #[tokio::test]
    async fn validates_order() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let worker = fixture::worker(db, Gender::Male).await;
        let cmd = |customer_id, supervisor_id, details| CreateOrder {
            customer_id,
            supervisor_id,
            address: order::Address::new("Main st. 1").unwrap(),
            details,
        };

        let err = service
            .execute(cmd(customer, None, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::NoDetails));

        let err = service
            .execute(cmd(customer, None, vec![new_detail(0, 500)]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidCount(0)));

        let err = service
            .execute(cmd(customer, None, vec![new_detail(1, -5)]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::InvalidWager(_)));

        let err = service
            .execute(cmd(worker, None, vec![new_detail(1, 500)]))
            .await
            .unwrap_err();
        assert!(matches!(err.as_ref(), ExecutionError::CustomerNotExists(_)));

        let err = service
            .execute(cmd(customer, Some(worker), vec![new_detail(1, 500)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SupervisorNotExists(_),
        ));
    }
}
