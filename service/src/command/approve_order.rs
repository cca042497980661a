//! [`Command`] for approving a reviewed [`Order`].

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{
        order::{self, Transition},
        person, Order, Person,
    },
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::person::Supervisor;

use super::Command;

/// [`Command`] for approving an [`order::Status::Created`] [`Order`], so it
/// starts accepting replies.
///
/// The approving [`Supervisor`] is assigned to the [`Order`] unless it has
/// one already.
#[derive(Clone, Copy, Debug)]
pub struct ApproveOrder {
    /// ID of the [`Order`] to approve.
    pub order_id: order::Id,

    /// ID of the approving [`Supervisor`].
    pub supervisor_id: person::Id,
}

impl<Db, Clk> Command<ApproveOrder> for Service<Db, Clk>
where
    Db: Database<
            Select<By<Option<Person>, person::Id>>,
            Ok = Option<Person>,
            Err = Traced<database::Error>,
        > + Database<Transact, Err = Traced<database::Error>>,
    Transacted<Db>: Database<
            Select<By<Option<Order>, order::Id>>,
            Ok = Option<Order>,
            Err = Traced<database::Error>,
        > + Database<Lock<By<Order, order::Id>>, Err = Traced<database::Error>>
        + Database<Update<Order>, Err = Traced<database::Error>>
        + Database<Commit, Err = Traced<database::Error>>,
{
    type Ok = Order;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: ApproveOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let ApproveOrder {
            order_id,
            supervisor_id,
        } = cmd;

        self.database()
            .execute(Select(By::<Option<Person>, _>::new(supervisor_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .filter(|p| p.role.kind() == person::Kind::Supervisor)
            .ok_or(E::SupervisorNotExists(supervisor_id))
            .map_err(tracerr::wrap!())
            .map(drop)?;

        let tx = self
            .database()
            .execute(Transact)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?;
        tx.execute(Lock(By::<Order, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        let mut order = tx
            .execute(Select(By::<Option<Order>, _>::new(order_id)))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))?
            .ok_or(E::OrderNotExists(order_id))
            .map_err(tracerr::wrap!())?;
        order
            .approve(supervisor_id)
            .map_err(E::InvalidTransition)
            .map_err(tracerr::wrap!())?;

        tx.execute(Update(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`Order(id: {order_id})` is approved by \
             `Supervisor(id: {supervisor_id})`",
        );

        Ok(order)
    }
}

/// Error of [`ApproveOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] is not awaiting an approval.
    #[display("Cannot approve `Order`: {_0}")]
    InvalidTransition(#[error(not(source))] Transition),

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Supervisor`] with the provided ID does not exist.
    #[display("`Supervisor(id: {_0})` does not exist")]
    SupervisorNotExists(#[error(not(source))] person::Id),
}

#[cfg(test)]
mod spec {
    use time::macros::datetime;

    use crate::{
        domain::{
            order::{self, Transition},
            person::Gender,
        },
        fixture,
        query::order as orders,
    };

    use super::{ApproveOrder, Command as _, ExecutionError};

    #[tokio::test]
    async fn opens_order_assigning_supervisor() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let supervisor = fixture::supervisor(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Created).await;

        let approved = service
            .execute(ApproveOrder {
                order_id: order,
                supervisor_id: supervisor,
            })
            .await
            .unwrap();
        assert_eq!(approved.status, order::Status::Open);
        assert_eq!(approved.supervisor_id, Some(supervisor));

        let stored = service
            .execute(orders::ById::by(order))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_open());
        assert_eq!(stored.supervisor_id, Some(supervisor));
    }

    #[tokio::test]
    async fn keeps_assigned_supervisor() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let (assigned, approving) = (
            fixture::supervisor(db).await,
            fixture::supervisor(db).await,
        );
        let order = fixture::order(
            db,
            customer,
            Some(assigned),
            order::Status::Created,
        )
        .await;

        let approved = service
            .execute(ApproveOrder {
                order_id: order,
                supervisor_id: approving,
            })
            .await
            .unwrap();
        assert_eq!(approved.supervisor_id, Some(assigned));
    }

    #[tokio::test]
    async fn approves_created_orders_only() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let supervisor = fixture::supervisor(db).await;

        for from in [order::Status::Open, order::Status::Cancelled] {
            let order = fixture::order(db, customer, None, from).await;
            let expected = Transition {
                from,
                to: order::Status::Open,
            };

            let err = service
                .execute(ApproveOrder {
                    order_id: order,
                    supervisor_id: supervisor,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(
                    err.as_ref(),
                    ExecutionError::InvalidTransition(t) if *t == expected,
                ),
                "unexpected error: {err}",
            );
        }
    }

    #[tokio::test]
    async fn errors_on_unknown_targets() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let worker = fixture::worker(db, Gender::Male).await;
        let supervisor = fixture::supervisor(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Created).await;

        let err = service
            .execute(ApproveOrder {
                order_id: order,
                supervisor_id: worker,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::SupervisorNotExists(id) if *id == worker,
        ));

        let missing = order::Id::new();
        let err = service
            .execute(ApproveOrder {
                order_id: missing,
                supervisor_id: supervisor,
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_ref(),
            ExecutionError::OrderNotExists(id) if *id == missing,
        ));
    }
}
