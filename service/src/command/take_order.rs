//! [`Command`] for taking an [`Order`] for a review.

use common::operations::{By, Commit, Lock, Select, Transact, Transacted, Update};
use derive_more::{Display, Error, From};
use tracerr::Traced;
use tracing as log;

use crate::{
    domain::{order, person, Order, Person},
    infra::{database, Database},
    Service,
};
#[cfg(doc)]
use crate::domain::person::Supervisor;

use super::Command;

/// [`Command`] for assigning a [`Supervisor`] to review an
/// [`order::Status::Created`] [`Order`] nobody has taken yet.
#[derive(Clone, Copy, Debug)]
pub struct TakeOrder {
    /// ID of the [`Order`] to take.
    pub order_id: order::Id,

    /// ID of the [`Supervisor`] taking the [`Order`].
    pub supervisor_id: person::Id,
}

impl<Db, Clk> Command<TakeOrder> for Service<Db, Clk>
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

    async fn execute(&self, cmd: TakeOrder) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let TakeOrder {
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

        // Avoid two `Supervisor`s taking the same `Order` concurrently.
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
        if !order.can_be_taken() {
            return Err(tracerr::new!(E::NotTakeable {
                order_id,
                status: order.status,
                supervisor_id: order.supervisor_id,
            }));
        }
        order.supervisor_id = Some(supervisor_id);

        tx.execute(Update(order.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;
        tx.execute(Commit)
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        log::debug!(
            "`Order(id: {order_id})` is taken by \
             `Supervisor(id: {supervisor_id})`",
        );

        Ok(order)
    }
}

/// Error of [`TakeOrder`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// [`Order`] is reviewed already or has a [`Supervisor`] assigned.
    #[display(
        "`Order(id: {order_id})` cannot be taken: it is `{status}` with \
         `Supervisor(id: {supervisor_id:?})`"
    )]
    NotTakeable {
        /// ID of the [`Order`].
        order_id: order::Id,

        /// Current [`order::Status`] of the [`Order`].
        status: order::Status,

        /// ID of the [`Supervisor`] assigned to the [`Order`], if any.
        supervisor_id: Option<person::Id>,
    },

    /// [`Order`] with the provided ID does not exist.
    #[display("`Order(id: {_0})` does not exist")]
    OrderNotExists(#[error(not(source))] order::Id),

    /// [`Supervisor`] with the provided ID does not exist.
    #[display("`Supervisor(id: {_0})` does not exist")]
    SupervisorNotExists(#[error(not(source))] person::Id),
}
