//! [`Database`] implementations.

use std::collections::{BTreeSet, HashMap, HashSet};

use common::operations::{
    By, Commit, Insert, Lock, Select, Transact, Update,
};
use tracerr::Traced;

use crate::{
    domain::{
        order::{self, detail},
        person, reply, Detail, Order, Person, Reply,
    },
    infra::{database, Database},
    read::{self, capacity::ApprovedCount, metrics::Scope},
};

use super::{Access, Error, Memory, NonTx, State, Tx};

impl State {
    /// Returns the [`ApprovedCount`] of the specified [`Detail`].
    fn approved_of(&self, detail_id: detail::Id) -> ApprovedCount {
        let count = self
            .replies
            .values()
            .filter(|r| {
                r.detail_id == detail_id && r.status == reply::Status::Accepted
            })
            .count();
        ApprovedCount::from(u32::try_from(count).unwrap_or(u32::MAX))
    }

    /// Returns the [`Detail`] and the [`Order`] the provided [`Reply`] is
    /// made to.
    fn target_of(&self, reply: &Reply) -> Option<(&Detail, &Order)> {
        let detail = self.details.get(&reply.detail_id)?;
        let order = self.orders.get(&detail.order_id)?;
        Some((detail, order))
    }

    /// Returns [`Detail`]s of the specified [`Order`] in their creation
    /// order.
    fn details_of(&self, order_id: order::Id) -> Vec<&Detail> {
        let mut details = self
            .details
            .values()
            .filter(|d| d.order_id == order_id)
            .collect::<Vec<_>>();
        details.sort_by_key(|d| (d.created_at, d.id));
        details
    }

    /// Indicates whether the provided [`Order`] falls into the provided
    /// [`read::metrics::Selector`].
    fn selects_order(
        &self,
        order: &Order,
        selector: &read::metrics::Selector,
    ) -> bool {
        let in_scope = match selector.scope {
            Scope::All => true,
            Scope::Supervisor(id) => order.supervisor_id == Some(id),
            Scope::Customer(id) => order.customer_id == id,
            Scope::Worker(id) => self.replies.values().any(|r| {
                r.worker_id == id
                    && self
                        .details
                        .get(&r.detail_id)
                        .is_some_and(|d| d.order_id == order.id)
            }),
        };
        in_scope
            && selector.window.as_ref().map_or(true, |w| {
                self.details
                    .values()
                    .any(|d| d.order_id == order.id && w.contains(&d.date))
            })
    }
}

impl Database<Transact> for Memory<NonTx> {
    type Ok = Memory<Tx>;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(Memory(self.0.begin().await))
    }
}

impl Database<Transact> for Memory<Tx> {
    type Ok = Self;
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Transact) -> Result<Self::Ok, Self::Err> {
        Ok(self.clone())
    }
}

impl Database<Commit> for Memory<Tx> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(&self, _: Commit) -> Result<Self::Ok, Self::Err> {
        self.commit().await.map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<Option<Person>, person::Id>>> for Memory<A> {
    type Ok = Option<Person>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Person>, person::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.people.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Insert<Person>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(person): Insert<Person>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| drop(s.people.insert(person.id, person)))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Lock<By<Person, person::Id>>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Person, person::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` holds the whole `State` exclusively.
        Ok(())
    }
}

impl<A: Access> Database<Select<By<Option<Order>, order::Id>>> for Memory<A> {
    type Ok = Option<Order>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Order>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.orders.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Insert<Order>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(order): Insert<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if !s.people.contains_key(&order.customer_id) {
                return Err(Error::ForeignKeyViolation("orders_customer_id_fkey"));
            }
            drop(s.orders.insert(order.id, order));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<A: Access> Database<Update<Order>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(order): Update<Order>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if let Some(o) = s.orders.get_mut(&order.id) {
                o.supervisor_id = order.supervisor_id;
                o.status = order.status;
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Lock<By<Order, order::Id>>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Order, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` holds the whole `State` exclusively.
        Ok(())
    }
}

impl<A: Access> Database<Select<By<Option<Detail>, detail::Id>>> for Memory<A> {
    type Ok = Option<Detail>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Detail>, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.details.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<Vec<Detail>, order::Id>>> for Memory<A> {
    type Ok = Vec<Detail>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Detail>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.details_of(id).into_iter().cloned().collect())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Insert<Detail>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(detail): Insert<Detail>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if !s.orders.contains_key(&detail.order_id) {
                return Err(Error::ForeignKeyViolation(
                    "order_details_order_id_fkey",
                ));
            }
            drop(s.details.insert(detail.id, detail));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<A: Access> Database<Lock<By<Detail, detail::Id>>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Detail, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` holds the whole `State` exclusively.
        Ok(())
    }
}

impl<A: Access> Database<Select<By<Option<Reply>, reply::Id>>> for Memory<A> {
    type Ok = Option<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reply>, reply::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.replies.get(&id).cloned())
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Insert<Reply>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Insert(reply): Insert<Reply>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if s.replies.contains_key(&reply.id()) {
                return Err(Error::UniqueViolation(
                    database::REPLY_ID_CONSTRAINT,
                ));
            }
            if !s.people.contains_key(&reply.worker_id) {
                return Err(Error::ForeignKeyViolation(
                    "replies_worker_id_fkey",
                ));
            }
            if !s.details.contains_key(&reply.detail_id) {
                return Err(Error::ForeignKeyViolation(
                    "replies_detail_id_fkey",
                ));
            }
            drop(s.replies.insert(reply.id(), reply));
            Ok(())
        })
        .await
        .map_err(tracerr::wrap!())?
        .map_err(tracerr::from_and_wrap!(=> database::Error))
    }
}

impl<A: Access> Database<Update<Reply>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Update(reply): Update<Reply>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            if let Some(r) = s.replies.get_mut(&reply.id()) {
                *r = reply;
            }
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Lock<By<Reply, reply::Id>>> for Memory<A> {
    type Ok = ();
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Lock<By<Reply, reply::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        // `Tx` holds the whole `State` exclusively.
        Ok(())
    }
}

impl<A: Access> Database<Select<By<ApprovedCount, detail::Id>>> for Memory<A> {
    type Ok = ApprovedCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<ApprovedCount, detail::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| s.approved_of(id))
            .await
            .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>>
    for Memory<A>
{
    type Ok = HashMap<detail::Id, ApprovedCount>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<HashMap<detail::Id, ApprovedCount>, order::Id>>,
    ) -> Result<Self::Ok, Self::Err> {
        let id = by.into_inner();
        self.with(|s| {
            s.details_of(id)
                .into_iter()
                .map(|d| (d.id, s.approved_of(d.id)))
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<Select<By<Vec<read::reply::Engagement>, read::reply::Schedule>>>
    for Memory<A>
{
    type Ok = Vec<read::reply::Engagement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::reply::Engagement>, read::reply::Schedule>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::Schedule {
            worker_id,
            statuses,
            dates,
        } = by.into_inner();

        self.with(|s| {
            let mut engagements = s
                .replies
                .values()
                .filter(|r| {
                    r.worker_id == worker_id && statuses.contains(&r.status)
                })
                .filter_map(|r| {
                    let detail = s.details.get(&r.detail_id)?;
                    dates.contains(&detail.date).then(|| {
                        read::reply::Engagement {
                            reply: r.clone(),
                            detail: detail.clone(),
                        }
                    })
                })
                .collect::<Vec<_>>();
            engagements.sort_by_key(|e| {
                (e.detail.date, e.detail.start_at, e.detail.id)
            });
            engagements
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<Select<By<Option<Reply>, read::reply::FirstUnapproved>>>
    for Memory<A>
{
    type Ok = Option<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Option<Reply>, read::reply::FirstUnapproved>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::FirstUnapproved {
            order_id,
            worker_id,
        } = by.into_inner();

        self.with(|s| {
            s.replies
                .values()
                .filter(|r| {
                    r.status == reply::Status::Created
                        && worker_id.map_or(true, |id| r.worker_id == id)
                        && order_id.map_or(true, |id| {
                            s.target_of(r).is_some_and(|(_, o)| o.id == id)
                        })
                })
                .min_by_key(|r| (r.created_at, r.detail_id, r.worker_id))
                .cloned()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<Select<By<read::reply::list::Page, read::reply::list::Selector>>>
    for Memory<A>
{
    type Ok = read::reply::list::Page;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::reply::list::Page, read::reply::list::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::list::Selector {
            arguments,
            filter: read::reply::list::Filter { order_id, status },
        } = by.into_inner();

        self.with(|s| {
            let mut replies = s
                .replies
                .values()
                .filter(|r| {
                    status.map_or(true, |st| r.status == st)
                        && s.target_of(r).is_some_and(|(_, o)| o.id == order_id)
                })
                .collect::<Vec<_>>();
            replies.sort_by_key(|r| (r.created_at, r.detail_id, r.worker_id));
            read::reply::list::Page::new(
                arguments,
                arguments.apply(replies).cloned(),
            )
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<Select<By<Vec<Person>, read::reply::ApprovedWorkers>>>
    for Memory<A>
{
    type Ok = Vec<Person>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Person>, read::reply::ApprovedWorkers>>,
    ) -> Result<Self::Ok, Self::Err> {
        let read::reply::ApprovedWorkers(order_id) = by.into_inner();

        self.with(|s| {
            s.replies
                .values()
                .filter(|r| {
                    r.status.is_approved()
                        && s.target_of(r).is_some_and(|(_, o)| o.id == order_id)
                })
                .map(|r| r.worker_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .filter_map(|id| s.people.get(&id).cloned())
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<Vec<Reply>, read::reply::DropScope>>>
    for Memory<A>
{
    type Ok = Vec<Reply>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Reply>, read::reply::DropScope>>,
    ) -> Result<Self::Ok, Self::Err> {
        use read::reply::DropScope as S;

        let scope = by.into_inner();
        let statuses = scope.statuses();

        self.with(|s| {
            s.replies
                .values()
                .filter(|r| statuses.contains(&r.status))
                .filter(|r| {
                    let Some((detail, order)) = s.target_of(r) else {
                        return false;
                    };
                    match scope {
                        S::AllOfOrder(id) | S::UnapprovedOfOrder(id) => {
                            order.id == id
                        }
                        S::UnapprovedOfDetail(id) => detail.id == id,
                        S::UnapprovedOfWorkerOnDate { worker_id, date } => {
                            r.worker_id == worker_id && detail.date == date
                        }
                    }
                })
                .cloned()
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access> Database<Select<By<read::metrics::PeopleCount, ()>>>
    for Memory<A>
{
    type Ok = read::metrics::PeopleCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<read::metrics::PeopleCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        self.with(|s| {
            read::metrics::PeopleCount::from(s.people.len() as u64)
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<By<read::metrics::OrderTally, read::metrics::Selector>>,
    > for Memory<A>
{
    type Ok = read::metrics::OrderTally;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::metrics::OrderTally, read::metrics::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();

        self.with(|s| {
            s.orders
                .values()
                .filter(|o| s.selects_order(o, &selector))
                .fold(read::metrics::OrderTally::default(), |mut t, o| {
                    t.total += 1;
                    match o.status {
                        order::Status::Open => t.open += 1,
                        order::Status::Active => t.active += 1,
                        order::Status::Fulfilled => t.fulfilled += 1,
                        order::Status::Created
                        | order::Status::Closed
                        | order::Status::Cancelled => {}
                    }
                    t
                })
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<By<read::metrics::WagerTally, read::metrics::Selector>>,
    > for Memory<A>
{
    type Ok = read::metrics::WagerTally;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<read::metrics::WagerTally, read::metrics::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();

        self.with(|s| {
            let orders = s
                .orders
                .values()
                .filter(|o| s.selects_order(o, &selector))
                .map(|o| o.id)
                .collect::<HashSet<_>>();
            s.details
                .values()
                .filter(|d| {
                    orders.contains(&d.order_id)
                        && selector
                            .window
                            .as_ref()
                            .map_or(true, |w| w.contains(&d.date))
                })
                .fold(read::metrics::WagerTally::default(), |mut t, d| {
                    t.details += 1;
                    t.total += d.wager;
                    t
                })
        })
        .await
        .map_err(tracerr::wrap!())
    }
}

impl<A: Access>
    Database<
        Select<
            By<Vec<read::metrics::Engagement>, read::metrics::Selector>,
        >,
    > for Memory<A>
{
    type Ok = Vec<read::metrics::Engagement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<
            By<Vec<read::metrics::Engagement>, read::metrics::Selector>,
        >,
    ) -> Result<Self::Ok, Self::Err> {
        let read::metrics::Selector { scope, window } = by.into_inner();

        self.with(|s| {
            s.replies
                .values()
                .filter_map(|r| {
                    let (detail, order) = s.target_of(r)?;
                    let in_scope = match scope {
                        Scope::All => true,
                        Scope::Supervisor(id) => order.supervisor_id == Some(id),
                        Scope::Customer(id) => order.customer_id == id,
                        Scope::Worker(id) => r.worker_id == id,
                    };
                    let in_window =
                        window.as_ref().map_or(true, |w| w.contains(&detail.date));
                    (in_scope && in_window).then(|| read::metrics::Engagement {
                        reply: r.clone(),
                        detail: detail.clone(),
                        order_status: order.status,
                    })
                })
                .collect()
        })
        .await
        .map_err(tracerr::wrap!())
    }
}
