//! [`Query`] collection related to multiple [`Reply`]s.

use common::operations::{By, Select};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{order, reply, Person, Reply},
    infra::{database, Database},
    read,
    Service,
};
#[cfg(doc)]
use crate::domain::{person::Worker, Order};

use super::{DatabaseQuery, Query};

/// Queries a [`Reply`] by its [`reply::Id`].
pub type ById = DatabaseQuery<By<Option<Reply>, reply::Id>>;

/// Queries the earliest created [`reply::Status::Created`] [`Reply`].
pub type FirstUnapproved =
    DatabaseQuery<By<Option<Reply>, read::reply::FirstUnapproved>>;

/// Queries distinct [`Worker`]s having an approved [`Reply`] to an [`Order`].
pub type ApprovedWorkers =
    DatabaseQuery<By<Vec<Person>, read::reply::ApprovedWorkers>>;

/// [`Query`] for a page of the [`Reply`]s to an [`Order`], ordered by their
/// creation.
#[derive(Clone, Copy, Debug)]
pub struct Paginated {
    /// ID of the [`Order`] the [`Reply`]s are made to.
    pub order_id: order::Id,

    /// [`reply::Status`] of the [`Reply`]s, if any.
    pub status: Option<reply::Status>,

    /// Number of the requested page, starting from `1`.
    pub page: i64,

    /// Maximum number of [`Reply`]s on a page.
    ///
    /// [`None`] means all the [`Reply`]s after the page offset.
    pub size: Option<i64>,
}

impl<Db, Clk> Query<Paginated> for Service<Db, Clk>
where
    Db: Database<
        Select<By<read::reply::list::Page, read::reply::list::Selector>>,
        Ok = read::reply::list::Page,
        Err = Traced<database::Error>,
    >,
{
    type Ok = read::reply::list::Page;
    type Err = Traced<ExecutionError>;

    async fn execute(
        &self,
        Paginated {
            order_id,
            status,
            page,
            size,
        }: Paginated,
    ) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let arguments = read::reply::list::Arguments::new(page, size)
            .ok_or(E::InvalidArgument { page, size })
            .map_err(tracerr::wrap!())?;

        self.database()
            .execute(Select(By::<read::reply::list::Page, _>::new(
                read::reply::list::Selector {
                    arguments,
                    filter: read::reply::list::Filter { order_id, status },
                },
            )))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
    }
}

/// Error of [`Paginated`] [`Query`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    #[from]
    Db(database::Error),

    /// Pagination arguments are malformed.
    #[display("Invalid pagination: `page` = {page}, `size` = {size:?}")]
    InvalidArgument {
        /// Requested page number.
        page: i64,

        /// Requested page size.
        size: Option<i64>,
    },
}

#[cfg(test)]
mod spec {
    use common::DateTime;
    use time::{
        macros::{date, datetime, time},
        Duration,
    };

    use crate::{
        domain::{order, person::Gender, reply, Reply},
        fixture,
    };

    use crate::read::reply::FirstUnapproved as Unapproved;

    use super::{
        ApprovedWorkers, ExecutionError, FirstUnapproved, Paginated,
        Query as _,
    };

    #[tokio::test]
    async fn paginates_replies_of_order() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let other =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            12,
        )
        .await;
        let foreign = fixture::detail(
            db,
            other,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            12,
        )
        .await;

        // Stored in the reverse order of their creation.
        let mut ordered = vec![];
        for n in (0..12).rev() {
            let status = if n % 3 == 0 {
                reply::Status::Accepted
            } else {
                reply::Status::Created
            };
            let at = datetime!(2024-05-01 10:00) + Duration::minutes(n);
            let worker = fixture::worker(db, Gender::Male).await;
            let r = fixture::reply_at(
                db,
                worker,
                &detail,
                status,
                DateTime::from_primitive(at),
            )
            .await;
            _ = fixture::reply(db, worker, &foreign, status).await;
            ordered.push(r);
        }
        ordered.reverse();
        let ids = |replies: &[Reply]| {
            replies.iter().map(Reply::id).collect::<Vec<_>>()
        };
        let page = |page, size| Paginated {
            order_id: order,
            status: None,
            page,
            size,
        };

        let first = service.execute(page(1, Some(5))).await.unwrap();
        assert_eq!(ids(&first.nodes), ids(&ordered[0..5]));

        let second = service.execute(page(2, Some(5))).await.unwrap();
        assert_eq!(ids(&second.nodes), ids(&ordered[5..10]));

        let third = service.execute(page(3, Some(5))).await.unwrap();
        assert_eq!(ids(&third.nodes), ids(&ordered[10..]));

        let beyond = service.execute(page(4, Some(5))).await.unwrap();
        assert!(beyond.nodes.is_empty());

        let whole = service.execute(page(1, None)).await.unwrap();
        assert_eq!(ids(&whole.nodes), ids(&ordered));

        let accepted = service
            .execute(Paginated {
                status: Some(reply::Status::Accepted),
                ..page(2, Some(2))
            })
            .await
            .unwrap();
        let expected = ordered
            .iter()
            .filter(|r| r.status == reply::Status::Accepted)
            .skip(2)
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(ids(&accepted.nodes), ids(&expected));
    }

    #[tokio::test]
    async fn rejects_invalid_page() {
        let service = fixture::service(datetime!(2024-06-01 08:00));

        for (page, size) in [(0, Some(5)), (1, Some(-1))] {
            let err = service
                .execute(Paginated {
                    order_id: order::Id::new(),
                    status: None,
                    page,
                    size,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err.as_ref(), ExecutionError::InvalidArgument { .. }),
                "unexpected error: {err}",
            );
        }
    }

    #[tokio::test]
    async fn finds_unapproved_and_approved_workers() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            3,
        )
        .await;
        let (first, second, third) = (
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Female).await,
        );
        _ = fixture::reply(db, first, &detail, reply::Status::Accepted).await;
        _ = fixture::reply(db, second, &detail, reply::Status::Paid).await;
        let created =
            fixture::reply(db, third, &detail, reply::Status::Created).await;

        let unapproved = service
            .execute(FirstUnapproved::by(Unapproved {
                order_id: Some(order),
                worker_id: None,
            }))
            .await
            .unwrap();
        assert_eq!(unapproved, Some(created));

        let none = service
            .execute(FirstUnapproved::by(Unapproved {
                order_id: None,
                worker_id: Some(first),
            }))
            .await
            .unwrap();
        assert_eq!(none, None);

        let mut workers = service
            .execute(ApprovedWorkers::by(
                crate::read::reply::ApprovedWorkers(order),
            ))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect::<Vec<_>>();
        workers.sort();
        let mut expected = vec![first, second];
        expected.sort();
        assert_eq!(workers, expected);
    }

    #[tokio::test]
    async fn finds_earliest_created_unapproved_reply() {
        let service = fixture::service(datetime!(2024-06-01 08:00));
        let db = service.database();
        let customer = fixture::customer(db).await;
        let order =
            fixture::order(db, customer, None, order::Status::Open).await;
        let detail = fixture::detail(
            db,
            order,
            date!(2024 - 06 - 10),
            (time!(09:00), time!(18:00)),
            2,
        )
        .await;
        let mut workers = [
            fixture::worker(db, Gender::Male).await,
            fixture::worker(db, Gender::Male).await,
        ];
        workers.sort();
        let [lower, higher] = workers;

        // The higher ID is created earlier, so ID order would pick the
        // other one.
        let earliest = fixture::reply_at(
            db,
            higher,
            &detail,
            reply::Status::Created,
            DateTime::from_primitive(datetime!(2024-05-01 10:00)),
        )
        .await;
        _ = fixture::reply_at(
            db,
            lower,
            &detail,
            reply::Status::Created,
            DateTime::from_primitive(datetime!(2024-05-01 11:00)),
        )
        .await;

        let found = service
            .execute(FirstUnapproved::by(Unapproved {
                order_id: Some(order),
                worker_id: None,
            }))
            .await
            .unwrap();
        assert_eq!(found.map(|r| r.id()), Some(earliest.id()));
    }
}
