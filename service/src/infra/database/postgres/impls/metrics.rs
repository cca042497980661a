//! Metrics-related [`Database`] implementations.

use common::operations::{By, Select};
use itertools::Itertools as _;
use postgres_types::ToSql;
use rust_decimal::Decimal;
use tracerr::Traced;

use crate::{
    domain::order,
    infra::{
        database::{self, postgres::Connection, Postgres},
        Database,
    },
    read::metrics::{
        Engagement, OrderTally, PeopleCount, Scope, Selector, WagerTally,
    },
};

use super::{
    order::{detail_from_row, DETAIL_COLUMNS},
    reply,
};

/// Renders SQL conditions selecting `orders o` falling into the provided
/// [`Selector`], pushing their parameters into the provided ones.
fn orders_filtering<'s>(
    selector: &'s Selector,
    ps: &mut Vec<&'s (dyn ToSql + Sync)>,
) -> String {
    let scoping = match &selector.scope {
        Scope::All => String::new(),
        Scope::Supervisor(id) => {
            ps.push(id);
            format!("AND o.supervisor_id = ${}::UUID", ps.len())
        }
        Scope::Customer(id) => {
            ps.push(id);
            format!("AND o.customer_id = ${}::UUID", ps.len())
        }
        Scope::Worker(id) => {
            ps.push(id);
            format!(
                "AND EXISTS (\
                     SELECT 1 \
                     FROM replies sr \
                     INNER JOIN order_details sd ON sd.id = sr.detail_id \
                     WHERE sd.order_id = o.id \
                       AND sr.worker_id = ${}::UUID\
                 )",
                ps.len(),
            )
        }
    };

    let window_idx = selector.window.as_ref().map(|w| {
        ps.push(w.start());
        ps.push(w.end());
        ps.len()
    });

    format!(
        "{scoping} {windowing}",
        windowing = window_idx.into_iter().format_with("", |idx, f| {
            f(&format_args!(
                "AND EXISTS (\
                     SELECT 1 \
                     FROM order_details wd \
                     WHERE wd.order_id = o.id \
                       AND wd.date BETWEEN ${}::DATE AND ${idx}::DATE\
                 )",
                idx - 1,
            ))
        }),
    )
}

/// Renders SQL condition selecting `order_details d` falling into the window
/// of the provided [`Selector`], pushing its parameters into the provided
/// ones.
fn details_windowing<'s>(
    selector: &'s Selector,
    ps: &mut Vec<&'s (dyn ToSql + Sync)>,
) -> String {
    selector
        .window
        .as_ref()
        .map(|w| {
            ps.push(w.start());
            ps.push(w.end());
            format!(
                "AND d.date BETWEEN ${}::DATE AND ${}::DATE",
                ps.len() - 1,
                ps.len(),
            )
        })
        .unwrap_or_default()
}

/// Converts the provided SQL `COUNT()` into a [`u64`].
fn count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

impl<C> Database<Select<By<PeopleCount, ()>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = PeopleCount;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        _: Select<By<PeopleCount, ()>>,
    ) -> Result<Self::Ok, Self::Err> {
        const SQL: &str = "\
            SELECT COUNT(*)::INT8 \
            FROM people";
        self.query_opt(SQL, &[])
            .await
            .map_err(tracerr::wrap!())
            .map(|row| count(row.expect("always exists").get(0)).into())
    }
}

impl<C> Database<Select<By<OrderTally, Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = OrderTally;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<OrderTally, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();
        let (open, active, fulfilled) = (
            order::Status::Open,
            order::Status::Active,
            order::Status::Fulfilled,
        );

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![&open, &active, &fulfilled];
        let filtering = orders_filtering(&selector, &mut ps);

        let sql = format!(
            "SELECT COUNT(*)::INT8 AS total, \
                    COUNT(*) FILTER (WHERE o.status = $1::INT2)::INT8 AS open, \
                    COUNT(*) FILTER (WHERE o.status = $2::INT2)::INT8 \
                        AS active, \
                    COUNT(*) FILTER (WHERE o.status = $3::INT2)::INT8 \
                        AS fulfilled \
             FROM orders o \
             WHERE TRUE {filtering}"
        );
        let row = self
            .query_opt(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists");

        Ok(OrderTally {
            total: count(row.get("total")),
            open: count(row.get("open")),
            active: count(row.get("active")),
            fulfilled: count(row.get("fulfilled")),
        })
    }
}

impl<C> Database<Select<By<WagerTally, Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = WagerTally;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<WagerTally, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let filtering = orders_filtering(&selector, &mut ps);
        let windowing = details_windowing(&selector, &mut ps);

        let sql = format!(
            "SELECT COUNT(d.id)::INT8 AS details, \
                    COALESCE(SUM(d.wager), 0)::NUMERIC AS total \
             FROM order_details d \
             INNER JOIN orders o ON o.id = d.order_id \
             WHERE TRUE {filtering} {windowing}"
        );
        let row = self
            .query_opt(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .expect("always exists");

        Ok(WagerTally {
            details: count(row.get("details")),
            total: row.get::<_, Decimal>("total"),
        })
    }
}

impl<C> Database<Select<By<Vec<Engagement>, Selector>>> for Postgres<C>
where
    C: Connection,
{
    type Ok = Vec<Engagement>;
    type Err = Traced<database::Error>;

    async fn execute(
        &self,
        Select(by): Select<By<Vec<Engagement>, Selector>>,
    ) -> Result<Self::Ok, Self::Err> {
        let selector = by.into_inner();

        let mut ps: Vec<&(dyn ToSql + Sync)> = vec![];
        let scoping = match &selector.scope {
            Scope::All => String::new(),
            Scope::Supervisor(id) => {
                ps.push(id);
                format!("AND o.supervisor_id = ${}::UUID", ps.len())
            }
            Scope::Customer(id) => {
                ps.push(id);
                format!("AND o.customer_id = ${}::UUID", ps.len())
            }
            Scope::Worker(id) => {
                ps.push(id);
                format!("AND r.worker_id = ${}::UUID", ps.len())
            }
        };
        let windowing = details_windowing(&selector, &mut ps);

        let sql = format!(
            "SELECT {replies}, {DETAIL_COLUMNS}, \
                    o.status AS order_status \
             FROM replies r \
             INNER JOIN order_details d ON d.id = r.detail_id \
             INNER JOIN orders o ON o.id = d.order_id \
             WHERE TRUE {scoping} {windowing}",
            replies = reply::COLUMNS,
        );
        Ok(self
            .query(&sql, ps.as_slice())
            .await
            .map_err(tracerr::wrap!())?
            .iter()
            .map(|row| Engagement {
                reply: reply::from_row(row),
                detail: detail_from_row(row),
                order_status: row.get("order_status"),
            })
            .collect())
    }
}
