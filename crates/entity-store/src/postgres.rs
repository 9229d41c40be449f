use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    Address, Association, Delivery, DeliveryId, EntityStoreError, FetchPlan, Member, MemberId,
    Order, OrderId, OrderRecord, OrderSearch, OrderStatus, OrderSummaryRow, QueryKind, Result,
    store::EntityStore,
};

/// PostgreSQL-backed entity store implementation.
#[derive(Clone)]
pub struct PostgresEntityStore {
    pool: PgPool,
}

impl PostgresEntityStore {
    /// Selects the columns of an order summary and nothing else.
    ///
    /// `$1` is the status filter and `$2` the literal member name fragment;
    /// either may be NULL.
    pub const ORDER_SUMMARIES_QUERY: &str = r#"
        SELECT o.id, m.name, o.order_date, o.status, d.city, d.street, d.zipcode
        FROM orders o
        LEFT JOIN member m ON m.id = o.member_id
        LEFT JOIN delivery d ON d.id = o.delivery_id
        WHERE ($1::text IS NULL OR o.status = $1)
          AND ($2::text IS NULL OR strpos(m.name, $2) > 0)
        ORDER BY o.id ASC
    "#;

    /// Creates a new PostgreSQL entity store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and creates a store over the new pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| EntityStoreError::Unavailable(e.to_string()))?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a member row.
    pub async fn insert_member(&self, member: &Member) -> Result<()> {
        sqlx::query("INSERT INTO member (id, name) VALUES ($1, $2)")
            .bind(member.id.as_i64())
            .bind(&member.name)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts a delivery row.
    pub async fn insert_delivery(&self, delivery: &Delivery) -> Result<()> {
        sqlx::query("INSERT INTO delivery (id, city, street, zipcode) VALUES ($1, $2, $3, $4)")
            .bind(delivery.id.as_i64())
            .bind(&delivery.address.city)
            .bind(&delivery.address.street)
            .bind(&delivery.address.zipcode)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts an order row.
    pub async fn insert_order(&self, order: &OrderRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, member_id, delivery_id, order_date, status)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id.as_i64())
        .bind(order.member_id.as_i64())
        .bind(order.delivery_id.as_i64())
        .bind(order.order_date)
        .bind(order.status.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Looks up the key an order summary failed to join on.
    async fn dangling_reference(
        &self,
        order_id: OrderId,
        association: &'static str,
    ) -> Result<EntityStoreError> {
        let column = match association {
            "member" => "member_id",
            _ => "delivery_id",
        };
        let row = sqlx::query("SELECT member_id, delivery_id FROM orders WHERE id = $1")
            .bind(order_id.as_i64())
            .fetch_one(&self.pool)
            .await?;
        Ok(EntityStoreError::DanglingReference {
            order_id,
            association,
            id: row.try_get(column)?,
        })
    }

    fn record(kind: QueryKind) {
        metrics::counter!("entity_store_queries_total", "kind" => kind.as_str()).increment(1);
        tracing::debug!(kind = kind.as_str(), "entity store query");
    }

    fn row_to_order(row: &PgRow, plan: FetchPlan) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let record = OrderRecord {
            id: OrderId::new(row.try_get("id")?),
            member_id: MemberId::new(row.try_get("member_id")?),
            delivery_id: DeliveryId::new(row.try_get("delivery_id")?),
            order_date: row.try_get::<NaiveDateTime, _>("order_date")?,
            status: status.parse()?,
        };
        let mut order = Order::unresolved(&record);

        if plan == FetchPlan::JoinMemberDelivery {
            if let Some(name) = row.try_get::<Option<String>, _>("member_name")? {
                order.member = Association::Resolved(Member {
                    id: record.member_id,
                    name,
                });
            }
            if let Some(address) = Self::row_to_address(row)? {
                order.delivery = Association::Resolved(Delivery {
                    id: record.delivery_id,
                    address,
                });
            }
        }

        Ok(order)
    }

    /// Reads the left-joined delivery columns; `None` when no delivery row
    /// matched.
    fn row_to_address(row: &PgRow) -> Result<Option<Address>> {
        let joined: Option<i64> = row.try_get("joined_delivery_id")?;
        if joined.is_none() {
            return Ok(None);
        }
        Ok(Some(Address {
            city: row.try_get("city")?,
            street: row.try_get("street")?,
            zipcode: row.try_get("zipcode")?,
        }))
    }
}

#[async_trait]
impl EntityStore for PostgresEntityStore {
    async fn find_orders(&self, search: &OrderSearch, plan: FetchPlan) -> Result<Vec<Order>> {
        let (kind, sql) = match plan {
            FetchPlan::Lazy => (
                QueryKind::Orders,
                r#"
                SELECT o.id, o.member_id, o.delivery_id, o.order_date, o.status
                FROM orders o
                WHERE ($1::text IS NULL OR o.status = $1)
                  AND ($2::text IS NULL OR EXISTS (
                        SELECT 1 FROM member m
                        WHERE m.id = o.member_id AND strpos(m.name, $2) > 0))
                ORDER BY o.id ASC
                "#,
            ),
            FetchPlan::JoinMemberDelivery => (
                QueryKind::OrdersJoinFetch,
                r#"
                SELECT o.id, o.member_id, o.delivery_id, o.order_date, o.status,
                       m.name AS member_name,
                       d.id AS joined_delivery_id, d.city, d.street, d.zipcode
                FROM orders o
                LEFT JOIN member m ON m.id = o.member_id
                LEFT JOIN delivery d ON d.id = o.delivery_id
                WHERE ($1::text IS NULL OR o.status = $1)
                  AND ($2::text IS NULL OR strpos(m.name, $2) > 0)
                ORDER BY o.id ASC
                "#,
            ),
        };
        Self::record(kind);

        let rows = sqlx::query(sql)
            .bind(search.status.map(|s| s.as_str()))
            .bind(search.member_name.as_deref())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(|row| Self::row_to_order(row, plan)).collect()
    }

    async fn find_member(&self, id: MemberId) -> Result<Option<Member>> {
        Self::record(QueryKind::Member);

        let row = sqlx::query("SELECT id, name FROM member WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<Member> {
            Ok(Member {
                id: MemberId::new(row.try_get("id")?),
                name: row.try_get("name")?,
            })
        })
        .transpose()
    }

    async fn find_delivery(&self, id: DeliveryId) -> Result<Option<Delivery>> {
        Self::record(QueryKind::Delivery);

        let row = sqlx::query("SELECT id, city, street, zipcode FROM delivery WHERE id = $1")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| -> Result<Delivery> {
            Ok(Delivery {
                id: DeliveryId::new(row.try_get("id")?),
                address: Address {
                    city: row.try_get("city")?,
                    street: row.try_get("street")?,
                    zipcode: row.try_get("zipcode")?,
                },
            })
        })
        .transpose()
    }

    async fn find_order_summaries(&self, search: &OrderSearch) -> Result<Vec<OrderSummaryRow>> {
        Self::record(QueryKind::OrderSummaries);

        let rows = sqlx::query(Self::ORDER_SUMMARIES_QUERY)
            .bind(search.status.map(|s| s.as_str()))
            .bind(search.member_name.as_deref())
            .fetch_all(&self.pool)
            .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let order_id = OrderId::new(row.try_get("id")?);
            let Some(member_name) = row.try_get::<Option<String>, _>("name")? else {
                return Err(self.dangling_reference(order_id, "member").await?);
            };
            // city is NOT NULL, so NULL here means no delivery row joined
            let Some(city) = row.try_get::<Option<String>, _>("city")? else {
                return Err(self.dangling_reference(order_id, "delivery").await?);
            };
            let status: String = row.try_get("status")?;
            summaries.push(OrderSummaryRow {
                order_id,
                member_name,
                order_date: row.try_get("order_date")?,
                status: status.parse::<OrderStatus>()?,
                address: Address {
                    city,
                    street: row.try_get("street")?,
                    zipcode: row.try_get("zipcode")?,
                },
            });
        }
        Ok(summaries)
    }
}
