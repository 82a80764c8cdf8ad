//! Postgres-backed user and product repositories.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (other) | Any other | `Backend` |
//! | Other | N/A | `Backend` |
//!
//! ## Lockout writes
//!
//! `compare_and_set_lockout` is a single conditional `UPDATE`; the row matches
//! only if both lockout columns still hold the expected values, so concurrent
//! failed logins on one account cannot lose increments.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use stockroom_auth::{Account, AccountStore, LockoutState, ResourceStore};
use stockroom_core::{ListField, ListQuery, Page, ProductId, SortOrder, StoreError, UserId, natural_cmp};
use stockroom_products::{Product, ProductField};
use stockroom_users::{User, UserField};

use super::{ProductRepository, UserRepository};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id              UUID PRIMARY KEY,
        name            TEXT NOT NULL,
        email           TEXT NOT NULL UNIQUE,
        password_hash   TEXT NOT NULL,
        login_attempts  INTEGER NOT NULL DEFAULT 0 CHECK (login_attempts >= 0),
        lock_until      TIMESTAMPTZ,
        created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          UUID PRIMARY KEY,
        name        TEXT NOT NULL,
        category    TEXT NOT NULL,
        price       DOUBLE PRECISION NOT NULL CHECK (price > 0),
        quantity    BIGINT NOT NULL DEFAULT 0 CHECK (quantity >= 0),
        created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
];

/// Open a connection pool.
pub async fn connect(dsn: &str) -> Result<PgPool, StoreError> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(dsn)
        .await
        .map_err(|e| map_sqlx_error("connect", e))
}

/// Create tables if they do not exist yet.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
    }
    Ok(())
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate(msg),
                _ => StoreError::Backend(msg),
            }
        }
        other => StoreError::Backend(format!("{operation}: {other}")),
    }
}

/// SQL for one page of `table` plus its total count.
///
/// Column names come from the `ListField` whitelist, never from the client.
/// With a search filter `$1` is the lowercased needle; limit and offset follow.
struct ListSql {
    select: String,
    count: String,
    has_needle: bool,
}

fn list_sql<F: ListField>(
    table: &str,
    columns: &str,
    query: &ListQuery<F>,
    column: impl Fn(F) -> &'static str,
) -> ListSql {
    let (filter, has_needle) = match &query.search {
        Some(search) => (format!("WHERE strpos(lower({}), $1) > 0", column(search.field)), true),
        None => (String::new(), false),
    };

    // Without an explicit sort, pages are cut in creation order and then
    // ordered naturally by name in Rust.
    let order = match &query.sort {
        Some(spec) => {
            let dir = match spec.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            format!("ORDER BY {} {dir}, id ASC", column(spec.field))
        }
        None => "ORDER BY created_at ASC, id ASC".to_string(),
    };

    let (limit, offset) = if has_needle { ("$2", "$3") } else { ("$1", "$2") };

    ListSql {
        select: format!("SELECT {columns} FROM {table} {filter} {order} LIMIT {limit} OFFSET {offset}"),
        count: format!("SELECT COUNT(*) FROM {table} {filter}"),
        has_needle,
    }
}

async fn fetch_page<T, F: ListField>(
    pool: &PgPool,
    sql: ListSql,
    query: &ListQuery<F>,
    decode: impl Fn(&PgRow) -> Result<T, StoreError>,
) -> Result<(Vec<T>, u64), StoreError> {
    let needle = query.search.as_ref().map(|s| s.needle.as_str());
    let limit = i64::try_from(query.limit()).unwrap_or(i64::MAX);
    let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);

    let mut count = sqlx::query_scalar::<_, i64>(&sql.count);
    let mut select = sqlx::query(&sql.select);
    if sql.has_needle {
        count = count.bind(needle);
        select = select.bind(needle);
    }

    let total = count
        .fetch_one(pool)
        .await
        .map_err(|e| map_sqlx_error("list_count", e))?;
    let rows = select
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(|e| map_sqlx_error("list", e))?;

    let data = rows.iter().map(decode).collect::<Result<Vec<_>, _>>()?;
    Ok((data, u64::try_from(total).unwrap_or(0)))
}

fn decode_err(e: sqlx::Error) -> StoreError {
    StoreError::backend(format!("failed to decode row: {e}"))
}

const USER_COLUMNS: &str = "id, name, email, password_hash, login_attempts, lock_until";

fn user_from_row(row: &PgRow) -> Result<User, StoreError> {
    let attempts: i32 = row.try_get("login_attempts").map_err(decode_err)?;
    Ok(User {
        id: UserId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        email: row.try_get("email").map_err(decode_err)?,
        password_hash: row.try_get("password_hash").map_err(decode_err)?,
        lockout: LockoutState {
            failed_attempts: u32::try_from(attempts).unwrap_or(0),
            locked_until: row
                .try_get::<Option<DateTime<Utc>>, _>("lock_until")
                .map_err(decode_err)?,
        },
    })
}

fn attempts_column(state: &LockoutState) -> i32 {
    i32::try_from(state.failed_attempts).unwrap_or(i32::MAX)
}

/// Postgres-backed user repository; also the account store for login.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: Arc<PgPool>,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, query), err)]
    async fn list(&self, query: &ListQuery<UserField>) -> Result<Page<User>, StoreError> {
        let sql = list_sql("users", USER_COLUMNS, query, UserField::as_str);
        let (mut data, total) = fetch_page(&self.pool, sql, query, user_from_row).await?;
        if query.sort.is_none() {
            data.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        }
        Ok(Page::new(data, total, query))
    }

    async fn get(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn create(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, login_attempts, lock_until)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(*user.id.as_uuid())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(attempts_column(&user.lockout))
        .bind(user.lockout.locked_until)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_user", e))?;
        Ok(())
    }

    async fn update_profile(&self, id: UserId, name: &str, email: &str) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE users SET name = $2, email = $3 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(name)
            .bind(email)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        Ok(done.rows_affected() == 1)
    }

    async fn set_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(password_hash)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_password_hash", e))?;
        Ok(done.rows_affected() == 1)
    }

    async fn delete(&self, id: UserId) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        Ok(done.rows_affected() == 1)
    }
}

#[async_trait]
impl AccountStore for PostgresUserRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.find_by_email(identifier).await?.map(Account::from))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        Ok(self.get(id).await?.map(Account::from))
    }

    async fn set_lockout(&self, id: UserId, state: LockoutState) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET login_attempts = $2, lock_until = $3 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(attempts_column(&state))
            .bind(state.locked_until)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("set_lockout", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn compare_and_set_lockout(
        &self,
        id: UserId,
        expected: LockoutState,
        next: LockoutState,
    ) -> Result<bool, StoreError> {
        let done = sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = $4, lock_until = $5
            WHERE id = $1
              AND login_attempts = $2
              AND lock_until IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(*id.as_uuid())
        .bind(attempts_column(&expected))
        .bind(expected.locked_until)
        .bind(attempts_column(&next))
        .bind(next.locked_until)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("compare_and_set_lockout", e))?;
        Ok(done.rows_affected() == 1)
    }
}

const PRODUCT_COLUMNS: &str = "id, name, category, price, quantity";

fn product_from_row(row: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(row.try_get::<Uuid, _>("id").map_err(decode_err)?),
        name: row.try_get("name").map_err(decode_err)?,
        category: row.try_get("category").map_err(decode_err)?,
        price: row.try_get("price").map_err(decode_err)?,
        quantity: row.try_get("quantity").map_err(decode_err)?,
    })
}

/// Postgres-backed product repository; also the resource store for tokens.
#[derive(Debug, Clone)]
pub struct PostgresProductRepository {
    pool: Arc<PgPool>,
}

impl PostgresProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }
}

#[async_trait]
impl ProductRepository for PostgresProductRepository {
    #[instrument(skip(self, query), err)]
    async fn list(&self, query: &ListQuery<ProductField>) -> Result<Page<Product>, StoreError> {
        let sql = list_sql("products", PRODUCT_COLUMNS, query, ProductField::as_str);
        let (mut data, total) = fetch_page(&self.pool, sql, query, product_from_row).await?;
        if query.sort.is_none() {
            data.sort_by(|a, b| natural_cmp(&a.name, &b.name));
        }
        Ok(Page::new(data, total, query))
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(*id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?;
        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, product), fields(product_id = %product.id), err)]
    async fn create(&self, product: &Product) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, category, price, quantity)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price)
        .bind(product.quantity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_product", e))?;
        Ok(())
    }

    async fn update(&self, product: &Product) -> Result<bool, StoreError> {
        let done = sqlx::query(
            "UPDATE products SET name = $2, category = $3, quantity = $4 WHERE id = $1",
        )
        .bind(*product.id.as_uuid())
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.quantity)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_product", e))?;
        Ok(done.rows_affected() == 1)
    }

    async fn change_price(&self, id: ProductId, price: f64) -> Result<bool, StoreError> {
        let done = sqlx::query("UPDATE products SET price = $2 WHERE id = $1")
            .bind(*id.as_uuid())
            .bind(price)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("change_price", e))?;
        Ok(done.rows_affected() == 1)
    }

    async fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(*id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?;
        Ok(done.rows_affected() == 1)
    }
}

#[async_trait]
impl ResourceStore for PostgresProductRepository {
    async fn exists(&self, id: ProductId) -> Result<bool, StoreError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM products WHERE id = $1)")
            .bind(*id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))
    }
}
