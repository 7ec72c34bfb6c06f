use crate::core::{CartItem, CartItemsRepository, Result};
use crate::utils::error::CartError;
use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

const CART_ITEM_TABLE: &str = "cartItem";

// Quantity is read back as a signed BIGINT whatever the column's signedness,
// so tables created as `INT UNSIGNED` decode too.
const SELECT_ITEMS: &str =
    "SELECT id, name, CAST(quantity AS SIGNED) AS quantity, reservationId FROM cartItem";

type CartItemRow = (String, String, Option<i64>, Option<String>);

/// Cart storage backed by a MySQL table with one row per item.
#[derive(Debug, Clone)]
pub struct MySqlCartItemsRepository {
    pool: MySqlPool,
}

impl MySqlCartItemsRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Opens a pool; fails if no connection can be established.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = MySqlPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        tracing::info!(max_connections, "Connected to MySQL");

        Ok(Self::new(pool))
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        let ddl = format!(
            r"
            CREATE TABLE IF NOT EXISTS {CART_ITEM_TABLE} (
                id VARCHAR(64) NOT NULL PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                quantity INT NOT NULL,
                reservationId VARCHAR(255) NULL
            )
            "
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn item_from_row((id, name, quantity, reservation_id): CartItemRow) -> Result<CartItem> {
    let quantity = quantity
        .and_then(|q| u32::try_from(q).ok())
        .filter(|q| *q > 0)
        .ok_or_else(|| CartError::MalformedData {
            message: format!("unreadable quantity {:?} for item {}", quantity, id),
        })?;

    Ok(CartItem {
        id,
        name,
        quantity,
        reservation_id: reservation_id.unwrap_or_default(),
    })
}

#[async_trait]
impl CartItemsRepository for MySqlCartItemsRepository {
    async fn get(&self) -> Result<Vec<CartItem>> {
        let rows: Vec<CartItemRow> = sqlx::query_as(SELECT_ITEMS).fetch_all(&self.pool).await?;

        rows.into_iter().map(item_from_row).collect()
    }

    async fn add(&self, item: &CartItem) -> Result<()> {
        let query = format!(
            "INSERT INTO {CART_ITEM_TABLE} (id, name, quantity) VALUES (?, ?, ?) \
             ON DUPLICATE KEY UPDATE quantity = quantity + ?"
        );
        sqlx::query(&query)
            .bind(&item.id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.quantity)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_reservation_id(&self, item: &CartItem, reservation_id: &str) -> Result<()> {
        let query = format!("UPDATE {CART_ITEM_TABLE} SET reservationId = ? WHERE id = ?");
        let result = sqlx::query(&query)
            .bind(reservation_id)
            .bind(&item.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(CartError::ItemNotFound {
                id: item.id.clone(),
            });
        }
        Ok(())
    }
}
