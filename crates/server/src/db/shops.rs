//! Shop repository for database operations.
//!
//! Cities are matched through the `city_key` column, the Unicode-lowercased
//! city name, so `Toulouse`, `toulouse` and `TOULOUSE` address the same rows.
//! Queries are built at runtime (`sqlx::query_as::<_, Row>`) against SQLite.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use rescue_map_core::timestamp;
use rescue_map_core::{CityName, Shop, ShopCandidate, ShopId, ShopStatus};

use super::RepositoryError;

const SHOP_COLUMNS: &str =
    "id, name, lat, lon, type AS kind, address, status, last_verified, notes, city";

/// Raw `supermarkets` row before validation.
#[derive(Debug, sqlx::FromRow)]
struct ShopRow {
    id: ShopId,
    name: String,
    lat: f64,
    lon: f64,
    kind: String,
    address: Option<String>,
    status: String,
    last_verified: Option<String>,
    notes: Option<String>,
    city: String,
}

impl TryFrom<ShopRow> for Shop {
    type Error = RepositoryError;

    fn try_from(row: ShopRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<ShopStatus>().map_err(|e| {
            RepositoryError::DataCorruption(format!("shop {}: {e}", row.id))
        })?;

        let last_verified = row
            .last_verified
            .as_deref()
            .map(timestamp::parse)
            .transpose()
            .map_err(|e| {
                RepositoryError::DataCorruption(format!(
                    "shop {}: invalid last_verified: {e}",
                    row.id
                ))
            })?;

        Ok(Self {
            id: row.id,
            name: row.name,
            lat: row.lat,
            lon: row.lon,
            kind: row.kind,
            address: row.address,
            status,
            last_verified,
            notes: row.notes,
            city: row.city,
        })
    }
}

fn into_shops(rows: Vec<ShopRow>) -> Result<Vec<Shop>, RepositoryError> {
    rows.into_iter().map(Shop::try_from).collect()
}

/// Repository for shop database operations.
pub struct ShopRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all shops of a city, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_by_city(&self, city: &CityName) -> Result<Vec<Shop>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM supermarkets WHERE city_key = ? ORDER BY name, id"
        ))
        .bind(city.key())
        .fetch_all(self.pool)
        .await?;

        into_shops(rows)
    }

    /// Count the shops of a city.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count_by_city(&self, city: &CityName) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM supermarkets WHERE city_key = ?")
                .bind(city.key())
                .fetch_one(self.pool)
                .await?;

        Ok(count)
    }

    /// Coordinates of the oldest stored shop of a city, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn first_location(
        &self,
        city: &CityName,
    ) -> Result<Option<(f64, f64)>, RepositoryError> {
        let location: Option<(f64, f64)> = sqlx::query_as(
            "SELECT lat, lon FROM supermarkets WHERE city_key = ? ORDER BY id LIMIT 1",
        )
        .bind(city.key())
        .fetch_optional(self.pool)
        .await?;

        Ok(location)
    }

    /// Insert a freshly fetched inventory for a city in one transaction.
    ///
    /// Every row starts as `unknown` with `last_verified` set to `stamped_at`.
    /// Returns the number of rows inserted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails; nothing is
    /// committed in that case.
    pub async fn insert_inventory(
        &self,
        city: &CityName,
        candidates: &[ShopCandidate],
        stamped_at: DateTime<Utc>,
    ) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let inserted = insert_candidates(&mut tx, city, candidates, stamped_at).await?;
        tx.commit().await?;

        Ok(inserted)
    }

    /// Replace the whole inventory of a city in one transaction.
    ///
    /// Returns `(deleted, inserted)` row counts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete or an insert fails;
    /// the previous inventory is kept in that case.
    pub async fn replace_inventory(
        &self,
        city: &CityName,
        candidates: &[ShopCandidate],
        stamped_at: DateTime<Utc>,
    ) -> Result<(u64, u64), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM supermarkets WHERE city_key = ?")
            .bind(city.key())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let inserted = insert_candidates(&mut tx, city, candidates, stamped_at).await?;
        tx.commit().await?;

        Ok((deleted, inserted))
    }

    /// Set the status of a shop, stamping `last_verified`.
    ///
    /// `notes` replaces the stored notes when provided and keeps them otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no shop has this id in this city.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: ShopId,
        city: &CityName,
        status: ShopStatus,
        notes: Option<&str>,
        verified_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE supermarkets
            SET status = ?, last_verified = ?, notes = COALESCE(?, notes)
            WHERE id = ? AND city_key = ?
            ",
        )
        .bind(status)
        .bind(timestamp::format(verified_at))
        .bind(notes)
        .bind(id)
        .bind(city.key())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Shop counts per city, ordered by city name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn city_counts(&self) -> Result<Vec<(String, i64)>, RepositoryError> {
        let counts: Vec<(String, i64)> = sqlx::query_as(
            "SELECT MIN(city), COUNT(*) FROM supermarkets GROUP BY city_key ORDER BY MIN(city)",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(counts)
    }

    /// Shops whose `last_verified` is strictly after `since`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn changed_since(&self, since: DateTime<Utc>) -> Result<Vec<Shop>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM supermarkets \
             WHERE last_verified IS NOT NULL AND last_verified > ? \
             ORDER BY last_verified, id"
        ))
        .bind(timestamp::format(since))
        .fetch_all(self.pool)
        .await?;

        into_shops(rows)
    }

    /// Write whole rows by primary key, replacing any existing row.
    ///
    /// Rows are applied in slice order inside one transaction, so the last
    /// occurrence of an id wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a write fails; nothing is
    /// committed in that case.
    pub async fn upsert_all(&self, shops: &[Shop]) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for shop in shops {
            sqlx::query(
                r"
                INSERT OR REPLACE INTO supermarkets
                    (id, name, lat, lon, type, address, status, last_verified, notes, city, city_key)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(shop.id)
            .bind(&shop.name)
            .bind(shop.lat)
            .bind(shop.lon)
            .bind(&shop.kind)
            .bind(&shop.address)
            .bind(shop.status)
            .bind(shop.last_verified.map(timestamp::format))
            .bind(&shop.notes)
            .bind(&shop.city)
            .bind(shop.city.to_lowercase())
            .execute(&mut *tx)
            .await?;
            written += 1;
        }

        tx.commit().await?;

        Ok(written)
    }

    /// Get a shop by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        let row = sqlx::query_as::<_, ShopRow>(&format!(
            "SELECT {SHOP_COLUMNS} FROM supermarkets WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(Shop::try_from).transpose()
    }
}

async fn insert_candidates(
    conn: &mut SqliteConnection,
    city: &CityName,
    candidates: &[ShopCandidate],
    stamped_at: DateTime<Utc>,
) -> Result<u64, RepositoryError> {
    let key = city.key();
    let stamped_at = timestamp::format(stamped_at);
    let mut inserted = 0;

    for candidate in candidates {
        sqlx::query(
            r"
            INSERT INTO supermarkets (name, lat, lon, type, status, last_verified, city, city_key)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&candidate.name)
        .bind(candidate.lat)
        .bind(candidate.lon)
        .bind(&candidate.kind)
        .bind(ShopStatus::Unknown)
        .bind(&stamped_at)
        .bind(city.as_str())
        .bind(&key)
        .execute(&mut *conn)
        .await?;
        inserted += 1;
    }

    Ok(inserted)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::db::memory_store;

    fn city(name: &str) -> CityName {
        CityName::parse(name).unwrap()
    }

    fn candidate(name: &str) -> ShopCandidate {
        ShopCandidate {
            name: name.to_string(),
            lat: 43.6,
            lon: 1.44,
            kind: "supermarket".to_string(),
        }
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list_is_case_insensitive_and_sorted() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);

        let inserted = repo
            .insert_inventory(
                &city("Toulouse"),
                &[candidate("Lidl"), candidate("Auchan"), candidate("Casino")],
                at(8),
            )
            .await
            .unwrap();
        assert_eq!(inserted, 3);

        let shops = repo.list_by_city(&city("toulouse")).await.unwrap();
        let names: Vec<_> = shops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["Auchan", "Casino", "Lidl"]);
        assert!(shops.iter().all(|s| s.status == ShopStatus::Unknown));
        assert!(shops.iter().all(|s| s.last_verified == Some(at(8))));
        assert!(shops.iter().all(|s| s.city == "Toulouse"));

        assert_eq!(repo.count_by_city(&city("TOULOUSE")).await.unwrap(), 3);
        assert_eq!(repo.count_by_city(&city("Lyon")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_status_stamps_and_reports_missing_rows() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        repo.insert_inventory(&city("Nice"), &[candidate("Spar")], at(8))
            .await
            .unwrap();
        let id = repo.list_by_city(&city("Nice")).await.unwrap()[0].id;

        repo.update_status(id, &city("NICE"), ShopStatus::Looted, Some("vitrines cassées"), at(9))
            .await
            .unwrap();
        let shop = repo.get(id).await.unwrap().unwrap();
        assert_eq!(shop.status, ShopStatus::Looted);
        assert_eq!(shop.last_verified, Some(at(9)));
        assert_eq!(shop.notes.as_deref(), Some("vitrines cassées"));

        // Notes survive an update that does not carry any
        repo.update_status(id, &city("Nice"), ShopStatus::Safe, None, at(10))
            .await
            .unwrap();
        let shop = repo.get(id).await.unwrap().unwrap();
        assert_eq!(shop.status, ShopStatus::Safe);
        assert_eq!(shop.notes.as_deref(), Some("vitrines cassées"));

        let wrong_city = repo
            .update_status(id, &city("Lyon"), ShopStatus::Danger, None, at(11))
            .await;
        assert!(matches!(wrong_city, Err(RepositoryError::NotFound)));

        let wrong_id = repo
            .update_status(ShopId::new(9999), &city("Nice"), ShopStatus::Danger, None, at(11))
            .await;
        assert!(matches!(wrong_id, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_replace_inventory_never_reuses_ids() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        let lille = city("Lille");

        repo.insert_inventory(&lille, &[candidate("A"), candidate("B")], at(8))
            .await
            .unwrap();
        let before: Vec<_> = repo
            .list_by_city(&lille)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        let (deleted, inserted) = repo
            .replace_inventory(&lille, &[candidate("C"), candidate("D")], at(9))
            .await
            .unwrap();
        assert_eq!((deleted, inserted), (2, 2));

        let after: Vec<_> = repo
            .list_by_city(&lille)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert!(after.iter().all(|id| !before.contains(id)));
    }

    #[tokio::test]
    async fn test_changed_since_is_strict() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        repo.insert_inventory(&city("Lyon"), &[candidate("A")], at(8))
            .await
            .unwrap();

        assert_eq!(repo.changed_since(at(7)).await.unwrap().len(), 1);
        assert!(repo.changed_since(at(8)).await.unwrap().is_empty());
        assert!(repo.changed_since(at(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_all_last_occurrence_wins() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);

        let mut shop = Shop {
            id: ShopId::new(12),
            name: "Monoprix".to_string(),
            lat: 48.85,
            lon: 2.35,
            kind: "supermarket".to_string(),
            address: None,
            status: ShopStatus::Safe,
            last_verified: Some(at(8)),
            notes: None,
            city: "Paris".to_string(),
        };
        let first = shop.clone();
        shop.status = ShopStatus::Danger;

        let written = repo.upsert_all(&[first, shop.clone()]).await.unwrap();
        assert_eq!(written, 2);
        assert_eq!(repo.get(ShopId::new(12)).await.unwrap(), Some(shop));
        assert_eq!(repo.count_by_city(&city("paris")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_city_counts_groups_case_insensitively() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        repo.insert_inventory(&city("Nantes"), &[candidate("A"), candidate("B")], at(8))
            .await
            .unwrap();
        repo.insert_inventory(&city("Bordeaux"), &[candidate("C")], at(8))
            .await
            .unwrap();

        let counts = repo.city_counts().await.unwrap();
        assert_eq!(
            counts,
            vec![("Bordeaux".to_string(), 1), ("Nantes".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_first_location() {
        let pool = memory_store().await.unwrap();
        let repo = ShopRepository::new(&pool);
        assert_eq!(repo.first_location(&city("Brest")).await.unwrap(), None);

        repo.insert_inventory(&city("Brest"), &[candidate("A")], at(8))
            .await
            .unwrap();
        assert_eq!(
            repo.first_location(&city("brest")).await.unwrap(),
            Some((43.6, 1.44))
        );
    }
}
