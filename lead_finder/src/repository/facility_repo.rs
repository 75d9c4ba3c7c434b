use color_eyre::Result;
use serde::{Deserialize, Serialize};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::{EnrichmentStatus, WebsiteSource};

/// An accommodation record to be enriched.
#[derive(Debug, Clone, Serialize, ToSchema, sqlx::FromRow)]
pub struct Facility {
    pub id: Uuid,
    pub raw_id: Option<String>,
    pub name: String,
    pub city: String,
    pub district: String,
    pub doc_type: String,
    pub address: Option<String>,
    pub website: Option<String>,
    pub website_source: Option<String>,
    pub website_score: f64,
    pub website_status: EnrichmentStatus,
    pub email: Option<String>,
    pub email_source: Option<String>,
    pub email_status: EnrichmentStatus,
}

/// Tab-style status filter used by the facility listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    Pending,
    NotFound,
    HasWebsite,
    HasEmail,
}

#[derive(Debug, Clone, Default)]
pub struct FacilityFilters {
    pub city: Option<String>,
    pub doc_type: Option<String>,
    pub search: Option<String>,
    pub status_filter: Option<StatusFilter>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FacilityStats {
    pub total: i64,
    pub pending: i64,
    pub not_found: i64,
    pub has_website: i64,
    pub has_email: i64,
}

#[derive(Debug, Serialize, ToSchema, sqlx::FromRow)]
pub struct DocTypeCount {
    pub name: String,
    pub count: i64,
}

#[derive(Clone)]
pub struct FacilityRepository {
    pool: SqlitePool,
}

impl FacilityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert one imported row, keyed on `raw_id` when present.
    /// Returns true when a new facility was inserted.
    pub async fn upsert_imported(
        &self,
        raw_id: &str,
        name: &str,
        city: &str,
        district: &str,
        doc_type: &str,
        address: &str,
    ) -> Result<bool> {
        if !raw_id.is_empty() {
            let existing: Option<(Uuid,)> =
                sqlx::query_as("SELECT id FROM facilities WHERE raw_id = ?")
                    .bind(raw_id)
                    .fetch_optional(&self.pool)
                    .await?;

            if let Some((id,)) = existing {
                sqlx::query(
                    r#"UPDATE facilities
                       SET name = ?, city = ?, district = ?, doc_type = ?, address = ?
                       WHERE id = ?"#,
                )
                .bind(name)
                .bind(city)
                .bind(district)
                .bind(doc_type)
                .bind(address)
                .bind(id)
                .execute(&self.pool)
                .await?;

                return Ok(false);
            }
        }

        sqlx::query(
            r#"INSERT INTO facilities (id, raw_id, name, city, district, doc_type, address)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4())
        .bind(raw_id)
        .bind(name)
        .bind(city)
        .bind(district)
        .bind(doc_type)
        .bind(address)
        .execute(&self.pool)
        .await?;

        Ok(true)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Facility>> {
        let facility = sqlx::query_as::<_, Facility>("SELECT * FROM facilities WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(facility)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filters: &FacilityFilters) {
        match filters.status_filter {
            Some(StatusFilter::Pending) => {
                qb.push(" AND (website IS NULL OR website = '') AND website_status = 'pending'");
            }
            Some(StatusFilter::NotFound) => {
                qb.push(" AND website_status = 'not_found'");
            }
            Some(StatusFilter::HasWebsite) => {
                qb.push(" AND website IS NOT NULL AND website != ''")
                    .push(" AND (email IS NULL OR email = '')");
            }
            Some(StatusFilter::HasEmail) => {
                qb.push(" AND website IS NOT NULL AND website != ''")
                    .push(" AND email IS NOT NULL AND email != ''");
            }
            None => {}
        }

        if let Some(city) = &filters.city {
            qb.push(" AND city = ").push_bind(city.clone());
        }
        if let Some(doc_type) = &filters.doc_type {
            qb.push(" AND doc_type = ").push_bind(doc_type.clone());
        }
        if let Some(search) = &filters.search {
            // LIKE folds ASCII case on its own
            let pattern = format!("%{search}%");
            qb.push(" AND (name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR city LIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub async fn list(
        &self,
        filters: &FacilityFilters,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<Facility>, i64)> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM facilities WHERE 1=1");
        Self::push_filters(&mut count_qb, filters);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM facilities WHERE 1=1");
        Self::push_filters(&mut qb, filters);
        qb.push(" ORDER BY name LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1).max(0) * limit);

        let items = qb
            .build_query_as::<Facility>()
            .fetch_all(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn stats(&self) -> Result<FacilityStats> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facilities")
            .fetch_one(&self.pool)
            .await?;

        let pending: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM facilities
               WHERE (website IS NULL OR website = '') AND website_status = 'pending'"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let not_found: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM facilities WHERE website_status = 'not_found'")
                .fetch_one(&self.pool)
                .await?;

        let has_website: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM facilities
               WHERE website IS NOT NULL AND website != ''
                 AND (email IS NULL OR email = '')"#,
        )
        .fetch_one(&self.pool)
        .await?;

        let has_email: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM facilities
               WHERE website IS NOT NULL AND website != ''
                 AND email IS NOT NULL AND email != ''"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(FacilityStats {
            total,
            pending,
            not_found,
            has_website,
            has_email,
        })
    }

    pub async fn distinct_doc_types(&self) -> Result<Vec<DocTypeCount>> {
        let rows = sqlx::query_as::<_, DocTypeCount>(
            r#"SELECT doc_type AS name, COUNT(*) AS count
               FROM facilities
               GROUP BY doc_type
               ORDER BY count DESC"#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Facilities a website-discovery job should process: the explicit uid
    /// set, or every facility with no website that was not already marked
    /// not_found.
    pub async fn discovery_targets(&self, uids: &[Uuid]) -> Result<Vec<Facility>> {
        if uids.is_empty() {
            let rows = sqlx::query_as::<_, Facility>(
                r#"SELECT * FROM facilities
                   WHERE (website IS NULL OR website = '')
                     AND website_status != 'not_found'"#,
            )
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows);
        }

        self.by_ids(uids).await
    }

    /// Facilities an email-crawl job should process.
    pub async fn email_targets(&self, uids: &[Uuid]) -> Result<Vec<Facility>> {
        if uids.is_empty() {
            let rows = sqlx::query_as::<_, Facility>(
                r#"SELECT * FROM facilities
                   WHERE website IS NOT NULL AND website != ''
                     AND (email IS NULL OR email = '')
                     AND email_status != 'not_found'"#,
            )
            .fetch_all(&self.pool)
            .await?;
            return Ok(rows);
        }

        self.by_ids(uids).await
    }

    async fn by_ids(&self, uids: &[Uuid]) -> Result<Vec<Facility>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM facilities WHERE id IN (");
        let mut separated = qb.separated(", ");
        for uid in uids {
            separated.push_bind(*uid);
        }
        qb.push(")");

        let rows = qb
            .build_query_as::<Facility>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn set_website_found(
        &self,
        id: Uuid,
        url: &str,
        score: f64,
        source: WebsiteSource,
    ) -> Result<()> {
        sqlx::query(
            r#"UPDATE facilities
               SET website = ?, website_score = ?, website_status = 'found', website_source = ?
               WHERE id = ?"#,
        )
        .bind(url)
        .bind(score)
        .bind(source.to_string())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_website_not_found(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE facilities SET website_status = 'not_found' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn set_email_found(&self, id: Uuid, email: &str, source: &str) -> Result<()> {
        sqlx::query(
            r#"UPDATE facilities
               SET email = ?, email_status = 'found', email_source = ?
               WHERE id = ?"#,
        )
        .bind(email)
        .bind(source)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn set_email_not_found(&self, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE facilities SET email_status = 'not_found' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn all_for_export(&self, city: Option<&str>) -> Result<Vec<Facility>> {
        let rows = match city {
            Some(city) => {
                sqlx::query_as::<_, Facility>(
                    "SELECT * FROM facilities WHERE city = ? ORDER BY name",
                )
                .bind(city)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Facility>("SELECT * FROM facilities ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    /// Wipe the facility table; used by uploads with `reset_db=true`.
    pub async fn reset(&self) -> Result<()> {
        sqlx::query("DELETE FROM facilities")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
