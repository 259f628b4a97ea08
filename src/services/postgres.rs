use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::collections::{BTreeSet, HashSet};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::core::distance::{
    bounding_box_wraps, calculate_bounding_box, EARTH_RADIUS_METERS, METERS_PER_MILE,
};
use crate::models::{
    AgeRange, CandidateQuery, Compatibility, GenderPreference, GeoPoint, InteractionRecord,
    Location, LookingFor, Match, MatchStatus, ProfileStats, Stat, SwipeAction, UnknownVariant,
    UserProfile,
};
use crate::services::store::{
    page_offset, InteractionLog, MatchStore, ProfileStore, StoreError, StoreResult,
};

/// Errors that can occur while connecting to PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                StoreError::Corrupt(err.to_string())
            }
            sqlx::Error::Database(ref db) if db.code().as_deref() == Some("23505") => {
                StoreError::Conflict(err.to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

fn corrupt(err: UnknownVariant) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

const PROFILE_COLUMNS: &str = r#"
    id, email, name, age, gender, bio, interests,
    longitude, latitude, city, country, location_updated_at,
    pref_genders, pref_age_min, pref_age_max, pref_distance, relationship_type,
    blocked, reported, is_online, last_active, status,
    likes, super_likes, matches, profile_views, created_at
"#;

const MATCH_COLUMNS: &str = r#"
    id, user_a, user_b, initiator, match_type, compatibility, status,
    unmatched_by, unmatched_at, last_interaction, message_count, created_at
"#;

/// PostgreSQL-backed profile store, interaction log and match store
///
/// The partial unique index on active pairs backs the one-active-match rule
/// even if two service instances race on the same pair.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_profile_exists(&self, id: &str) -> StoreResult<()> {
        sqlx::query("SELECT 1 FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("profile {}", id)))
    }
}

fn profile_from_row(row: &PgRow) -> StoreResult<UserProfile> {
    let id: String = row.try_get("id")?;

    let age: i16 = row.try_get("age")?;
    let age = u8::try_from(age)
        .map_err(|_| StoreError::Corrupt(format!("profile {} has age {}", id, age)))?;

    let pref_min: i16 = row.try_get("pref_age_min")?;
    let pref_max: i16 = row.try_get("pref_age_max")?;
    let age_range = AgeRange {
        min: u8::try_from(pref_min).map_err(|_| {
            StoreError::Corrupt(format!("profile {} has age preference {}", id, pref_min))
        })?,
        max: u8::try_from(pref_max).map_err(|_| {
            StoreError::Corrupt(format!("profile {} has age preference {}", id, pref_max))
        })?,
    };

    let pref_genders: Vec<String> = row.try_get("pref_genders")?;
    let gender = pref_genders
        .iter()
        .map(|g| g.parse::<GenderPreference>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(corrupt)?;

    let counter = |column: &str| -> StoreResult<u32> {
        let value: i32 = row.try_get(column)?;
        Ok(u32::try_from(value).unwrap_or(0))
    };

    Ok(UserProfile {
        email: row.try_get("email")?,
        name: row.try_get("name")?,
        age,
        gender: row.try_get::<String, _>("gender")?.parse().map_err(corrupt)?,
        bio: row.try_get("bio")?,
        interests: row.try_get("interests")?,
        location: Location {
            point: GeoPoint::new(row.try_get("longitude")?, row.try_get("latitude")?),
            city: row.try_get("city")?,
            country: row.try_get("country")?,
            last_updated: row.try_get("location_updated_at")?,
        },
        looking_for: LookingFor {
            gender,
            age_range,
            distance: row.try_get("pref_distance")?,
            relationship_type: row
                .try_get::<String, _>("relationship_type")?
                .parse()
                .map_err(corrupt)?,
        },
        blocked: row.try_get::<Vec<String>, _>("blocked")?.into_iter().collect::<BTreeSet<_>>(),
        reported: row.try_get::<Vec<String>, _>("reported")?.into_iter().collect::<BTreeSet<_>>(),
        is_online: row.try_get("is_online")?,
        last_active: row.try_get("last_active")?,
        status: row.try_get::<String, _>("status")?.parse().map_err(corrupt)?,
        stats: ProfileStats {
            likes: counter("likes")?,
            super_likes: counter("super_likes")?,
            matches: counter("matches")?,
            profile_views: counter("profile_views")?,
        },
        created_at: row.try_get("created_at")?,
        id,
    })
}

fn swipe_from_row(row: &PgRow) -> StoreResult<InteractionRecord> {
    Ok(InteractionRecord {
        from: row.try_get("from_user")?,
        to: row.try_get("to_user")?,
        action: row.try_get::<String, _>("action")?.parse().map_err(corrupt)?,
        created_at: row.try_get("created_at")?,
    })
}

fn match_from_row(row: &PgRow) -> StoreResult<Match> {
    let compatibility: Json<Compatibility> = row.try_get("compatibility")?;
    let message_count: i32 = row.try_get("message_count")?;

    Ok(Match {
        id: row.try_get("id")?,
        users: [row.try_get("user_a")?, row.try_get("user_b")?],
        initiator: row.try_get("initiator")?,
        match_type: row.try_get::<String, _>("match_type")?.parse().map_err(corrupt)?,
        compatibility: compatibility.0,
        status: row.try_get::<String, _>("status")?.parse().map_err(corrupt)?,
        unmatched_by: row.try_get("unmatched_by")?,
        unmatched_at: row.try_get("unmatched_at")?,
        last_interaction: row.try_get("last_interaction")?,
        message_count: u32::try_from(message_count).unwrap_or(0),
        created_at: row.try_get("created_at")?,
    })
}

/// Append the store-side exclusion rules of `query` to a WHERE clause
fn push_candidate_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CandidateQuery) {
    let excluded: Vec<String> = query.exclude_user_ids.iter().cloned().collect();

    builder
        .push(" WHERE status = 'active' AND id <> ")
        .push_bind(query.requester_id.clone())
        .push(" AND NOT (id = ANY(")
        .push_bind(excluded)
        .push(")) AND NOT (")
        .push_bind(query.requester_id.clone())
        .push(" = ANY(blocked))");

    if let Some(range) = query.age_range {
        builder
            .push(" AND age BETWEEN ")
            .push_bind(i16::from(range.min))
            .push(" AND ")
            .push_bind(i16::from(range.max));
    }

    if let Some(genders) = &query.genders {
        let genders: Vec<String> = genders.iter().map(|g| g.as_str().to_string()).collect();
        builder.push(" AND gender = ANY(").push_bind(genders).push(")");
    }

    if let Some(radius) = query.radius {
        let center = radius.center;
        builder.push(" AND NOT (longitude = 0 AND latitude = 0)");

        let bbox = calculate_bounding_box(center, radius.miles);
        if !bounding_box_wraps(&bbox) {
            builder
                .push(" AND latitude BETWEEN ")
                .push_bind(bbox.min_lat)
                .push(" AND ")
                .push_bind(bbox.max_lat)
                .push(" AND longitude BETWEEN ")
                .push_bind(bbox.min_lon)
                .push(" AND ")
                .push_bind(bbox.max_lon);
        }

        builder
            .push(" AND 2 * ")
            .push_bind(EARTH_RADIUS_METERS / METERS_PER_MILE)
            .push(" * ASIN(SQRT(POWER(SIN(RADIANS(latitude - ")
            .push_bind(center.latitude)
            .push(") / 2), 2) + COS(RADIANS(")
            .push_bind(center.latitude)
            .push(")) * COS(RADIANS(latitude)) * POWER(SIN(RADIANS(longitude - ")
            .push_bind(center.longitude)
            .push(") / 2), 2))) <= ")
            .push_bind(radius.miles);
    }
}

#[async_trait]
impl ProfileStore for PostgresStore {
    async fn get_profile(&self, id: &str) -> StoreResult<Option<UserProfile>> {
        let query = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(profile_from_row)
            .transpose()
    }

    async fn find_active_profiles(
        &self,
        query: &CandidateQuery,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<UserProfile>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM profiles",
            PROFILE_COLUMNS
        ));
        push_candidate_filters(&mut builder, query);
        builder
            .push(" ORDER BY id LIMIT ")
            .push_bind(i64::from(page_size))
            .push(" OFFSET ")
            .push_bind(page_offset(page, page_size) as i64);

        let rows = builder.build().fetch_all(&self.pool).await?;

        let mut profiles = Vec::with_capacity(rows.len());
        for row in &rows {
            match profile_from_row(row) {
                Ok(profile) => profiles.push(profile),
                Err(e) => tracing::warn!("Skipping unreadable profile row: {}", e),
            }
        }

        tracing::debug!(
            "Found {} active profiles for {} (page {})",
            profiles.len(),
            query.requester_id,
            page
        );
        Ok(profiles)
    }

    async fn increment_stat(&self, id: &str, stat: Stat) -> StoreResult<()> {
        let query = format!(
            "UPDATE profiles SET {col} = {col} + 1 WHERE id = $1",
            col = stat.column()
        );

        let result = sqlx::query(&query).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", id)));
        }
        Ok(())
    }

    async fn save_profile(&self, profile: UserProfile) -> StoreResult<()> {
        let query = r#"
            INSERT INTO profiles (
                id, email, name, age, gender, bio, interests,
                longitude, latitude, city, country, location_updated_at,
                pref_genders, pref_age_min, pref_age_max, pref_distance, relationship_type,
                blocked, reported, is_online, last_active, status,
                likes, super_likes, matches, profile_views, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                bio = EXCLUDED.bio,
                interests = EXCLUDED.interests,
                longitude = EXCLUDED.longitude,
                latitude = EXCLUDED.latitude,
                city = EXCLUDED.city,
                country = EXCLUDED.country,
                location_updated_at = EXCLUDED.location_updated_at,
                pref_genders = EXCLUDED.pref_genders,
                pref_age_min = EXCLUDED.pref_age_min,
                pref_age_max = EXCLUDED.pref_age_max,
                pref_distance = EXCLUDED.pref_distance,
                relationship_type = EXCLUDED.relationship_type,
                blocked = EXCLUDED.blocked,
                reported = EXCLUDED.reported,
                is_online = EXCLUDED.is_online,
                last_active = EXCLUDED.last_active,
                status = EXCLUDED.status,
                likes = EXCLUDED.likes,
                super_likes = EXCLUDED.super_likes,
                matches = EXCLUDED.matches,
                profile_views = EXCLUDED.profile_views
        "#;

        let prefs = &profile.looking_for;
        let genders: Vec<String> = prefs.gender.iter().map(|g| g.as_str().to_string()).collect();
        let counter = |value: u32| i32::try_from(value).unwrap_or(i32::MAX);

        sqlx::query(query)
            .bind(&profile.id)
            .bind(&profile.email)
            .bind(&profile.name)
            .bind(i16::from(profile.age))
            .bind(profile.gender.as_str())
            .bind(&profile.bio)
            .bind(&profile.interests)
            .bind(profile.location.point.longitude)
            .bind(profile.location.point.latitude)
            .bind(&profile.location.city)
            .bind(&profile.location.country)
            .bind(profile.location.last_updated)
            .bind(genders)
            .bind(i16::from(prefs.age_range.min))
            .bind(i16::from(prefs.age_range.max))
            .bind(prefs.distance)
            .bind(prefs.relationship_type.as_str())
            .bind(profile.blocked.iter().cloned().collect::<Vec<_>>())
            .bind(profile.reported.iter().cloned().collect::<Vec<_>>())
            .bind(profile.is_online)
            .bind(profile.last_active)
            .bind(profile.status.as_str())
            .bind(counter(profile.stats.likes))
            .bind(counter(profile.stats.super_likes))
            .bind(counter(profile.stats.matches))
            .bind(counter(profile.stats.profile_views))
            .bind(profile.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn add_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET blocked = array_append(blocked, $2)
            WHERE id = $1 AND NOT ($2 = ANY(blocked))
            "#,
        )
        .bind(owner)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        self.ensure_profile_exists(owner).await?;
        Ok(false)
    }

    async fn remove_blocked(&self, owner: &str, target: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET blocked = array_remove(blocked, $2)
            WHERE id = $1 AND $2 = ANY(blocked)
            "#,
        )
        .bind(owner)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }
        self.ensure_profile_exists(owner).await?;
        Ok(false)
    }

    async fn add_reported(&self, owner: &str, target: &str) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles SET reported = array_append(reported, $2)
            WHERE id = $1 AND NOT ($2 = ANY(reported))
            "#,
        )
        .bind(owner)
        .bind(target)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.ensure_profile_exists(owner).await?;
        }
        Ok(())
    }

    async fn update_location(&self, id: &str, location: Location) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE profiles
            SET longitude = $2, latitude = $3, city = $4, country = $5, location_updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(location.point.longitude)
        .bind(location.point.latitude)
        .bind(&location.city)
        .bind(&location.country)
        .bind(location.last_updated)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("profile {}", id)));
        }
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<bool> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl InteractionLog for PostgresStore {
    /// Uses INSERT ... ON CONFLICT so the latest decision replaces the old one
    async fn upsert_swipe(
        &self,
        from: &str,
        to: &str,
        action: SwipeAction,
        at: DateTime<Utc>,
    ) -> StoreResult<InteractionRecord> {
        let query = r#"
            INSERT INTO swipes (from_user, to_user, action, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (from_user, to_user)
            DO UPDATE SET
                action = EXCLUDED.action,
                created_at = EXCLUDED.created_at
            RETURNING from_user, to_user, action, created_at
        "#;

        let row = sqlx::query(query)
            .bind(from)
            .bind(to)
            .bind(action.as_str())
            .bind(at)
            .fetch_one(&self.pool)
            .await?;

        swipe_from_row(&row)
    }

    async fn find_swipe(&self, from: &str, to: &str) -> StoreResult<Option<InteractionRecord>> {
        let query = r#"
            SELECT from_user, to_user, action, created_at
            FROM swipes
            WHERE from_user = $1 AND to_user = $2
        "#;

        sqlx::query(query)
            .bind(from)
            .bind(to)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(swipe_from_row)
            .transpose()
    }

    async fn list_swiped_targets(&self, from: &str) -> StoreResult<HashSet<String>> {
        let query = r#"
            SELECT to_user AS target FROM swipes WHERE from_user = $1
            UNION
            SELECT target_id AS target FROM passed_profiles WHERE user_id = $1
        "#;

        let rows = sqlx::query(query).bind(from).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("target").map_err(Into::into))
            .collect()
    }

    async fn list_likes_received(&self, to: &str) -> StoreResult<Vec<InteractionRecord>> {
        let query = r#"
            SELECT from_user, to_user, action, created_at
            FROM swipes
            WHERE to_user = $1 AND action IN ('like', 'superlike')
            ORDER BY created_at DESC
        "#;

        let rows = sqlx::query(query).bind(to).fetch_all(&self.pool).await?;
        rows.iter().map(swipe_from_row).collect()
    }

    async fn compact_dislikes(&self, cutoff: DateTime<Utc>) -> StoreResult<u64> {
        let query = r#"
            WITH expired AS (
                DELETE FROM swipes
                WHERE action = 'dislike' AND created_at < $1
                RETURNING from_user, to_user, created_at
            ),
            folded AS (
                INSERT INTO passed_profiles (user_id, target_id, passed_at)
                SELECT from_user, to_user, created_at FROM expired
                ON CONFLICT (user_id, target_id) DO NOTHING
            )
            SELECT COUNT(*) AS compacted FROM expired
        "#;

        let row = sqlx::query(query).bind(cutoff).fetch_one(&self.pool).await?;
        let compacted: i64 = row.try_get("compacted")?;
        Ok(u64::try_from(compacted).unwrap_or(0))
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    async fn create_match(&self, new_match: Match) -> StoreResult<Match> {
        let query = r#"
            INSERT INTO matches (
                id, user_a, user_b, initiator, match_type, compatibility, status,
                unmatched_by, unmatched_at, last_interaction, message_count, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#;

        sqlx::query(query)
            .bind(new_match.id)
            .bind(&new_match.users[0])
            .bind(&new_match.users[1])
            .bind(&new_match.initiator)
            .bind(new_match.match_type.as_str())
            .bind(Json(new_match.compatibility))
            .bind(new_match.status.as_str())
            .bind(&new_match.unmatched_by)
            .bind(new_match.unmatched_at)
            .bind(new_match.last_interaction)
            .bind(i32::try_from(new_match.message_count).unwrap_or(i32::MAX))
            .bind(new_match.created_at)
            .execute(&self.pool)
            .await?;

        tracing::debug!("Inserted match {}", new_match.id);
        Ok(new_match)
    }

    async fn get_match(&self, id: Uuid) -> StoreResult<Option<Match>> {
        let query = format!("SELECT {} FROM matches WHERE id = $1", MATCH_COLUMNS);

        sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(match_from_row)
            .transpose()
    }

    async fn find_active_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
        let query = format!(
            r#"
            SELECT {} FROM matches
            WHERE status = 'active'
              AND ((user_a = $1 AND user_b = $2) OR (user_a = $2 AND user_b = $1))
            "#,
            MATCH_COLUMNS
        );

        sqlx::query(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(match_from_row)
            .transpose()
    }

    async fn find_ended_match(&self, a: &str, b: &str) -> StoreResult<Option<Match>> {
        let query = format!(
            r#"
            SELECT {} FROM matches
            WHERE status <> 'active'
              AND ((user_a = $1 AND user_b = $2) OR (user_a = $2 AND user_b = $1))
            ORDER BY COALESCE(unmatched_at, created_at) DESC
            LIMIT 1
            "#,
            MATCH_COLUMNS
        );

        sqlx::query(&query)
            .bind(a)
            .bind(b)
            .fetch_optional(&self.pool)
            .await?
            .as_ref()
            .map(match_from_row)
            .transpose()
    }

    async fn update_match_status(
        &self,
        id: Uuid,
        status: MatchStatus,
        actor: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Match> {
        let query = format!(
            r#"
            UPDATE matches
            SET status = $2, unmatched_by = $3, unmatched_at = $4
            WHERE id = $1 AND status = 'active'
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let row = sqlx::query(&query)
            .bind(id)
            .bind(status.as_str())
            .bind(actor)
            .bind(at)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("active match {}", id)))?;

        match_from_row(&row)
    }

    async fn list_active_matches(
        &self,
        user: &str,
        page: u32,
        page_size: u32,
    ) -> StoreResult<Vec<Match>> {
        let query = format!(
            r#"
            SELECT {} FROM matches
            WHERE status = 'active' AND (user_a = $1 OR user_b = $1)
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
            MATCH_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user)
            .bind(i64::from(page_size))
            .bind(page_offset(page, page_size) as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(match_from_row).collect()
    }
}
