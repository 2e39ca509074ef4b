//! SQLite database operations
//!
//! All database access goes through this module.
//! Count caches (member counts, attendee counts, rating aggregates) are
//! always recomputed from the junction tables after a mutation.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::types::Json;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::collections::HashMap;
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Append ` IN (?, ?, ...)` binding every id.
fn push_id_list(builder: &mut QueryBuilder<'_, Sqlite>, ids: &[String]) {
    builder.push(" IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.clone());
    }
    separated.push_unseparated(")");
}

fn map_by_id<T>(rows: Vec<T>, id: impl Fn(&T) -> &str) -> HashMap<String, T> {
    rows.into_iter()
        .map(|row| (id(&row).to_string(), row))
        .collect()
}

async fn recount_hobby_group_members(
    conn: &mut SqliteConnection,
    group_id: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE hobby_groups SET current_members = (SELECT COUNT(*) FROM hobby_group_members WHERE group_id = ?), updated_at = ? WHERE id = ?",
    )
    .bind(group_id)
    .bind(Utc::now())
    .bind(group_id)
    .execute(conn)
    .await?;
    Ok(())
}

async fn recount_event_attendees(
    conn: &mut SqliteConnection,
    event_id: &str,
) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE events SET attendee_count = (SELECT COUNT(*) FROM event_attendees WHERE event_id = ? AND status = 'going'), updated_at = ? WHERE id = ?",
    )
    .bind(event_id)
    .bind(Utc::now())
    .bind(event_id)
    .execute(conn)
    .await?;
    Ok(())
}

impl Database {
    /// Connect to SQLite database with the default pool size.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_pool_size(path, 5).await
    }

    /// Connect to SQLite database and run embedded migrations.
    ///
    /// Creates the parent directory and the database file when missing.
    pub async fn connect_with_pool_size(
        path: &Path,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let db_path = path.to_str().ok_or_else(|| {
            AppError::Config(format!(
                "database path must be valid UTF-8: {}",
                path.display()
            ))
        })?;
        let connection_string = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(&connection_string)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Create the user on first sign-in, otherwise refresh identity fields.
    ///
    /// Returns the stored user and whether it was newly created. A profile
    /// image set through the profile editor is never replaced by the
    /// identity provider's picture.
    pub async fn upsert_user(&self, claims: &UpsertUser) -> Result<(User, bool), AppError> {
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO users
                (id, email, first_name, last_name, profile_image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&claims.id)
        .bind(&claims.email)
        .bind(&claims.first_name)
        .bind(&claims.last_name)
        .bind(&claims.profile_image_url)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected()
            > 0;

        if !inserted {
            sqlx::query(
                r#"
                UPDATE users SET
                    email = ?,
                    first_name = ?,
                    last_name = ?,
                    profile_image_url = COALESCE(profile_image_url, ?),
                    updated_at = ?
                WHERE id = ?
                  AND (email IS NOT ? OR first_name IS NOT ? OR last_name IS NOT ?
                       OR (profile_image_url IS NULL AND ? IS NOT NULL))
                "#,
            )
            .bind(&claims.email)
            .bind(&claims.first_name)
            .bind(&claims.last_name)
            .bind(&claims.profile_image_url)
            .bind(now)
            .bind(&claims.id)
            .bind(&claims.email)
            .bind(&claims.first_name)
            .bind(&claims.last_name)
            .bind(&claims.profile_image_url)
            .execute(&self.pool)
            .await?;
        }

        let user = self.get_user(&claims.id).await?.ok_or(AppError::NotFound)?;
        Ok((user, inserted))
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Fetch users keyed by id; unknown ids are skipped.
    pub async fn get_users_by_ids(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, User>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM users WHERE id");
        push_id_list(&mut builder, ids);
        let users = builder
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;

        Ok(map_by_id(users, |user| &user.id))
    }

    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let updated = sqlx::query(
            r#"
            UPDATE users SET
                display_name = ?,
                age_group = COALESCE(?, age_group),
                location_city = COALESCE(?, location_city),
                location_state = COALESCE(?, location_state),
                location_country = COALESCE(?, location_country),
                share_location = COALESCE(?, share_location),
                bio = COALESCE(?, bio),
                profile_image_url = COALESCE(?, profile_image_url),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.display_name)
        .bind(update.age_group.map(|group| group.as_str()))
        .bind(&update.location_city)
        .bind(&update.location_state)
        .bind(&update.location_country)
        .bind(update.share_location)
        .bind(&update.bio)
        .bind(&update.profile_image_url)
        .bind(Utc::now())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(user_id).await
    }

    pub async fn update_bored_status(
        &self,
        user_id: &str,
        is_bored: bool,
    ) -> Result<Option<User>, AppError> {
        sqlx::query("UPDATE users SET is_bored = ?, updated_at = ? WHERE id = ?")
            .bind(is_bored)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        self.get_user(user_id).await
    }

    /// Users currently flagged bored, most recently updated first.
    pub async fn get_bored_users(
        &self,
        exclude_user_id: &str,
        limit: i64,
    ) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE is_bored = 1 AND id != ? ORDER BY updated_at DESC LIMIT ?",
        )
        .bind(exclude_user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    // =========================================================================
    // Ratings
    // =========================================================================

    /// Store a rating and recompute the rated user's aggregates.
    pub async fn create_rating(&self, rating: &NewRating) -> Result<UserRating, AppError> {
        let row = UserRating {
            id: EntityId::new().0,
            rater_id: rating.rater_id.clone(),
            rated_user_id: rating.rated_user_id.clone(),
            rating: rating.rating,
            experience_type: rating.experience_type.as_str().to_string(),
            comment: rating.comment.clone(),
            activity_context: rating.activity_context.clone(),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO user_ratings
                (id, rater_id, rated_user_id, rating, experience_type, comment, activity_context, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&row.id)
        .bind(&row.rater_id)
        .bind(&row.rated_user_id)
        .bind(row.rating)
        .bind(&row.experience_type)
        .bind(&row.comment)
        .bind(&row.activity_context)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            UPDATE users SET
                average_rating = COALESCE((SELECT AVG(rating) FROM user_ratings WHERE rated_user_id = ?), 0),
                total_ratings = (SELECT COUNT(*) FROM user_ratings WHERE rated_user_id = ?),
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&row.rated_user_id)
        .bind(&row.rated_user_id)
        .bind(Utc::now())
        .bind(&row.rated_user_id)
        .execute(&self.pool)
        .await?;

        Ok(row)
    }

    pub async fn get_user_ratings(&self, user_id: &str) -> Result<Vec<UserRating>, AppError> {
        let ratings = sqlx::query_as::<_, UserRating>(
            "SELECT * FROM user_ratings WHERE rated_user_id = ? ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ratings)
    }

    // =========================================================================
    // Interests
    // =========================================================================

    pub async fn get_all_interests(&self) -> Result<Vec<Interest>, AppError> {
        let interests = sqlx::query_as::<_, Interest>("SELECT * FROM interests ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(interests)
    }

    pub async fn get_interest(&self, id: &str) -> Result<Option<Interest>, AppError> {
        let interest = sqlx::query_as::<_, Interest>("SELECT * FROM interests WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(interest)
    }

    pub async fn get_interests_by_user(&self, user_id: &str) -> Result<Vec<Interest>, AppError> {
        let interests = sqlx::query_as::<_, Interest>(
            r#"
            SELECT i.* FROM interests i
            JOIN user_interests ui ON ui.interest_id = i.id
            WHERE ui.user_id = ?
            ORDER BY i.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(interests)
    }

    pub async fn get_user_interest_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT interest_id FROM user_interests WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Insert a catalog interest. Returns `None` when the name is taken.
    pub async fn create_interest(&self, new: &NewInterest) -> Result<Option<Interest>, AppError> {
        let id = EntityId::new().0;
        let inserted = sqlx::query(
            r#"
            INSERT INTO interests (id, name, description, icon, color, member_count, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.icon)
        .bind(&new.color)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_interest(&id).await
    }

    /// Attach an interest to a user. Re-adding is a no-op.
    pub async fn add_user_interest(
        &self,
        user_id: &str,
        interest_id: &str,
    ) -> Result<bool, AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO user_interests (id, user_id, interest_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, interest_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(user_id)
        .bind(interest_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.update_interest_member_count(interest_id).await?;
        Ok(inserted.rows_affected() > 0)
    }

    pub async fn remove_user_interest(
        &self,
        user_id: &str,
        interest_id: &str,
    ) -> Result<bool, AppError> {
        let deleted =
            sqlx::query("DELETE FROM user_interests WHERE user_id = ? AND interest_id = ?")
                .bind(user_id)
                .bind(interest_id)
                .execute(&self.pool)
                .await?;

        self.update_interest_member_count(interest_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn update_interest_member_count(&self, interest_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE interests SET member_count = (SELECT COUNT(*) FROM user_interests WHERE interest_id = ?) WHERE id = ?",
        )
        .bind(interest_id)
        .bind(interest_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Interests that have members, with how many of those members are bored.
    pub async fn get_interest_groups(&self) -> Result<Vec<InterestGroup>, AppError> {
        let groups = sqlx::query_as::<_, InterestGroup>(
            r#"
            SELECT i.*,
                (SELECT COUNT(*) FROM user_interests ui
                 JOIN users u ON u.id = ui.user_id
                 WHERE ui.interest_id = i.id AND u.is_bored = 1) AS bored_count
            FROM interests i
            WHERE i.member_count > 0
            ORDER BY i.member_count DESC, i.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    /// Junction rows of other users holding any of `interest_ids`.
    ///
    /// Rows come back in junction insertion order. `limit` caps the number of
    /// rows, not users.
    pub async fn get_member_interest_rows(
        &self,
        interest_ids: &[String],
        exclude_user_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<MemberInterestRow>, AppError> {
        if interest_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT ui.user_id AS member_id, i.* FROM user_interests ui \
             JOIN interests i ON i.id = ui.interest_id \
             WHERE ui.user_id != ",
        );
        builder.push_bind(exclude_user_id.to_string());
        builder.push(" AND ui.interest_id");
        push_id_list(&mut builder, interest_ids);
        builder.push(" ORDER BY ui.rowid");
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build_query_as::<MemberInterestRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Full interest lists of the given users.
    pub async fn get_interest_rows_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<MemberInterestRow>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT ui.user_id AS member_id, i.* FROM user_interests ui \
             JOIN interests i ON i.id = ui.interest_id \
             WHERE ui.user_id",
        );
        push_id_list(&mut builder, user_ids);
        builder.push(" ORDER BY ui.rowid");

        let rows = builder
            .build_query_as::<MemberInterestRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // =========================================================================
    // Hobbies
    // =========================================================================

    pub async fn get_all_hobbies(&self) -> Result<Vec<Hobby>, AppError> {
        let hobbies = sqlx::query_as::<_, Hobby>("SELECT * FROM hobbies ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(hobbies)
    }

    pub async fn get_hobby(&self, id: &str) -> Result<Option<Hobby>, AppError> {
        let hobby = sqlx::query_as::<_, Hobby>("SELECT * FROM hobbies WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hobby)
    }

    pub async fn get_hobbies_by_ids(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Hobby>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM hobbies WHERE id");
        push_id_list(&mut builder, ids);
        let hobbies = builder
            .build_query_as::<Hobby>()
            .fetch_all(&self.pool)
            .await?;
        Ok(map_by_id(hobbies, |hobby| &hobby.id))
    }

    pub async fn get_user_hobby_ids(&self, user_id: &str) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT hobby_id FROM user_hobbies WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// A user's hobbies with their experience level and schedule.
    pub async fn get_hobbies_by_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<HobbyWithUserDetails>, AppError> {
        let user_hobbies = sqlx::query_as::<_, UserHobby>(
            "SELECT * FROM user_hobbies WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let hobby_ids: Vec<String> = user_hobbies.iter().map(|uh| uh.hobby_id.clone()).collect();
        let mut hobbies = self.get_hobbies_by_ids(&hobby_ids).await?;

        Ok(user_hobbies
            .into_iter()
            .filter_map(|user_hobby| {
                hobbies
                    .remove(&user_hobby.hobby_id)
                    .map(|hobby| HobbyWithUserDetails { hobby, user_hobby })
            })
            .collect())
    }

    /// Insert a catalog hobby. Returns `None` when the name is taken.
    pub async fn create_hobby(&self, new: &NewHobby) -> Result<Option<Hobby>, AppError> {
        let id = EntityId::new().0;
        let inserted = sqlx::query(
            r#"
            INSERT INTO hobbies
                (id, name, description, category, icon, color, is_elderly_friendly, difficulty_level, member_count, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.category)
        .bind(&new.icon)
        .bind(&new.color)
        .bind(new.is_elderly_friendly)
        .bind(new.difficulty_level.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_hobby(&id).await
    }

    /// Attach a hobby to a user, updating the attributes when already attached.
    pub async fn add_user_hobby(
        &self,
        user_id: &str,
        hobby_id: &str,
        details: &NewUserHobby,
    ) -> Result<UserHobby, AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_hobbies
                (id, user_id, hobby_id, experience_level, is_looking_for_partners, available_schedule, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, hobby_id) DO UPDATE SET
                experience_level = excluded.experience_level,
                is_looking_for_partners = excluded.is_looking_for_partners,
                available_schedule = excluded.available_schedule
            "#,
        )
        .bind(EntityId::new().0)
        .bind(user_id)
        .bind(hobby_id)
        .bind(details.experience_level.as_str())
        .bind(details.is_looking_for_partners)
        .bind(details.available_schedule.clone().map(Json))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.update_hobby_member_count(hobby_id).await?;

        let row = sqlx::query_as::<_, UserHobby>(
            "SELECT * FROM user_hobbies WHERE user_id = ? AND hobby_id = ?",
        )
        .bind(user_id)
        .bind(hobby_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn remove_user_hobby(&self, user_id: &str, hobby_id: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM user_hobbies WHERE user_id = ? AND hobby_id = ?")
            .bind(user_id)
            .bind(hobby_id)
            .execute(&self.pool)
            .await?;

        self.update_hobby_member_count(hobby_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn update_hobby_member_count(&self, hobby_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE hobbies SET member_count = (SELECT COUNT(*) FROM user_hobbies WHERE hobby_id = ?) WHERE id = ?",
        )
        .bind(hobby_id)
        .bind(hobby_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Junction rows of other users holding any of `hobby_ids`.
    ///
    /// With `looking_for_partners_only`, holders who opted out of partner
    /// matching are skipped.
    pub async fn get_member_hobby_rows(
        &self,
        hobby_ids: &[String],
        exclude_user_id: &str,
        looking_for_partners_only: bool,
        limit: Option<i64>,
    ) -> Result<Vec<MemberHobbyRow>, AppError> {
        if hobby_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT uh.user_id AS member_id, h.* FROM user_hobbies uh \
             JOIN hobbies h ON h.id = uh.hobby_id \
             WHERE uh.user_id != ",
        );
        builder.push_bind(exclude_user_id.to_string());
        if looking_for_partners_only {
            builder.push(" AND uh.is_looking_for_partners = 1");
        }
        builder.push(" AND uh.hobby_id");
        push_id_list(&mut builder, hobby_ids);
        builder.push(" ORDER BY uh.rowid");
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit);
        }

        let rows = builder
            .build_query_as::<MemberHobbyRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn get_hobby_rows_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<MemberHobbyRow>, AppError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT uh.user_id AS member_id, h.* FROM user_hobbies uh \
             JOIN hobbies h ON h.id = uh.hobby_id \
             WHERE uh.user_id",
        );
        push_id_list(&mut builder, user_ids);
        builder.push(" ORDER BY uh.rowid");

        let rows = builder
            .build_query_as::<MemberHobbyRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    // =========================================================================
    // Skills
    // =========================================================================

    pub async fn get_skills(&self) -> Result<Vec<Skill>, AppError> {
        let skills = sqlx::query_as::<_, Skill>("SELECT * FROM skills ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(skills)
    }

    pub async fn get_skill(&self, id: &str) -> Result<Option<Skill>, AppError> {
        let skill = sqlx::query_as::<_, Skill>("SELECT * FROM skills WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(skill)
    }

    async fn get_skills_by_ids(&self, ids: &[String]) -> Result<HashMap<String, Skill>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM skills WHERE id");
        push_id_list(&mut builder, ids);
        let skills = builder
            .build_query_as::<Skill>()
            .fetch_all(&self.pool)
            .await?;
        Ok(map_by_id(skills, |skill| &skill.id))
    }

    /// Insert a catalog skill. Returns `None` when the name is taken.
    pub async fn create_skill(&self, new: &NewSkill) -> Result<Option<Skill>, AppError> {
        let id = EntityId::new().0;
        let inserted = sqlx::query(
            r#"
            INSERT INTO skills (id, name, category, description, member_count, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.category)
        .bind(&new.description)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_skill(&id).await
    }

    pub async fn get_user_skills(
        &self,
        user_id: &str,
    ) -> Result<Vec<SkillWithUserDetails>, AppError> {
        let user_skills = sqlx::query_as::<_, UserSkill>(
            "SELECT * FROM user_skills WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let skill_ids: Vec<String> = user_skills.iter().map(|us| us.skill_id.clone()).collect();
        let mut skills = self.get_skills_by_ids(&skill_ids).await?;

        Ok(user_skills
            .into_iter()
            .filter_map(|user_skill| {
                skills
                    .remove(&user_skill.skill_id)
                    .map(|skill| SkillWithUserDetails { skill, user_skill })
            })
            .collect())
    }

    /// Attach a skill to a user, updating level and flags when already attached.
    pub async fn add_user_skill(
        &self,
        user_id: &str,
        skill_id: &str,
        details: &NewUserSkill,
    ) -> Result<UserSkill, AppError> {
        sqlx::query(
            r#"
            INSERT INTO user_skills (id, user_id, skill_id, level, is_teaching, is_learning, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id, skill_id) DO UPDATE SET
                level = excluded.level,
                is_teaching = excluded.is_teaching,
                is_learning = excluded.is_learning
            "#,
        )
        .bind(EntityId::new().0)
        .bind(user_id)
        .bind(skill_id)
        .bind(details.level.as_str())
        .bind(details.is_teaching)
        .bind(details.is_learning)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.update_skill_member_count(skill_id).await?;

        let row = sqlx::query_as::<_, UserSkill>(
            "SELECT * FROM user_skills WHERE user_id = ? AND skill_id = ?",
        )
        .bind(user_id)
        .bind(skill_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn remove_user_skill(&self, user_id: &str, skill_id: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM user_skills WHERE user_id = ? AND skill_id = ?")
            .bind(user_id)
            .bind(skill_id)
            .execute(&self.pool)
            .await?;

        self.update_skill_member_count(skill_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn update_skill_member_count(&self, skill_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE skills SET member_count = (SELECT COUNT(*) FROM user_skills WHERE skill_id = ?) WHERE id = ?",
        )
        .bind(skill_id)
        .bind(skill_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Users teaching (`teaching = true`) or learning a skill.
    pub async fn get_skill_holders(&self, teaching: bool) -> Result<Vec<SkillHolder>, AppError> {
        let sql = if teaching {
            "SELECT * FROM user_skills WHERE is_teaching = 1 ORDER BY created_at DESC"
        } else {
            "SELECT * FROM user_skills WHERE is_learning = 1 ORDER BY created_at DESC"
        };
        let user_skills = sqlx::query_as::<_, UserSkill>(sql)
            .fetch_all(&self.pool)
            .await?;

        let user_ids: Vec<String> = user_skills.iter().map(|us| us.user_id.clone()).collect();
        let skill_ids: Vec<String> = user_skills.iter().map(|us| us.skill_id.clone()).collect();
        let users = self.get_users_by_ids(&user_ids).await?;
        let skills = self.get_skills_by_ids(&skill_ids).await?;

        Ok(user_skills
            .into_iter()
            .filter_map(|user_skill| {
                let user = users.get(&user_skill.user_id)?.clone();
                let skill = skills.get(&user_skill.skill_id)?.clone();
                Some(SkillHolder {
                    user,
                    user_skill,
                    skill,
                })
            })
            .collect())
    }

    // =========================================================================
    // Connections
    // =========================================================================

    pub async fn get_connection(&self, id: &str) -> Result<Option<Connection>, AppError> {
        let connection = sqlx::query_as::<_, Connection>(
            "SELECT id, requester_id, receiver_id, status, created_at, updated_at FROM connections WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(connection)
    }

    /// The row for an unordered pair, whichever side requested.
    pub async fn get_connection_between(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Option<Connection>, AppError> {
        let (low, high) = canonical_pair(user_a, user_b);
        let connection = sqlx::query_as::<_, Connection>(
            "SELECT id, requester_id, receiver_id, status, created_at, updated_at FROM connections WHERE user_low = ? AND user_high = ?",
        )
        .bind(low)
        .bind(high)
        .fetch_optional(&self.pool)
        .await?;
        Ok(connection)
    }

    /// Insert a pending connection unless the pair already has a row.
    ///
    /// Returns `None` when a row exists in either direction.
    pub async fn insert_connection_if_absent(
        &self,
        requester_id: &str,
        receiver_id: &str,
    ) -> Result<Option<Connection>, AppError> {
        let (low, high) = canonical_pair(requester_id, receiver_id);
        let id = EntityId::new().0;
        let now = Utc::now();

        let inserted = sqlx::query(
            r#"
            INSERT INTO connections
                (id, requester_id, receiver_id, user_low, user_high, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_low, user_high) DO NOTHING
            "#,
        )
        .bind(&id)
        .bind(requester_id)
        .bind(receiver_id)
        .bind(low)
        .bind(high)
        .bind(ConnectionStatus::Pending.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection(&id).await
    }

    /// Turn a declined row back into a pending request from `requester_id`.
    ///
    /// Returns `None` when the pair has no declined row.
    pub async fn reopen_declined_connection(
        &self,
        requester_id: &str,
        receiver_id: &str,
    ) -> Result<Option<Connection>, AppError> {
        let (low, high) = canonical_pair(requester_id, receiver_id);
        let updated = sqlx::query(
            r#"
            UPDATE connections
            SET requester_id = ?, receiver_id = ?, status = ?, updated_at = ?
            WHERE user_low = ? AND user_high = ? AND status = ?
            "#,
        )
        .bind(requester_id)
        .bind(receiver_id)
        .bind(ConnectionStatus::Pending.as_str())
        .bind(Utc::now())
        .bind(low)
        .bind(high)
        .bind(ConnectionStatus::Declined.as_str())
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_connection_between(requester_id, receiver_id).await
    }

    /// Move a pending connection to `status`. Returns false when the row is
    /// no longer pending.
    pub async fn resolve_pending_connection(
        &self,
        id: &str,
        status: ConnectionStatus,
    ) -> Result<bool, AppError> {
        let updated = sqlx::query(
            "UPDATE connections SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id)
        .bind(ConnectionStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected() > 0)
    }

    /// Connections in `status` where the user is either party, latest first.
    pub async fn get_connections(
        &self,
        user_id: &str,
        status: ConnectionStatus,
    ) -> Result<Vec<Connection>, AppError> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
            SELECT id, requester_id, receiver_id, status, created_at, updated_at
            FROM connections
            WHERE (requester_id = ? OR receiver_id = ?) AND status = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(connections)
    }

    /// Pending requests addressed to the user, newest first.
    pub async fn get_pending_requests(&self, user_id: &str) -> Result<Vec<Connection>, AppError> {
        let connections = sqlx::query_as::<_, Connection>(
            r#"
            SELECT id, requester_id, receiver_id, status, created_at, updated_at
            FROM connections
            WHERE receiver_id = ? AND status = ?
            ORDER BY updated_at DESC
            "#,
        )
        .bind(user_id)
        .bind(ConnectionStatus::Pending.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(connections)
    }

    // =========================================================================
    // Messages
    // =========================================================================

    pub async fn create_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        content: &str,
        photo_url: Option<&str>,
    ) -> Result<Message, AppError> {
        let message = Message {
            id: EntityId::new().0,
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            content: content.to_string(),
            is_read: false,
            photo_url: photo_url.map(ToOwned::to_owned),
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, is_read, photo_url, created_at)
            VALUES (?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&message.id)
        .bind(&message.sender_id)
        .bind(&message.receiver_id)
        .bind(&message.content)
        .bind(&message.photo_url)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;

        Ok(message)
    }

    /// All messages between two users in send order.
    pub async fn get_conversation(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Mark every unread message from `sender_id` to `receiver_id` read.
    pub async fn mark_messages_read(
        &self,
        receiver_id: &str,
        sender_id: &str,
    ) -> Result<u64, AppError> {
        let updated = sqlx::query(
            "UPDATE messages SET is_read = 1 WHERE receiver_id = ? AND sender_id = ? AND is_read = 0",
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&self.pool)
        .await?;
        Ok(updated.rows_affected())
    }

    pub async fn count_unread_messages(
        &self,
        receiver_id: &str,
        sender_id: Option<&str>,
    ) -> Result<i64, AppError> {
        let count = match sender_id {
            Some(sender_id) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND sender_id = ? AND is_read = 0",
                )
                .bind(receiver_id)
                .bind(sender_id)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0",
                )
                .bind(receiver_id)
                .fetch_one(&self.pool)
                .await?
            }
        };
        Ok(count)
    }

    /// Latest message per counterpart, newest conversation first.
    pub async fn get_latest_messages_per_counterpart(
        &self,
        user_id: &str,
    ) -> Result<Vec<Message>, AppError> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT * FROM messages
            WHERE rowid IN (
                SELECT MAX(rowid) FROM messages
                WHERE sender_id = ? OR receiver_id = ?
                GROUP BY CASE WHEN sender_id = ? THEN receiver_id ELSE sender_id END
            )
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Unread message counts addressed to the user, keyed by sender.
    pub async fn get_unread_counts_by_sender(
        &self,
        receiver_id: &str,
    ) -> Result<HashMap<String, i64>, AppError> {
        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT sender_id, COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0 GROUP BY sender_id",
        )
        .bind(receiver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().collect())
    }

    // =========================================================================
    // Activities
    // =========================================================================

    pub async fn create_activity(&self, new: &NewActivity) -> Result<Activity, AppError> {
        let activity = Activity {
            id: EntityId::new().0,
            user_id: new.user_id.clone(),
            activity_type: new.activity_type.as_str().to_string(),
            title: new.title.clone(),
            description: new.description.clone(),
            metadata: new.metadata.clone().map(Json),
            is_public: new.is_public,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO activities (id, user_id, activity_type, title, description, metadata, is_public, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&activity.id)
        .bind(&activity.user_id)
        .bind(&activity.activity_type)
        .bind(&activity.title)
        .bind(&activity.description)
        .bind(&activity.metadata)
        .bind(activity.is_public)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await?;

        Ok(activity)
    }

    /// Latest public activities with their authors.
    pub async fn get_activities(&self, limit: i64) -> Result<Vec<ActivityWithUser>, AppError> {
        let activities = sqlx::query_as::<_, Activity>(
            "SELECT * FROM activities WHERE is_public = 1 ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let user_ids: Vec<String> = activities.iter().map(|a| a.user_id.clone()).collect();
        let users = self.get_users_by_ids(&user_ids).await?;

        Ok(activities
            .into_iter()
            .filter_map(|activity| {
                let user = users.get(&activity.user_id)?.clone();
                Some(ActivityWithUser { activity, user })
            })
            .collect())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub async fn create_notification(
        &self,
        new: &NewNotification,
    ) -> Result<Notification, AppError> {
        let notification = Notification {
            id: EntityId::new().0,
            user_id: new.user_id.clone(),
            notification_type: new.notification_type.as_str().to_string(),
            title: new.title.clone(),
            message: new.message.clone(),
            related_id: new.related_id.clone(),
            related_type: new.related_type.map(ToOwned::to_owned),
            is_read: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO notifications
                (id, user_id, notification_type, title, message, related_id, related_type, is_read, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.user_id)
        .bind(&notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(&notification.related_id)
        .bind(&notification.related_type)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn get_notifications(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    /// Mark one of the user's notifications read. Returns false when the
    /// notification does not belong to the user.
    pub async fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool, AppError> {
        let updated =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(updated.rows_affected() > 0)
    }

    pub async fn mark_all_notifications_read(&self, user_id: &str) -> Result<u64, AppError> {
        let updated =
            sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(updated.rows_affected())
    }

    pub async fn count_unread_notifications(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    // =========================================================================
    // Events
    // =========================================================================

    pub async fn create_event(&self, new: &NewEvent) -> Result<Event, AppError> {
        let now = Utc::now();
        let event = Event {
            id: EntityId::new().0,
            title: new.title.clone(),
            description: new.description.clone(),
            location: new.location.clone(),
            is_virtual: new.is_virtual,
            start_date: new.start_date,
            end_date: new.end_date,
            creator_id: new.creator_id.clone(),
            max_attendees: new.max_attendees,
            attendee_count: 0,
            image_url: new.image_url.clone(),
            tags: Some(Json(new.tags.clone())),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO events
                (id, title, description, location, is_virtual, start_date, end_date, creator_id,
                 max_attendees, attendee_count, image_url, tags, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.is_virtual)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(&event.creator_id)
        .bind(event.max_attendees)
        .bind(&event.image_url)
        .bind(&event.tags)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(event)
    }

    pub async fn get_event(&self, id: &str) -> Result<Option<Event>, AppError> {
        let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }

    /// Active events with creators, latest start first.
    pub async fn get_events(&self) -> Result<Vec<EventWithCreator>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE is_active = 1 ORDER BY start_date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_event_creators(events).await
    }

    pub async fn get_events_by_creator(
        &self,
        user_id: &str,
    ) -> Result<Vec<EventWithCreator>, AppError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT * FROM events WHERE creator_id = ? ORDER BY start_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_event_creators(events).await
    }

    async fn attach_event_creators(
        &self,
        events: Vec<Event>,
    ) -> Result<Vec<EventWithCreator>, AppError> {
        let creator_ids: Vec<String> = events.iter().map(|e| e.creator_id.clone()).collect();
        let creators = self.get_users_by_ids(&creator_ids).await?;

        Ok(events
            .into_iter()
            .filter_map(|event| {
                let creator = UserSummary::from(creators.get(&event.creator_id)?);
                Some(EventWithCreator { event, creator })
            })
            .collect())
    }

    /// Record the user's attendance status and recompute the attendee count.
    ///
    /// A `going` status is refused once `max_attendees` going attendees exist;
    /// changing to `maybe` or `not_going` always succeeds.
    pub async fn join_event(
        &self,
        event_id: &str,
        user_id: &str,
        status: AttendeeStatus,
    ) -> Result<JoinOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        // Writing first takes the SQLite write lock before the capacity read.
        let touched = sqlx::query("UPDATE events SET updated_at = updated_at WHERE id = ?")
            .bind(event_id)
            .execute(&mut *tx)
            .await?;
        if touched.rows_affected() == 0 {
            return Ok(JoinOutcome::NotFound);
        }

        let (max_attendees, is_active) = sqlx::query_as::<_, (Option<i64>, bool)>(
            "SELECT max_attendees, is_active FROM events WHERE id = ?",
        )
        .bind(event_id)
        .fetch_one(&mut *tx)
        .await?;
        if !is_active {
            return Ok(JoinOutcome::NotFound);
        }

        if status == AttendeeStatus::Going {
            if let Some(max_attendees) = max_attendees {
                let going_others = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM event_attendees WHERE event_id = ? AND status = 'going' AND user_id != ?",
                )
                .bind(event_id)
                .bind(user_id)
                .fetch_one(&mut *tx)
                .await?;
                if going_others >= max_attendees {
                    return Ok(JoinOutcome::Full);
                }
            }
        }

        sqlx::query(
            r#"
            INSERT INTO event_attendees (id, event_id, user_id, status, joined_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(event_id, user_id) DO UPDATE SET status = excluded.status
            "#,
        )
        .bind(EntityId::new().0)
        .bind(event_id)
        .bind(user_id)
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        recount_event_attendees(&mut *tx, event_id).await?;
        tx.commit().await?;
        Ok(JoinOutcome::Joined)
    }

    pub async fn leave_event(&self, event_id: &str, user_id: &str) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        let deleted = sqlx::query("DELETE FROM event_attendees WHERE event_id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(&mut *conn)
            .await?;

        recount_event_attendees(&mut *conn, event_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn get_event_attendee(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> Result<Option<EventAttendee>, AppError> {
        let attendee = sqlx::query_as::<_, EventAttendee>(
            "SELECT * FROM event_attendees WHERE event_id = ? AND user_id = ?",
        )
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attendee)
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Create a group and enrol the creator as admin.
    pub async fn create_group(&self, new: &NewGroup) -> Result<Group, AppError> {
        let id = EntityId::new().0;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO community_groups
                (id, name, description, creator_id, is_private, member_count, image_url, tags, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.creator_id)
        .bind(new.is_private)
        .bind(&new.image_url)
        .bind(Json(&new.tags))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.insert_group_member(&id, &new.creator_id, GroupRole::Admin)
            .await?;

        self.get_group(&id).await?.ok_or(AppError::NotFound)
    }

    pub async fn get_group(&self, id: &str) -> Result<Option<Group>, AppError> {
        let group = sqlx::query_as::<_, Group>("SELECT * FROM community_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    /// Public groups with creators, newest first.
    pub async fn get_groups(&self) -> Result<Vec<GroupWithCreator>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT * FROM community_groups WHERE is_private = 0 ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        self.attach_group_creators(groups).await
    }

    /// Groups the user belongs to, most recently joined first.
    pub async fn get_groups_for_member(
        &self,
        user_id: &str,
    ) -> Result<Vec<GroupWithCreator>, AppError> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.* FROM community_groups g
            JOIN group_members m ON m.group_id = g.id
            WHERE m.user_id = ?
            ORDER BY m.joined_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.attach_group_creators(groups).await
    }

    async fn attach_group_creators(
        &self,
        groups: Vec<Group>,
    ) -> Result<Vec<GroupWithCreator>, AppError> {
        let creator_ids: Vec<String> = groups.iter().map(|g| g.creator_id.clone()).collect();
        let creators = self.get_users_by_ids(&creator_ids).await?;

        Ok(groups
            .into_iter()
            .filter_map(|group| {
                let creator = UserSummary::from(creators.get(&group.creator_id)?);
                Some(GroupWithCreator { group, creator })
            })
            .collect())
    }

    async fn insert_group_member(
        &self,
        group_id: &str,
        user_id: &str,
        role: GroupRole,
    ) -> Result<bool, AppError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO group_members (id, group_id, user_id, role, joined_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(group_id, user_id) DO NOTHING
            "#,
        )
        .bind(EntityId::new().0)
        .bind(group_id)
        .bind(user_id)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.update_group_member_count(group_id).await?;
        Ok(inserted.rows_affected() > 0)
    }

    pub async fn join_group(&self, group_id: &str, user_id: &str) -> Result<JoinOutcome, AppError> {
        if self.get_group(group_id).await?.is_none() {
            return Ok(JoinOutcome::NotFound);
        }

        if self
            .insert_group_member(group_id, user_id, GroupRole::Member)
            .await?
        {
            Ok(JoinOutcome::Joined)
        } else {
            Ok(JoinOutcome::AlreadyMember)
        }
    }

    pub async fn leave_group(&self, group_id: &str, user_id: &str) -> Result<bool, AppError> {
        let deleted = sqlx::query("DELETE FROM group_members WHERE group_id = ? AND user_id = ?")
            .bind(group_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        self.update_group_member_count(group_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn update_group_member_count(&self, group_id: &str) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE community_groups SET member_count = (SELECT COUNT(*) FROM group_members WHERE group_id = ?), updated_at = ? WHERE id = ?",
        )
        .bind(group_id)
        .bind(Utc::now())
        .bind(group_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_group_members(&self, group_id: &str) -> Result<Vec<GroupMember>, AppError> {
        let members = sqlx::query_as::<_, GroupMember>(
            "SELECT * FROM group_members WHERE group_id = ? ORDER BY joined_at",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    // =========================================================================
    // Hobby groups
    // =========================================================================

    /// Create a hobby group and enrol the creator as organizer.
    pub async fn create_hobby_group(&self, new: &NewHobbyGroup) -> Result<HobbyGroup, AppError> {
        let id = EntityId::new().0;
        let now = Utc::now();
        let mut conn = self.pool.acquire().await?;

        sqlx::query(
            r#"
            INSERT INTO hobby_groups
                (id, name, description, hobby_id, creator_id, location, max_members, current_members,
                 target_age_group, meeting_schedule, is_active, image_url, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(&new.hobby_id)
        .bind(&new.creator_id)
        .bind(new.location.clone().map(Json))
        .bind(new.max_members)
        .bind(new.target_age_group.map(|group| group.as_str()))
        .bind(new.meeting_schedule.clone().map(Json))
        .bind(&new.image_url)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            "INSERT INTO hobby_group_members (id, group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(&id)
        .bind(&new.creator_id)
        .bind(HobbyGroupRole::Organizer.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        recount_hobby_group_members(&mut *conn, &id).await?;
        drop(conn);

        self.get_hobby_group(&id).await?.ok_or(AppError::NotFound)
    }

    pub async fn get_hobby_group(&self, id: &str) -> Result<Option<HobbyGroup>, AppError> {
        let group = sqlx::query_as::<_, HobbyGroup>("SELECT * FROM hobby_groups WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(group)
    }

    /// Active hobby groups with hobby and creator, newest first.
    pub async fn get_hobby_groups(
        &self,
        hobby_id: Option<&str>,
    ) -> Result<Vec<HobbyGroupDetails>, AppError> {
        let groups = match hobby_id {
            Some(hobby_id) => {
                sqlx::query_as::<_, HobbyGroup>(
                    "SELECT * FROM hobby_groups WHERE is_active = 1 AND hobby_id = ? ORDER BY created_at DESC",
                )
                .bind(hobby_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, HobbyGroup>(
                    "SELECT * FROM hobby_groups WHERE is_active = 1 ORDER BY created_at DESC",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let with_roles = groups.into_iter().map(|group| (group, None)).collect();
        self.attach_hobby_group_details(with_roles).await
    }

    /// Hobby groups the user belongs to, with the user's role.
    pub async fn get_hobby_groups_for_member(
        &self,
        user_id: &str,
    ) -> Result<Vec<HobbyGroupDetails>, AppError> {
        let memberships = sqlx::query_as::<_, HobbyGroupMember>(
            "SELECT * FROM hobby_group_members WHERE user_id = ? ORDER BY joined_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut with_roles = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if let Some(group) = self.get_hobby_group(&membership.group_id).await? {
                with_roles.push((group, Some(membership.role)));
            }
        }
        self.attach_hobby_group_details(with_roles).await
    }

    async fn attach_hobby_group_details(
        &self,
        groups: Vec<(HobbyGroup, Option<String>)>,
    ) -> Result<Vec<HobbyGroupDetails>, AppError> {
        let hobby_ids: Vec<String> = groups.iter().map(|(g, _)| g.hobby_id.clone()).collect();
        let creator_ids: Vec<String> = groups.iter().map(|(g, _)| g.creator_id.clone()).collect();
        let hobbies = self.get_hobbies_by_ids(&hobby_ids).await?;
        let creators = self.get_users_by_ids(&creator_ids).await?;

        Ok(groups
            .into_iter()
            .filter_map(|(group, role)| {
                let hobby = hobbies.get(&group.hobby_id)?.clone();
                let creator = creators.get(&group.creator_id)?.clone();
                Some(HobbyGroupDetails {
                    member_count: group.current_members,
                    group,
                    hobby,
                    creator,
                    role,
                })
            })
            .collect())
    }

    /// Join an active hobby group if it has room.
    ///
    /// The existence, duplicate and capacity checks run in the same
    /// write transaction as the insert. A dropped future rolls it back.
    pub async fn join_hobby_group(
        &self,
        group_id: &str,
        user_id: &str,
    ) -> Result<JoinOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let touched =
            sqlx::query("UPDATE hobby_groups SET updated_at = updated_at WHERE id = ?")
                .bind(group_id)
                .execute(&mut *tx)
                .await?;
        if touched.rows_affected() == 0 {
            return Ok(JoinOutcome::NotFound);
        }

        let (max_members, is_active) = sqlx::query_as::<_, (i64, bool)>(
            "SELECT max_members, is_active FROM hobby_groups WHERE id = ?",
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;
        if !is_active {
            return Ok(JoinOutcome::NotFound);
        }

        let already_member = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM hobby_group_members WHERE group_id = ? AND user_id = ?",
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?
            > 0;
        if already_member {
            return Ok(JoinOutcome::AlreadyMember);
        }

        let members = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM hobby_group_members WHERE group_id = ?",
        )
        .bind(group_id)
        .fetch_one(&mut *tx)
        .await?;
        if members >= max_members {
            return Ok(JoinOutcome::Full);
        }

        sqlx::query(
            "INSERT INTO hobby_group_members (id, group_id, user_id, role, joined_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(EntityId::new().0)
        .bind(group_id)
        .bind(user_id)
        .bind(HobbyGroupRole::Member.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        recount_hobby_group_members(&mut *tx, group_id).await?;
        tx.commit().await?;
        Ok(JoinOutcome::Joined)
    }

    pub async fn leave_hobby_group(&self, group_id: &str, user_id: &str) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        let deleted =
            sqlx::query("DELETE FROM hobby_group_members WHERE group_id = ? AND user_id = ?")
                .bind(group_id)
                .bind(user_id)
                .execute(&mut *conn)
                .await?;

        recount_hobby_group_members(&mut *conn, group_id).await?;
        Ok(deleted.rows_affected() > 0)
    }

    pub async fn get_hobby_group_members(
        &self,
        group_id: &str,
    ) -> Result<Vec<HobbyGroupMemberWithUser>, AppError> {
        let members = sqlx::query_as::<_, HobbyGroupMember>(
            "SELECT * FROM hobby_group_members WHERE group_id = ? ORDER BY joined_at",
        )
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        let user_ids: Vec<String> = members.iter().map(|m| m.user_id.clone()).collect();
        let users = self.get_users_by_ids(&user_ids).await?;

        Ok(members
            .into_iter()
            .filter_map(|member| {
                let user = users.get(&member.user_id)?.clone();
                Some(HobbyGroupMemberWithUser { member, user })
            })
            .collect())
    }
}
