use sqlx::PgPool;

use crate::users::repo_types::Account;

const ACCOUNT_COLUMNS: &str = "id, username, email, phone, password_hash, full_name, \
                               location, image, badge, ratings, created_at";

impl Account {
    pub async fn find_by_username(
        db: &PgPool,
        username: &str,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_email(db: &PgPool, email: &str) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i64) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn username_taken(db: &PgPool, username: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE username = $1)")
            .bind(username)
            .fetch_one(db)
            .await
    }

    /// Create an account from password registration. Ratings start empty,
    /// badge false, full name defaults to the username.
    pub async fn create_with_password(
        db: &PgPool,
        email: &str,
        phone: &str,
        username: &str,
        password_hash: &str,
    ) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO users (email, phone, username, password_hash, full_name)
             VALUES ($1, $2, $3, $4, $3)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email)
        .bind(phone)
        .bind(username)
        .bind(password_hash)
        .fetch_one(db)
        .await
    }

    /// Create an account from a first OAuth login. No password hash.
    pub async fn create_from_oauth(
        db: &PgPool,
        email: &str,
        username: &str,
        full_name: &str,
        image: Option<&str>,
    ) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO users (email, username, full_name, image)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(email)
        .bind(username)
        .bind(full_name)
        .bind(image)
        .fetch_one(db)
        .await
    }

    pub async fn update_location(
        db: &PgPool,
        id: i64,
        location: &str,
    ) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE users SET location = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(location)
        .fetch_one(db)
        .await
    }

    pub async fn update_image(db: &PgPool, id: i64, key: &str) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE users SET image = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(key)
        .fetch_one(db)
        .await
    }

    /// Rename the account. The unique constraint on username makes the
    /// check-then-rename race safe: a concurrent taker surfaces as a
    /// unique violation, not a duplicate.
    pub async fn rename(
        db: &PgPool,
        id: i64,
        new_username: &str,
    ) -> Result<Account, sqlx::Error> {
        sqlx::query_as::<_, Account>(&format!(
            "UPDATE users SET username = $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(new_username)
        .fetch_one(db)
        .await
    }

    /// Merge one rater's grade into the target's rating map, overwriting any
    /// prior grade from the same rater. A single UPDATE so the
    /// read-modify-write is atomic per record. Returns false when the target
    /// does not exist.
    pub async fn merge_rating(
        db: &PgPool,
        target_username: &str,
        rater_username: &str,
        grade: f32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET ratings = ratings || jsonb_build_object($2::text, $3::float4)
             WHERE username = $1",
        )
        .bind(target_username)
        .bind(rater_username)
        .bind(grade)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
