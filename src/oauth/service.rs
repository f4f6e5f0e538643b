use rand::Rng;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::oauth::google::GoogleProfile;
use crate::users::repo_types::Account;

/// Sequential candidates tried before giving up on the `base`, `base1`,
/// `base2`, ... scheme. Keeps collision probing bounded under adversarial
/// squatting of a name prefix.
const MAX_SEQUENTIAL_CANDIDATES: u32 = 64;
const MAX_RANDOM_CANDIDATES: u32 = 8;

/// Map an external identity assertion to a local account: find by verified
/// email, or create a passwordless account with a synthesized username.
#[instrument(skip(db, profile))]
pub async fn reconcile(db: &PgPool, profile: &GoogleProfile) -> Result<Account, AppError> {
    let email = match &profile.email {
        Some(email) if profile.email_verified => email.trim().to_lowercase(),
        Some(_) => {
            return Err(AppError::Validation(
                "Google account email is not verified".into(),
            ))
        }
        None => {
            return Err(AppError::Validation(
                "Email not found in Google profile".into(),
            ))
        }
    };

    // Repeat logins return the existing account unchanged.
    if let Some(account) = Account::find_by_email(db, &email).await? {
        return Ok(account);
    }

    let first = profile
        .given_name
        .clone()
        .unwrap_or_else(|| "user".to_string());
    let last = profile
        .family_name
        .clone()
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..10_000).to_string());
    let full_name = format!("{} {}", first, last);
    let base = username_base(&first, &last);

    let username = generate_unique_username(db, &base).await?;

    let created = Account::create_from_oauth(
        db,
        &email,
        &username,
        &full_name,
        profile.picture.as_deref(),
    )
    .await;

    match created {
        Ok(account) => {
            info!(account_id = account.id, username = %account.username, "oauth account created");
            Ok(account)
        }
        // Concurrent first logins with the same email: the loser of the
        // insert race picks up the winner's row.
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            match Account::find_by_email(db, &email).await? {
                Some(account) => Ok(account),
                None => Err(AppError::Conflict("Username already taken".into())),
            }
        }
        Err(e) => Err(e.into()),
    }
}

/// Lower-case a name part and strip all whitespace.
pub(crate) fn sanitize_name_part(part: &str) -> String {
    part.to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// `firstname.lastname`, lower-cased, whitespace stripped.
pub(crate) fn username_base(first: &str, last: &str) -> String {
    format!("{}.{}", sanitize_name_part(first), sanitize_name_part(last))
}

/// Candidate `n` for a base username: the base itself, then `base1`, `base2`, ...
pub(crate) fn nth_candidate(base: &str, n: u32) -> String {
    if n == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, n)
    }
}

/// Probe sequential candidates, then random suffixes; errors out instead of
/// looping forever when everything is taken.
async fn generate_unique_username(db: &PgPool, base: &str) -> Result<String, AppError> {
    for n in 0..MAX_SEQUENTIAL_CANDIDATES {
        let candidate = nth_candidate(base, n);
        if !Account::username_taken(db, &candidate).await? {
            return Ok(candidate);
        }
    }

    for _ in 0..MAX_RANDOM_CANDIDATES {
        let candidate = format!("{}{}", base, rand::thread_rng().gen::<u32>());
        if !Account::username_taken(db, &candidate).await? {
            return Ok(candidate);
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not find a free username for base {base}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_parts_are_lowercased_and_stripped() {
        assert_eq!(sanitize_name_part("Jane"), "jane");
        assert_eq!(sanitize_name_part("De La Cruz"), "delacruz");
        assert_eq!(sanitize_name_part(" Mary Ann "), "maryann");
    }

    #[test]
    fn base_joins_first_and_last_with_a_dot() {
        assert_eq!(username_base("Jane", "Doe"), "jane.doe");
        assert_eq!(username_base("Jean Luc", "Van Damme"), "jeanluc.vandamme");
    }

    #[test]
    fn candidate_sequence_starts_with_the_bare_base() {
        assert_eq!(nth_candidate("jane.doe", 0), "jane.doe");
        assert_eq!(nth_candidate("jane.doe", 1), "jane.doe1");
        assert_eq!(nth_candidate("jane.doe", 2), "jane.doe2");
        assert_eq!(nth_candidate("jane.doe", 63), "jane.doe63");
    }

    #[test]
    fn candidates_are_distinct() {
        let all: std::collections::BTreeSet<String> = (0..MAX_SEQUENTIAL_CANDIDATES)
            .map(|n| nth_candidate("jane.doe", n))
            .collect();
        assert_eq!(all.len(), MAX_SEQUENTIAL_CANDIDATES as usize);
    }
}
