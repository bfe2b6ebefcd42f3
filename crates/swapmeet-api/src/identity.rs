use anyhow::Result;
use uuid::Uuid;

use swapmeet_db::Database;
use swapmeet_db::models::UserRow;

use crate::firebase::IdentityClaims;

/// Map a verified external identity to a local user, creating one on first
/// sight. The username is derived from the email, falling back to the
/// subject id; the display name splits into first/last at the first space.
///
/// Derived-username collisions are not handled: the unique constraint on
/// users.username turns them into an insert error.
pub fn reconcile_user(db: &Database, claims: &IdentityClaims) -> Result<UserRow> {
    if let Some(user) = db.get_user_by_firebase_uid(&claims.uid)? {
        return Ok(user);
    }

    let email = claims.email.as_deref().unwrap_or("").trim();
    let username = if email.is_empty() { &claims.uid } else { email };
    let (first_name, last_name) = split_display_name(claims.name.as_deref().unwrap_or(""));

    let id = Uuid::new_v4().to_string();
    db.create_user(
        &id,
        Some(&claims.uid),
        username,
        email,
        &first_name,
        &last_name,
    )
}

fn split_display_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(uid: &str, email: Option<&str>, name: Option<&str>) -> IdentityClaims {
        IdentityClaims {
            uid: uid.to_string(),
            email: email.map(String::from),
            name: name.map(String::from),
        }
    }

    #[test]
    fn display_name_splits_at_first_space() {
        assert_eq!(split_display_name("Ada Lovelace"), ("Ada".into(), "Lovelace".into()));
        assert_eq!(
            split_display_name("Ada King Lovelace"),
            ("Ada".into(), "King Lovelace".into())
        );
        assert_eq!(split_display_name("Ada"), ("Ada".into(), String::new()));
        assert_eq!(split_display_name(""), (String::new(), String::new()));
    }

    #[test]
    fn first_sight_creates_user_with_email_username() {
        let db = Database::open_in_memory().unwrap();
        let user =
            reconcile_user(&db, &claims("abc123", Some("a@x.com"), Some("Ada Lovelace"))).unwrap();

        assert_eq!(user.username, "a@x.com");
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.last_name, "Lovelace");
        assert_eq!(user.firebase_uid.as_deref(), Some("abc123"));
    }

    #[test]
    fn missing_email_falls_back_to_subject_id() {
        let db = Database::open_in_memory().unwrap();
        let user = reconcile_user(&db, &claims("abc123", None, None)).unwrap();
        assert_eq!(user.username, "abc123");
        assert_eq!(user.email, "");
    }

    #[test]
    fn second_sight_reuses_the_same_user() {
        let db = Database::open_in_memory().unwrap();
        let first = reconcile_user(&db, &claims("abc123", Some("a@x.com"), None)).unwrap();
        let second = reconcile_user(&db, &claims("abc123", Some("a@x.com"), None)).unwrap();
        assert_eq!(first.id, second.id);
    }
}
