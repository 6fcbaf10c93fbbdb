use chrono::{DateTime, Duration, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

pub const USER_ID_LEN: usize = 12;
pub const TWEET_MAX_LEN: usize = 256;
/// bcrypt ignores everything past this many bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// A user as persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

/// The part of a [`User`] that is safe to hand out. Every response carrying
/// a user goes through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PublicUser {
    pub id: String,
    #[validate(custom(function = "user_id_format"))]
    pub user_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            user_id: user.user_id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            birth_date: user.birth_date,
        }
    }
}

/// A user about to be inserted; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
}

impl NewUser {
    pub fn into_user(self, id: String) -> User {
        User {
            id,
            user_id: self.user_id,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            birth_date: self.birth_date,
        }
    }
}

/// Fields to overwrite on an existing user. `None` leaves the stored value alone;
/// `birth_date: Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub birth_date: Option<Option<NaiveDate>>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        *self == UserChanges::default()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(email) = &self.email {
            user.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        if let Some(first_name) = &self.first_name {
            user.first_name = first_name.clone();
        }
        if let Some(last_name) = &self.last_name {
            user.last_name = last_name.clone();
        }
        if let Some(birth_date) = self.birth_date {
            user.birth_date = birth_date;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: Uuid,
    pub content: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
    pub by: PublicUser,
}

#[derive(Debug, Clone)]
pub struct NewTweet {
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub by: PublicUser,
}

impl NewTweet {
    pub fn into_tweet(self, id: Uuid) -> Tweet {
        Tweet {
            id,
            content: self.content,
            created_at: self.created_at,
            updated_at: self.created_at,
            by: self.by,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(custom(function = "user_id_format"))]
    pub user_id: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64), custom(function = "password_bytes"))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64), custom(function = "password_bytes"))]
    pub password: String,
}

/// Full replacement payload for a user. Any `user_id` in the body is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 64), custom(function = "password_bytes"))]
    pub password: String,
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTweetRequest {
    #[validate(length(min = 1, max = 256))]
    pub content: String,
    #[validate(nested)]
    pub by: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTweetQuery {
    #[validate(length(min = 1, max = 256))]
    pub content: String,
}

fn user_id_format(user_id: &str) -> Result<(), ValidationError> {
    if user_id.len() != USER_ID_LEN || !user_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("user_id_format"));
    }
    Ok(())
}

fn password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(ValidationError::new("password_too_many_bytes"));
    }
    Ok(())
}

/// Check a `user_id` taken from a path segment.
pub fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    user_id_format(user_id).map_err(|_| {
        ApiError::Validation(format!("user_id must be exactly {} digits", USER_ID_LEN))
    })
}

/// Lowercase the domain part; the local part is left as given.
pub fn normalize_email(email: &str) -> String {
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_ascii_lowercase()),
        None => email.to_string(),
    }
}

/// Current time truncated to what the store can represent.
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Timestamp for a content edit: now, but never at or before `created_at`.
pub fn edit_timestamp(created_at: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let earliest = created_at + Duration::milliseconds(1);
    if now < earliest {
        earliest
    } else {
        now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> PublicUser {
        PublicUser {
            id: Uuid::new_v4().to_string(),
            user_id: "123456789012".to_string(),
            email: "a@b.com".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            birth_date: None,
        }
    }

    fn signup(email: &str, password: &str) -> SignupRequest {
        SignupRequest {
            user_id: "123456789012".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            birth_date: None,
        }
    }

    fn content(content: String) -> UpdateTweetQuery {
        UpdateTweetQuery { content }
    }

    #[test]
    fn test_content_length_boundaries() {
        assert!(content(String::new()).validate().is_err());
        assert!(content("x".to_string()).validate().is_ok());
        assert!(content("x".repeat(256)).validate().is_ok());
        assert!(content("x".repeat(257)).validate().is_err());
    }

    #[test]
    fn test_content_length_counts_characters() {
        // 256 multi-byte characters is still within the limit.
        assert!(content("é".repeat(256)).validate().is_ok());
    }

    #[test]
    fn test_user_id_must_be_twelve_digits() {
        assert!(validate_user_id("123456789012").is_ok());
        assert!(validate_user_id("12345678901").is_err());
        assert!(validate_user_id("1234567890123").is_err());
        assert!(validate_user_id("12345678901a").is_err());
        assert!(validate_user_id("").is_err());
    }

    #[test]
    fn test_email_format() {
        for ok in ["a@b.com", "first.last@mail.example.org"] {
            assert!(signup(ok, "secret123").validate().is_ok(), "{}", ok);
        }
        for bad in [
            "ab.com",
            "@b.com",
            "a@@b.com",
            "a b@c.com",
            "<script>@b.com",
            "a,b@c.com",
            "a@-b-.com",
            "a(b)@c.com",
        ] {
            let errors = signup(bad, "secret123").validate().unwrap_err();
            assert!(errors.field_errors().contains_key("email"), "{}", bad);
        }
    }

    #[test]
    fn test_name_and_password_bounds() {
        let mut request = signup("a@b.com", "secret123");
        request.first_name = String::new();
        assert!(request.validate().is_err());
        request.first_name = "n".repeat(50);
        assert!(request.validate().is_ok());
        request.first_name = "n".repeat(51);
        assert!(request.validate().is_err());

        assert!(signup("a@b.com", "short").validate().is_err());
        assert!(signup("a@b.com", &"p".repeat(65)).validate().is_err());
    }

    #[test]
    fn test_password_fits_bcrypt_input() {
        // 36 two-byte characters is exactly 72 bytes.
        assert!(signup("a@b.com", &"é".repeat(36)).validate().is_ok());
        let errors = signup("a@b.com", &"é".repeat(64)).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("password"));
        let login = LoginRequest {
            email: "a@b.com".to_string(),
            password: "é".repeat(37),
        };
        assert!(login.validate().is_err());
    }

    #[test]
    fn test_normalize_email_lowercases_domain_only() {
        assert_eq!(normalize_email("Ann@Example.COM"), "Ann@example.com");
        assert_eq!(normalize_email("a@b.com"), "a@b.com");
    }

    #[test]
    fn test_create_tweet_request_validates_author() {
        let mut request = CreateTweetRequest {
            content: "hello".to_string(),
            by: author(),
        };
        assert!(request.validate().is_ok());
        request.by.user_id = "42".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User {
            id: "abc".to_string(),
            user_id: "123456789012".to_string(),
            email: "a@b.com".to_string(),
            password_hash: "$2b$04$secret".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            birth_date: None,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        let public = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert!(public.get("password_hash").is_none());
        assert_eq!(public["user_id"], "123456789012");
    }

    #[test]
    fn test_user_changes_apply() {
        let mut user = User {
            id: "abc".to_string(),
            user_id: "123456789012".to_string(),
            email: "a@b.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "A".to_string(),
            last_name: "B".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1),
        };
        let changes = UserChanges {
            last_name: Some("C".to_string()),
            birth_date: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply(&mut user);
        assert_eq!(user.last_name, "C");
        assert_eq!(user.first_name, "A");
        assert_eq!(user.birth_date, None);
        assert!(UserChanges::default().is_empty());
    }

    #[test]
    fn test_edit_timestamp_is_strictly_later() {
        let created = now_millis();
        assert!(edit_timestamp(created, created) > created);
        let later = created + Duration::seconds(5);
        assert_eq!(edit_timestamp(created, later), later);
    }

    #[test]
    fn test_tweet_timestamps_serialize_as_millis() {
        let created = DateTime::<Utc>::from_timestamp(1_700_000_000, 123_000_000).unwrap();
        let tweet = NewTweet {
            content: "hello".to_string(),
            created_at: created,
            by: author(),
        }
        .into_tweet(Uuid::new_v4());
        let json = serde_json::to_value(&tweet).unwrap();
        assert_eq!(json["created_at"], 1_700_000_000_123i64);
        assert_eq!(json["created_at"], json["updated_at"]);
    }
}
