use chrono::NaiveDateTime;
use diesel::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MAX_FIELD_LENGTH: usize = 255;
const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 40;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern compiles")
});

// ============================================================================
// Validation
// ============================================================================

/// A request field that failed its declared constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn check_email(field: &'static str, email: &str) -> Result<(), ValidationError> {
    check_max_length(field, email, MAX_FIELD_LENGTH)?;
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::new(field, "value is not a valid email address"));
    }
    Ok(())
}

fn check_max_length(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max),
        ));
    }
    Ok(())
}

fn check_length(
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() < min {
        return Err(ValidationError::new(
            field,
            format!("must be at least {} characters", min),
        ));
    }
    check_max_length(field, value, max)
}

fn check_password(field: &'static str, password: &str) -> Result<(), ValidationError> {
    check_length(field, password, MIN_PASSWORD_LENGTH, MAX_PASSWORD_LENGTH)
}

fn check_full_name(full_name: Option<&str>) -> Result<(), ValidationError> {
    match full_name {
        Some(name) => check_max_length("full_name", name, MAX_FIELD_LENGTH),
        None => Ok(()),
    }
}

fn default_true() -> bool {
    true
}

// ============================================================================
// Users
// ============================================================================

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct User {
    pub id: i32,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

/// Properties received on user creation
#[derive(Deserialize, Debug, Clone)]
pub struct UserCreate {
    pub email: String,
    pub password: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_email("email", &self.email)?;
        check_password("password", &self.password)?;
        check_full_name(self.full_name.as_deref())
    }
}

/// Self-service sign-up payload
#[derive(Deserialize, Debug, Clone)]
pub struct UserRegister {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserRegister {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_email("email", &self.email)?;
        check_password("password", &self.password)?;
        check_full_name(self.full_name.as_deref())
    }
}

impl From<UserRegister> for UserCreate {
    fn from(register: UserRegister) -> Self {
        Self {
            email: register.email,
            password: register.password,
            is_active: true,
            is_superuser: false,
            full_name: register.full_name,
        }
    }
}

/// Admin update; every field is optional except the flags, which keep their defaults
#[derive(Deserialize, Debug, Clone)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub is_superuser: bool,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl UserUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref email) = self.email {
            check_email("email", email)?;
        }
        if let Some(ref password) = self.password {
            check_password("password", password)?;
        }
        check_full_name(self.full_name.as_deref())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UserUpdateMe {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UserUpdateMe {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref email) = self.email {
            check_email("email", email)?;
        }
        check_full_name(self.full_name.as_deref())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct UpdatePassword {
    pub current_password: String,
    pub new_password: String,
}

impl UpdatePassword {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_password("current_password", &self.current_password)?;
        check_password("new_password", &self.new_password)
    }
}

/// User as returned by the API; never carries the password hash
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserPublic {
    pub id: i32,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub full_name: Option<String>,
}

impl From<User> for UserPublic {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            is_active: user.is_active,
            is_superuser: user.is_superuser,
            full_name: user.full_name,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct UsersPublic {
    pub data: Vec<UserPublic>,
    pub count: i64,
}

// ============================================================================
// Items
// ============================================================================

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = crate::schema::items)]
#[diesel(belongs_to(User, foreign_key = owner_id))]
pub struct Item {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i32,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = crate::schema::items)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i32,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ItemCreate {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemCreate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_length("title", &self.title, 1, MAX_FIELD_LENGTH)?;
        match self.description {
            Some(ref description) => check_max_length("description", description, MAX_FIELD_LENGTH),
            None => Ok(()),
        }
    }

    pub fn into_new_item(self, owner_id: i32) -> NewItem {
        NewItem {
            title: self.title,
            description: self.description,
            owner_id,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ItemUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ItemUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            check_length("title", title, 1, MAX_FIELD_LENGTH)?;
        }
        match self.description {
            Some(ref description) => check_max_length("description", description, MAX_FIELD_LENGTH),
            None => Ok(()),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemPublic {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub owner_id: i32,
}

impl From<Item> for ItemPublic {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            title: item.title,
            description: item.description,
            owner_id: item.owner_id,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ItemsPublic {
    pub data: Vec<ItemPublic>,
    pub count: i64,
}

// ============================================================================
// Auth payloads
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub message: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

impl Token {
    pub fn bearer(access_token: String) -> Self {
        Self {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

/// Contents of an access token
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPayload {
    pub sub: Option<i32>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NewPassword {
    pub token: String,
    pub new_password: String,
}

impl NewPassword {
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_password("new_password", &self.new_password)
    }
}

// ============================================================================
// Domestic precious-metal prices
// ============================================================================

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GoldType {
    Pt,
    Pd,
    Au,
    Ag,
}

/// One commodity quote. `domestic_price_don` is per don (3.75 g).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    #[serde(rename = "type")]
    pub gold_type: GoldType,
    pub domestic_price: f64,
    pub domestic_price_don: f64,
    pub fluctuation: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PriceList {
    pub domestic_live_price_dto_list: Vec<Price>,
}

/// Documented shape of the upstream price document. The proxy relays the
/// upstream body untouched and does not parse it into this type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PriceResponse {
    pub data: PriceList,
    pub regdate: NaiveDateTime,
    pub success: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn user_create(email: &str, password: &str) -> UserCreate {
        UserCreate {
            email: email.to_string(),
            password: password.to_string(),
            is_active: true,
            is_superuser: false,
            full_name: None,
        }
    }

    #[test]
    fn test_user_create_defaults() {
        let json = r#"{"email": "admin@example.com", "password": "changethis"}"#;
        let user: UserCreate = serde_json::from_str(json).unwrap();

        assert!(user.is_active);
        assert!(!user.is_superuser);
        assert!(user.full_name.is_none());
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_user_create_rejects_short_password() {
        let err = user_create("admin@example.com", "short").validate().unwrap_err();
        assert_eq!(err.field, "password");
    }

    #[test]
    fn test_user_create_rejects_long_password() {
        let long = "p".repeat(41);
        let err = user_create("admin@example.com", &long).validate().unwrap_err();
        assert_eq!(err.field, "password");
        assert!(user_create("admin@example.com", &"p".repeat(40)).validate().is_ok());
    }

    #[test]
    fn test_user_create_rejects_bad_email() {
        for email in ["not-an-email", "a@b", "with space@example.com", "@example.com"] {
            let err = user_create(email, "changethis").validate().unwrap_err();
            assert_eq!(err.field, "email", "{} should be rejected", email);
        }
    }

    #[test]
    fn test_user_create_rejects_long_full_name() {
        let mut user = user_create("admin@example.com", "changethis");
        user.full_name = Some("n".repeat(256));
        assert_eq!(user.validate().unwrap_err().field, "full_name");
    }

    #[test]
    fn test_user_register_into_create() {
        let json = r#"{"email": "new@example.com", "password": "changethis", "full_name": "New"}"#;
        let register: UserRegister = serde_json::from_str(json).unwrap();
        assert!(register.validate().is_ok());

        let create = UserCreate::from(register);
        assert!(create.is_active);
        assert!(!create.is_superuser);
        assert_eq!(create.full_name.as_deref(), Some("New"));
    }

    #[test]
    fn test_user_update_all_optional() {
        let update: UserUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.email.is_none());
        assert!(update.password.is_none());
        assert!(update.is_active);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_user_update_checks_present_fields() {
        let update: UserUpdate = serde_json::from_str(r#"{"password": "abc"}"#).unwrap();
        assert_eq!(update.validate().unwrap_err().field, "password");

        let me: UserUpdateMe = serde_json::from_str(r#"{"email": "nope"}"#).unwrap();
        assert_eq!(me.validate().unwrap_err().field, "email");
    }

    #[test]
    fn test_update_password_validation() {
        let payload = UpdatePassword {
            current_password: "changethis".to_string(),
            new_password: "short".to_string(),
        };
        assert_eq!(payload.validate().unwrap_err().field, "new_password");
    }

    #[test]
    fn test_user_public_omits_password_hash() {
        let user = User {
            id: 7,
            email: "admin@example.com".to_string(),
            is_active: true,
            is_superuser: true,
            full_name: None,
            hashed_password: "$argon2id$secret".to_string(),
        };
        let json = serde_json::to_value(UserPublic::from(user)).unwrap();

        assert_eq!(json["id"], 7);
        assert_eq!(json["is_superuser"], true);
        assert!(json.get("hashed_password").is_none());
    }

    #[test]
    fn test_item_create_title_bounds() {
        let empty: ItemCreate = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert_eq!(empty.validate().unwrap_err().field, "title");

        let long = ItemCreate {
            title: "t".repeat(256),
            description: None,
        };
        assert_eq!(long.validate().unwrap_err().field, "title");

        let ok = ItemCreate {
            title: "Gold bar".to_string(),
            description: Some("1 kg".to_string()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_item_update_partial() {
        let update: ItemUpdate = serde_json::from_str(r#"{"description": "updated"}"#).unwrap();
        assert!(update.title.is_none());
        assert!(update.validate().is_ok());

        let bad: ItemUpdate = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_item_create_into_new_item_sets_owner() {
        let create = ItemCreate {
            title: "Silver coin".to_string(),
            description: None,
        };
        let new_item = create.into_new_item(3);
        assert_eq!(new_item.owner_id, 3);
        assert_eq!(new_item.title, "Silver coin");
    }

    #[test]
    fn test_item_public_from_item() {
        let item = Item {
            id: 1,
            title: "Gold bar".to_string(),
            description: None,
            owner_id: 2,
        };
        let public = ItemPublic::from(item);
        assert_eq!(public.owner_id, 2);
        assert_eq!(public.title, "Gold bar");
    }

    #[test]
    fn test_token_is_bearer() {
        let token = Token::bearer("abc".to_string());
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["token_type"], "bearer");
        assert_eq!(json["access_token"], "abc");
    }

    #[test]
    fn test_gold_type_wire_names() {
        assert_eq!(serde_json::to_string(&GoldType::Au).unwrap(), r#""Au""#);
        let parsed: GoldType = serde_json::from_str(r#""Pd""#).unwrap();
        assert_eq!(parsed, GoldType::Pd);
        assert!(serde_json::from_str::<GoldType>(r#""Cu""#).is_err());
    }

    #[test]
    fn test_price_list_parses_upstream_sample() {
        let json = r#"{
            "domesticLivePriceDtoList": [
                {"type": "Pt", "domesticPrice": 44463, "domesticPriceDon": 166737, "fluctuation": -204},
                {"type": "Pd", "domesticPrice": 43507, "domesticPriceDon": 163152, "fluctuation": 606},
                {"type": "Au", "domesticPrice": 103554, "domesticPriceDon": 388328, "fluctuation": 158},
                {"type": "Ag", "domesticPrice": 1300.9, "domesticPriceDon": 4879, "fluctuation": -2.1}
            ]
        }"#;
        let list: PriceList = serde_json::from_str(json).unwrap();

        assert_eq!(list.domestic_live_price_dto_list.len(), 4);
        assert_eq!(list.domestic_live_price_dto_list[0].gold_type, GoldType::Pt);
        let silver = &list.domestic_live_price_dto_list[3];
        assert_eq!(silver.gold_type, GoldType::Ag);
        assert_eq!(silver.domestic_price, 1300.9);
        assert_eq!(silver.fluctuation, -2.1);
    }

    #[test]
    fn test_price_response_parses_declared_shape() {
        let json = r#"{
            "success": true,
            "message": null,
            "data": {"domesticLivePriceDtoList": [
                {"type": "Au", "domesticPrice": 103554, "domesticPriceDon": 388328, "fluctuation": 158}
            ]},
            "regdate": "2024-06-29T06:00:10"
        }"#;
        let response: PriceResponse = serde_json::from_str(json).unwrap();

        assert!(response.success);
        assert!(response.message.is_none());
        assert_eq!(
            response.regdate,
            NaiveDate::from_ymd_opt(2024, 6, 29)
                .unwrap()
                .and_hms_opt(6, 0, 10)
                .unwrap()
        );
        let gold = &response.data.domestic_live_price_dto_list[0];
        assert_eq!(gold.gold_type, GoldType::Au);
        assert_eq!(gold.domestic_price_don, 388328.0);
    }

    #[test]
    fn test_price_serializes_camel_case() {
        let price = Price {
            gold_type: GoldType::Au,
            domestic_price: 1.0,
            domestic_price_don: 3.75,
            fluctuation: -0.5,
        };
        let json = serde_json::to_value(&price).unwrap();
        assert_eq!(json["type"], "Au");
        assert_eq!(json["domesticPriceDon"], 3.75);
    }
}
