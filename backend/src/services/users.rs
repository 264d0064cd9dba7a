use diesel::prelude::*;

use crate::{
    db::DbPool,
    error::ApiError,
    models::{NewUser, User, UserCreate},
    schema::users,
    services::auth,
};

#[derive(Debug)]
pub enum RepositoryError {
    Pool(String),
    Query(diesel::result::Error),
}

impl std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RepositoryError::Pool(msg) => write!(f, "Database connection error: {}", msg),
            RepositoryError::Query(e) => write!(f, "Database query error: {}", e),
        }
    }
}

impl std::error::Error for RepositoryError {}

impl From<diesel::r2d2::PoolError> for RepositoryError {
    fn from(e: diesel::r2d2::PoolError) -> Self {
        RepositoryError::Pool(e.to_string())
    }
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(e: diesel::result::Error) -> Self {
        RepositoryError::Query(e)
    }
}

/// Lookup and insertion of user records, as needed by the auth layer
pub trait UserRepository: Send + Sync {
    fn get_by_id(&self, id: i32) -> Result<Option<User>, RepositoryError>;

    fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    fn insert(&self, new_user: &NewUser) -> Result<User, RepositoryError>;
}

#[derive(Clone)]
pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn get_by_id(&self, id: i32) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = users::table
            .find(id)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn get_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = users::table
            .filter(users::email.eq(email))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(user)
    }

    fn insert(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        let mut conn = self.pool.get()?;
        let user = diesel::insert_into(users::table)
            .values(new_user)
            .returning(User::as_returning())
            .get_result(&mut conn)?;
        Ok(user)
    }
}

/// Validates the payload, hashes the password and stores the user
pub fn create_user(repo: &dyn UserRepository, input: &UserCreate) -> Result<User, ApiError> {
    input.validate()?;

    if repo.get_by_email(&input.email)?.is_some() {
        return Err(ApiError::BadRequest(
            "The user with this email already exists in the system".to_string(),
        ));
    }

    let hashed_password = auth::hash_password(&input.password).map_err(ApiError::Internal)?;

    let user = repo.insert(&NewUser {
        email: input.email.clone(),
        is_active: input.is_active,
        is_superuser: input.is_superuser,
        full_name: input.full_name.clone(),
        hashed_password,
    })?;

    log::info!("Created user {} (id {})", user.email, user.id);
    Ok(user)
}

/// Returns the user when the email exists and the password matches
pub fn authenticate(
    repo: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    let Some(user) = repo.get_by_email(email)? else {
        return Ok(None);
    };

    match auth::verify_password(password, &user.hashed_password) {
        Ok(true) => Ok(Some(user)),
        Ok(false) => Ok(None),
        Err(e) => {
            log::warn!("Stored password hash for user {} is unreadable: {}", user.id, e);
            Ok(None)
        }
    }
}

/// Creates the bootstrap superuser unless a user with that email already exists
pub fn ensure_first_superuser(
    repo: &dyn UserRepository,
    email: &str,
    password: &str,
) -> Result<Option<User>, ApiError> {
    if repo.get_by_email(email)?.is_some() {
        log::debug!("First superuser {} already present", email);
        return Ok(None);
    }

    let user = create_user(
        repo,
        &UserCreate {
            email: email.to_string(),
            password: password.to_string(),
            is_active: true,
            is_superuser: true,
            full_name: None,
        },
    )?;
    Ok(Some(user))
}
