use crate::{
    database::MongoDB,
    models::{validate_role_organization, Organization, Role, User, UserResponse},
    utils::{is_duplicate_key, parse_object_id, AppError},
};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user _id (hex)
    pub email: String,
    pub role: Role,
    pub typ: TokenType,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn user_id(&self) -> Result<ObjectId, AppError> {
        ObjectId::parse_str(&self.sub).map_err(|_| AppError::Unauthorized("Invalid token subject".into()))
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Owner or platform admin
    pub fn can_modify(&self, owner: &ObjectId) -> bool {
        self.is_admin() || self.sub == owner.to_hex()
    }

    /// 403 "Not authorized to {what}" unless [`Claims::can_modify`] holds.
    pub fn ensure_can_modify(&self, owner: &ObjectId, what: &str) -> Result<(), AppError> {
        if !self.can_modify(owner) {
            return Err(AppError::Forbidden(format!("Not authorized to {}", what)));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    /// Organization id, required for school and corporate accounts
    pub organization: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

fn get_jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "default-secret-change-me".to_string())
}

fn get_jwt_issuer() -> String {
    std::env::var("JWT_ISSUER").unwrap_or_else(|_| "terranest-api".to_string())
}

fn get_jwt_audience() -> String {
    std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "terranest-app".to_string())
}

fn issue_token(user: &User, typ: TokenType, ttl: Duration) -> Result<String, AppError> {
    let user_id = user.id.ok_or_else(|| AppError::Internal("User has no _id".into()))?;
    let now = Utc::now();

    let claims = Claims {
        sub: user_id.to_hex(),
        email: user.email.clone(),
        role: user.role,
        typ,
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(get_jwt_secret().as_ref()))
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

// Access token (24h)
pub fn generate_jwt(user: &User) -> Result<String, AppError> {
    issue_token(user, TokenType::Access, Duration::hours(24))
}

// Refresh token (30 days)
pub fn generate_refresh_token(user: &User) -> Result<String, AppError> {
    issue_token(user, TokenType::Refresh, Duration::days(30))
}

pub fn verify_token(token: &str, expected: TokenType) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[get_jwt_audience()]);
    validation.set_issuer(&[get_jwt_issuer()]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(get_jwt_secret().as_ref()), &validation)
        .map(|data| data.claims)
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

    if claims.typ != expected {
        return Err(AppError::Unauthorized("Invalid token type".into()));
    }
    Ok(claims)
}

fn auth_response(user: User) -> Result<AuthResponse, AppError> {
    let token = generate_jwt(&user)?;
    let refresh_token = generate_refresh_token(&user)?;
    Ok(AuthResponse { success: true, token, refresh_token, user: UserResponse::from(user) })
}

pub fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'))
        .unwrap_or(false);
    if !valid {
        return Err(AppError::validation("A valid email is required"));
    }
    Ok(email)
}

// User registration
pub async fn register(db: &MongoDB, request: RegisterRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>(User::COLLECTION);

    let name = crate::models::common::required_text(&request.name, "Name")?;
    let email = normalize_email(&request.email)?;
    if request.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    if request.role == Role::Admin {
        return Err(AppError::validation("Admin accounts cannot be self-registered"));
    }

    let organization = match request.organization.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(id) => Some(parse_object_id(id, "organization")?),
        None => None,
    };
    validate_role_organization(request.role, organization.as_ref())?;

    if let Some(org_id) = organization {
        let exists = db
            .collection::<Organization>(Organization::COLLECTION)
            .count_documents(doc! { "_id": org_id })
            .await?;
        if exists == 0 {
            return Err(AppError::not_found("Organization not found"));
        }
    }

    if collection.find_one(doc! { "email": &email }).await?.is_some() {
        return Err(AppError::validation("User already exists"));
    }

    let hashed_password = hash(&request.password, DEFAULT_COST)?;
    let now = BsonDateTime::now();

    let mut new_user = User {
        id: None,
        name,
        email: email.clone(),
        password: hashed_password,
        role: request.role,
        organization,
        avatar: None,
        bio: None,
        location: request.location,
        total_emission_saved: 0.0,
        total_points: 0,
        actions_completed: 0,
        challenges_joined: 0,
        challenges_completed: 0,
        created_at: now,
        updated_at: now,
    };

    let inserted = collection.insert_one(&new_user).await.map_err(|e| {
        if is_duplicate_key(&e) {
            AppError::validation("User already exists")
        } else {
            AppError::Database(e)
        }
    })?;
    let user_id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| AppError::Internal("Inserted user has no ObjectId".into()))?;
    new_user.id = Some(user_id);

    if let Some(org_id) = organization {
        db.collection::<Organization>(Organization::COLLECTION)
            .update_one(doc! { "_id": org_id }, doc! { "$addToSet": { "members": user_id } })
            .await?;
    }

    log::info!("✅ User registered successfully: {} (role: {})", email, new_user.role);

    auth_response(new_user)
}

// User login
pub async fn login(db: &MongoDB, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    let collection = db.collection::<User>(User::COLLECTION);
    let email = request.email.trim().to_lowercase();

    let user = collection
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify(&request.password, &user.password)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    auth_response(user)
}

// Refresh token
pub async fn refresh_token(db: &MongoDB, request: &RefreshTokenRequest) -> Result<AuthResponse, AppError> {
    let claims = verify_token(&request.refresh_token, TokenType::Refresh)?;
    let user = get_user(db, &claims.user_id()?)
        .await
        .map_err(refresh_lookup_error)?;

    auth_response(user)
}

/// A deleted account invalidates its refresh token; other failures pass through.
fn refresh_lookup_error(err: AppError) -> AppError {
    match err {
        AppError::NotFound(_) => AppError::Unauthorized("User not found".into()),
        other => other,
    }
}

pub async fn get_user(db: &MongoDB, user_id: &ObjectId) -> Result<User, AppError> {
    db.collection::<User>(User::COLLECTION)
        .find_one(doc! { "_id": *user_id })
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

/// Claims for an access token, without going through encode/decode.
#[cfg(test)]
pub fn claims_for(id: ObjectId, role: Role) -> Claims {
    let now = Utc::now();
    Claims {
        sub: id.to_hex(),
        email: format!("{}@example.com", id.to_hex()),
        role,
        typ: TokenType::Access,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(1)).timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: get_jwt_audience(),
        iss: get_jwt_issuer(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        let now = BsonDateTime::now();
        User {
            id: Some(ObjectId::new()),
            name: "Ana".into(),
            email: "ana@example.com".into(),
            password: String::new(),
            role,
            organization: None,
            avatar: None,
            bio: None,
            location: None,
            total_emission_saved: 0.0,
            total_points: 0,
            actions_completed: 0,
            challenges_joined: 0,
            challenges_completed: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_access_token_roundtrip() {
        let u = user(Role::Corporate);
        let token = generate_jwt(&u).unwrap();
        let claims = verify_token(&token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, u.id.unwrap().to_hex());
        assert_eq!(claims.role, Role::Corporate);
        assert_eq!(claims.user_id().unwrap(), u.id.unwrap());
    }

    #[test]
    fn test_refresh_token_is_not_an_access_token() {
        let u = user(Role::Public);
        let refresh = generate_refresh_token(&u).unwrap();

        assert!(verify_token(&refresh, TokenType::Refresh).is_ok());
        assert!(matches!(
            verify_token(&refresh, TokenType::Access),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let token = generate_jwt(&user(Role::Public)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_token(&tampered, TokenType::Access).is_err());
        assert!(verify_token("not.a.jwt", TokenType::Access).is_err());
    }

    #[test]
    fn test_can_modify() {
        let owner = ObjectId::new();
        let mut u = user(Role::Public);
        u.id = Some(owner);
        let claims = verify_token(&generate_jwt(&u).unwrap(), TokenType::Access).unwrap();
        assert!(claims.can_modify(&owner));
        assert!(!claims.can_modify(&ObjectId::new()));

        let admin = verify_token(&generate_jwt(&user(Role::Admin)).unwrap(), TokenType::Access).unwrap();
        assert!(admin.can_modify(&owner));

        let err = claims.ensure_can_modify(&ObjectId::new(), "delete this post").unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == "Not authorized to delete this post"));
    }

    #[test]
    fn test_refresh_lookup_error() {
        let err = refresh_lookup_error(AppError::not_found("User not found"));
        assert!(matches!(err, AppError::Unauthorized(_)));

        let err = refresh_lookup_error(AppError::Internal("connection refused".into()));
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM ").unwrap(), "ana@example.com");
        assert!(normalize_email("ana").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("ana@localhost").is_err());
    }
}
