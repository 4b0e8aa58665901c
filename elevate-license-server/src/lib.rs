//! HTTP API for Elevate for Humanity license keys.

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
    response::Json,
    routing::{get, post},
};
use elevate_license::{
    DEFAULT_DURATION_DAYS, DomainCheck, DomainRegistry, DomainTier, InvalidReason, Keyring,
    LicenseManager, MemoryRevocationList, Validation, codec::format_timestamp, inspect,
    required_feature,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};

/// Header carrying the admin API key.
pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<LicenseManager>,
    pub revocations: Arc<MemoryRevocationList>,
    pub domains: Arc<DomainRegistry>,
    admin_api_key: Option<Arc<str>>,
}

impl AppState {
    /// State with an empty revocation list and the default domain registry.
    ///
    /// A blank admin key disables the admin routes.
    pub fn new(keyring: Keyring, admin_api_key: Option<String>) -> Self {
        let revocations = Arc::new(MemoryRevocationList::new());
        let manager = LicenseManager::new(keyring).with_revocations(revocations.clone());
        Self {
            manager: Arc::new(manager),
            revocations,
            domains: Arc::new(DomainRegistry::with_defaults()),
            admin_api_key: admin_api_key
                .filter(|key| !key.trim().is_empty())
                .map(Arc::from),
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.keyring.clone(), config.admin_api_key.clone())
    }

    fn require_admin(&self, headers: &HeaderMap) -> ApiResult<()> {
        let Some(expected) = self.admin_api_key.as_deref() else {
            warn!("admin route called but no admin key is configured");
            return Err(ApiError::Unauthorized);
        };
        let provided = headers
            .get(ADMIN_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !provided.is_empty() && bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            Ok(())
        } else {
            warn!("admin route rejected: bad or missing {ADMIN_KEY_HEADER}");
            Err(ApiError::Unauthorized)
        }
    }
}

// ── Request / response bodies ────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseKeyRequest {
    pub license_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Validation> for ValidationResponse {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::Valid(payload) => Self {
                valid: true,
                issued_at: Some(format_timestamp(&payload.issued_at)),
                expires_at: Some(format_timestamp(&payload.expires_at)),
                email: Some(payload.email),
                product_id: Some(payload.product_id),
                reason: None,
            },
            Validation::Invalid(reason) => Self {
                valid: false,
                reason: Some(reason.to_string()),
                ..Self::default()
            },
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub email: Option<String>,
    pub product_id: Option<String>,
    pub expires_in_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub license_key: String,
    pub expires_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenewRequest {
    pub license_key: Option<String>,
    pub additional_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenewResponse {
    pub message: String,
    pub old_expiry: String,
    pub new_license: String,
    pub new_expiry: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfoResponse {
    pub email: String,
    pub product_id: String,
    pub issued_at: String,
    pub expires_at: String,
    pub expired: bool,
    pub days_remaining: i64,
    /// Always false: the preview never checks the signature.
    pub signature_checked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyrightRequest {
    pub domain: Option<String>,
    pub feature: Option<String>,
    /// API path whose required feature is checked when `feature` is absent.
    pub path: Option<String>,
    pub min_tier: Option<DomainTier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CopyrightResponse {
    pub valid: bool,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<DomainTier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub revoked: bool,
    pub key_id: String,
}

// ── Handlers ─────────────────────────────────────────────────────

/// Unwraps a JSON body, turning extractor rejections into JSON errors.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(req)| req)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn required(field: Option<String>, name: &str) -> ApiResult<String> {
    field
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

async fn validate_handler(
    State(state): State<AppState>,
    payload: Result<Json<LicenseKeyRequest>, JsonRejection>,
) -> Json<ValidationResponse> {
    let key = match body(payload) {
        Ok(req) => req.license_key.unwrap_or_default(),
        Err(e) => {
            debug!("unreadable validation body: {e}");
            String::new()
        }
    };
    let validation = state.manager.validate(&key);
    match &validation {
        Validation::Invalid(reason @ InvalidReason::InvalidSignature) => {
            warn!(%reason, "license validation failed");
        }
        Validation::Invalid(reason) => info!(%reason, "license validation failed"),
        Validation::Valid(_) => {}
    }
    Json(validation.into())
}

async fn generate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    state.require_admin(&headers)?;
    let req = body(payload)?;
    let email = required(req.email, "email")?;
    let product_id = required(req.product_id, "productId")?;
    let days = req.expires_in_days.unwrap_or(DEFAULT_DURATION_DAYS);

    let issued = state.manager.generate(&email, &product_id, days)?;
    info!(%email, %product_id, days, "license issued");

    Ok(Json(GenerateResponse {
        license_key: issued.key,
        expires_at: format_timestamp(&issued.payload.expires_at),
    }))
}

async fn renew_handler(
    State(state): State<AppState>,
    payload: Result<Json<RenewRequest>, JsonRejection>,
) -> ApiResult<Json<RenewResponse>> {
    let req = body(payload)?;
    let key = required(req.license_key, "licenseKey")?;
    let days = req.additional_days.unwrap_or(DEFAULT_DURATION_DAYS);

    let renewal = state.manager.renew(&key, days).inspect_err(|e| {
        info!("license renewal refused: {e}");
    })?;
    info!(
        email = %renewal.previous.email,
        product_id = %renewal.previous.product_id,
        days,
        "license renewed"
    );

    Ok(Json(RenewResponse {
        message: "License renewed successfully".to_string(),
        old_expiry: format_timestamp(&renewal.previous.expires_at),
        new_license: renewal.issued.key,
        new_expiry: format_timestamp(&renewal.issued.payload.expires_at),
    }))
}

async fn license_info_handler(
    payload: Result<Json<LicenseKeyRequest>, JsonRejection>,
) -> ApiResult<Json<LicenseInfoResponse>> {
    let req = body(payload)?;
    let key = required(req.license_key, "licenseKey")?;
    let payload = inspect(&key)?;
    let now = chrono::Utc::now();

    Ok(Json(LicenseInfoResponse {
        expired: payload.is_expired_at(now),
        days_remaining: payload.days_remaining_at(now),
        issued_at: format_timestamp(&payload.issued_at),
        expires_at: format_timestamp(&payload.expires_at),
        email: payload.email,
        product_id: payload.product_id,
        signature_checked: false,
    }))
}

async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "operational".to_string(),
        service: "elevate-license".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: format_timestamp(&chrono::Utc::now()),
    })
}

async fn copyright_handler(
    State(state): State<AppState>,
    payload: Result<Json<CopyrightRequest>, JsonRejection>,
) -> ApiResult<Json<CopyrightResponse>> {
    let req = body(payload)?;
    let domain = required(req.domain, "domain")?;

    let response = match state.domains.check(&domain) {
        DomainCheck::Unauthorized { domain } => {
            warn!(%domain, "unauthorized domain");
            CopyrightResponse {
                valid: false,
                reason: Some(format!("Unauthorized domain: {domain}")),
                domain,
                tier: None,
                features: None,
            }
        }
        DomainCheck::Authorized(grant) => {
            let feature = req.feature.filter(|f| !f.is_empty()).or_else(|| {
                req.path
                    .as_deref()
                    .and_then(required_feature)
                    .map(str::to_string)
            });
            let reason = match req.min_tier {
                Some(min) if !grant.tier.meets(min) => {
                    Some(format!("Insufficient license tier: requires {}", min.as_str()))
                }
                _ => feature
                    .filter(|f| !grant.has_feature(f))
                    .map(|f| format!("Feature not licensed: {f}")),
            };
            if let Some(reason) = &reason {
                warn!(domain = %grant.domain, %reason, "copyright check failed");
            }
            CopyrightResponse {
                valid: reason.is_none(),
                reason,
                domain: grant.domain,
                tier: Some(grant.tier),
                features: Some(grant.features),
            }
        }
    };
    Ok(Json(response))
}

async fn revoke_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<LicenseKeyRequest>, JsonRejection>,
) -> ApiResult<Json<RevokeResponse>> {
    state.require_admin(&headers)?;
    let req = body(payload)?;
    let key = required(req.license_key, "licenseKey")?;
    let key_id = state.manager.key_id(&key)?;

    if state.revocations.revoke(key_id.clone()) {
        info!(%key_id, "license revoked");
    }
    Ok(Json(RevokeResponse {
        revoked: true,
        key_id,
    }))
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound
}

/// Build the HTTP API router with the given state.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/validate-license", post(validate_handler))
        .route("/api/generate-license", post(generate_handler))
        .route("/api/renew-license", post(renew_handler))
        .route("/api/license-info", post(license_info_handler))
        .route("/api/license-status", get(status_handler))
        .route("/api/copyright/validate", post(copyright_handler))
        .route("/api/revoke-license", post(revoke_handler))
        .fallback(not_found_handler)
        .with_state(state)
}
