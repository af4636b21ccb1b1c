//! Request handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use bondrisk_core::{
    Bond, BondId, CurrentRate, ErrorKind, NewBond, Portfolio, PortfolioId, RiskResult,
    ShockDirection, StressResult, UserId,
};
use bondrisk_engine::{EngineError, PortfolioView, RiskService, ServiceStatus, YieldCurveView};

/// Shared handler state.
pub type AppState = Arc<RiskService>;

/// Curve requested when the caller names no bond.
pub const DEFAULT_BOND_NAME: &str = "US Treasury";

// =============================================================================
// RESPONSES
// =============================================================================

/// Response envelope used by every JSON endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
    /// Payload, absent on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    fn ok(message: impl Into<String>, data: T) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: Some(data),
        })
    }
}

impl ApiResponse<()> {
    fn done(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
            data: None,
        })
    }

    fn failure(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: false,
            message: message.into(),
            data: None,
        })
    }
}

/// Engine error rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(EngineError);

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        Self(e)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            EngineError::Risk(e) => match e.kind() {
                ErrorKind::Validation | ErrorKind::DataUnavailable => StatusCode::BAD_REQUEST,
                ErrorKind::Computation => StatusCode::INTERNAL_SERVER_ERROR,
            },
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Storage(_) | EngineError::Export(_) | EngineError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "request failed");
        }
        (status, ApiResponse::<()>::failure(self.0.to_string())).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

// =============================================================================
// HEALTH & STATUS
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: DateTime<Utc>,
}

/// Health check handler.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}

/// Service status.
pub async fn status(State(service): State<AppState>) -> Json<ApiResponse<ServiceStatus>> {
    ApiResponse::ok("API status retrieved", service.status())
}

// =============================================================================
// AUTH
// =============================================================================

/// Username and password.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// Username.
    pub username: String,
    /// Current password.
    pub password: String,
    /// Replacement password.
    pub new_password: String,
}

/// Resolved identity.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdResponse {
    /// User id.
    pub user_id: UserId,
}

/// Resolve credentials.
pub async fn login(
    State(service): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<UserIdResponse> {
    let user_id = service.authenticate(&req.username, &req.password).await?;
    Ok(ApiResponse::ok("Login successful", UserIdResponse { user_id }))
}

/// Create a user.
pub async fn register(
    State(service): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserIdResponse>>), ApiError> {
    let user_id = service.register_user(&req.username, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("User registered", UserIdResponse { user_id }),
    ))
}

/// Delete the user identified by the credentials.
pub async fn delete_user(
    State(service): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<()> {
    service.delete_user(&req.username, &req.password).await?;
    Ok(ApiResponse::<()>::done("User deleted successfully"))
}

/// Change a password.
pub async fn change_password(
    State(service): State<AppState>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<()> {
    service
        .change_password(&req.username, &req.password, &req.new_password)
        .await?;
    Ok(ApiResponse::<()>::done("Password updated successfully"))
}

/// Look up a user id.
pub async fn get_user_id(
    State(service): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<UserIdResponse> {
    let user_id = service.get_user_id(&username).await?;
    Ok(ApiResponse::ok("User found", UserIdResponse { user_id }))
}

// =============================================================================
// MARKET
// =============================================================================

/// Front-tenor rate of the live curve.
pub async fn current_rate(State(service): State<AppState>) -> ApiResult<CurrentRate> {
    let rate = service.get_current_rate().await?;
    Ok(ApiResponse::ok("Current rate retrieved", rate))
}

/// Yield curve query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldCurveQuery {
    /// Bond the curve is requested for.
    pub bond_name: Option<String>,
}

/// The live curve.
pub async fn yield_curve(
    State(service): State<AppState>,
    Query(query): Query<YieldCurveQuery>,
) -> ApiResult<YieldCurveView> {
    let bond_name = query.bond_name.as_deref().unwrap_or(DEFAULT_BOND_NAME);
    let curve = service.get_yield_curve(bond_name).await?;
    Ok(ApiResponse::ok("Yield curve retrieved", curve))
}

/// Last curve update.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastUpdateResponse {
    /// When the live curve was installed.
    pub last_update: DateTime<Utc>,
}

/// When the live curve was last installed.
pub async fn last_update(State(service): State<AppState>) -> Json<ApiResponse<LastUpdateResponse>> {
    ApiResponse::ok(
        "Last update time retrieved",
        LastUpdateResponse {
            last_update: service.curves().last_updated(),
        },
    )
}

// =============================================================================
// PORTFOLIO
// =============================================================================

/// Portfolio lookup query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioQuery {
    /// Portfolio name, `Default` when absent.
    pub portfolio_name: Option<String>,
}

/// A user's portfolio with aggregates.
pub async fn get_portfolio(
    State(service): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<PortfolioQuery>,
) -> ApiResult<PortfolioView> {
    let name = query
        .portfolio_name
        .as_deref()
        .unwrap_or(bondrisk_engine::DEFAULT_PORTFOLIO_NAME);
    let view = service.get_portfolio(UserId::new(user_id), name).await?;
    Ok(ApiResponse::ok("Portfolio retrieved", view))
}

/// Portfolio creation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePortfolioRequest {
    /// Owner.
    pub user_id: i64,
    /// Name, `Default` when absent.
    pub name: Option<String>,
}

/// Create a portfolio.
pub async fn create_portfolio(
    State(service): State<AppState>,
    Json(req): Json<CreatePortfolioRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Portfolio>>), ApiError> {
    let portfolio = service
        .create_portfolio(UserId::new(req.user_id), req.name.as_deref())
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Portfolio created successfully", portfolio),
    ))
}

/// Add a bond.
pub async fn add_bond(
    State(service): State<AppState>,
    Path(portfolio_id): Path<i64>,
    Json(bond): Json<NewBond>,
) -> Result<(StatusCode, Json<ApiResponse<Bond>>), ApiError> {
    let bond = service.add_bond(PortfolioId::new(portfolio_id), bond).await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::ok("Bond added to portfolio successfully", bond),
    ))
}

/// Remove a bond.
pub async fn remove_bond(
    State(service): State<AppState>,
    Path((portfolio_id, bond_id)): Path<(i64, i64)>,
) -> ApiResult<()> {
    service
        .remove_bond(PortfolioId::new(portfolio_id), BondId::new(bond_id))
        .await?;
    Ok(ApiResponse::<()>::done("Bond removed from portfolio successfully"))
}

/// Shock scenario.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StressTestRequest {
    /// Shock size in basis points.
    pub shock_bps: i32,
    /// `up`, `down` or `parallel` (default).
    #[serde(default)]
    pub shock_direction: String,
}

/// Run a stress test.
pub async fn stress_test(
    State(service): State<AppState>,
    Path(portfolio_id): Path<i64>,
    Json(req): Json<StressTestRequest>,
) -> ApiResult<StressResult> {
    let direction: ShockDirection = req
        .shock_direction
        .parse()
        .map_err(EngineError::from)?;
    let result = service
        .run_stress_test(PortfolioId::new(portfolio_id), req.shock_bps, direction)
        .await?;
    Ok(ApiResponse::ok("Stress test completed successfully", result))
}

/// Run the risk analysis.
pub async fn risk_analysis(
    State(service): State<AppState>,
    Path(portfolio_id): Path<i64>,
) -> ApiResult<RiskResult> {
    let result = service.calculate_risk(PortfolioId::new(portfolio_id)).await?;
    Ok(ApiResponse::ok("Risk analysis completed successfully", result))
}

// =============================================================================
// EXPORT
// =============================================================================

/// All of a user's bonds as a CSV attachment.
pub async fn export_csv(
    State(service): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let body = service.export_portfolio_csv(UserId::new(user_id)).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"portfolio_{user_id}.csv\""),
            ),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    use bondrisk_core::RiskError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (EngineError::from(RiskError::invalid_argument("x")), StatusCode::BAD_REQUEST),
            (EngineError::from(RiskError::insufficient_data("x")), StatusCode::BAD_REQUEST),
            (
                EngineError::from(RiskError::computation("x")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (EngineError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (EngineError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (EngineError::Conflict("x".into()), StatusCode::CONFLICT),
            (EngineError::Storage("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }
}
