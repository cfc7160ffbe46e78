use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use cellgeo_core::{CellQuery, CoreError, LocationRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const CONTENT_TYPE_JSON: &str = "application/json";

// -------------------------
// Errors
// -------------------------

/// API errors mapped to HTTP responses with a JSON error body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "invalid_input",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal",
        }
    }

    pub fn to_error_body(&self) -> ErrorBody {
        let message = match self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) | ApiError::Internal(msg) => msg,
        };
        ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: message.clone(),
            },
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        ApiResponse::new(self.to_error_body(), self.status_code()).into_response()
    }
}

/// `{"error": {"code": ..., "message": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}


// -------------------------
// Response wrapper
// -------------------------

/// JSON body with an explicit status and optional extra headers.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: T,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value,
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let (status, body) = match serde_json::to_vec(&self.value) {
            Ok(b) => (self.status, b),
            Err(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":{"code":"internal","message":"serialization failure"}}"#.to_vec(),
            ),
        };

        let mut response = (status, body).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_JSON),
        );
        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        response
    }
}


// -------------------------
// Location lookup
// -------------------------

/// Query string of `GET /`.
///
/// Fields are taken as text so that missing and malformed values produce the
/// same JSON error body as out-of-range ones.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocationQuery {
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub lac: Option<String>,
    #[serde(alias = "cellId")]
    pub cellid: Option<String>,
}

fn required_int(name: &str, value: Option<&str>) -> Result<i64, ApiError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("missing query parameter '{name}'")))?;
    raw.parse::<i64>().map_err(|_| {
        ApiError::bad_request(format!("query parameter '{name}' is not an integer: {raw}"))
    })
}

impl LocationQuery {
    /// Parses the four parameters; range checks are left to
    /// [`CellQuery::validate`].
    pub fn to_cell_query(&self) -> Result<CellQuery, ApiError> {
        Ok(CellQuery::new(
            required_int("mcc", self.mcc.as_deref())?,
            required_int("mnc", self.mnc.as_deref())?,
            required_int("lac", self.lac.as_deref())?,
            required_int("cellid", self.cellid.as_deref())?,
        ))
    }
}

/// `{"lat", "lon", "range"}` as returned by the lookup endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationBody {
    pub lat: f64,
    pub lon: f64,
    pub range: u32,
}

impl From<LocationRecord> for LocationBody {
    fn from(record: LocationRecord) -> Self {
        Self {
            lat: record.lat,
            lon: record.lon,
            range: record.range,
        }
    }
}

impl LocationBody {
    /// Status the lookup endpoint reports for this body: the global fallback
    /// is always a 404, wherever it was served from.
    pub fn status(&self) -> StatusCode {
        if LocationRecord::new(self.lat, self.lon, self.range).is_default() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::OK
        }
    }
}

impl IntoResponse for LocationBody {
    fn into_response(self) -> Response {
        let status = self.status();
        ApiResponse::new(self, status).into_response()
    }
}

#[cfg(test)]
mod location_tests {
    use super::*;
    use cellgeo_core::{APPROXIMATED_RANGE, DEFAULT_RANGE};

    fn query(pairs: &[(&str, &str)]) -> LocationQuery {
        let mut q = LocationQuery::default();
        for (name, value) in pairs {
            let v = Some(value.to_string());
            match *name {
                "mcc" => q.mcc = v,
                "mnc" => q.mnc = v,
                "lac" => q.lac = v,
                _ => q.cellid = v,
            }
        }
        q
    }

    #[test]
    fn parses_integers() {
        let q = query(&[("mcc", "228"), ("mnc", "1"), ("lac", "1"), ("cellid", "1")]);
        assert_eq!(q.to_cell_query().unwrap(), CellQuery::new(228, 1, 1, 1));
    }

    #[test]
    fn keeps_out_of_range_values_for_validation() {
        let q = query(&[("mcc", "1000"), ("mnc", "1"), ("lac", "-1"), ("cellid", "1")]);
        let parsed = q.to_cell_query().unwrap();
        assert_eq!(parsed.mcc, 1000);
        assert!(parsed.validate().is_err());
    }

    #[test]
    fn missing_and_malformed_rejected() {
        let q = query(&[("mcc", "228"), ("mnc", "1"), ("lac", "1")]);
        assert!(matches!(q.to_cell_query(), Err(ApiError::BadRequest(m)) if m.contains("cellid")));

        let q = query(&[("mcc", "abc"), ("mnc", "1"), ("lac", "1"), ("cellid", "1")]);
        assert!(matches!(q.to_cell_query(), Err(ApiError::BadRequest(m)) if m.contains("abc")));
    }

    #[test]
    fn cell_id_alias_accepted() {
        let q: LocationQuery =
            serde_json::from_value(serde_json::json!({"mcc": "1", "mnc": "2", "lac": "3", "cellId": "4"}))
                .unwrap();
        assert_eq!(q.cellid.as_deref(), Some("4"));
    }

    #[test]
    fn status_follows_range() {
        let observed = LocationBody { lat: 1.0, lon: 2.0, range: 500 };
        let approximated = LocationBody { lat: 1.0, lon: 2.0, range: APPROXIMATED_RANGE };
        let fallback = LocationBody { lat: 1.0, lon: 2.0, range: DEFAULT_RANGE };
        assert_eq!(observed.status(), StatusCode::OK);
        assert_eq!(approximated.status(), StatusCode::OK);
        assert_eq!(fallback.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn location_body_wire_shape() {
        let body = LocationBody::from(LocationRecord::new(46.911, 7.36, 1200));
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"lat": 46.911, "lon": 7.36, "range": 1200})
        );
    }
}

// -------------------------
// Service endpoints
// -------------------------

/// Body of `GET /healthz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
}

impl HealthBody {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBody {
    /// Server build version.
    pub server: String,
    /// Modification time of the authoritative dataset as unix seconds, or
    /// `null` when it is not file backed.
    pub data_version: Option<i64>,
}
