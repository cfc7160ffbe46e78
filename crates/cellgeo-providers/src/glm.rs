//! Client for the binary-protocol geolocation service.
//!
//! Requests are a fixed 55-byte frame posted as the raw body. Responses are
//! 25-byte big-endian frames:
//!
//! | bytes  | field                         |
//! |--------|-------------------------------|
//! | 0..3   | header                        |
//! | 3..7   | status code (0 = ok)          |
//! | 7..11  | latitude  (micro-degrees)     |
//! | 11..15 | longitude (micro-degrees)     |
//! | 15..19 | range in meters               |
//! | 19..25 | trailer                       |

use std::time::Duration;

use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use cellgeo_core::{CellKey, LocationRecord};
use cellgeo_storage::TierId;
use reqwest::Client;
use tracing::{debug, instrument, warn};

use crate::config::GlmConfig;
use crate::error::ProviderError;
use crate::outcome::ProviderOutcome;
use crate::traits::LocationProvider;

const REQUEST_HEADER: [u8; 31] = [
    0x00, 0x0e, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x1b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x00, 0x00,
];

const REQUEST_TRAILER: [u8; 8] = [0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00];

/// Size of an encoded request.
pub const REQUEST_LEN: usize = REQUEST_HEADER.len() + 16 + REQUEST_TRAILER.len();

/// Shortest response that still carries status, position and range.
pub const MIN_RESPONSE_LEN: usize = 19;

/// Encodes the request frame for `key`.
pub fn encode_request(key: &CellKey) -> Bytes {
    let mut buf = BytesMut::with_capacity(REQUEST_LEN);
    buf.put_slice(&REQUEST_HEADER);
    buf.put_u32(key.cell_id());
    buf.put_u32(key.lac());
    buf.put_u32(key.mnc());
    buf.put_u32(key.mcc());
    buf.put_slice(&REQUEST_TRAILER);
    buf.freeze()
}

fn read_i32(body: &[u8], offset: usize) -> i32 {
    i32::from_be_bytes([
        body[offset],
        body[offset + 1],
        body[offset + 2],
        body[offset + 3],
    ])
}

/// Decodes a response frame.
///
/// Short frames, a non-zero status, a (0, 0) position and implausible values
/// all mean the cell is unknown.
pub fn decode_response(body: &[u8]) -> ProviderOutcome {
    if body.len() < MIN_RESPONSE_LEN {
        debug!(len = body.len(), "response frame too short");
        return ProviderOutcome::NotFound;
    }

    let status = read_i32(body, 3);
    if status != 0 {
        debug!(status, "provider reported error status");
        return ProviderOutcome::NotFound;
    }

    let lat_micro = read_i32(body, 7);
    let lon_micro = read_i32(body, 11);
    let range = read_i32(body, 15);

    if lat_micro == 0 && lon_micro == 0 {
        return ProviderOutcome::NotFound;
    }

    let Ok(range) = u32::try_from(range) else {
        debug!(range, "negative range");
        return ProviderOutcome::NotFound;
    };

    let record = LocationRecord::new(
        f64::from(lat_micro) / 1_000_000.0,
        f64::from(lon_micro) / 1_000_000.0,
        range,
    );
    if !record.is_plausible_observation() {
        debug!(lat = record.lat, lon = record.lon, range, "implausible location");
        return ProviderOutcome::NotFound;
    }

    ProviderOutcome::Found(record)
}

/// Binary-protocol provider; answers are cached in the `glm` tier.
pub struct GlmProvider {
    http_client: Client,
    url: String,
    timeout_ms: u64,
}

impl GlmProvider {
    /// Builds a client with the given endpoint and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &GlmConfig, timeout_ms: u64) -> Result<Self, ProviderError> {
        let timeout = Duration::from_millis(timeout_ms);
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| ProviderError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            http_client,
            url: config.url.clone(),
            timeout_ms,
        })
    }

    async fn fetch(&self, key: &CellKey) -> Result<Bytes, ProviderError> {
        let response = self
            .http_client
            .post(&self.url)
            .header("Content-Type", "application/binary")
            .body(encode_request(key))
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.timeout_ms))
    }
}

#[async_trait]
impl LocationProvider for GlmProvider {
    fn id(&self) -> &'static str {
        "glm"
    }

    fn cache_tier(&self) -> TierId {
        TierId::Glm
    }

    #[instrument(skip(self, key), fields(provider = "glm", key = %key))]
    async fn locate(&self, key: &CellKey) -> ProviderOutcome {
        match self.fetch(key).await {
            Ok(body) => decode_response(&body),
            Err(e) => {
                warn!(error = %e, "provider request failed");
                ProviderOutcome::TransportError(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn frame(status: i32, lat: i32, lon: i32, range: i32) -> Vec<u8> {
        let mut body = vec![0u8; 3];
        body.extend_from_slice(&status.to_be_bytes());
        body.extend_from_slice(&lat.to_be_bytes());
        body.extend_from_slice(&lon.to_be_bytes());
        body.extend_from_slice(&range.to_be_bytes());
        body.extend_from_slice(&[0u8; 6]);
        body
    }

    fn key() -> CellKey {
        CellKey::new(228, 1, 1, 1).unwrap()
    }

    #[test]
    fn test_encode_request() {
        let encoded = encode_request(&CellKey::new(228, 1, 0x1234, 0x00ab_cdef).unwrap());
        assert_eq!(encoded.len(), 55);
        assert_eq!(&encoded[..31], &REQUEST_HEADER);
        assert_eq!(&encoded[31..35], &[0x00, 0xab, 0xcd, 0xef]);
        assert_eq!(&encoded[35..39], &[0x00, 0x00, 0x12, 0x34]);
        assert_eq!(&encoded[39..43], &[0x00, 0x00, 0x00, 0x01]);
        assert_eq!(&encoded[43..47], &[0x00, 0x00, 0x00, 0xe4]);
        assert_eq!(&encoded[47..], &REQUEST_TRAILER);
    }

    #[test]
    fn test_decode_found() {
        let encoded = encode_request(&key());
        assert_eq!(encoded.len(), REQUEST_LEN);

        match decode_response(&frame(0, 46_911_000, 7_360_000, 1200)) {
            ProviderOutcome::Found(record) => {
                assert!((record.lat - 46.911).abs() < 1e-6);
                assert!((record.lon - 7.360).abs() < 1e-6);
                assert_eq!(record.range, 1200);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_negative_coordinates() {
        match decode_response(&frame(0, -33_868_800, -151_209_300, 500)) {
            ProviderOutcome::Found(record) => {
                assert!((record.lat + 33.8688).abs() < 1e-6);
                assert!((record.lon + 151.2093).abs() < 1e-6);
            }
            other => panic!("expected Found, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_not_found_cases() {
        assert!(matches!(decode_response(&[0u8; 18]), ProviderOutcome::NotFound));
        assert!(matches!(
            decode_response(&frame(1, 46_911_000, 7_360_000, 1200)),
            ProviderOutcome::NotFound
        ));
        assert!(matches!(
            decode_response(&frame(0, 0, 0, 1200)),
            ProviderOutcome::NotFound
        ));
        assert!(matches!(
            decode_response(&frame(0, 95_000_000, 7_360_000, 1200)),
            ProviderOutcome::NotFound
        ));
        assert!(matches!(
            decode_response(&frame(0, 46_911_000, 7_360_000, 2_000_000)),
            ProviderOutcome::NotFound
        ));
        assert!(matches!(
            decode_response(&frame(0, 46_911_000, 7_360_000, -1)),
            ProviderOutcome::NotFound
        ));
    }

    #[test]
    fn test_decode_accepts_minimum_frame() {
        let body = &frame(0, 46_911_000, 7_360_000, 1200)[..MIN_RESPONSE_LEN];
        assert!(decode_response(body).is_found());
    }

    #[tokio::test]
    async fn test_locate_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/glm/mmap"))
            .and(body_bytes(encode_request(&key()).to_vec()))
            .respond_with(
                ResponseTemplate::new(200).set_body_bytes(frame(0, 46_911_000, 7_360_000, 1200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = GlmConfig {
            enabled: true,
            url: format!("{}/glm/mmap", server.uri()),
        };
        let provider = GlmProvider::new(&config, 3000).unwrap();
        assert!(provider.locate(&key()).await.is_found());
    }

    #[tokio::test]
    async fn test_http_error_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = GlmConfig {
            enabled: true,
            url: server.uri(),
        };
        let provider = GlmProvider::new(&config, 3000).unwrap();
        match provider.locate(&key()).await {
            ProviderOutcome::TransportError(ProviderError::HttpStatus { status }) => {
                assert_eq!(status, 503)
            }
            other => panic!("expected TransportError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(frame(0, 46_911_000, 7_360_000, 1200))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let config = GlmConfig {
            enabled: true,
            url: server.uri(),
        };
        let provider = GlmProvider::new(&config, 50).unwrap();
        match provider.locate(&key()).await {
            ProviderOutcome::TransportError(e) => assert!(e.is_timeout()),
            other => panic!("expected TransportError, got {other:?}"),
        }
    }
}
