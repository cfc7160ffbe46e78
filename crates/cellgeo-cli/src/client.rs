use anyhow::{Context, Result};
use cellgeo_api::{ErrorBody, LocationBody, VersionBody};
use serde_json::Value;
use url::Url;

/// A resolved location and whether the server considered it found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub found: bool,
    pub location: LocationBody,
}

pub struct CellgeoClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CellgeoClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid server URL: {base_url}"))?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid request path: {path}"))
    }

    pub async fn lookup(&self, mcc: i64, mnc: i64, lac: i64, cellid: i64) -> Result<Lookup> {
        let resp = self
            .http
            .get(self.url("/")?)
            .query(&[("mcc", mcc), ("mnc", mnc), ("lac", lac), ("cellid", cellid)])
            .send()
            .await
            .context("Failed to connect to server")?;

        // 404 still carries the fallback location.
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let location = resp.json().await.context("Failed to parse response JSON")?;
            return Ok(Lookup {
                found: false,
                location,
            });
        }
        let body = handle_response(resp).await?;
        let location = serde_json::from_value(body).context("Unexpected lookup response")?;
        Ok(Lookup {
            found: true,
            location,
        })
    }

    pub async fn health(&self) -> Result<(u16, String)> {
        let resp = self
            .http
            .get(self.url("/healthz")?)
            .send()
            .await
            .context("Failed to connect to server")?;
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Ok((status, body))
    }

    pub async fn version(&self) -> Result<VersionBody> {
        let body = self.get("/version").await?;
        serde_json::from_value(body).context("Unexpected version response")
    }

    pub async fn stats(&self) -> Result<Value> {
        self.get("/stats").await
    }

    pub async fn reconcile(&self, tier: &str) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(&format!("/admin/reconcile/{tier}"))?)
            .send()
            .await
            .context("Failed to connect to server")?;
        handle_response(resp).await
    }

    pub async fn refresh(&self, tier: &str, max_age_secs: Option<u64>) -> Result<Value> {
        let mut request = self.http.post(self.url(&format!("/admin/refresh/{tier}"))?);
        if let Some(secs) = max_age_secs {
            request = request.query(&[("max_age_secs", secs)]);
        }
        let resp = request
            .send()
            .await
            .context("Failed to connect to server")?;
        handle_response(resp).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .context("Failed to connect to server")?;
        handle_response(resp).await
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
            anyhow::bail!("HTTP {status}: {} ({})", err.error.message, err.error.code);
        }
        anyhow::bail!("HTTP {status}: {body}");
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&body).context("Failed to parse response JSON")
}
