//! HTTP-backed [`IntelAdapter`] (§6): `POST /query`, `GET /history/{module}`,
//! `POST /outcomes`, `GET /health`, all under an optional bearer token.

use super::error::IntelError;
use super::IntelAdapter;
use crate::models::{IntelContext, KillReport, OutcomeRecord};
use serde_json::json;
use url::Url;

pub struct HttpIntelAdapter {
    client: reqwest::blocking::Client,
    base_url: Url,
    bearer_token: Option<String>,
}

impl HttpIntelAdapter {
    pub fn new(client: reqwest::blocking::Client, base_url: Url, bearer_token: Option<String>) -> Self {
        HttpIntelAdapter {
            client,
            base_url,
            bearer_token,
        }
    }

    fn authorize(&self, builder: reqwest::blocking::RequestBuilder) -> reqwest::blocking::RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn map_transport_err(err: reqwest::Error) -> IntelError {
        if err.is_timeout() {
            IntelError::Timeout
        } else {
            IntelError::Connection(err.to_string())
        }
    }
}

impl IntelAdapter for HttpIntelAdapter {
    fn query_context(&self, report: &KillReport) -> Result<IntelContext, IntelError> {
        let url = self
            .base_url
            .join("query")
            .map_err(|e| IntelError::BadRequest(e.to_string()))?;
        let body = json!({
            "query_type": "kill_context",
            "kill_id": report.kill_id,
            "target_module": report.target_module,
            "target_instance_id": report.target_instance_id,
            "timestamp": report.timestamp,
            "include_historical": true,
            "historical_days": 30,
        });
        let request = self.authorize(self.client.post(url).json(&body));
        let response = request.send().map_err(Self::map_transport_err)?;
        if !response.status().is_success() {
            return Err(IntelError::BadRequest(format!("unexpected status {}", response.status())));
        }
        response
            .json::<IntelContext>()
            .map_err(|e| IntelError::BadRequest(e.to_string()))
    }

    fn get_history(&self, module: &str, days: u32) -> Result<Vec<IntelContext>, IntelError> {
        let url = self
            .base_url
            .join(&format!("history/{module}"))
            .map_err(|e| IntelError::BadRequest(e.to_string()))?;
        let request = self.authorize(self.client.get(url).query(&[("days", days)]));
        let response = request.send().map_err(Self::map_transport_err)?;
        if !response.status().is_success() {
            return Err(IntelError::BadRequest(format!("unexpected status {}", response.status())));
        }
        response
            .json::<Vec<IntelContext>>()
            .map_err(|e| IntelError::BadRequest(e.to_string()))
    }

    fn report_outcome(&self, record: &OutcomeRecord) -> Result<bool, IntelError> {
        let url = self
            .base_url
            .join("outcomes")
            .map_err(|e| IntelError::BadRequest(e.to_string()))?;
        let request = self.authorize(self.client.post(url).json(record));
        let response = request.send().map_err(Self::map_transport_err)?;
        Ok(response.status().is_success())
    }

    fn health_check(&self) -> Result<bool, IntelError> {
        let url = self
            .base_url
            .join("health")
            .map_err(|e| IntelError::BadRequest(e.to_string()))?;
        let request = self.authorize(self.client.get(url));
        let response = request.send().map_err(Self::map_transport_err)?;
        Ok(response.status().is_success())
    }
}
