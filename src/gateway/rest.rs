//! PostgREST / hosted-auth implementation of the gateway

use std::time::Duration;

use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CustomerQuery, Gateway, CUSTOMER_ID_COLUMN, CUSTOMER_TEXT_COLUMNS};
use crate::query::SearchTerm;
use crate::session::{AuthUser, Session};
use crate::types::{
    Agent, AgentCustomerCount, Customer, DailyCount, DashError, DashboardMetrics, Result,
};

const AGENT_TABLE: &str = "Agent";
const CUSTOMER_TABLE: &str = "Customer_Data";

/// Error payload shapes used by PostgREST and the auth service
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    hint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: AuthUser,
}

/// RPCs returning a single row come back as an object or a one-element array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: Default> OneOrMany<T> {
    fn into_first(self) -> T {
        match self {
            Self::One(value) => value,
            Self::Many(values) => values.into_iter().next().unwrap_or_default(),
        }
    }
}

/// Blocking HTTP gateway
pub struct RestGateway {
    client: Client,
    base_url: String,
    anon_key: String,
    access_token: Option<String>,
}

impl RestGateway {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashError::Http(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: None,
        })
    }

    /// Authorize later requests with the session's access token
    pub fn with_session(mut self, session: Option<&Session>) -> Self {
        self.access_token = session.map(|s| s.access_token.clone());
        self
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, path)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .map_err(|e| DashError::Http(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().unwrap_or_default();
        let message = error_message(status, &body);
        tracing::debug!(status = status.as_u16(), %message, "Gateway request failed");
        Err(DashError::Gateway {
            status: status.as_u16(),
            message,
        })
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        response
            .json()
            .map_err(|e| DashError::Decode(format!("JSON parse error: {}", e)))
    }

    fn rpc<T: DeserializeOwned>(&self, name: &str, body: Value) -> Result<T> {
        let url = self.rest_url(&format!("rpc/{}", name));
        let response = self.execute(self.request(Method::POST, &url).json(&body))?;
        Self::decode(response)
    }

    /// Run a token request; rejections become auth errors
    fn token_grant(&self, request: RequestBuilder) -> Result<Session> {
        let response = self.execute(request).map_err(|e| match e {
            DashError::Gateway { message, .. } => DashError::Auth(message),
            other => other,
        })?;
        let token: TokenResponse = Self::decode(response)?;

        let expires_at = token
            .expires_at
            .or_else(|| token.expires_in.map(|secs| Utc::now().timestamp() + secs))
            .unwrap_or(0);
        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        })
    }

    fn customer_filter(search: Option<&SearchTerm>) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "*".to_string())];
        if let Some(term) = search {
            params.push((
                "or",
                term.to_or_filter(&CUSTOMER_TEXT_COLUMNS, CUSTOMER_ID_COLUMN),
            ));
        }
        params
    }
}

/// Best human-readable message from an error body
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .or(parsed.error_description)
        .or(parsed.msg)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
    match parsed.hint {
        Some(hint) if !hint.is_empty() => format!("{} ({})", message, hint),
        _ => message,
    }
}

/// Total from a `Content-Range` header: `0-9/42` or `*/0`
fn parse_content_range(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

/// PostgREST column filter key with the space percent-encoded
fn column_key(column: &str) -> String {
    column.replace(' ', "%20")
}

impl Gateway for RestGateway {
    fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        let url = self.auth_url("token?grant_type=password");
        let request = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));

        let session = self.token_grant(request)?;
        tracing::info!(user = %session.user.id, "Signed in");
        Ok(session)
    }

    fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        let url = self.auth_url("token?grant_type=refresh_token");
        let request = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }));

        let session = self.token_grant(request)?;
        tracing::info!(user = %session.user.id, "Session refreshed");
        Ok(session)
    }

    fn sign_out(&self, session: &Session) -> Result<()> {
        let url = self.auth_url("logout");
        let request = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token);
        self.execute(request)
            .map_err(|e| DashError::Auth(e.message()))?;
        Ok(())
    }

    fn dashboard_metrics(&self) -> Result<DashboardMetrics> {
        let rows: OneOrMany<DashboardMetrics> = self.rpc("get_dashboard_metrics", json!({}))?;
        Ok(rows.into_first())
    }

    fn daily_customer_counts(&self, days_back: u32) -> Result<Vec<DailyCount>> {
        self.rpc(
            "get_daily_customer_counts",
            json!({ "days_back": days_back }),
        )
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        let url = self.rest_url(AGENT_TABLE);
        let response = self.execute(self.request(Method::GET, &url).query(&[("select", "*")]))?;
        Self::decode(response)
    }

    fn agent_customer_counts(&self) -> Result<Vec<AgentCustomerCount>> {
        self.rpc("get_agent_customer_counts", json!({}))
    }

    fn list_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        let url = self.rest_url(CUSTOMER_TABLE);
        let mut params = Self::customer_filter(query.search.as_ref());
        params.push(("order", query.sort.to_order_param()));
        params.push(("offset", query.range.offset.to_string()));
        params.push(("limit", query.range.limit.to_string()));

        let response = self.execute(self.request(Method::GET, &url).query(&params))?;
        Self::decode(response)
    }

    fn count_customers(&self, search: Option<&SearchTerm>) -> Result<u64> {
        let url = self.rest_url(CUSTOMER_TABLE);
        let request = self
            .request(Method::HEAD, &url)
            .query(&Self::customer_filter(search))
            .header("Prefer", "count=exact");
        let response = self.execute(request)?;

        response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| DashError::Decode("Missing or invalid Content-Range header".into()))
    }

    fn update_agent_name(&self, agent_id: i64, new_name: &str) -> Result<()> {
        let url = format!(
            "{}?{}=eq.{}",
            self.rest_url(AGENT_TABLE),
            column_key("Agent ID"),
            agent_id
        );
        let request = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&json!({ "Full Name": new_name }));
        let response = self.execute(request)?;
        let status = response.status().as_u16();

        // An unknown id and a row hidden by row-level security both come back empty
        let updated: Vec<Value> = Self::decode(response)?;
        if updated.is_empty() {
            return Err(DashError::Gateway {
                status,
                message: format!(
                    "No rows updated: agent {} not found or not permitted",
                    agent_id
                ),
            });
        }
        tracing::info!(agent_id, "Agent renamed");
        Ok(())
    }
}
