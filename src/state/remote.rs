// Remote spreadsheet client
// Talks to a small JSON relay in front of the spreadsheet (row count + append)
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::{StoreError, StoreResult};
use crate::config::RemoteConfig;

const USER_AGENT: &str = concat!("melopref/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct RowCount {
    rows: u32,
}

#[derive(Debug, Serialize)]
struct AppendRequest<'a> {
    spreadsheet: &'a str,
    worksheet: &'a str,
    row: &'a [Value],
}

pub struct RemoteSheet {
    http_client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl RemoteSheet {
    /// Build a client for the configured endpoint, `None` when no endpoint is set
    pub fn from_config(config: &RemoteConfig) -> StoreResult<Option<Self>> {
        let Some(endpoint) = config.endpoint.clone() else {
            return Ok(None);
        };

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Some(Self {
            http_client,
            endpoint,
            token: config.token.clone(),
        }))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Number of data rows in a worksheet
    pub async fn count_rows(&self, spreadsheet: &str, worksheet: &str) -> StoreResult<u32> {
        let request = self
            .http_client
            .get(&self.endpoint)
            .query(&[("spreadsheet", spreadsheet), ("worksheet", worksheet)]);

        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::RemoteStatus(status.as_u16(), body));
        }

        let count: RowCount = response.json().await?;
        log::debug!("Remote {}/{} has {} row(s)", spreadsheet, worksheet, count.rows);
        Ok(count.rows)
    }

    /// Append one row to a worksheet
    pub async fn append_row(&self, spreadsheet: &str, worksheet: &str, row: &[Value]) -> StoreResult<()> {
        let request = self.http_client.post(&self.endpoint).json(&AppendRequest {
            spreadsheet,
            worksheet,
            row,
        });

        let response = self.authorize(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::RemoteStatus(status.as_u16(), body));
        }

        log::info!("Appended row to remote {}/{}", spreadsheet, worksheet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Query, State};
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    // What the relay saw: authorization header, query and JSON body per request
    #[derive(Default)]
    struct Seen {
        auth: Vec<Option<String>>,
        queries: Vec<HashMap<String, String>>,
        bodies: Vec<Value>,
    }

    type Log = Arc<Mutex<Seen>>;

    fn auth_of(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn count_rows_handler(
        State(log): State<Log>,
        headers: HeaderMap,
        Query(query): Query<HashMap<String, String>>,
    ) -> Json<Value> {
        let mut seen = log.lock().unwrap();
        seen.auth.push(auth_of(&headers));
        seen.queries.push(query);
        Json(json!({ "rows": 12 }))
    }

    async fn append_handler(State(log): State<Log>, headers: HeaderMap, Json(body): Json<Value>) -> StatusCode {
        let mut seen = log.lock().unwrap();
        seen.auth.push(auth_of(&headers));
        seen.bodies.push(body);
        StatusCode::OK
    }

    async fn spawn_relay(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/exec", addr)
    }

    async fn recording_client(token: Option<&str>) -> (RemoteSheet, Log) {
        let log = Log::default();
        let app = Router::new()
            .route("/exec", get(count_rows_handler).post(append_handler))
            .with_state(log.clone());
        let config = RemoteConfig {
            endpoint: Some(spawn_relay(app).await),
            token: token.map(str::to_string),
            timeout_secs: 5,
        };
        (RemoteSheet::from_config(&config).unwrap().unwrap(), log)
    }

    #[test]
    fn test_no_endpoint_means_no_client() {
        let client = RemoteSheet::from_config(&RemoteConfig::default()).unwrap();
        assert!(client.is_none());
    }

    #[test]
    fn test_client_keeps_endpoint() {
        let config = RemoteConfig {
            endpoint: Some("https://sheets.example/exec".to_string()),
            token: Some("secret".to_string()),
            timeout_secs: 5,
        };
        let client = RemoteSheet::from_config(&config).unwrap().unwrap();
        assert_eq!(client.endpoint(), "https://sheets.example/exec");
    }

    #[test]
    fn test_append_body_shape() {
        let row = vec![json!(1), json!(0), json!(22)];
        let body = serde_json::to_value(AppendRequest {
            spreadsheet: "research",
            worksheet: "participants",
            row: &row,
        })
        .unwrap();
        assert_eq!(
            body,
            json!({"spreadsheet": "research", "worksheet": "participants", "row": [1, 0, 22]})
        );
    }

    #[test]
    fn test_row_count_body() {
        let count: RowCount = serde_json::from_str(r#"{"rows": 7}"#).unwrap();
        assert_eq!(count.rows, 7);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let config = RemoteConfig {
            endpoint: Some("http://127.0.0.1:9/exec".to_string()),
            token: None,
            timeout_secs: 2,
        };
        let client = RemoteSheet::from_config(&config).unwrap().unwrap();
        let result = client.count_rows("research", "participants").await;
        assert!(matches!(result, Err(StoreError::Remote(_))));
    }

    #[tokio::test]
    async fn test_count_rows_queries_the_relay() {
        let (client, log) = recording_client(None).await;
        assert_eq!(client.count_rows("research", "participants").await.unwrap(), 12);

        let seen = log.lock().unwrap();
        assert_eq!(seen.queries[0]["spreadsheet"], "research");
        assert_eq!(seen.queries[0]["worksheet"], "participants");
        assert_eq!(seen.auth, vec![None]);
    }

    #[tokio::test]
    async fn test_append_posts_row_with_bearer_token() {
        let (client, log) = recording_client(Some("s3cret")).await;
        client
            .append_row("research", "responses", &[json!(3), json!("song"), json!(1.25)])
            .await
            .unwrap();
        client.count_rows("research", "responses").await.unwrap();

        let seen = log.lock().unwrap();
        assert_eq!(
            seen.bodies,
            vec![json!({"spreadsheet": "research", "worksheet": "responses", "row": [3, "song", 1.25]})]
        );
        assert_eq!(
            seen.auth,
            vec![Some("Bearer s3cret".to_string()), Some("Bearer s3cret".to_string())]
        );
    }

    #[tokio::test]
    async fn test_error_status_carries_body() {
        let app = Router::new().route(
            "/exec",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "sheet locked") })
                .post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "quota exceeded") }),
        );
        let config = RemoteConfig {
            endpoint: Some(spawn_relay(app).await),
            token: None,
            timeout_secs: 5,
        };
        let client = RemoteSheet::from_config(&config).unwrap().unwrap();

        match client.append_row("research", "responses", &[json!(1)]).await {
            Err(StoreError::RemoteStatus(500, body)) => assert_eq!(body, "quota exceeded"),
            other => panic!("unexpected result: {:?}", other),
        }
        match client.count_rows("research", "responses").await {
            Err(StoreError::RemoteStatus(503, body)) => assert_eq!(body, "sheet locked"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_count_is_an_error() {
        let app = Router::new().route("/exec", get(|| async { "not json" }));
        let config = RemoteConfig {
            endpoint: Some(spawn_relay(app).await),
            token: None,
            timeout_secs: 5,
        };
        let client = RemoteSheet::from_config(&config).unwrap().unwrap();
        assert!(matches!(
            client.count_rows("research", "participants").await,
            Err(StoreError::Remote(_))
        ));
    }
}
