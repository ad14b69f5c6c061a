//! Scoring service client
//!
//! Every endpoint is a JSON POST. Each call is a single attempt bounded by
//! the configured timeout; retry cadence is left to the caller.

use crate::types::{CustomerQuery, CustomerRef, InputData, InterventionRequest};
use reqwest::Client;
use riskpulse_core::{FetchError, RiskError, ScoringConfig, StatsSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

const DASHBOARD_STATS_PATH: &str = "/get_dashboard_stats";
const LIST_CUSTOMERS_PATH: &str = "/list_customers";
const GET_CUSTOMER_PATH: &str = "/get_customer";
const ANALYZE_CUSTOMER_PATH: &str = "/analyze_customer_risk";
const AI_INSIGHTS_PATH: &str = "/generate_ai_insights";
const EXECUTE_INTERVENTION_PATH: &str = "/execute_intervention";

/// Scoring service API client
#[derive(Clone)]
pub struct ScoringClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ScoringClient {
    /// Create a client for the configured scoring service
    pub fn new(config: &ScoringConfig) -> Result<Self, RiskError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RiskError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch aggregate dashboard statistics
    ///
    /// The response body is returned exactly as the service produced it.
    #[instrument(skip(self))]
    pub async fn fetch_stats(&self) -> Result<StatsSnapshot, FetchError> {
        self.post(DASHBOARD_STATS_PATH, &serde_json::json!({})).await
    }

    /// List customers with their risk scores
    #[instrument(skip(self))]
    pub async fn list_customers(&self, query: &CustomerQuery) -> Result<Value, FetchError> {
        self.post(LIST_CUSTOMERS_PATH, &InputData::new(query)).await
    }

    /// Look up a single customer
    #[instrument(skip(self))]
    pub async fn get_customer(&self, customer_id: &str) -> Result<Value, FetchError> {
        self.post(GET_CUSTOMER_PATH, &Self::customer_ref(customer_id))
            .await
    }

    /// Run the full risk analysis for a customer, including the model explanation
    #[instrument(skip(self))]
    pub async fn analyze_customer_risk(&self, customer_id: &str) -> Result<Value, FetchError> {
        self.post(ANALYZE_CUSTOMER_PATH, &Self::customer_ref(customer_id))
            .await
    }

    /// Generate the AI narrative and personalised message for a customer
    #[instrument(skip(self))]
    pub async fn generate_ai_insights(&self, customer_id: &str) -> Result<Value, FetchError> {
        self.post(AI_INSIGHTS_PATH, &Self::customer_ref(customer_id))
            .await
    }

    /// Trigger an intervention action
    #[instrument(skip(self))]
    pub async fn execute_intervention(
        &self,
        request: &InterventionRequest,
    ) -> Result<Value, FetchError> {
        self.post(EXECUTE_INTERVENTION_PATH, &InputData::new(request))
            .await
    }

    fn customer_ref(customer_id: &str) -> InputData<CustomerRef> {
        InputData::new(CustomerRef {
            customer_id: customer_id.to_string(),
        })
    }

    /// POST a JSON body and decode the JSON response
    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, FetchError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);

        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::status(status.as_u16(), body));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        serde_json::from_slice(&bytes)
            .map_err(|e| FetchError::parse(format!("Failed to parse {} response: {}", path, e)))
    }

    fn map_transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_secs())
        } else {
            FetchError::network(e.to_string())
        }
    }
}

impl std::fmt::Debug for ScoringClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoringClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RiskFilter;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> ScoringClient {
        ScoringClient::new(&ScoringConfig {
            base_url: server.uri(),
            timeout,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_stats_passes_body_through() {
        let server = MockServer::start().await;
        let body = r#"{"summary":{"totalCustomers":1000,"criticalRisk":12},"riskDistribution":[]}"#;

        Mock::given(method("POST"))
            .and(path("/get_dashboard_stats"))
            .and(body_json(json!({})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(body.as_bytes().to_vec(), "application/json"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let snapshot = client.fetch_stats().await.unwrap();

        assert_eq!(snapshot.as_str(), body);
    }

    #[tokio::test]
    async fn test_fetch_stats_non_success_status() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_dashboard_stats"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let err = client.fetch_stats().await.unwrap_err();

        assert_eq!(err, FetchError::status(503, "model loading"));
    }

    #[tokio::test]
    async fn test_fetch_stats_malformed_body() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_dashboard_stats"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let err = client.fetch_stats().await.unwrap_err();

        assert!(matches!(err, FetchError::Parse(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_stats_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/get_dashboard_stats"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"summary": {}}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(1));
        let err = client.fetch_stats().await.unwrap_err();

        assert_eq!(err, FetchError::Timeout(1));
    }

    #[tokio::test]
    async fn test_fetch_stats_connection_refused() {
        let client = ScoringClient::new(&ScoringConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let err = client.fetch_stats().await.unwrap_err();
        assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_list_customers_wraps_input_data() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/list_customers"))
            .and(body_json(json!({
                "input_data": {"risk_filter": "High", "search": "", "enrich_ml": false, "limit": 20}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"customers": [{"customer_id": "CUSR-100001"}]})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let query = CustomerQuery {
            risk_filter: RiskFilter::High,
            limit: Some(20),
            ..CustomerQuery::default()
        };
        let customers = client.list_customers(&query).await.unwrap();

        assert_eq!(customers["customers"][0]["customer_id"], "CUSR-100001");
    }

    #[tokio::test]
    async fn test_analyze_customer_risk() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/analyze_customer_risk"))
            .and(body_json(json!({"input_data": {"customer_id": "CUSR-100007"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "risk_analysis": {"score": 87, "level": "Critical"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let analysis = client.analyze_customer_risk("CUSR-100007").await.unwrap();

        assert_eq!(analysis["risk_analysis"]["level"], "Critical");
    }

    #[tokio::test]
    async fn test_execute_intervention() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute_intervention"))
            .and(body_json(json!({
                "input_data": {"customer_id": "CUSR-100007", "action": "EMI Holiday", "channel": "sms"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "queued"})))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(10));
        let request = InterventionRequest {
            customer_id: "CUSR-100007".to_string(),
            action: "EMI Holiday".to_string(),
            channel: Some("sms".to_string()),
            message: None,
        };
        let result = client.execute_intervention(&request).await.unwrap();

        assert_eq!(result["status"], "queued");
    }
}
