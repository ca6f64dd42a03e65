//! BigQuery REST client
//!
//! Implements [`WarehouseClient`] on top of the BigQuery v2 REST API with
//! `reqwest`. Queries go through `jobs.query`, are polled with
//! `jobs.getQueryResults` until the job completes, and are paged with
//! `pageToken` until every row is materialized.

use super::models::{
    ErrorResponse, FormatOptions, JobReference, QueryRequest, QueryResponse, Table, TableSchema,
};
use crate::adapters::warehouse::{QueryResult, TableMetadata, WarehouseClient};
use crate::config::{SecretString, WarehouseConfig};
use crate::core::sql::Statement;
use crate::domain::{ExtractError, Result, TableRef, WarehouseError};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use url::Url;

/// Upper bound for a single server-side wait in `jobs.query`/`getQueryResults`
const MAX_SERVER_WAIT_MS: u64 = 10_000;

/// BigQuery client
///
/// # Example
///
/// ```no_run
/// use bqextract::adapters::bigquery::BigQueryClient;
/// use bqextract::config::WarehouseConfig;
///
/// # fn example() -> bqextract::domain::Result<()> {
/// let client = BigQueryClient::new(&WarehouseConfig::default(), "my-billing-project")?;
/// assert_eq!(client.project(), "my-billing-project");
/// # Ok(())
/// # }
/// ```
pub struct BigQueryClient {
    client: Client,
    endpoint: Url,
    project: String,
    access_token: Option<SecretString>,
    location: Option<String>,
    timeout: Duration,
    poll_interval: Duration,
}

/// Whether a call needs rows or only completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fetch {
    Rows,
    CompletionOnly,
}

impl BigQueryClient {
    /// Create a new client billing jobs to `project`
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Configuration`] for an unusable endpoint or
    /// when the HTTP client cannot be built.
    pub fn new(config: &WarehouseConfig, project: &str) -> Result<Self> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/')).map_err(|e| {
            ExtractError::Configuration(format!(
                "Invalid warehouse endpoint '{}': {e}",
                config.endpoint
            ))
        })?;

        let timeout = Duration::from_secs(config.timeout_seconds);
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ExtractError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        if config.access_token.is_none() {
            tracing::warn!("No warehouse access token configured, sending unauthenticated requests");
        }

        Ok(Self {
            client,
            endpoint,
            project: project.to_string(),
            access_token: config.access_token.clone(),
            location: config.location.clone(),
            timeout,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// Billing project
    pub fn project(&self) -> &str {
        &self.project
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ExtractError::Configuration(format!(
                    "Warehouse endpoint '{}' cannot be a base URL",
                    self.endpoint
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_url(&self, table: &TableRef) -> Result<Url> {
        let dataset = table.dataset().ok_or_else(|| {
            ExtractError::Configuration(format!(
                "Table reference '{table}' must include a dataset"
            ))
        })?;
        let project = table.project().unwrap_or(&self.project);
        self.url(&["projects", project, "datasets", dataset, "tables", table.table()])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.access_token {
            Some(token) => {
                let token: &str = token.expose_secret().as_ref();
                request.bearer_auth(token)
            }
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                WarehouseError::Timeout(e.to_string())
            } else {
                WarehouseError::ConnectionFailed(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body).into())
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        response.json::<T>().await.map_err(|e| {
            WarehouseError::InvalidResponse(format!("Failed to decode response: {e}")).into()
        })
    }

    async fn start_query(&self, sql: &str, wait_ms: u64) -> Result<QueryResponse> {
        let body = QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            request_id: uuid::Uuid::new_v4().to_string(),
            location: self.location.clone(),
            timeout_ms: wait_ms,
            format_options: FormatOptions {
                use_int64_timestamp: true,
            },
        };
        let url = self.url(&["projects", self.project.as_str(), "queries"])?;
        self.send_json(self.client.post(url).json(&body)).await
    }

    async fn query_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
        wait_ms: u64,
    ) -> Result<QueryResponse> {
        let url = self.url(&[
            "projects",
            job.project_id.as_str(),
            "queries",
            job.job_id.as_str(),
        ])?;
        let mut params: Vec<(&str, String)> = vec![
            ("timeoutMs", wait_ms.to_string()),
            ("formatOptions.useInt64Timestamp", "true".to_string()),
        ];
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            params.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }
        self.send_json(self.client.get(url).query(&params)).await
    }

    async fn run(&self, statement: &Statement, fetch: Fetch) -> Result<QueryResult> {
        let start = Instant::now();
        let deadline = start + self.timeout;
        let wait_ms = |now: Instant| -> u64 {
            let remaining = deadline.saturating_duration_since(now).as_millis() as u64;
            remaining.clamp(1, MAX_SERVER_WAIT_MS)
        };

        let mut response = self.start_query(statement.as_sql(), wait_ms(start)).await?;
        log_job_warnings(&response);

        while !response.job_complete {
            if Instant::now() >= deadline {
                return Err(WarehouseError::Timeout(format!(
                    "Job did not complete within {}s",
                    self.timeout.as_secs()
                ))
                .into());
            }
            let job = job_reference(&response)?;
            tracing::debug!(job_id = %job.job_id, "Waiting for job to complete");
            tokio::time::sleep(self.poll_interval).await;
            response = self.query_results(&job, None, wait_ms(Instant::now())).await?;
            log_job_warnings(&response);
        }

        let schema = response.schema.clone().unwrap_or_default();
        let mut result = QueryResult {
            schema: schema.columns(),
            rows: Vec::new(),
        };
        if fetch == Fetch::CompletionOnly {
            tracing::debug!(
                duration_ms = start.elapsed().as_millis() as u64,
                "Statement completed"
            );
            return Ok(result);
        }

        append_rows(&schema, &response, &mut result)?;
        while let Some(token) = response.page_token.clone() {
            let job = job_reference(&response)?;
            response = self
                .query_results(&job, Some(&token), wait_ms(Instant::now()))
                .await?;
            log_job_warnings(&response);
            append_rows(&schema, &response, &mut result)?;
        }

        tracing::debug!(
            rows = result.rows.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Query completed"
        );
        Ok(result)
    }
}

#[async_trait]
impl WarehouseClient for BigQueryClient {
    async fn execute_query(&self, statement: &Statement) -> Result<QueryResult> {
        self.run(statement, Fetch::Rows).await
    }

    async fn execute(&self, statement: &Statement) -> Result<()> {
        self.run(statement, Fetch::CompletionOnly).await.map(|_| ())
    }

    async fn table_metadata(&self, table: &TableRef) -> Result<TableMetadata> {
        let url = self.table_url(table)?;
        let resource: Table = self.send_json(self.client.get(url)).await?;
        let row_count = match resource.num_rows.as_deref() {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                WarehouseError::InvalidResponse(format!(
                    "Table {table} reported a non-integer row count '{raw}'"
                ))
            })?,
            None => 0,
        };
        tracing::debug!(table = %table, row_count, "Read table metadata");
        Ok(TableMetadata { row_count })
    }

    async fn delete_table(&self, table: &TableRef, ignore_missing: bool) -> Result<()> {
        let url = self.table_url(table)?;
        match self.send(self.client.delete(url)).await {
            Ok(_) => Ok(()),
            Err(ExtractError::Warehouse(e)) if ignore_missing && e.is_not_found() => {
                tracing::debug!(table = %table, "Table already absent");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn job_reference(response: &QueryResponse) -> Result<JobReference> {
    response.job_reference.clone().ok_or_else(|| {
        WarehouseError::InvalidResponse("Response is missing the job reference".to_string()).into()
    })
}

/// Logs the `errors` list of a successful response
///
/// A failed job is reported through a non-success status and mapped by
/// [`status_error`]; entries arriving with a 2xx status are warnings.
fn log_job_warnings(response: &QueryResponse) {
    if response.errors.is_empty() {
        return;
    }
    let messages: Vec<String> = response.errors.iter().map(ToString::to_string).collect();
    tracing::warn!(
        job_id = response.job_reference.as_ref().map(|j| j.job_id.as_str()),
        warnings = %messages.join("; "),
        "Warehouse reported warnings"
    );
}

fn append_rows(schema: &TableSchema, response: &QueryResponse, result: &mut QueryResult) -> Result<()> {
    for row in &response.rows {
        result.rows.push(schema.decode_row(row)?);
    }
    Ok(())
}

/// Maps a non-success HTTP status and body to a warehouse error
pub(crate) fn status_error(status: StatusCode, body: &str) -> WarehouseError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|e| {
            let details: Vec<String> = e.error.errors.iter().map(ToString::to_string).collect();
            if e.error.message.is_empty() {
                details.join("; ")
            } else {
                e.error.message
            }
        })
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        400 => WarehouseError::QueryFailed(message),
        401 | 403 => WarehouseError::AuthenticationFailed(message),
        404 => WarehouseError::NotFound(message),
        code if status.is_client_error() => WarehouseError::ClientError {
            status: code,
            message,
        },
        code => WarehouseError::ServerError {
            status: code,
            message,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::secret_string;
    use crate::core::sql::{Relation, Select};
    use mockito::Matcher;
    use serde_json::json;

    fn config(endpoint: &str) -> WarehouseConfig {
        WarehouseConfig {
            endpoint: endpoint.to_string(),
            access_token: Some(secret_string("test-token".to_string())),
            location: Some("EU".to_string()),
            timeout_seconds: 5,
            poll_interval_ms: 1,
        }
    }

    fn statement() -> Statement {
        Statement::query(&Select::all_from(Relation::Table(
            TableRef::new("p.d.t").unwrap(),
        )))
    }

    fn schema() -> serde_json::Value {
        json!({"fields": [{"name": "id", "type": "INTEGER"}, {"name": "name", "type": "STRING"}]})
    }

    #[tokio::test]
    async fn test_execute_query_single_page() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/projects/billing/queries")
            .match_header("authorization", "Bearer test-token")
            .match_body(Matcher::PartialJson(json!({
                "useLegacySql": false,
                "location": "EU",
                "query": "SELECT *\nFROM `p.d.t`"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": {"projectId": "billing", "jobId": "job1", "location": "EU"},
                    "jobComplete": true,
                    "schema": schema(),
                    "rows": [{"f": [{"v": "1"}, {"v": "a"}]}, {"f": [{"v": "2"}, {"v": null}]}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let result = client.execute_query(&statement()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.schema[0].name, "id");
        assert_eq!(result.rows[0]["id"], json!(1));
        assert_eq!(result.rows[1]["name"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_execute_query_polls_until_complete() {
        let mut server = mockito::Server::new_async().await;
        let job = json!({"projectId": "billing", "jobId": "job2", "location": "EU"});
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"jobReference": job, "jobComplete": false}).to_string())
            .create_async()
            .await;
        let poll = server
            .mock("GET", "/projects/billing/queries/job2")
            .match_query(Matcher::UrlEncoded("location".into(), "EU".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": job,
                    "jobComplete": true,
                    "schema": schema(),
                    "rows": [{"f": [{"v": "7"}, {"v": "z"}]}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let result = client.execute_query(&statement()).await.unwrap();

        poll.assert_async().await;
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["id"], json!(7));
    }

    #[tokio::test]
    async fn test_execute_query_follows_page_tokens() {
        let mut server = mockito::Server::new_async().await;
        let job = json!({"projectId": "billing", "jobId": "job3", "location": "EU"});
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": job,
                    "jobComplete": true,
                    "schema": schema(),
                    "rows": [{"f": [{"v": "1"}, {"v": "a"}]}],
                    "pageToken": "page-2"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let page = server
            .mock("GET", "/projects/billing/queries/job3")
            .match_query(Matcher::UrlEncoded("pageToken".into(), "page-2".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": job,
                    "jobComplete": true,
                    "schema": schema(),
                    "rows": [{"f": [{"v": "2"}, {"v": "b"}]}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let result = client.execute_query(&statement()).await.unwrap();

        page.assert_async().await;
        let ids: Vec<_> = result.rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_execute_skips_row_pages() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": {"projectId": "billing", "jobId": "job4"},
                    "jobComplete": true,
                    "pageToken": "ignored"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let page = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        client.execute(&statement()).await.unwrap();
        page.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_failure_maps_to_query_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"error": {"code": 400, "message": "Syntax error: Unexpected keyword", "errors": []}})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let err = client.execute(&statement()).await.unwrap_err();
        match err {
            ExtractError::Warehouse(WarehouseError::QueryFailed(message)) => {
                assert!(message.contains("Syntax error"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_warnings_on_success_status_do_not_fail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jobReference": {"projectId": "billing", "jobId": "job5"},
                    "jobComplete": true,
                    "schema": schema(),
                    "rows": [],
                    "errors": [{"reason": "warning", "message": "Slot contention"}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let result = client.execute_query(&statement()).await.unwrap();
        assert!(result.is_empty());
        client.execute(&statement()).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_job_poll_maps_to_query_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/projects/billing/queries")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"jobReference": {"projectId": "billing", "jobId": "job6"}, "jobComplete": false})
                    .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/projects/billing/queries/job6")
            .match_query(Matcher::Any)
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                json!({"error": {"code": 400, "message": "Division by zero", "errors": []}})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let err = client.execute(&statement()).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Warehouse(WarehouseError::QueryFailed(ref m)) if m == "Division by zero"
        ));
    }

    #[tokio::test]
    async fn test_table_metadata() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/projects/p/datasets/d/tables/t")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"numRows": "250", "kind": "bigquery#table"}).to_string())
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let metadata = client
            .table_metadata(&TableRef::new("p.d.t").unwrap())
            .await
            .unwrap();
        assert_eq!(metadata.row_count, 250);
    }

    #[tokio::test]
    async fn test_table_metadata_defaults_to_billing_project() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/projects/billing/datasets/d/tables/t")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"numRows": "3"}).to_string())
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        client
            .table_metadata(&TableRef::new("d.t").unwrap())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_table_tolerates_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/projects/p/datasets/d/tables/t")
            .with_status(404)
            .with_body(json!({"error": {"code": 404, "message": "Not found: Table p:d.t"}}).to_string())
            .expect(2)
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let table = TableRef::new("p.d.t").unwrap();
        assert!(client.delete_table(&table, true).await.is_ok());
        let err = client.delete_table(&table, false).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Warehouse(WarehouseError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_table_propagates_other_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("DELETE", "/projects/p/datasets/d/tables/t")
            .with_status(403)
            .with_body(json!({"error": {"code": 403, "message": "Access Denied"}}).to_string())
            .create_async()
            .await;

        let client = BigQueryClient::new(&config(&server.url()), "billing").unwrap();
        let err = client
            .delete_table(&TableRef::new("p.d.t").unwrap(), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExtractError::Warehouse(WarehouseError::AuthenticationFailed(_))
        ));
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::BAD_REQUEST, "bad"),
            WarehouseError::QueryFailed(m) if m == "bad"
        ));
        assert!(matches!(
            status_error(StatusCode::UNAUTHORIZED, ""),
            WarehouseError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "dup"),
            WarehouseError::ClientError { status: 409, .. }
        ));
        assert!(matches!(
            status_error(StatusCode::SERVICE_UNAVAILABLE, "down"),
            WarehouseError::ServerError { status: 503, .. }
        ));
    }

    #[test]
    fn test_table_url_requires_dataset() {
        let client = BigQueryClient::new(&config("http://localhost:9050"), "billing").unwrap();
        assert!(client.table_url(&TableRef::new("t").unwrap()).is_err());
        assert_eq!(
            client
                .table_url(&TableRef::new("example.com:proj.d.t").unwrap())
                .unwrap()
                .path(),
            "/projects/example.com:proj/datasets/d/tables/t"
        );
    }
}
