use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    BackfillRequest, PartitionRunInputs, PartitionService, PartitionSet, PartitionTag,
    RepoAddress, SingleRunRequest,
};
use crate::error::RemoteError;
use crate::partition::asset_key::AssetKey;
use crate::partition::health::PartitionHealthData;

const PARTITION_HEALTH_QUERY: &str = r#"
query PartitionHealthQuery($assetKey: AssetKeyInput!) {
  assetNodeOrError(assetKey: $assetKey) {
    __typename
    ... on AssetNode {
      materializationCountByPartition {
        partition
        materializationCount
      }
    }
    ... on AssetNotFoundError { message }
  }
}"#;

const PARTITION_SETS_QUERY: &str = r#"
query AssetJobPartitionSetsQuery(
  $pipelineName: String!
  $repositoryName: String!
  $repositoryLocationName: String!
) {
  partitionSetsOrError(
    pipelineName: $pipelineName
    repositorySelector: {
      repositoryName: $repositoryName
      repositoryLocationName: $repositoryLocationName
    }
  ) {
    __typename
    ... on PartitionSets { results { name mode } }
    ... on PipelineNotFoundError { message }
    ... on PythonError { message }
  }
}"#;

const PARTITION_TAGS_AND_CONFIG_QUERY: &str = r#"
query ConfigPartitionSelectionQuery(
  $repositorySelector: RepositorySelector!
  $partitionSetName: String!
  $partitionName: String!
) {
  partitionSetOrError(
    repositorySelector: $repositorySelector
    partitionSetName: $partitionSetName
  ) {
    __typename
    ... on PartitionSet {
      partition(partitionName: $partitionName) {
        name
        mode
        runConfigOrError {
          __typename
          ... on PartitionRunConfig { yaml }
          ... on PythonError { message }
        }
        tagsOrError {
          __typename
          ... on PartitionTags { results { key value } }
          ... on PythonError { message }
        }
      }
    }
    ... on PartitionSetNotFoundError { message }
    ... on PythonError { message }
  }
}"#;

const RUNNING_BACKFILLS_QUERY: &str = r#"
query RunningBackfillsNoticeQuery {
  partitionBackfillsOrError(status: REQUESTED) {
    __typename
    ... on PartitionBackfills {
      results {
        backfillId
        partitionSetName
      }
    }
    ... on PythonError { message }
  }
}"#;

const LAUNCH_RUN_MUTATION: &str = r#"
mutation LaunchPipelineExecution($executionParams: ExecutionParams!) {
  launchPipelineExecution(executionParams: $executionParams) {
    __typename
    ... on LaunchRunSuccess { run { runId } }
    ... on PipelineNotFoundError { message }
    ... on InvalidSubsetError { message }
    ... on RunConfigValidationInvalid { errors { message } }
    ... on InvalidStepError { invalidStepKey }
    ... on InvalidOutputError { stepKey invalidOutputName }
    ... on UnauthorizedError { message }
    ... on PythonError { message }
  }
}"#;

const LAUNCH_BACKFILL_MUTATION: &str = r#"
mutation LaunchPartitionBackfill($backfillParams: LaunchBackfillParams!) {
  launchPartitionBackfill(backfillParams: $backfillParams) {
    __typename
    ... on LaunchBackfillSuccess { backfillId }
    ... on PartitionSetNotFoundError { message }
    ... on InvalidStepError { invalidStepKey }
    ... on InvalidOutputError { stepKey invalidOutputName }
    ... on UnauthorizedError { message }
    ... on PythonError { message }
  }
}"#;

// ─── Wire results ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum AssetNodeOrError {
    AssetNode {
        #[serde(rename = "materializationCountByPartition")]
        counts: Vec<PartitionCount>,
    },
    AssetNotFoundError {
        message: String,
    },
    PythonError {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct PartitionCount {
    partition: String,
    #[serde(rename = "materializationCount")]
    materialization_count: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum PartitionSetsOrError {
    PartitionSets { results: Vec<PartitionSet> },
    PipelineNotFoundError { message: String },
    PythonError { message: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum PartitionSetOrError {
    PartitionSet { partition: Option<PartitionWire> },
    PartitionSetNotFoundError { message: String },
    PythonError { message: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct PartitionWire {
    mode: String,
    #[serde(rename = "runConfigOrError")]
    run_config: RunConfigOrError,
    #[serde(rename = "tagsOrError")]
    tags: TagsOrError,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum RunConfigOrError {
    PartitionRunConfig { yaml: Option<String> },
    PythonError { message: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum TagsOrError {
    PartitionTags { results: Vec<PartitionTag> },
    PythonError { message: String },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct BackfillWire {
    #[serde(rename = "backfillId")]
    backfill_id: String,
    #[serde(rename = "partitionSetName")]
    partition_set_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum PartitionBackfillsOrError {
    PartitionBackfills { results: Vec<BackfillWire> },
    PythonError { message: String },
    #[serde(other)]
    Unknown,
}

impl PartitionBackfillsOrError {
    fn into_ids_for(self, partition_set_name: &str) -> Result<Vec<String>, RemoteError> {
        match self {
            PartitionBackfillsOrError::PartitionBackfills { results } => Ok(results
                .into_iter()
                .filter(|b| b.partition_set_name.as_deref() == Some(partition_set_name))
                .map(|b| b.backfill_id)
                .collect()),
            PartitionBackfillsOrError::PythonError { message } => {
                Err(RemoteError::Python { message })
            }
            PartitionBackfillsOrError::Unknown => Err(unexpected("unknown")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunRef {
    #[serde(rename = "runId")]
    run_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum LaunchRunResult {
    LaunchRunSuccess {
        run: RunRef,
    },
    RunConfigValidationInvalid {
        errors: Vec<Message>,
    },
    InvalidStepError {
        #[serde(rename = "invalidStepKey")]
        invalid_step_key: String,
    },
    InvalidOutputError {
        #[serde(rename = "stepKey")]
        step_key: String,
        #[serde(rename = "invalidOutputName")]
        invalid_output_name: String,
    },
    PipelineNotFoundError {
        message: String,
    },
    InvalidSubsetError {
        message: String,
    },
    UnauthorizedError {
        message: String,
    },
    PythonError {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum LaunchBackfillResult {
    LaunchBackfillSuccess {
        #[serde(rename = "backfillId")]
        backfill_id: String,
    },
    PartitionSetNotFoundError {
        message: String,
    },
    InvalidStepError {
        #[serde(rename = "invalidStepKey")]
        invalid_step_key: String,
    },
    InvalidOutputError {
        #[serde(rename = "stepKey")]
        step_key: String,
        #[serde(rename = "invalidOutputName")]
        invalid_output_name: String,
    },
    UnauthorizedError {
        message: String,
    },
    PythonError {
        message: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<Message>,
}

fn unexpected(typename: &str) -> RemoteError {
    RemoteError::Unexpected {
        typename: typename.to_string(),
        message: format!("Unexpected result type returned by the server ({typename})"),
    }
}

fn invalid_step(step_key: String) -> RemoteError {
    RemoteError::Unexpected {
        typename: "InvalidStepError".to_string(),
        message: format!("Invalid step: {step_key}"),
    }
}

fn invalid_output(step_key: String, output_name: String) -> RemoteError {
    RemoteError::Unexpected {
        typename: "InvalidOutputError".to_string(),
        message: format!("Invalid output: {output_name} on step {step_key}"),
    }
}

fn unauthorized(message: String) -> RemoteError {
    RemoteError::Unexpected {
        typename: "UnauthorizedError".to_string(),
        message,
    }
}

impl LaunchRunResult {
    fn into_result(self) -> Result<String, RemoteError> {
        match self {
            LaunchRunResult::LaunchRunSuccess { run } => Ok(run.run_id),
            LaunchRunResult::RunConfigValidationInvalid { errors } => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
                Err(RemoteError::Unexpected {
                    typename: "RunConfigValidationInvalid".to_string(),
                    message: format!("Run config is invalid: {}", messages.join("; ")),
                })
            }
            LaunchRunResult::InvalidStepError { invalid_step_key } => {
                Err(invalid_step(invalid_step_key))
            }
            LaunchRunResult::InvalidOutputError {
                step_key,
                invalid_output_name,
            } => Err(invalid_output(step_key, invalid_output_name)),
            LaunchRunResult::PipelineNotFoundError { message } => {
                Err(RemoteError::NotFound { message })
            }
            LaunchRunResult::InvalidSubsetError { message } => Err(RemoteError::Unexpected {
                typename: "InvalidSubsetError".to_string(),
                message,
            }),
            LaunchRunResult::UnauthorizedError { message } => Err(unauthorized(message)),
            LaunchRunResult::PythonError { message } => Err(RemoteError::Python { message }),
            LaunchRunResult::Unknown => Err(unexpected("unknown")),
        }
    }
}

impl LaunchBackfillResult {
    fn into_result(self) -> Result<String, RemoteError> {
        match self {
            LaunchBackfillResult::LaunchBackfillSuccess { backfill_id } => Ok(backfill_id),
            LaunchBackfillResult::PartitionSetNotFoundError { message } => {
                Err(RemoteError::NotFound { message })
            }
            LaunchBackfillResult::InvalidStepError { invalid_step_key } => {
                Err(invalid_step(invalid_step_key))
            }
            LaunchBackfillResult::InvalidOutputError {
                step_key,
                invalid_output_name,
            } => Err(invalid_output(step_key, invalid_output_name)),
            LaunchBackfillResult::UnauthorizedError { message } => Err(unauthorized(message)),
            LaunchBackfillResult::PythonError { message } => Err(RemoteError::Python { message }),
            LaunchBackfillResult::Unknown => Err(unexpected("unknown")),
        }
    }
}

// ─── Client ─────────────────────────────────────────────────────────────────

/// `PartitionService` over a GraphQL HTTP endpoint.
pub struct GraphqlClient {
    http: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl GraphqlClient {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        use anyhow::Context;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Run one operation and decode the value under `data.<field>`.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
        field: &str,
    ) -> Result<T, RemoteError> {
        debug!(endpoint = %self.endpoint, field, "Sending GraphQL request");

        let mut req = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let response = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to send request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Transport(format!("API error ({status}): {body}")));
        }

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Transport(format!("Failed to parse response: {e}")))?;

        decode_field(body, field)
    }
}

fn decode_field<T: DeserializeOwned>(body: GraphqlResponse, field: &str) -> Result<T, RemoteError> {
    if !body.errors.is_empty() {
        let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
        return Err(RemoteError::Transport(messages.join("; ")));
    }

    let value = body
        .data
        .and_then(|mut data| data.get_mut(field).map(Value::take))
        .ok_or_else(|| RemoteError::Transport(format!("Response is missing '{field}'")))?;

    serde_json::from_value(value)
        .map_err(|e| RemoteError::Transport(format!("Failed to decode '{field}': {e}")))
}

fn health_from_counts(asset_key: &AssetKey, counts: Vec<PartitionCount>) -> PartitionHealthData {
    PartitionHealthData::from_statuses(
        asset_key.clone(),
        counts
            .into_iter()
            .map(|c| (c.partition, c.materialization_count > 0)),
    )
}

#[async_trait]
impl PartitionService for GraphqlClient {
    async fn fetch_partition_health(
        &self,
        asset_keys: &[AssetKey],
    ) -> Result<Vec<PartitionHealthData>, RemoteError> {
        let mut health = Vec::with_capacity(asset_keys.len());

        for asset_key in asset_keys {
            let result: AssetNodeOrError = self
                .execute(
                    PARTITION_HEALTH_QUERY,
                    json!({ "assetKey": { "path": asset_key.path } }),
                    "assetNodeOrError",
                )
                .await?;

            match result {
                AssetNodeOrError::AssetNode { counts } => {
                    health.push(health_from_counts(asset_key, counts))
                }
                AssetNodeOrError::AssetNotFoundError { message } => {
                    return Err(RemoteError::NotFound { message })
                }
                AssetNodeOrError::PythonError { message } => {
                    return Err(RemoteError::Python { message })
                }
                AssetNodeOrError::Unknown => return Err(unexpected("unknown")),
            }
        }

        Ok(health)
    }

    async fn fetch_partition_sets(
        &self,
        repo: &RepoAddress,
        job_name: &str,
    ) -> Result<Vec<PartitionSet>, RemoteError> {
        let result: PartitionSetsOrError = self
            .execute(
                PARTITION_SETS_QUERY,
                json!({
                    "pipelineName": job_name,
                    "repositoryName": repo.name,
                    "repositoryLocationName": repo.location,
                }),
                "partitionSetsOrError",
            )
            .await?;

        match result {
            PartitionSetsOrError::PartitionSets { results } => Ok(results),
            PartitionSetsOrError::PipelineNotFoundError { message } => {
                Err(RemoteError::NotFound { message })
            }
            PartitionSetsOrError::PythonError { message } => Err(RemoteError::Python { message }),
            PartitionSetsOrError::Unknown => Err(unexpected("unknown")),
        }
    }

    async fn fetch_partition_tags_and_config(
        &self,
        repo: &RepoAddress,
        partition_set_name: &str,
        partition_name: &str,
    ) -> Result<PartitionRunInputs, RemoteError> {
        let result: PartitionSetOrError = self
            .execute(
                PARTITION_TAGS_AND_CONFIG_QUERY,
                json!({
                    "repositorySelector": repo.selector(),
                    "partitionSetName": partition_set_name,
                    "partitionName": partition_name,
                }),
                "partitionSetOrError",
            )
            .await?;

        let partition = match result {
            PartitionSetOrError::PartitionSet {
                partition: Some(partition),
            } => partition,
            PartitionSetOrError::PartitionSet { partition: None } => {
                return Err(RemoteError::NotFound {
                    message: format!(
                        "Partition '{partition_name}' not found in partition set '{partition_set_name}'"
                    ),
                })
            }
            PartitionSetOrError::PartitionSetNotFoundError { message } => {
                return Err(RemoteError::NotFound { message })
            }
            PartitionSetOrError::PythonError { message } => {
                return Err(RemoteError::Python { message })
            }
            PartitionSetOrError::Unknown => return Err(unexpected("unknown")),
        };

        let tags = match partition.tags {
            TagsOrError::PartitionTags { results } => Ok(results),
            TagsOrError::PythonError { message } => Err(RemoteError::Python { message }),
            TagsOrError::Unknown => Err(unexpected("unknown")),
        };
        let run_config_yaml = match partition.run_config {
            RunConfigOrError::PartitionRunConfig { yaml } => Ok(yaml),
            RunConfigOrError::PythonError { message } => Err(RemoteError::Python { message }),
            RunConfigOrError::Unknown => Err(unexpected("unknown")),
        };

        Ok(PartitionRunInputs {
            mode: partition.mode,
            tags,
            run_config_yaml,
        })
    }

    async fn submit_single_run(&self, request: &SingleRunRequest) -> Result<String, RemoteError> {
        let result: LaunchRunResult = self
            .execute(
                LAUNCH_RUN_MUTATION,
                json!({
                    "executionParams": {
                        "runConfigData": request.run_config_data,
                        "mode": request.mode,
                        "stepKeys": request.step_keys,
                        "selector": request.selector,
                        "executionMetadata": { "tags": request.tags },
                    }
                }),
                "launchPipelineExecution",
            )
            .await?;
        result.into_result()
    }

    async fn fetch_running_backfills(
        &self,
        partition_set_name: &str,
    ) -> Result<Vec<String>, RemoteError> {
        let result: PartitionBackfillsOrError = self
            .execute(RUNNING_BACKFILLS_QUERY, json!({}), "partitionBackfillsOrError")
            .await?;
        result.into_ids_for(partition_set_name)
    }

    async fn submit_backfill(&self, request: &BackfillRequest) -> Result<String, RemoteError> {
        let result: LaunchBackfillResult = self
            .execute(
                LAUNCH_BACKFILL_MUTATION,
                json!({ "backfillParams": request }),
                "launchPartitionBackfill",
            )
            .await?;
        result.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Value) -> GraphqlResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_partition_sets() {
        let body = response(json!({
            "data": { "partitionSetsOrError": {
                "__typename": "PartitionSets",
                "results": [{ "name": "daily", "mode": "default" }]
            }}
        }));
        let decoded: PartitionSetsOrError = decode_field(body, "partitionSetsOrError").unwrap();
        match decoded {
            PartitionSetsOrError::PartitionSets { results } => {
                assert_eq!(results[0].name, "daily");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_graphql_errors_become_transport_errors() {
        let body = response(json!({ "errors": [{ "message": "boom" }] }));
        let err = decode_field::<PartitionSetsOrError>(body, "partitionSetsOrError").unwrap_err();
        assert_eq!(err, RemoteError::Transport("boom".to_string()));
    }

    #[test]
    fn test_unknown_typename_is_unexpected() {
        let result: LaunchRunResult =
            serde_json::from_value(json!({ "__typename": "RunConflict", "message": "x" }))
                .unwrap();
        assert!(matches!(
            result.into_result(),
            Err(RemoteError::Unexpected { .. })
        ));
    }

    #[test]
    fn test_run_config_validation_messages_are_joined() {
        let result: LaunchRunResult = serde_json::from_value(json!({
            "__typename": "RunConfigValidationInvalid",
            "errors": [{ "message": "missing a" }, { "message": "bad b" }]
        }))
        .unwrap();
        let err = result.into_result().unwrap_err();
        assert_eq!(err.message(), "Run config is invalid: missing a; bad b");
    }

    #[test]
    fn test_backfill_success_and_python_error() {
        let ok: LaunchBackfillResult = serde_json::from_value(json!({
            "__typename": "LaunchBackfillSuccess", "backfillId": "bf-1"
        }))
        .unwrap();
        assert_eq!(ok.into_result().unwrap(), "bf-1");

        let err: LaunchBackfillResult = serde_json::from_value(json!({
            "__typename": "PythonError", "message": "stack overflow"
        }))
        .unwrap();
        assert_eq!(
            err.into_result().unwrap_err(),
            RemoteError::Python {
                message: "stack overflow".to_string()
            }
        );
    }

    #[test]
    fn test_running_backfills_are_filtered_by_partition_set() {
        let result: PartitionBackfillsOrError = serde_json::from_value(json!({
            "__typename": "PartitionBackfills",
            "results": [
                { "backfillId": "bf-1", "partitionSetName": "daily" },
                { "backfillId": "bf-2", "partitionSetName": "hourly" },
                { "backfillId": "bf-3", "partitionSetName": null },
                { "backfillId": "bf-4", "partitionSetName": "daily" }
            ]
        }))
        .unwrap();
        assert_eq!(result.into_ids_for("daily").unwrap(), vec!["bf-1", "bf-4"]);
    }

    #[test]
    fn test_health_from_counts_keeps_order() {
        let counts = vec![
            PartitionCount {
                partition: "p2".to_string(),
                materialization_count: 0,
            },
            PartitionCount {
                partition: "p1".to_string(),
                materialization_count: 3,
            },
        ];
        let data = health_from_counts(&AssetKey::new(["a"]), counts);
        assert_eq!(data.keys, vec!["p2", "p1"]);
        assert!(data.is_materialized("p1"));
        assert!(!data.is_materialized("p2"));
    }
}
