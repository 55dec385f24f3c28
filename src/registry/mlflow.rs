use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ModelRegistry, ModelVersion, NewModelVersion, RegistryError};
use crate::config::RegistryConfig;

const MODEL_ARTIFACT_DIR: &str = "model";
const MODEL_ARTIFACT_FILE: &str = "model.json";

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct CreateExperimentResponse {
    experiment_id: String,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
    #[serde(default)]
    data: RunData,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
    #[serde(default)]
    artifact_uri: String,
}

#[derive(Debug, Default, Deserialize)]
struct RunData {
    #[serde(default)]
    metrics: Vec<Metric>,
}

#[derive(Debug, Deserialize)]
struct Metric {
    key: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ModelVersionResponse {
    model_version: ApiModelVersion,
}

#[derive(Debug, Deserialize)]
struct ApiModelVersion {
    name: String,
    version: String,
    #[serde(default)]
    run_id: String,
    #[serde(default)]
    source: String,
}

impl TryFrom<ApiModelVersion> for ModelVersion {
    type Error = RegistryError;

    fn try_from(v: ApiModelVersion) -> Result<Self, Self::Error> {
        let version = v
            .version
            .parse()
            .map_err(|_| RegistryError::Unexpected(format!("non-numeric model version {:?}", v.version)))?;
        Ok(ModelVersion {
            name: v.name,
            version,
            run_id: v.run_id,
            source: v.source,
        })
    }
}

#[derive(Debug, Serialize)]
struct Param<'a> {
    key: &'a str,
    value: &'a str,
}

/// Client for an MLflow tracking server (REST API 2.0).
///
/// Artifacts go through the server's `mlflow-artifacts` proxy, so the
/// server must run with artifact serving enabled.
#[derive(Debug, Clone)]
pub struct MlflowClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    experiment_name: String,
    artifact_location: Option<String>,
}

impl MlflowClient {
    pub fn new(http: Client, config: &RegistryConfig) -> Self {
        Self {
            http,
            base_url: config.tracking_uri.trim_end_matches('/').to_string(),
            token: config.tracking_token.clone(),
            experiment_name: config.experiment_name.clone(),
            artifact_location: config.artifact_location.clone(),
        }
    }

    /// Client with its own HTTP connection pool and the configured timeout.
    pub fn from_config(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::new(http, config))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    fn artifact_url(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow-artifacts/artifacts/{}", self.base_url, path)
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn check(resp: Response) -> Result<Response, RegistryError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or(ApiErrorBody {
            error_code: String::new(),
            message: body,
        });
        Err(RegistryError::Api {
            status: status.as_u16(),
            code: parsed.error_code,
            message: parsed.message,
        })
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<R, RegistryError> {
        let url = Url::parse_with_params(&self.api_url(path), params)
            .map_err(|e| RegistryError::Unexpected(format!("invalid registry URL: {e}")))?;
        let resp = self.authorize(self.http.get(url)).send().await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RegistryError> {
        let resp = self
            .authorize(self.http.post(self.api_url(path)))
            .json(body)
            .send()
            .await?;
        Ok(Self::check(resp).await?.json().await?)
    }

    /// Look up the configured experiment, creating it on first use.
    pub async fn ensure_experiment(&self) -> Result<String, RegistryError> {
        let found: Result<ExperimentResponse, _> = self
            .get_json(
                "experiments/get-by-name",
                &[("experiment_name", self.experiment_name.as_str())],
            )
            .await;

        match found {
            Ok(resp) => return Ok(resp.experiment.experiment_id),
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        tracing::info!(experiment = %self.experiment_name, "Creating experiment");
        let mut body = json!({ "name": self.experiment_name });
        if let Some(location) = &self.artifact_location {
            body["artifact_location"] = json!(location);
        }
        let created: Result<CreateExperimentResponse, _> = self.post_json("experiments/create", &body).await;
        match created {
            Ok(resp) => Ok(resp.experiment_id),
            // Created concurrently by another process.
            Err(RegistryError::Api { code, .. }) if code == "RESOURCE_ALREADY_EXISTS" => {
                let resp: ExperimentResponse = self
                    .get_json(
                        "experiments/get-by-name",
                        &[("experiment_name", self.experiment_name.as_str())],
                    )
                    .await?;
                Ok(resp.experiment.experiment_id)
            }
            Err(e) => Err(e),
        }
    }

    async fn create_run(&self, experiment_id: &str, run_name: &str) -> Result<RunInfo, RegistryError> {
        let body = json!({
            "experiment_id": experiment_id,
            "run_name": run_name,
            "start_time": Utc::now().timestamp_millis(),
        });
        let resp: RunResponse = self.post_json("runs/create", &body).await?;
        Ok(resp.run.info)
    }

    async fn log_batch(&self, run_id: &str, request: &NewModelVersion) -> Result<(), RegistryError> {
        let timestamp = Utc::now().timestamp_millis();
        let params: Vec<Param<'_>> = request
            .params
            .iter()
            .map(|(k, v)| Param { key: k, value: v })
            .collect();
        let metrics: Vec<serde_json::Value> = request
            .metrics
            .iter()
            .map(|(k, v)| json!({ "key": k, "value": v, "timestamp": timestamp, "step": 0 }))
            .collect();

        let body = json!({ "run_id": run_id, "params": params, "metrics": metrics });
        let _: serde_json::Value = self.post_json("runs/log-batch", &body).await?;
        Ok(())
    }

    async fn upload_artifact(&self, artifact_uri: &str, bytes: Vec<u8>) -> Result<(), RegistryError> {
        let path = format!(
            "{}/{MODEL_ARTIFACT_DIR}/{MODEL_ARTIFACT_FILE}",
            proxied_artifact_path(artifact_uri)?
        );
        let resp = self
            .authorize(self.http.put(self.artifact_url(&path)))
            .header("content-type", "application/json")
            .body(bytes)
            .send()
            .await?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn update_run(&self, run_id: &str, status: &str) -> Result<(), RegistryError> {
        let body = json!({
            "run_id": run_id,
            "status": status,
            "end_time": Utc::now().timestamp_millis(),
        });
        let _: serde_json::Value = self.post_json("runs/update", &body).await?;
        Ok(())
    }

    async fn ensure_registered_model(&self, name: &str) -> Result<(), RegistryError> {
        let res: Result<serde_json::Value, _> = self
            .post_json("registered-models/create", &json!({ "name": name }))
            .await;
        match res {
            Ok(_) => Ok(()),
            Err(RegistryError::Api { code, .. }) if code == "RESOURCE_ALREADY_EXISTS" => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// The tracking server answers an unassigned alias with
/// 400 `INVALID_PARAMETER_VALUE` rather than a 404.
fn is_unknown_alias(err: &RegistryError) -> bool {
    matches!(
        err,
        RegistryError::Api { status: 400, code, .. } if code == "INVALID_PARAMETER_VALUE"
    )
}

/// Map a run artifact URI onto the tracking server's artifact proxy path.
fn proxied_artifact_path(artifact_uri: &str) -> Result<String, RegistryError> {
    let rest = artifact_uri
        .strip_prefix("mlflow-artifacts:")
        .ok_or_else(|| {
            RegistryError::Unexpected(format!(
                "artifact location {artifact_uri} is not served by the tracking server"
            ))
        })?;

    // Either `mlflow-artifacts:/path` or `mlflow-artifacts://host/path`.
    let path = match rest.strip_prefix("//") {
        Some(with_host) => with_host.split_once('/').map_or("", |(_, p)| p),
        None => rest.trim_start_matches('/'),
    };
    Ok(path.trim_end_matches('/').to_string())
}

#[async_trait]
impl ModelRegistry for MlflowClient {
    async fn register_version(&self, request: NewModelVersion) -> Result<ModelVersion, RegistryError> {
        let experiment_id = self.ensure_experiment().await?;
        let run = self.create_run(&experiment_id, &request.run_name).await?;
        tracing::info!(run_id = %run.run_id, run_name = %request.run_name, "Tracking run started");

        let logged = match self.log_batch(&run.run_id, &request).await {
            Ok(()) => self.upload_artifact(&run.artifact_uri, request.artifact.clone()).await,
            Err(e) => Err(e),
        };
        let status = if logged.is_ok() { "FINISHED" } else { "FAILED" };
        if let Err(e) = self.update_run(&run.run_id, status).await {
            tracing::warn!(run_id = %run.run_id, error = %e, "Failed to close tracking run");
        }
        logged?;

        self.ensure_registered_model(&request.model_name).await?;
        let body = json!({
            "name": request.model_name,
            "source": format!("{}/{MODEL_ARTIFACT_DIR}", run.artifact_uri.trim_end_matches('/')),
            "run_id": run.run_id,
        });
        let created: ModelVersionResponse = self.post_json("model-versions/create", &body).await?;
        created.model_version.try_into()
    }

    async fn version_by_alias(
        &self,
        model_name: &str,
        alias: &str,
    ) -> Result<Option<ModelVersion>, RegistryError> {
        let res: Result<ModelVersionResponse, _> = self
            .get_json("registered-models/alias", &[("name", model_name), ("alias", alias)])
            .await;
        match res {
            Ok(resp) => Ok(Some(resp.model_version.try_into()?)),
            Err(e) if e.is_not_found() || is_unknown_alias(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_alias(&self, model_name: &str, alias: &str, version: u64) -> Result<(), RegistryError> {
        let body = json!({
            "name": model_name,
            "alias": alias,
            "version": version.to_string(),
        });
        let _: serde_json::Value = self.post_json("registered-models/alias", &body).await?;
        Ok(())
    }

    async fn run_metric(&self, run_id: &str, key: &str) -> Result<Option<f64>, RegistryError> {
        let resp: RunResponse = self.get_json("runs/get", &[("run_id", run_id)]).await?;
        Ok(resp
            .run
            .data
            .metrics
            .into_iter()
            .find(|m| m.key == key)
            .map(|m| m.value))
    }

    async fn download_model(&self, version: &ModelVersion) -> Result<Vec<u8>, RegistryError> {
        let path = format!("{}/{MODEL_ARTIFACT_FILE}", proxied_artifact_path(&version.source)?);
        let resp = self
            .authorize(self.http.get(self.artifact_url(&path)))
            .send()
            .await?;
        let bytes = Self::check(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proxied_artifact_path() {
        assert_eq!(
            proxied_artifact_path("mlflow-artifacts:/1/abc/artifacts").unwrap(),
            "1/abc/artifacts"
        );
        assert_eq!(
            proxied_artifact_path("mlflow-artifacts://tracking:5500/1/abc/artifacts/model").unwrap(),
            "1/abc/artifacts/model"
        );
        assert!(proxied_artifact_path("s3://bucket/1/abc/artifacts").is_err());
    }

    #[test]
    fn test_not_found_detection() {
        let err = RegistryError::Api {
            status: 404,
            code: "RESOURCE_DOES_NOT_EXIST".into(),
            message: "missing".into(),
        };
        assert!(err.is_not_found());

        let err = RegistryError::Api {
            status: 500,
            code: "INTERNAL_ERROR".into(),
            message: "boom".into(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unknown_alias_detection() {
        let err = RegistryError::Api {
            status: 400,
            code: "INVALID_PARAMETER_VALUE".into(),
            message: "Registered model alias prod not found.".into(),
        };
        assert!(is_unknown_alias(&err));

        let err = RegistryError::Api {
            status: 500,
            code: "INVALID_PARAMETER_VALUE".into(),
            message: "boom".into(),
        };
        assert!(!is_unknown_alias(&err));
    }
}
