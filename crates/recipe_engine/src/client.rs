use std::future::Future;
use std::time::Duration;

use futures_util::StreamExt;
use recipe_core::{Language, Recipe, RecipeSummary};
use recipe_logging::recipe_debug;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{new_trace_id, LineSplitter, ServiceError, StreamIngestor};

const CLIENT_NAME: &str = "recipe-cli";

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub endpoint: String,
    pub user_id: String,
    pub trace_id: String,
    pub connect_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8787".to_string(),
            user_id: "anonymous".to_string(),
            trace_id: new_trace_id(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl ServiceSettings {
    pub fn user_agent(&self) -> String {
        format!("{CLIENT_NAME}; user_id={}", self.user_id)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint.trim_end_matches('/'), path)
    }
}

/// One of the three streaming calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCall {
    Init {
        prompt: String,
        language: Language,
        recipe_id: Option<String>,
        shell: Option<String>,
    },
    Clarify {
        id: Option<String>,
        clarification: String,
    },
    Execution {
        id: Option<String>,
    },
}

impl StreamCall {
    /// `init` for a fresh prompt or, with `recipe_id`, for a saved recipe.
    pub fn init(prompt: impl Into<String>, language: Language, recipe_id: Option<String>) -> Self {
        let shell = match language {
            Language::Shell => std::env::var("SHELL").ok(),
            Language::Terraform => None,
        };
        StreamCall::Init {
            prompt: prompt.into(),
            language,
            recipe_id,
            shell,
        }
    }

    pub fn clarify(recipe: &Recipe, clarification: impl Into<String>) -> Self {
        StreamCall::Clarify {
            id: recipe.id.clone(),
            clarification: clarification.into(),
        }
    }

    pub fn execution(recipe: &Recipe) -> Self {
        StreamCall::Execution {
            id: recipe.id.clone(),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            StreamCall::Init { .. } => "/recipe/stream/init",
            StreamCall::Clarify { .. } => "/recipe/stream/clarify",
            StreamCall::Execution { .. } => "/recipe/stream/execution",
        }
    }

    pub fn body(&self, settings: &ServiceSettings) -> Value {
        match self {
            StreamCall::Init {
                prompt,
                language,
                recipe_id,
                shell,
            } => {
                let mut body = Map::new();
                body.insert("prompt".into(), json!(prompt));
                body.insert("trace_id".into(), json!(settings.trace_id));
                body.insert("platform".into(), json!(std::env::consts::OS));
                body.insert("language".into(), json!(language.as_str()));
                body.insert("author".into(), json!(settings.user_id));
                body.insert("recipe_id".into(), json!(recipe_id));
                if *language == Language::Shell {
                    body.insert("shell".into(), json!(shell));
                }
                Value::Object(body)
            }
            StreamCall::Clarify { id, clarification } => json!({
                "id": id,
                "trace_id": settings.trace_id,
                "clarification": clarification,
            }),
            StreamCall::Execution { id } => json!({
                "trace_id": settings.trace_id,
                "id": id,
            }),
        }
    }
}

/// The remote generation service.
#[async_trait::async_trait]
pub trait RecipeService: Send + Sync {
    /// Issues a streaming call and feeds every line into `ingestor` in order.
    async fn stream(
        &self,
        call: StreamCall,
        ingestor: &mut StreamIngestor<'_>,
    ) -> Result<(), ServiceError>;

    /// Sends the user-modified outline.
    async fn persist_steps(&self, recipe: &Recipe) -> Result<(), ServiceError>;

    /// Asks for a fresh attempt; returns the recipe id if the service reassigned it.
    async fn regenerate(
        &self,
        recipe: &Recipe,
        clarification: &str,
    ) -> Result<Option<String>, ServiceError>;

    async fn save(&self, recipe: &Recipe, name: &str) -> Result<(), ServiceError>;

    async fn list(&self) -> Result<Vec<RecipeSummary>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    recipes: Vec<RecipeSummary>,
}

/// [`RecipeService`] over HTTP. There is no read timeout; calls end when the
/// server closes the stream or the token is cancelled.
#[derive(Debug, Clone)]
pub struct HttpRecipeService {
    settings: ServiceSettings,
    client: reqwest::Client,
    cancel: CancellationToken,
}

impl HttpRecipeService {
    pub fn new(settings: ServiceSettings, cancel: &CancellationToken) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent())
            .build()
            .map_err(ServiceError::transport)?;
        Ok(Self {
            settings,
            client,
            cancel: cancel.clone(),
        })
    }

    async fn until_cancelled<F: Future>(&self, fut: F) -> Result<F::Output, ServiceError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ServiceError::Cancelled),
            output = fut => Ok(output),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<reqwest::Response, ServiceError> {
        let url = self.settings.url(path);
        recipe_debug!("POST {}", url);
        let response = self
            .until_cancelled(self.client.post(&url).json(body).send())
            .await?
            .map_err(ServiceError::transport)?;
        self.check_status(response).await
    }

    async fn check_status(
        &self,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ServiceError> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        let body = self
            .until_cancelled(response.text())
            .await?
            .unwrap_or_default();
        Err(ServiceError::Status {
            code: status.as_u16(),
            body,
        })
    }

    async fn read_body(&self, response: reqwest::Response) -> Result<String, ServiceError> {
        self.until_cancelled(response.text())
            .await?
            .map_err(ServiceError::transport)
    }
}

#[async_trait::async_trait]
impl RecipeService for HttpRecipeService {
    async fn stream(
        &self,
        call: StreamCall,
        ingestor: &mut StreamIngestor<'_>,
    ) -> Result<(), ServiceError> {
        let response = self.post(call.path(), &call.body(&self.settings)).await?;
        let mut chunks = response.bytes_stream();
        let mut splitter = LineSplitter::default();

        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ServiceError::Cancelled),
                next = chunks.next() => next,
            };
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(ServiceError::transport)?;
            for line in splitter.push(&chunk)? {
                ingestor.feed_line(&line)?;
            }
        }
        if let Some(rest) = splitter.finish()? {
            ingestor.feed_line(&rest)?;
        }
        Ok(())
    }

    async fn persist_steps(&self, recipe: &Recipe) -> Result<(), ServiceError> {
        let body = json!({
            "id": recipe.id,
            "trace_id": self.settings.trace_id,
            "steps": recipe.steps,
        });
        self.post("/recipe/steps", &body).await.map(|_| ())
    }

    async fn regenerate(
        &self,
        recipe: &Recipe,
        clarification: &str,
    ) -> Result<Option<String>, ServiceError> {
        let body = json!({
            "trace_id": self.settings.trace_id,
            "id": recipe.id,
            "clarification": clarification,
        });
        let response = self.post("/recipe/regenerate", &body).await?;
        let text = self.read_body(response).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        let value: Value =
            serde_json::from_str(&text).map_err(|err| ServiceError::Decode(err.to_string()))?;
        Ok(value.get("id").and_then(Value::as_str).map(str::to_string))
    }

    async fn save(&self, recipe: &Recipe, name: &str) -> Result<(), ServiceError> {
        let body = json!({
            "id": recipe.id,
            "trace_id": self.settings.trace_id,
            "name": name,
            "parameters": recipe.parameters,
            "execution": recipe.execution,
        });
        self.post("/recipe/save", &body).await.map(|_| ())
    }

    async fn list(&self) -> Result<Vec<RecipeSummary>, ServiceError> {
        // Trace ids are hex, so no query encoding is needed.
        let url = self
            .settings
            .url(&format!("/recipe?trace_id={}", self.settings.trace_id));
        recipe_debug!("GET {}", url);
        let response = self
            .until_cancelled(self.client.get(&url).send())
            .await?
            .map_err(ServiceError::transport)?;
        let response = self.check_status(response).await?;
        let text = self.read_body(response).await?;
        let parsed: ListResponse =
            serde_json::from_str(&text).map_err(|err| ServiceError::Decode(err.to_string()))?;
        Ok(parsed.recipes)
    }
}
