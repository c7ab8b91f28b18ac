use std::env;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::models::{NewTodoRequest, Todo};

pub const DEFAULT_BASE_URL: &str = "https://mate.academy/students-api";

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
    pub user_id: i64,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>, user_id: i64) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("TODOS_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let user_id = env::var("TODOS_USER_ID")
            .map_err(|_| AppError::Config("TODOS_USER_ID is not set".to_string()))?
            .trim()
            .parse::<i64>()
            .map_err(|e| AppError::Config(format!("TODOS_USER_ID is not an integer: {}", e)))?;

        Ok(Self::new(base_url, user_id))
    }
}

/// Remote todo collection, scoped to a single owner.
#[async_trait]
pub trait TodoApi: Send + Sync {
    /// Owner every created todo is assigned to.
    fn user_id(&self) -> i64;
    async fn list(&self) -> Result<Vec<Todo>, AppError>;
    async fn create(&self, title: &str) -> Result<Todo, AppError>;
    async fn update(&self, todo: &Todo) -> Result<Todo, AppError>;
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

pub struct HttpTodoApi {
    client: Client,
    config: ApiConfig,
}

impl HttpTodoApi {
    pub fn new(config: ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.config.base_url)
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/todos/{}", self.config.base_url, id)
    }

    async fn check(response: Response) -> Result<Response, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AppError> {
        let body_text = Self::check(response).await?.text().await?;
        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse todos response: {}", e);
            AppError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl TodoApi for HttpTodoApi {
    fn user_id(&self) -> i64 {
        self.config.user_id
    }

    async fn list(&self) -> Result<Vec<Todo>, AppError> {
        let url = format!("{}?userId={}", self.collection_url(), self.config.user_id);
        let response = self.client.get(&url).send().await?;
        Self::decode(response).await
    }

    async fn create(&self, title: &str) -> Result<Todo, AppError> {
        let request_body = NewTodoRequest {
            title: title.to_string(),
            user_id: self.config.user_id,
            completed: false,
        };

        let response = self
            .client
            .post(self.collection_url())
            .json(&request_body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn update(&self, todo: &Todo) -> Result<Todo, AppError> {
        let response = self
            .client
            .patch(self.item_url(todo.id))
            .json(todo)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        let response = self.client.delete(self.item_url(id)).send().await?;
        Self::check(response).await?;
        Ok(())
    }
}
