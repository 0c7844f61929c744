use crate::{ApiResponseOrError, Credentials, OpenAiError, Result};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION},
    multipart::Form,
    Client, Method, Response,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// Handle on the remote API. Cloning is cheap and shares the connection pool.
#[derive(Clone)]
pub struct OpenAiClient {
    credentials: Credentials,
    client: Client,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OpenAiClient({})", self.credentials.base_url)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct OpenAiErrorWrapper {
    error: OpenAiError,
}

/// Body returned by every `DELETE` endpoint.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Deleted {
    pub id: String,
    pub object: String,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ListOrder {
    Asc,
    Desc,
}

/// Page size used for every paginated listing.
const PAGE_LIMIT: u32 = 100;

impl OpenAiClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        let headers: HeaderMap = [
            (
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))?,
            ),
            (
                HeaderName::from_static("openai-beta"),
                HeaderValue::from_static("assistants=v2"),
            ),
        ]
        .into_iter()
        .collect();

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(OpenAiError::from)?;

        Ok(Self {
            credentials,
            client,
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(Credentials::from_env()?)
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.credentials.base_url, route)
    }

    async fn request_inner<S, R>(
        &self,
        method: Method,
        route: R,
        body: Option<S>,
    ) -> std::result::Result<Response, reqwest::Error>
    where
        R: Into<String>,
        S: Serialize,
    {
        let url = self.url(&route.into());
        debug!("OpenAI Request[{}] {}", method, url);

        let mut request = self.client.request(method.clone(), url.clone());

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;

        debug!(
            "OpenAI Response[{}] {} {url}",
            method,
            response.status().as_str()
        );
        Ok(response)
    }

    async fn decode<T>(response: Response) -> ApiResponseOrError<T>
    where
        T: DeserializeOwned,
    {
        if response.status().is_success() {
            return Ok(response.json::<T>().await?);
        }

        let status = response.status();
        let result = response.text().await?;
        if let Ok(api_response) = serde_json::from_str::<OpenAiErrorWrapper>(&result) {
            Err(api_response.error)
        } else {
            Err(OpenAiError::new(
                format!("{status}: {result}"),
                "unknown".to_string(),
            ))
        }
    }

    pub async fn request<S, R, T>(
        &self,
        method: Method,
        route: R,
        body: Option<S>,
    ) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        S: Serialize,
        T: DeserializeOwned,
    {
        let response = self.request_inner(method, route, body).await?;
        Self::decode(response).await
    }

    pub async fn get<R, T>(&self, route: R) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        T: DeserializeOwned,
    {
        self.request::<(), R, T>(Method::GET, route, None).await
    }

    pub async fn post<S, R, T>(&self, route: R, body: S) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        S: Serialize,
        T: DeserializeOwned,
    {
        self.request(Method::POST, route, Some(body)).await
    }

    pub async fn post_multipart<R, T>(&self, route: R, form: Form) -> ApiResponseOrError<T>
    where
        R: Into<String>,
        T: DeserializeOwned,
    {
        let url = self.url(&route.into());
        debug!("OpenAI Request[POST multipart] {}", url);

        let response = self.client.post(url.clone()).multipart(form).send().await?;

        debug!(
            "OpenAI Response[POST multipart] {} {url}",
            response.status().as_str()
        );
        Self::decode(response).await
    }

    pub async fn delete<R>(&self, route: R) -> ApiResponseOrError<Deleted>
    where
        R: Into<String>,
    {
        self.request::<(), R, Deleted>(Method::DELETE, route, None)
            .await
    }

    /// Fetches every page of a cursor-paginated collection.
    ///
    /// Endpoints that are not paginated (models) answer without `has_more`
    /// and stop after the first page.
    pub async fn list<R, T>(&self, route: R, order: ListOrder) -> ApiResponseOrError<Vec<T>>
    where
        R: Into<String>,
        T: DeserializeOwned,
    {
        let route = route.into();
        let mut after: Option<String> = None;
        let mut data = Vec::new();

        loop {
            let page_route = match &after {
                Some(after) => format!("{route}?order={order}&limit={PAGE_LIMIT}&after={after}"),
                None => format!("{route}?order={order}&limit={PAGE_LIMIT}"),
            };
            let list: List<T> = self.get(page_route).await?;
            data.extend(list.data);

            match (list.has_more, list.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }

        Ok(data)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct List<T> {
    #[serde(default)]
    pub first_id: Option<String>,
    #[serde(default)]
    pub last_id: Option<String>,
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}
