//! A thin client of the farm REST API.
//!
//! The gateway never fails: transport errors, timeouts and non-2xx
//! responses are all folded into an [`ApiResponse`] with `success: false`,
//! so tools can hand them to the model like any other result.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Url, header};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// The default timeout of one API call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const JSON_API: &str = "application/vnd.api+json";

/// HTTP verbs used by the farm API.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PATCH`
    Patch,
    /// `DELETE`
    Delete,
}

impl ApiMethod {
    fn to_http(self) -> Method {
        match self {
            Self::Get => Method::GET,
            Self::Post => Method::POST,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }
}

/// A request against the farm API.
#[derive(Clone, Debug, PartialEq)]
pub struct ApiRequest {
    /// The HTTP verb.
    pub method: ApiMethod,
    /// Path relative to the API base URL, like `assets/animal`.
    pub endpoint: String,
    /// Query parameters, in order.
    pub params: Vec<(String, String)>,
    /// JSON body.
    pub body: Option<Value>,
}

impl ApiRequest {
    /// Creates a request without parameters or body.
    pub fn new<S: Into<String>>(method: ApiMethod, endpoint: S) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            params: vec![],
            body: None,
        }
    }

    /// Creates a `GET` request.
    #[inline]
    pub fn get<S: Into<String>>(endpoint: S) -> Self {
        Self::new(ApiMethod::Get, endpoint)
    }

    /// Creates a `POST` request.
    #[inline]
    pub fn post<S: Into<String>>(endpoint: S) -> Self {
        Self::new(ApiMethod::Post, endpoint)
    }

    /// Creates a `PATCH` request.
    #[inline]
    pub fn patch<S: Into<String>>(endpoint: S) -> Self {
        Self::new(ApiMethod::Patch, endpoint)
    }

    /// Creates a `DELETE` request.
    #[inline]
    pub fn delete<S: Into<String>>(endpoint: S) -> Self {
        Self::new(ApiMethod::Delete, endpoint)
    }

    /// Appends a query parameter.
    pub fn param<V: ToString>(mut self, key: &str, value: V) -> Self {
        self.params.push((key.to_owned(), value.to_string()));
        self
    }

    /// Appends a query parameter if `value` is present and not empty.
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value.map(|value| value.to_string()) {
            Some(value) if !value.is_empty() => self.param(key, value),
            _ => self,
        }
    }

    /// Appends `key=true` if `on` is set. Unset flags are not sent.
    #[inline]
    pub fn flag(self, key: &str, on: bool) -> Self {
        if on { self.param(key, "true") } else { self }
    }

    /// Sets the JSON body.
    #[inline]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The normalized outcome of an API call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ApiResponse {
    /// Whether the API answered with a 2xx status.
    pub success: bool,
    /// The response body of a successful call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// What went wrong, for failed calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The HTTP status, if the API answered at all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// The response body of a rejected call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_data: Option<Value>,
}

impl ApiResponse {
    /// A 2xx response.
    pub fn success(status_code: u16, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status_code: Some(status_code),
            response_data: None,
        }
    }

    /// A response with a non-2xx status.
    pub fn rejected(
        status_code: u16,
        error: String,
        response_data: Value,
    ) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            status_code: Some(status_code),
            response_data: Some(response_data),
        }
    }

    /// A call that got no response.
    pub fn failure<S: Into<String>>(error: S) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            status_code: None,
            response_data: None,
        }
    }

    /// Returns the JSON:API document of a successful call.
    #[inline]
    pub fn document(&self) -> Option<&Value> {
        self.data.as_ref().filter(|_| self.success)
    }

    /// Returns the `data` member of the JSON:API document.
    #[inline]
    pub fn resource(&self) -> Option<&Value> {
        self.document().and_then(|doc| doc.get("data"))
    }

    /// Returns the id of the single resource in the document, as sent by
    /// the API.
    pub fn resource_id(&self) -> Option<&Value> {
        self.resource()
            .and_then(|data| data.get("id"))
            .filter(|id| !id.is_null())
    }

    /// Converts the response into the JSON value tools return.
    pub fn into_value(self) -> Value {
        let mut map = Map::new();
        map.insert("success".to_owned(), Value::Bool(self.success));
        if let Some(data) = self.data {
            map.insert("data".to_owned(), data);
        }
        if let Some(error) = self.error {
            map.insert("error".to_owned(), Value::String(error));
        }
        if let Some(status_code) = self.status_code {
            map.insert("status_code".to_owned(), json!(status_code));
        }
        if let Some(response_data) = self.response_data {
            map.insert("response_data".to_owned(), response_data);
        }
        Value::Object(map)
    }
}

/// The farm API, as seen by tools.
#[async_trait]
pub trait FarmApi: Send + Sync + 'static {
    /// Performs a request. Failures are reported in the response.
    async fn call(&self, request: ApiRequest) -> ApiResponse;
}

/// [`FarmApi`] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpFarmApi {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpFarmApi {
    /// Creates a client of the API rooted at `base_url`.
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        let base_url = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the timeout of each call.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the base URL, without a trailing slash.
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> Result<Url, String> {
        let endpoint = request.endpoint.trim_start_matches('/');
        let mut url = Url::parse(&format!("{}/{endpoint}", self.base_url))
            .map_err(|err| err.to_string())?;
        if !request.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.params);
        }
        Ok(url)
    }

    async fn send(&self, request: ApiRequest) -> ApiResponse {
        let url = match self.url_for(&request) {
            Ok(url) => url,
            Err(err) => {
                return ApiResponse::failure(format!("Unexpected error: {err}"));
            }
        };

        let mut builder = self
            .client
            .request(request.method.to_http(), url)
            .header(header::ACCEPT, JSON_API)
            .header(header::CONTENT_TYPE, JSON_API)
            .timeout(self.timeout);
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let resp = match builder.send().await {
            Ok(resp) => resp,
            Err(err) => return transport_failure(err),
        };
        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(err) => return transport_failure(err),
        };
        let body = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if status.is_success() {
            ApiResponse::success(status.as_u16(), body)
        } else {
            let reason = status.canonical_reason().unwrap_or_default();
            let error = format!("{} {reason}", status.as_u16());
            ApiResponse::rejected(
                status.as_u16(),
                error.trim_end().to_owned(),
                body,
            )
        }
    }
}

#[async_trait]
impl FarmApi for HttpFarmApi {
    async fn call(&self, request: ApiRequest) -> ApiResponse {
        let method = request.method;
        let endpoint = request.endpoint.clone();
        let resp = self.send(request).await;
        if resp.success {
            debug!(?method, %endpoint, status = ?resp.status_code, "api call");
        } else {
            warn!(
                ?method,
                %endpoint,
                error = resp.error.as_deref().unwrap_or_default(),
                "api call failed"
            );
        }
        resp
    }
}

fn transport_failure(err: reqwest::Error) -> ApiResponse {
    if err.is_timeout() {
        ApiResponse::failure("Request timed out")
    } else if err.is_connect() {
        ApiResponse::failure(format!("Connection error: {err}"))
    } else {
        ApiResponse::failure(format!("Unexpected error: {err}"))
    }
}

/// The attributes of a JSON:API resource, in insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attributes(Map<String, Value>);

impl Attributes {
    /// Creates an empty attribute map.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an attribute.
    pub fn set<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.0.insert(key.to_owned(), value.into());
        self
    }

    /// Sets an attribute if `value` is present.
    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Sets a text attribute if `value` is present and not empty.
    pub fn set_text(self, key: &str, value: Option<String>) -> Self {
        self.set_opt(key, value.filter(|value| !value.is_empty()))
    }

    /// Sets a list attribute if `values` is present and not empty.
    pub fn set_list<V: Into<Value>>(
        self,
        key: &str,
        values: Option<Vec<V>>,
    ) -> Self {
        self.set_opt(key, values.filter(|values| !values.is_empty()))
    }

    /// Returns `true` if no attribute is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts the attributes into a JSON object.
    #[inline]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Wraps attributes into a JSON:API document:
/// `{"data": {"type", "id"?, "attributes"}}`.
///
/// Resource ids are sent as strings.
pub fn resource_document(
    kind: &str,
    id: Option<i64>,
    attributes: Attributes,
) -> Value {
    let mut data = Map::new();
    data.insert("type".to_owned(), json!(kind));
    if let Some(id) = id {
        data.insert("id".to_owned(), json!(id.to_string()));
    }
    data.insert("attributes".to_owned(), attributes.into_value());
    json!({ "data": data })
}
