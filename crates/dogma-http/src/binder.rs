use std::collections::HashSet;
use std::fmt::Display;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, RawPathParamsRejection},
        RawPathParams,
    },
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use dogma_contract::Verb;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{Instrument, Span};

use crate::registry::{Registry, SignatureKey};

/// Request metadata handed to every handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

/// Response body of every dispatched request.
///
/// The result's fields are flattened next to `message`, so `R` must
/// serialise as a map or struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Envelope<R> {
    pub message: String,
    #[serde(flatten)]
    pub result: R,
}

impl<R: Default> Envelope<R> {
    pub fn success(result: R) -> Self {
        Self {
            message: String::new(),
            result,
        }
    }

    pub fn failure(error: impl Display) -> Self {
        Self {
            message: error.to_string(),
            result: R::default(),
        }
    }
}

/// Placeholder for handlers without URL params, body or result fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

/// Deserialize a URL parameter through its [`FromStr`] impl.
///
/// URL params always arrive as strings; use this with
/// `#[serde(deserialize_with = "dogma_http::parsed")]` on numeric fields.
pub fn parsed<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Routed { path: String, verb: Verb },
    Skipped { name: String, verb: Verb },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("no descriptor registered for handler `{handler}`")]
    MissingDescriptor { handler: &'static str },

    #[error("route {verb} {path} is already bound")]
    DuplicateRoute { path: String, verb: Verb },
}

/// Installs typed handlers as HTTP routes using the descriptors of a
/// [`Registry`].
pub struct Binder {
    registry: Arc<Registry>,
    span: Span,
    bound: HashSet<(String, Verb)>,
    routes: Vec<(String, MethodRouter)>,
}

impl Binder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            span: Span::none(),
            bound: HashSet::new(),
            routes: Vec::new(),
        }
    }

    /// Span that request handling and setup logs are recorded under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Bind `handler`, panicking if it cannot be routed.
    ///
    /// A handler without a descriptor is a setup mistake, so this is meant
    /// to run during service initialisation where aborting is acceptable.
    /// Use [`Binder::try_bind`] to handle the error instead.
    pub fn bind<F, U, B, R, E, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(RequestContext, U, B) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        U: DeserializeOwned + Send + 'static,
        B: DeserializeOwned + Default + Send + 'static,
        R: Serialize + Default + Send + 'static,
        E: Display + Send + 'static,
    {
        if let Err(err) = self.try_bind(handler) {
            panic!("failed to bind handler: {err}");
        }
        self
    }

    pub fn try_bind<F, U, B, R, E, Fut>(&mut self, handler: F) -> Result<Binding, BindError>
    where
        F: Fn(RequestContext, U, B) -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<R, E>> + Send + 'static,
        U: DeserializeOwned + Send + 'static,
        B: DeserializeOwned + Default + Send + 'static,
        R: Serialize + Default + Send + 'static,
        E: Display + Send + 'static,
    {
        let key = SignatureKey::of::<F>();
        let descriptor = self
            .registry
            .get(&key)
            .cloned()
            .ok_or(BindError::MissingDescriptor {
                handler: key.type_name(),
            })?;

        let _entered = self.span.enter();

        let Some(filter) = method_filter(&descriptor.verb) else {
            tracing::warn!(
                name = %descriptor.name,
                verb = %descriptor.verb,
                "skipping handler with unsupported verb"
            );
            return Ok(Binding::Skipped {
                name: descriptor.name,
                verb: descriptor.verb,
            });
        };

        let path = descriptor.path();
        if !self.bound.insert((path.clone(), descriptor.verb.clone())) {
            return Err(BindError::DuplicateRoute {
                path,
                verb: descriptor.verb,
            });
        }

        let endpoint = Endpoint {
            name: Arc::from(descriptor.name.as_str()),
            verb: descriptor.verb.clone(),
            span: self.span.clone(),
        };
        let method_router = on(
            filter,
            move |method: Method,
                  uri: Uri,
                  headers: HeaderMap,
                  params: Result<RawPathParams, RawPathParamsRejection>,
                  body: Result<Bytes, BytesRejection>| {
                let handler = handler.clone();
                let endpoint = endpoint.clone();
                let context = RequestContext {
                    method,
                    uri,
                    headers,
                };
                let params = params.map(|params| params_object(&params));
                let span = endpoint.span.clone();
                async move { endpoint.dispatch(handler, context, params, body).await }
                    .instrument(span)
            },
        );

        tracing::debug!(%path, verb = %descriptor.verb, "bound handler");
        self.routes.push((path.clone(), method_router));
        Ok(Binding::Routed {
            path,
            verb: descriptor.verb,
        })
    }

    /// Router serving every bound handler.
    pub fn into_router(self) -> Router {
        self.routes
            .into_iter()
            .fold(Router::new(), |router, (path, method_router)| {
                router.route(&path, method_router)
            })
    }
}

#[derive(Clone)]
struct Endpoint {
    name: Arc<str>,
    verb: Verb,
    span: Span,
}

impl Endpoint {
    async fn dispatch<F, U, B, R, E, Fut>(
        &self,
        handler: F,
        context: RequestContext,
        params: Result<Value, RawPathParamsRejection>,
        body: Result<Bytes, BytesRejection>,
    ) -> Response
    where
        F: Fn(RequestContext, U, B) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        U: DeserializeOwned,
        B: DeserializeOwned + Default,
        R: Serialize + Default,
        E: Display,
    {
        let params: U = match params
            .map_err(|err| err.to_string())
            .and_then(|params| serde_json::from_value(params).map_err(|err| err.to_string()))
        {
            Ok(params) => params,
            Err(err) => {
                tracing::warn!(endpoint = %self.name, error = %err, "failed to decode url params");
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        // Payload rejections only matter for verbs whose body is decoded.
        let body: B = match body
            .map_err(|err| err.to_string())
            .and_then(|body| decode_body(&self.verb, &body).map_err(|err| err.to_string()))
        {
            Ok(body) => body,
            Err(_) if !self.verb.carries_body() => B::default(),
            Err(err) => {
                tracing::warn!(
                    endpoint = %self.name,
                    error = %err,
                    "failed to decode request body"
                );
                return StatusCode::BAD_REQUEST.into_response();
            }
        };

        let envelope = match handler(context, params, body).await {
            Ok(result) => Envelope::success(result),
            Err(err) => {
                tracing::debug!(
                    endpoint = %self.name,
                    error = %err,
                    "handler returned an error"
                );
                Envelope::failure(err)
            }
        };

        (StatusCode::OK, Json(envelope)).into_response()
    }
}

fn method_filter(verb: &Verb) -> Option<MethodFilter> {
    match verb {
        Verb::Get => Some(MethodFilter::GET),
        Verb::Post => Some(MethodFilter::POST),
        Verb::Put => Some(MethodFilter::PUT),
        Verb::Delete => Some(MethodFilter::DELETE),
        Verb::Patch => Some(MethodFilter::PATCH),
        Verb::Other(_) => None,
    }
}

// URL params are re-encoded as a JSON object of strings so any
// `Deserialize` shape can be decoded from them uniformly.
fn params_object(params: &RawPathParams) -> Value {
    let object: Map<String, Value> = params
        .iter()
        .map(|(key, value)| (key.to_owned(), Value::String(value.to_owned())))
        .collect();
    Value::Object(object)
}

fn decode_body<B>(verb: &Verb, body: &[u8]) -> serde_json::Result<B>
where
    B: DeserializeOwned + Default,
{
    if !verb.carries_body() || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(B::default());
    }
    serde_json::from_slice(body)
}
