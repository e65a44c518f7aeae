//! Bind strongly typed handlers to HTTP routes.
//!
//! Handlers have the shape `Fn(RequestContext, U, B) -> impl Future<Output =
//! Result<R, E>>`. A [`Registry`] pairs each handler with a [`Descriptor`]
//! naming its route and verb; the [`Binder`] looks the descriptor up by the
//! handler's type and installs an axum route at `/{name}`.
//!
//! ```ignore
//! async fn get_user(
//!     _ctx: RequestContext,
//!     params: UserParams,
//!     _body: Empty,
//! ) -> Result<User, UserError> { /* ... */ }
//!
//! let registry = Registry::new()
//!     .describe(&get_user, Descriptor::new("users/{id}", Verb::Get));
//! let mut binder = Binder::new(Arc::new(registry));
//! binder.bind(get_user);
//! let app = binder.into_router();
//! ```
//!
//! Every dispatched request answers `200 OK` with an [`Envelope`]; handler
//! errors travel in its `message` field. Requests whose URL params or body
//! fail to decode answer `400 Bad Request` with an empty body and never reach
//! the handler.

mod binder;
mod registry;

pub use binder::{parsed, BindError, Binder, Binding, Empty, Envelope, RequestContext};
pub use registry::{Descriptor, Registry, SignatureKey};
