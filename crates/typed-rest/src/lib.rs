//! typed-rest: async REST client with typed responses
//!
//! Sends requests against a base URL, applies a status-code policy to decide
//! whether a body should exist, and deserializes it into a caller-chosen
//! type through a pluggable decoder and converter set.
//!
//! # Architecture
//!
//! - `Dispatcher`: resolves a `Request` and sends it over a `Transport`,
//!   returning the `RawResponse` untouched
//! - `ResponseMaterializer`: maps the status to a `Disposition` and, when a
//!   body is expected, deserializes it into a `RestResponse<T>`
//! - `runtime`: runs each send as one task on a worker runtime, so callers
//!   may block on a send from a single-threaded context without deadlocking
//! - `RestClient`: the public entry point tying the three together

pub mod client;
pub mod config;
pub mod deserializer;
pub mod dispatcher;
pub mod error;
pub mod materializer;
pub mod request;
pub mod response;
pub mod runtime;
pub mod transport;

pub use client::RestClient;
pub use config::RestClientConfig;
pub use deserializer::{
    converted, converted_option, BodyDecoder, Converter, DeserializerConfig, JsonDecoder, TypeKey,
};
pub use dispatcher::Dispatcher;
pub use error::{ErrorCategory, RestError, RestResult, TransportError};
pub use materializer::{Disposition, ResponseMaterializer};
pub use request::{HttpMethod, Request, RequestBody, RequestBuilder};
pub use response::{RawResponse, RawResponseBuilder, RestResponse};
pub use transport::{ReqwestTransport, Transport, TransportRequest};

// Re-export shared HTTP types from typed-rest-common
pub use typed_rest_common::{HttpResponseLike, HttpStatus, StatusClass};
