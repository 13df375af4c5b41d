//! Status-code policy and typed materialization of raw responses

use std::any::type_name;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use typed_rest_common::{HttpResponseLike, HttpStatus, StatusClass};

use crate::deserializer::DeserializerConfig;
use crate::error::{RestError, RestResult};
use crate::response::{RawResponse, RestResponse};

/// What the materializer does with a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The status has no-content semantics; any body is ignored
    NoBody,
    /// 4xx/5xx (or a code outside the standard range); the body is not read
    ErrorStatus,
    /// Success, but the body is absent or empty
    EmptyBody,
    /// Success with a body: deserialize it
    Deserialize,
}

impl Disposition {
    /// The content policy, as one table over status classes
    pub fn of(status: HttpStatus, body: Option<&[u8]>) -> Self {
        match status.class() {
            StatusClass::Informational => Disposition::NoBody,
            StatusClass::NoContent => Disposition::NoBody,
            StatusClass::Redirection => Disposition::NoBody,
            StatusClass::Success => match body {
                Some(bytes) if !bytes.is_empty() => Disposition::Deserialize,
                _ => Disposition::EmptyBody,
            },
            StatusClass::ClientError => Disposition::ErrorStatus,
            StatusClass::ServerError => Disposition::ErrorStatus,
            StatusClass::Nonstandard => Disposition::ErrorStatus,
        }
    }
}

/// Turns raw responses into typed envelopes
///
/// Holds nothing but the read-only deserializer configuration, so the same
/// input always yields the same envelope.
#[derive(Debug, Clone)]
pub struct ResponseMaterializer {
    config: Arc<DeserializerConfig>,
}

impl ResponseMaterializer {
    pub fn new(config: DeserializerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DeserializerConfig {
        &self.config
    }

    /// Apply the status policy to `raw` and deserialize its body when one is expected.
    ///
    /// Only a body that was expected and present but unreadable is an error;
    /// error statuses come back as envelopes with absent content.
    pub fn materialize<T>(&self, raw: RawResponse) -> RestResult<RestResponse<T>>
    where
        T: DeserializeOwned + 'static,
    {
        let disposition = Disposition::of(raw.status(), raw.body_bytes());
        tracing::debug!(
            status = raw.status_code,
            ?disposition,
            target_type = type_name::<T>(),
            "materializing response"
        );

        let content = match disposition {
            Disposition::NoBody | Disposition::ErrorStatus | Disposition::EmptyBody => None,
            Disposition::Deserialize => Some(self.deserialize_body::<T>(&raw)?),
        };

        Ok(RestResponse::new(raw, content))
    }

    fn deserialize_body<T>(&self, raw: &RawResponse) -> RestResult<T>
    where
        T: DeserializeOwned + 'static,
    {
        let body = raw.body_bytes().unwrap_or_default();
        let value = self
            .config
            .decode(body, raw.content_type())
            .map_err(|e| deserialization_error::<T>(raw, e))?;

        if let Some(items) = value.as_array() {
            tracing::trace!(elements = items.len(), "response body is a sequence");
        }

        self.config
            .deserialize_value::<T>(value)
            .map_err(|e| deserialization_error::<T>(raw, e))
    }
}

impl Default for ResponseMaterializer {
    fn default() -> Self {
        Self::new(DeserializerConfig::default())
    }
}

fn deserialization_error<T>(raw: &RawResponse, error: anyhow::Error) -> RestError {
    tracing::warn!(
        status = raw.status_code,
        target_type = type_name::<T>(),
        error = %error,
        "response body did not match the expected type"
    );
    RestError::Deserialization {
        status: raw.status_code,
        type_name: type_name::<T>(),
        message: format!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deserializer::{Converter, TypeKey};
    use crate::response::RawResponseBuilder;
    use serde::Deserialize;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Deserialize, PartialEq)]
    struct Book {
        id: u32,
        title: String,
    }

    const BOOKS: &str = r#"[
        {"id": 1, "title": "Dune"},
        {"id": 2, "title": "Emma"},
        {"id": 3, "title": "Beloved"},
        {"id": 4, "title": "Ulysses"},
        {"id": 5, "title": "Middlemarch"}
    ]"#;

    fn raw(status: u16, body: Option<&'static str>) -> RawResponse {
        let builder = RawResponseBuilder::new().status_code(status);
        match body {
            Some(b) => builder.body(b).build(),
            None => builder.build(),
        }
    }

    #[test]
    fn test_disposition_table() {
        let body = Some(&b"[1]"[..]);
        let empty = Some(&b""[..]);

        assert_eq!(Disposition::of(HttpStatus(100), body), Disposition::NoBody);
        assert_eq!(Disposition::of(HttpStatus::NO_CONTENT, body), Disposition::NoBody);
        assert_eq!(Disposition::of(HttpStatus::RESET_CONTENT, None), Disposition::NoBody);
        assert_eq!(Disposition::of(HttpStatus::NOT_MODIFIED, body), Disposition::NoBody);
        assert_eq!(Disposition::of(HttpStatus::OK, body), Disposition::Deserialize);
        assert_eq!(Disposition::of(HttpStatus::CREATED, body), Disposition::Deserialize);
        assert_eq!(Disposition::of(HttpStatus::OK, empty), Disposition::EmptyBody);
        assert_eq!(Disposition::of(HttpStatus::OK, None), Disposition::EmptyBody);
        assert_eq!(Disposition::of(HttpStatus::NOT_FOUND, body), Disposition::ErrorStatus);
        assert_eq!(Disposition::of(HttpStatus::INTERNAL_SERVER_ERROR, body), Disposition::ErrorStatus);
        assert_eq!(Disposition::of(HttpStatus(600), body), Disposition::ErrorStatus);
    }

    #[test]
    fn test_no_content_ignores_a_stray_body() {
        let materializer = ResponseMaterializer::default();
        let response = materializer
            .materialize::<Vec<Book>>(raw(204, Some("this is not json")))
            .unwrap();
        assert_eq!(response.status_code(), 204);
        assert!(response.content().is_none());
    }

    #[test]
    fn test_error_status_keeps_code_and_skips_body() {
        let materializer = ResponseMaterializer::default();
        for status in [400, 404, 500, 503] {
            let response = materializer
                .materialize::<Vec<Book>>(raw(status, Some(r#"{"message": "nope"}"#)))
                .unwrap();
            assert_eq!(response.status_code(), status);
            assert!(response.content().is_none());
        }
    }

    #[test]
    fn test_empty_success_body_is_not_an_error() {
        let materializer = ResponseMaterializer::default();
        let empty = materializer.materialize::<Vec<Book>>(raw(200, Some(""))).unwrap();
        let absent = materializer.materialize::<Vec<Book>>(raw(200, None)).unwrap();
        assert!(empty.content().is_none());
        assert!(absent.content().is_none());
    }

    #[test]
    fn test_success_body_is_deserialized() {
        let materializer = ResponseMaterializer::default();
        let response = materializer
            .materialize::<Vec<Book>>(raw(200, Some(BOOKS)))
            .unwrap();
        let books = response.content().unwrap();
        assert_eq!(books.len(), 5);
        assert_eq!(books[0], Book { id: 1, title: "Dune".into() });
    }

    #[test]
    fn test_scalar_target() {
        let materializer = ResponseMaterializer::default();
        let response = materializer.materialize::<u64>(raw(200, Some("42"))).unwrap();
        assert_eq!(response.into_content(), Some(42));
    }

    #[test]
    fn test_mismatched_body_is_reported() {
        let materializer = ResponseMaterializer::default();
        let err = materializer
            .materialize::<Vec<Book>>(raw(200, Some(r#"{"id": 1}"#)))
            .unwrap_err();
        match err {
            RestError::Deserialization { status, type_name, .. } => {
                assert_eq!(status, 200);
                assert!(type_name.contains("Book"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = materializer
            .materialize::<Vec<Book>>(raw(200, Some("<books/>")))
            .unwrap_err();
        assert!(err.is_deserialization());
    }

    #[test]
    fn test_materialization_is_idempotent() {
        let materializer = ResponseMaterializer::default();
        let input = raw(200, Some(BOOKS));
        let first = materializer.materialize::<Vec<Book>>(input.clone()).unwrap();
        let second = materializer.materialize::<Vec<Book>>(input).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_converters_not_consulted_without_body() {
        #[derive(Default)]
        struct Counting(AtomicUsize);

        impl Converter for Counting {
            fn can_convert(&self, _target: TypeKey) -> bool {
                self.0.fetch_add(1, Ordering::SeqCst);
                false
            }

            fn convert(&self, _target: TypeKey, raw: Value) -> anyhow::Result<Value> {
                Ok(raw)
            }
        }

        let counting = Arc::new(Counting::default());
        let materializer =
            ResponseMaterializer::new(DeserializerConfig::new().converter(counting.clone()));

        materializer.materialize::<Vec<Book>>(raw(404, Some(BOOKS))).unwrap();
        materializer.materialize::<Vec<Book>>(raw(204, Some(BOOKS))).unwrap();
        assert_eq!(counting.0.load(Ordering::SeqCst), 0);

        materializer.materialize::<Vec<Book>>(raw(200, Some(BOOKS))).unwrap();
        assert!(counting.0.load(Ordering::SeqCst) > 0);
    }

    /// Decodes `key=value` lines into an object, remembering the Content-Type it saw
    #[derive(Default)]
    struct KeyValueDecoder {
        seen_content_type: std::sync::Mutex<Option<String>>,
    }

    impl crate::deserializer::BodyDecoder for Arc<KeyValueDecoder> {
        fn decode(&self, body: &[u8], content_type: Option<&str>) -> anyhow::Result<Value> {
            *self.seen_content_type.lock().unwrap() = content_type.map(str::to_owned);
            let text = std::str::from_utf8(body)?;
            let mut fields = serde_json::Map::new();
            for line in text.lines().filter(|l| !l.trim().is_empty()) {
                let (key, value) = line
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("line without '=': {}", line))?;
                let value = value
                    .trim()
                    .parse::<u64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(value.trim()));
                fields.insert(key.trim().to_owned(), value);
            }
            Ok(Value::Object(fields))
        }
    }

    #[test]
    fn test_custom_decoder_receives_content_type_and_feeds_materialization() {
        let decoder = Arc::new(KeyValueDecoder::default());
        let materializer =
            ResponseMaterializer::new(DeserializerConfig::new().decoder(decoder.clone()));

        let raw = RawResponseBuilder::new()
            .status_code(200)
            .header("Content-Type", "text/x-key-value")
            .body("id = 7\ntitle = Kindred\n")
            .build();
        let response = materializer.materialize::<Book>(raw).unwrap();

        assert_eq!(
            response.content(),
            Some(&Book { id: 7, title: "Kindred".into() })
        );
        assert_eq!(
            decoder.seen_content_type.lock().unwrap().as_deref(),
            Some("text/x-key-value")
        );
    }

    #[test]
    fn test_custom_decoder_failure_is_a_deserialization_error() {
        let decoder = Arc::new(KeyValueDecoder::default());
        let materializer =
            ResponseMaterializer::new(DeserializerConfig::new().decoder(decoder.clone()));

        let err = materializer
            .materialize::<Book>(raw(200, Some("id: 7")))
            .unwrap_err();

        match err {
            RestError::Deserialization { status, message, .. } => {
                assert_eq!(status, 200);
                assert!(message.contains("line without '='"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(*decoder.seen_content_type.lock().unwrap(), None);
    }

    #[test]
    fn test_custom_decoder_not_called_for_error_status() {
        let decoder = Arc::new(KeyValueDecoder::default());
        let materializer =
            ResponseMaterializer::new(DeserializerConfig::new().decoder(decoder.clone()));

        let response = materializer
            .materialize::<Book>(raw(404, Some("id = 1")))
            .unwrap();
        assert!(response.content().is_none());
        assert!(decoder.seen_content_type.lock().unwrap().is_none());
    }
}
