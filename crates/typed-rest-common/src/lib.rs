//! Common HTTP types for typed-rest
//!
//! Method and status vocabulary shared by the client and anything that
//! wants to speak about responses without depending on the client itself.

pub mod http;

pub use self::http::{HttpMethod, HttpResponseLike, HttpStatus, StatusClass};
