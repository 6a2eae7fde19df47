#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    missing_debug_implementations,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    trivial_numeric_casts,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]

//! # apivideo-http
//!
//! ## api.video HTTP 接口
//!
//! 为上传引擎提供与具体 HTTP 客户端实现无关的请求、响应与错误类型，
//! 任何实现了 [`HttpCaller`] 的客户端都可以用于发送分片上传请求。

mod callback;
mod error;
mod multipart;
mod request;
mod response;

pub use callback::{CallbackResult, TransferProgressInfo};
pub use error::{Error as ResponseError, ErrorKind as ResponseErrorKind};
pub use http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    method::Method,
    status::StatusCode,
    uri::Uri,
};
pub use multipart::{Multipart, Part, PartMetadata};
pub use request::{Request, RequestBody, RequestBuilder};
pub use response::{Response, ResponseBuilder, Result as ResponseResult};

use auto_impl::auto_impl;
use std::fmt::Debug;

/// HTTP 请求处理接口
///
/// 实现该接口，即可处理上传引擎发出的所有 HTTP 请求。
///
/// 请求体在读取时可能返回错误以中止请求，实现方应当将其作为请求失败返回，而不是重试。
#[auto_impl(&, Box, Arc)]
pub trait HttpCaller: Debug + Send + Sync {
    /// 阻塞发送 HTTP 请求
    fn call(&self, request: &mut Request<'_>) -> ResponseResult;
}

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::HttpCaller;
}
