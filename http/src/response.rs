use super::error::Error;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    status::StatusCode,
};
use std::{mem::take, result};

/// HTTP 响应
///
/// 响应体在客户端实现中被完整读入内存
#[derive(Debug, Default, Clone)]
pub struct Response {
    status_code: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    /// 创建 HTTP 响应构建器
    #[inline]
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// 获取 HTTP 状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// 获取 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取 HTTP Header
    #[inline]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// 获取响应体
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 转换为响应体
    #[inline]
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}

/// HTTP 响应构建器
#[derive(Debug, Default)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    /// 设置 HTTP 状态码
    #[inline]
    pub fn status_code(&mut self, status_code: StatusCode) -> &mut Self {
        self.inner.status_code = status_code;
        self
    }

    /// 设置 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.inner.headers = headers;
        self
    }

    /// 添加 HTTP Header
    #[inline]
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// 设置响应体
    #[inline]
    pub fn body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.inner.body = body.into();
        self
    }

    /// 构建 HTTP 响应，同时构建器被重置
    #[inline]
    pub fn build(&mut self) -> Response {
        take(&mut self.inner)
    }
}

/// HTTP 响应结果
pub type Result = result::Result<Response, Error>;
