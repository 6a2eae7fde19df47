use assert_impl::assert_impl;
use http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    method::Method,
    uri::Uri,
};
use once_cell::sync::Lazy;
use std::{
    fmt,
    io::{empty, Read, Result as IoResult},
    mem::take,
    time::Duration,
};

static FULL_USER_AGENT: Lazy<Box<str>> = Lazy::new(|| {
    format!(
        "ApiVideoRust/apivideo-http-{}/rust-{}",
        env!("CARGO_PKG_VERSION"),
        rustc_version_runtime::version(),
    )
    .into()
});

/// HTTP 请求体
///
/// 请求体只能被读取一次，长度必须在创建时确定
pub struct RequestBody<'r> {
    reader: Box<dyn Read + Send + 'r>,
    size: u64,
}

impl<'r> RequestBody<'r> {
    /// 通过输入流和其长度创建请求体
    #[inline]
    pub fn from_reader(reader: impl Read + Send + 'r, size: u64) -> Self {
        Self {
            reader: Box::new(reader),
            size,
        }
    }

    /// 通过内存数据创建请求体
    #[inline]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let size = bytes.len() as u64;
        Self::from_reader(std::io::Cursor::new(bytes), size)
    }

    /// 获取请求体长度
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Default for RequestBody<'_> {
    #[inline]
    fn default() -> Self {
        Self::from_reader(empty(), 0)
    }
}

impl Read for RequestBody<'_> {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for RequestBody<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBody").field("size", &self.size).finish()
    }
}

/// HTTP 请求
///
/// 封装 HTTP 请求相关字段
#[derive(Debug, Default)]
pub struct Request<'r> {
    method: Method,
    url: Uri,
    headers: HeaderMap,
    body: RequestBody<'r>,
    timeout: Option<Duration>,
    appended_user_agent: String,
}

impl<'r> Request<'r> {
    /// 创建 HTTP 请求构建器
    #[inline]
    pub fn builder() -> RequestBuilder<'r> {
        RequestBuilder::default()
    }

    /// 获取请求 HTTP 方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 获取 HTTP 请求 URL
    #[inline]
    pub fn url(&self) -> &Uri {
        &self.url
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取请求 HTTP Headers 的可变引用
    #[inline]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// 获取请求体
    #[inline]
    pub fn body(&self) -> &RequestBody<'r> {
        &self.body
    }

    /// 获取请求体的可变引用
    #[inline]
    pub fn body_mut(&mut self) -> &mut RequestBody<'r> {
        &mut self.body
    }

    /// 获取请求超时时长
    ///
    /// 超时由 HTTP 客户端实现负责
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// 获取 UserAgent
    #[inline]
    pub fn user_agent(&self) -> String {
        let mut user_agent = String::from(FULL_USER_AGENT.as_ref());
        user_agent.push_str(&self.appended_user_agent);
        user_agent
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
    }
}

/// HTTP 请求构建器
#[derive(Debug, Default)]
pub struct RequestBuilder<'r> {
    inner: Request<'r>,
}

impl<'r> RequestBuilder<'r> {
    /// 设置请求 HTTP 方法
    #[inline]
    pub fn method(&mut self, method: Method) -> &mut Self {
        self.inner.method = method;
        self
    }

    /// 设置 HTTP 请求 URL
    #[inline]
    pub fn url(&mut self, url: Uri) -> &mut Self {
        self.inner.url = url;
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(&mut self, headers: HeaderMap) -> &mut Self {
        self.inner.headers = headers;
        self
    }

    /// 添加请求 HTTP Header
    #[inline]
    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// 设置请求体
    #[inline]
    pub fn body(&mut self, body: RequestBody<'r>) -> &mut Self {
        self.inner.body = body;
        self
    }

    /// 设置请求超时时长
    #[inline]
    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.inner.timeout = Some(timeout);
        self
    }

    /// 追加 UserAgent
    #[inline]
    pub fn appended_user_agent(&mut self, user_agent: impl Into<String>) -> &mut Self {
        self.inner.appended_user_agent = user_agent.into();
        self
    }

    /// 构建 HTTP 请求，同时构建器被重置
    #[inline]
    pub fn build(&mut self) -> Request<'r> {
        take(&mut self.inner)
    }
}
