use http::StatusCode;
use std::{error, fmt, sync::Arc};

/// 传输错误类型
///
/// 分片上传器与 HTTP 客户端实现都通过它描述一次请求失败的原因
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// 响应体无法解析，或缺少必需的字段
    InvalidRequestResponse,

    /// 无法构造请求地址
    InvalidUrl,

    /// 无法构造请求头
    InvalidHeader,

    /// 无法连接到服务器
    ConnectError,

    /// 代理连接失败
    ProxyError,

    /// 域名解析失败
    DnsServerError,

    /// 发送请求或请求体时失败
    SendError,

    /// 读取响应时失败
    ReceiveError,

    /// 读取本地分片数据失败
    LocalIoError,

    /// 请求超时
    TimeoutError,

    /// TLS 握手或证书错误
    SslError,

    /// 重定向次数过多
    TooManyRedirect,

    /// 服务器返回了非 2xx 的状态码
    StatusCodeError(StatusCode),

    /// 无法归类的错误
    UnknownError,

    /// 进度回调要求取消请求
    UserCanceled,
}

/// 传输错误
///
/// 克隆后的错误共享同一个内部错误
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    error: Arc<dyn error::Error + Send + Sync>,
}

impl Error {
    /// 使用内部错误创建传输错误
    #[inline]
    pub fn new(kind: ErrorKind, err: impl Into<Box<dyn error::Error + Send + Sync>>) -> Self {
        let error: Box<dyn error::Error + Send + Sync> = err.into();
        Error {
            kind,
            error: error.into(),
        }
    }

    /// 使用错误信息创建传输错误
    #[inline]
    pub fn new_with_msg(kind: ErrorKind, msg: impl fmt::Display) -> Self {
        Self::new(kind, msg.to_string())
    }

    /// 错误类型
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 是否是由用户取消引起的错误
    #[inline]
    pub fn is_user_canceled(&self) -> bool {
        self.kind == ErrorKind::UserCanceled
    }

    /// 获取内部错误
    #[inline]
    pub fn into_inner(self) -> Arc<dyn error::Error + Send + Sync> {
        self.error
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.kind {
            ErrorKind::StatusCodeError(status_code) => write!(f, "[{}] {}", status_code, self.error),
            kind => write!(f, "[{:?}] {}", kind, self.error),
        }
    }
}

impl error::Error for Error {
    #[inline]
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        env_logger::builder().is_test(true).try_init().ok();

        let err = Error::new_with_msg(ErrorKind::TimeoutError, "operation timed out");
        assert_eq!(err.to_string(), "[TimeoutError] operation timed out");
        assert!(!err.is_user_canceled());

        let err = Error::new_with_msg(ErrorKind::StatusCodeError(StatusCode::BAD_REQUEST), "invalid chunk");
        assert_eq!(err.kind(), ErrorKind::StatusCodeError(StatusCode::BAD_REQUEST));
        assert_eq!(err.to_string(), "[400 Bad Request] invalid chunk");

        let cloned = err.clone();
        assert_eq!(cloned.kind(), err.kind());
        assert_eq!(cloned.to_string(), err.to_string());
    }
}
