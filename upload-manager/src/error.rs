use apivideo_http::ResponseError;
use std::{io::Error as IoError, path::PathBuf, sync::Arc};
use thiserror::Error;

/// 上传错误
///
/// 可以被廉价地克隆，同一个分片失败的错误会被交付给之后被连带取消的分片
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum UploadError {
    /// 分片大小超出允许范围
    #[error("invalid chunk size {size}: must be between {min} and {max} bytes")]
    InvalidChunkSize {
        /// 给出的分片大小
        size: u64,
        /// 最小分片大小
        min: u64,
        /// 最大分片大小
        max: u64,
    },

    /// 数据源为空
    #[error("source {path:?} is empty")]
    EmptyFile {
        /// 文件路径，对于非文件的数据源为空
        path: Option<PathBuf>,
    },

    /// 没有可以上传的数据
    #[error("nothing to upload")]
    EmptyRequest,

    /// 上传会话已经关闭
    #[error("upload session is closed")]
    SessionClosed,

    /// 传输错误
    #[error("transport error: {0}")]
    Transport(#[from] ResponseError),

    /// 上传已被取消
    #[error("upload cancelled")]
    Cancelled,

    /// 非法的来源名称
    #[error("invalid name `{0}`: must match [\\w\\-]{{1,50}}")]
    InvalidName(String),

    /// 非法的来源版本号
    #[error("invalid version `{0}`: must be `x`, `x.y` or `x.y.z` with at most 3 digits each")]
    InvalidVersion(String),

    /// 本地 IO 错误
    #[error("io error: {0}")]
    Io(#[source] Arc<IoError>),
}

/// 上传结果
pub type UploadResult<T> = Result<T, UploadError>;

impl From<IoError> for UploadError {
    #[inline]
    fn from(err: IoError) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl UploadError {
    /// 是否是由取消引起的错误
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// 获取传输错误
    #[inline]
    pub fn as_transport(&self) -> Option<&ResponseError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}
