use super::{SeekableSource, UploadError, UploadResult};
use assert_impl::assert_impl;
use std::{
    fmt,
    fs::File,
    io::{Cursor, Read, Result as IoResult},
    num::NonZeroUsize,
    path::Path,
};

/// 分片请求体
///
/// 可以是内存数据，也可以是文件中的一段数据
pub struct PartBody {
    inner: PartBodyInner,
    file_name: Option<String>,
}

enum PartBodyInner {
    Bytes(Cursor<Vec<u8>>),
    Seekable(SeekableSource),
}

impl PartBody {
    /// 通过内存数据创建分片请求体
    #[inline]
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: PartBodyInner::Bytes(Cursor::new(bytes.into())),
            file_name: None,
        }
    }

    /// 通过文件创建分片请求体
    ///
    /// 只读取文件长度，文件内容在上传时才会被读取
    pub fn from_path(path: impl AsRef<Path>) -> UploadResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self::from_seekable_source(
            SeekableSource::new(file, 0, size),
            path.file_name().map(|name| name.to_string_lossy().into_owned()),
        ))
    }

    pub(crate) fn from_seekable_source(source: SeekableSource, file_name: Option<String>) -> Self {
        Self {
            inner: PartBodyInner::Seekable(source),
            file_name,
        }
    }

    /// 设置上传时使用的文件名
    #[inline]
    #[must_use]
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    #[inline]
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// 请求体长度
    #[inline]
    pub fn size(&self) -> u64 {
        match &self.inner {
            PartBodyInner::Bytes(bytes) => bytes.get_ref().len() as u64,
            PartBodyInner::Seekable(source) => source.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// 回到请求体起始位置
    pub(crate) fn reset(&mut self) {
        match &mut self.inner {
            PartBodyInner::Bytes(bytes) => bytes.set_position(0),
            PartBodyInner::Seekable(source) => source.reset(),
        }
    }
}

impl Read for PartBody {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        match &mut self.inner {
            PartBodyInner::Bytes(bytes) => bytes.read(buf),
            PartBodyInner::Seekable(source) => source.read(buf),
        }
    }
}

impl From<Vec<u8>> for PartBody {
    #[inline]
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&[u8]> for PartBody {
    #[inline]
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Debug for PartBody {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.inner {
            PartBodyInner::Bytes(_) => "Bytes",
            PartBodyInner::Seekable(_) => "Seekable",
        };
        f.debug_struct("PartBody")
            .field("kind", &kind)
            .field("size", &self.size())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// 分片在上传中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    /// 总分片数已知
    Sized {
        /// 总分片数
        total: NonZeroUsize,
    },

    /// 总分片数未知，由调用方标记最后一个分片
    Progressive {
        /// 是否是最后一个分片
        is_last_part: bool,
    },
}

/// 分片上传请求
///
/// 一个分片对应一次 Multipart 上传请求
#[derive(Debug)]
pub struct PartUploadRequest {
    index: NonZeroUsize,
    kind: PartKind,
    body: PartBody,
    video_id: Option<String>,
}

impl PartUploadRequest {
    /// 创建总分片数已知的分片上传请求
    pub fn sized(index: NonZeroUsize, total: NonZeroUsize, body: PartBody) -> UploadResult<Self> {
        Self::new(index, PartKind::Sized { total }, body)
    }

    /// 创建渐进式上传的分片上传请求
    pub fn progressive(index: NonZeroUsize, is_last_part: bool, body: PartBody) -> UploadResult<Self> {
        Self::new(index, PartKind::Progressive { is_last_part }, body)
    }

    fn new(index: NonZeroUsize, kind: PartKind, body: PartBody) -> UploadResult<Self> {
        if body.is_empty() {
            return Err(UploadError::EmptyRequest);
        }
        Ok(Self {
            index,
            kind,
            body,
            video_id: None,
        })
    }

    /// 分片序号，从 1 开始
    #[inline]
    pub fn index(&self) -> NonZeroUsize {
        self.index
    }

    #[inline]
    pub fn kind(&self) -> PartKind {
        self.kind
    }

    /// 总分片数，仅在总分片数已知时返回
    #[inline]
    pub fn total(&self) -> Option<NonZeroUsize> {
        match self.kind {
            PartKind::Sized { total } => Some(total),
            PartKind::Progressive { .. } => None,
        }
    }

    /// 是否是最后一个分片
    #[inline]
    pub fn is_last_part(&self) -> bool {
        match self.kind {
            PartKind::Sized { total } => self.index == total,
            PartKind::Progressive { is_last_part } => is_last_part,
        }
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.body.size()
    }

    #[inline]
    pub fn body(&self) -> &PartBody {
        &self.body
    }

    #[inline]
    pub fn body_mut(&mut self) -> &mut PartBody {
        &mut self.body
    }

    /// 视频 ID，通过上传凭证上传时在分片执行前注入
    #[inline]
    pub fn video_id(&self) -> Option<&str> {
        self.video_id.as_deref()
    }

    #[inline]
    pub(crate) fn set_video_id(&mut self, video_id: Option<String>) {
        self.video_id = video_id;
    }

    /// 上传文件时使用的文件名
    #[inline]
    pub fn file_name(&self) -> String {
        self.body
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("part-{}", self.index))
    }

    /// 除文件本身以外的表单字段，按发送顺序排列
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("chunkId", self.index.to_string())];
        match self.kind {
            PartKind::Sized { total } => fields.push(("numOfChunks", total.to_string())),
            PartKind::Progressive { is_last_part } => fields.push(("isLastPart", is_last_part.to_string())),
        }
        if let Some(video_id) = self.video_id.as_ref() {
            fields.push(("videoId", video_id.to_owned()));
        }
        fields
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_sized_part_form_fields() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let part = PartUploadRequest::sized(nz(2), nz(3), PartBody::from_bytes(b"data".to_vec()))?;
        assert!(!part.is_last_part());
        assert_eq!(part.total(), Some(nz(3)));
        assert_eq!(part.file_name(), "part-2");
        assert_eq!(
            part.form_fields(),
            [("chunkId", "2".to_owned()), ("numOfChunks", "3".to_owned())]
        );

        let last = PartUploadRequest::sized(nz(3), nz(3), PartBody::from_bytes(b"data".to_vec()))?;
        assert!(last.is_last_part());
        Ok(())
    }

    #[test]
    fn test_progressive_part_form_fields() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut part = PartUploadRequest::progressive(nz(1), true, b"data".to_vec().into())?;
        part.set_video_id(Some("vi123".to_owned()));
        assert!(part.is_last_part());
        assert_eq!(part.total(), None);
        assert_eq!(
            part.form_fields(),
            [
                ("chunkId", "1".to_owned()),
                ("isLastPart", "true".to_owned()),
                ("videoId", "vi123".to_owned()),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_empty_part_is_rejected() {
        env_logger::builder().is_test(true).try_init().ok();

        assert!(matches!(
            PartUploadRequest::progressive(nz(1), false, Vec::new().into()),
            Err(UploadError::EmptyRequest)
        ));
    }

    #[test]
    fn test_part_body_from_path() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut file = NamedTempFile::new()?;
        file.write_all(b"0123456789")?;
        file.flush()?;

        let mut body = PartBody::from_path(file.path())?;
        assert_eq!(body.size(), 10);
        assert_eq!(body.file_name(), file.path().file_name().and_then(|name| name.to_str()));

        let mut buf = String::new();
        body.read_to_string(&mut buf)?;
        assert_eq!(buf, "0123456789");

        body.reset();
        buf.clear();
        body.read_to_string(&mut buf)?;
        assert_eq!(buf, "0123456789");
        Ok(())
    }
}
