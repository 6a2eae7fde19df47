use std::{
    fmt::Debug,
    io::{Error as IoError, ErrorKind as IoErrorKind, Read, Result as IoResult, Seek, SeekFrom},
    sync::{Arc, Mutex, PoisonError},
};

/// 可寻址数据源中的一段数据
///
/// 同一个文件切分出的所有分片共享同一个底层输入流，每次读取前按需寻址到本分片内的位置，
/// 因此分片可以按任意顺序读取，也可以在重试前通过 [`SeekableSource::reset`] 从头读取
#[derive(Debug, Clone)]
pub struct SeekableSource {
    shared: Arc<Mutex<SharedCursor>>,
    start: u64,
    len: u64,
    consumed: u64,
}

impl SeekableSource {
    /// 创建可寻址数据源中的一段数据
    ///
    /// `offset` 为这段数据在输入流中的起始位置，`len` 为长度
    #[inline]
    pub fn new(source: impl Read + Seek + Debug + Send + Sync + 'static, offset: u64, len: u64) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SharedCursor {
                position: None,
                source: Box::new(source),
            })),
            start: offset,
            len,
            consumed: 0,
        }
    }

    /// 共享同一个输入流，创建另一段数据
    pub(crate) fn clone_with_new_offset_and_length(&self, offset: u64, len: u64) -> Self {
        Self {
            shared: self.shared.to_owned(),
            start: offset,
            len,
            consumed: 0,
        }
    }

    #[inline]
    pub fn offset(&self) -> u64 {
        self.start
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 下次读取将从这段数据的开头开始
    #[inline]
    pub fn reset(&mut self) {
        self.consumed = 0;
    }

    fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.consumed)
    }
}

impl Read for SeekableSource {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = usize::try_from(remaining).map_or(buf.len(), |remaining| remaining.min(buf.len()));
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        let have_read = shared.read_at(self.start + self.consumed, &mut buf[..want])?;
        if have_read == 0 {
            return Err(IoError::new(
                IoErrorKind::UnexpectedEof,
                format!(
                    "source ended {} bytes before the end of the chunk at offset {}",
                    remaining, self.start
                ),
            ));
        }
        self.consumed += have_read as u64;
        Ok(have_read)
    }
}

trait ReadSeek: Read + Seek + Send + Sync + Debug {}
impl<T: Read + Seek + Send + Sync + Debug> ReadSeek for T {}

#[derive(Debug)]
struct SharedCursor {
    /// 输入流当前位置，未知时为空
    position: Option<u64>,
    source: Box<dyn ReadSeek>,
}

impl SharedCursor {
    fn read_at(&mut self, position: u64, buf: &mut [u8]) -> IoResult<usize> {
        if self.position != Some(position) {
            self.position = None;
            self.position = Some(self.source.seek(SeekFrom::Start(position))?);
        }
        let have_read = self.source.read(buf)?;
        self.position = self.position.map(|position| position + have_read as u64);
        Ok(have_read)
    }
}
