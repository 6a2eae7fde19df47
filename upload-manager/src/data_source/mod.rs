mod seekable;

pub use seekable::SeekableSource;

use super::{ChunkSize, PartBody, UploadError, UploadResult};
use log::debug;
use std::{
    fmt::Debug,
    fs::File,
    io::{Read, Seek, SeekFrom},
    iter::FusedIterator,
    num::NonZeroUsize,
    path::Path,
};

/// 分片切分器
///
/// 将一个大小已知的数据源切分为若干个固定大小的分片，最后一个分片可能较小。
/// 切分时只读取数据源的长度，分片数据在真正上传时才会被读取。
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    source: SeekableSource,
    base_offset: u64,
    size: u64,
    chunk_size: ChunkSize,
    file_name: Option<String>,
}

impl ChunkSplitter {
    /// 打开文件并创建分片切分器
    ///
    /// 空文件将返回 [`UploadError::EmptyFile`]
    pub fn open(path: impl AsRef<Path>, chunk_size: ChunkSize) -> UploadResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        if size == 0 {
            return Err(UploadError::EmptyFile {
                path: Some(path.to_owned()),
            });
        }
        debug!("split {:?} ({} bytes) into chunks of {} bytes", path, size, chunk_size);
        Ok(Self {
            source: SeekableSource::new(file, 0, size),
            base_offset: 0,
            size,
            chunk_size,
            file_name: path.file_name().map(|name| name.to_string_lossy().into_owned()),
        })
    }

    /// 通过可寻址的输入流创建分片切分器
    ///
    /// 从输入流的当前位置开始直到末尾的数据都将被上传
    pub fn from_source(
        mut source: impl Read + Seek + Debug + Send + Sync + 'static,
        chunk_size: ChunkSize,
    ) -> UploadResult<Self> {
        let base_offset = source.stream_position()?;
        let end = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(base_offset))?;
        let size = end.saturating_sub(base_offset);
        if size == 0 {
            return Err(UploadError::EmptyFile { path: None });
        }
        Ok(Self {
            source: SeekableSource::new(source, base_offset, size),
            base_offset,
            size,
            chunk_size,
            file_name: None,
        })
    }

    /// 设置上传时使用的文件名
    #[inline]
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// 数据源总长度
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// 分片数量，即 `ceil(size / chunk_size)`
    #[inline]
    pub fn chunk_count(&self) -> NonZeroUsize {
        let count = (self.size + self.chunk_size.as_u64() - 1) / self.chunk_size.as_u64();
        NonZeroUsize::new(count.try_into().unwrap_or(usize::MAX)).unwrap_or(NonZeroUsize::MIN)
    }

    /// 从第一个分片开始迭代所有分片
    ///
    /// 每次调用都会返回一个新的迭代器
    #[inline]
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            splitter: self,
            next: 0,
            total: self.chunk_count(),
        }
    }
}

/// 分片迭代器
#[derive(Debug)]
pub struct Chunks<'s> {
    splitter: &'s ChunkSplitter,
    next: usize,
    total: NonZeroUsize,
}

impl Iterator for Chunks<'_> {
    type Item = Chunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total.get() {
            return None;
        }
        let chunk_size = self.splitter.chunk_size.as_u64();
        let start = self.next as u64 * chunk_size;
        let len = chunk_size.min(self.splitter.size - start);
        self.next += 1;
        let index = NonZeroUsize::new(self.next)?;
        Some(Chunk {
            index,
            total: self.total,
            offset: start,
            source: self
                .splitter
                .source
                .clone_with_new_offset_and_length(self.splitter.base_offset + start, len),
            file_name: self.splitter.file_name.to_owned(),
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total.get() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}
impl FusedIterator for Chunks<'_> {}

/// 分片
///
/// 表示数据源中的一段连续数据，序号从 1 开始
#[derive(Debug, Clone)]
pub struct Chunk {
    index: NonZeroUsize,
    total: NonZeroUsize,
    offset: u64,
    source: SeekableSource,
    file_name: Option<String>,
}

impl Chunk {
    #[inline]
    pub fn index(&self) -> NonZeroUsize {
        self.index
    }

    #[inline]
    pub fn total(&self) -> NonZeroUsize {
        self.total
    }

    /// 分片在数据源中的偏移量
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> u64 {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// 是否是最后一个分片
    #[inline]
    pub fn is_last_part(&self) -> bool {
        self.index == self.total
    }

    /// 转换为分片请求体，数据仍然是惰性读取的
    #[inline]
    pub fn into_body(self) -> PartBody {
        PartBody::from_seekable_source(self.source, self.file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::{super::MIN_CHUNK_SIZE, *};
    use anyhow::Result;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    fn splitter_of(size: u64, chunk_size: u64) -> Result<ChunkSplitter> {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        Ok(ChunkSplitter::from_source(
            Cursor::new(data),
            ChunkSize::new(chunk_size)?,
        )?)
    }

    #[test]
    fn test_chunk_count_and_sizes() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let size = 2 * MIN_CHUNK_SIZE + 12345;
        let splitter = splitter_of(size, MIN_CHUNK_SIZE)?;
        assert_eq!(splitter.chunk_count().get(), 3);

        let chunks: Vec<_> = splitter.chunks().collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|chunk| chunk.len()).collect::<Vec<_>>(),
            [MIN_CHUNK_SIZE, MIN_CHUNK_SIZE, 12345]
        );
        assert_eq!(
            chunks.iter().map(|chunk| chunk.index().get()).collect::<Vec<_>>(),
            [1, 2, 3]
        );
        assert_eq!(
            chunks.iter().map(|chunk| chunk.offset()).collect::<Vec<_>>(),
            [0, MIN_CHUNK_SIZE, 2 * MIN_CHUNK_SIZE]
        );
        assert!(chunks.iter().all(|chunk| chunk.total().get() == 3));
        assert_eq!(
            chunks.iter().filter(|chunk| chunk.is_last_part()).count(),
            1
        );
        assert!(chunks[2].is_last_part());
        assert_eq!(chunks.iter().map(|chunk| chunk.len()).sum::<u64>(), size);
        Ok(())
    }

    #[test]
    fn test_exact_multiple_gives_equal_chunks() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let splitter = splitter_of(2 * MIN_CHUNK_SIZE, MIN_CHUNK_SIZE)?;
        let chunks = splitter.chunks();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.map(|chunk| chunk.len()).all(|len| len == MIN_CHUNK_SIZE));
        Ok(())
    }

    #[test]
    fn test_chunks_are_restartable_and_lazy() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let size = MIN_CHUNK_SIZE + 10;
        let splitter = splitter_of(size, MIN_CHUNK_SIZE)?;
        let first_pass: Vec<_> = splitter.chunks().collect();
        let second_pass: Vec<_> = splitter.chunks().collect();
        assert_eq!(first_pass.len(), second_pass.len());

        let mut last = Vec::new();
        second_pass[1].to_owned().into_body().read_to_end(&mut last)?;
        assert_eq!(last.len(), 10);
        assert_eq!(last[0], (MIN_CHUNK_SIZE % 251) as u8);

        let mut first = Vec::new();
        first_pass[0].to_owned().into_body().read_to_end(&mut first)?;
        assert_eq!(first.len() as u64, MIN_CHUNK_SIZE);
        assert_eq!(&first[..3], &[0u8, 1, 2]);
        Ok(())
    }

    #[test]
    fn test_empty_source_is_rejected() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let file = NamedTempFile::new()?;
        match ChunkSplitter::open(file.path(), ChunkSize::default()) {
            Err(UploadError::EmptyFile { path }) => assert_eq!(path.as_deref(), Some(file.path())),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(matches!(
            ChunkSplitter::from_source(Cursor::new(Vec::new()), ChunkSize::default()),
            Err(UploadError::EmptyFile { path: None })
        ));
        Ok(())
    }

    #[test]
    fn test_open_file_uses_file_name() -> Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let mut file = NamedTempFile::new()?;
        file.write_all(b"hello world")?;
        file.flush()?;
        let splitter = ChunkSplitter::open(file.path(), ChunkSize::default())?;
        assert_eq!(splitter.size(), 11);
        let chunk = splitter.chunks().next().unwrap();
        assert!(chunk.is_last_part());
        let body = chunk.into_body();
        assert_eq!(
            body.file_name(),
            file.path().file_name().and_then(|name| name.to_str())
        );
        Ok(())
    }
}
