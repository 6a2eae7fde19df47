use super::request::RequestBody;
use assert_impl::assert_impl;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use mime::Mime;
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::random;
use regex::Regex;
use std::{
    collections::VecDeque,
    fmt,
    io::{Cursor, Read, Result as IoResult},
};

/// Multipart 表单
///
/// 字段按照添加的顺序编码
#[derive(Debug)]
pub struct Multipart<'a> {
    boundary: String,
    fields: VecDeque<(String, Part<'a>)>,
}

impl Default for Multipart<'_> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Multipart<'a> {
    /// 创建 Multipart 表单
    #[inline]
    pub fn new() -> Self {
        Self {
            boundary: gen_boundary(),
            fields: Default::default(),
        }
    }

    /// 获取分隔符
    #[inline]
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    /// 获取表单的 Content-Type
    #[inline]
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// 获取表单字段名称列表
    #[inline]
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// 添加 Multipart 表单组件
    #[inline]
    #[must_use]
    pub fn add_part(mut self, name: impl Into<String>, part: Part<'a>) -> Self {
        self.fields.push_back((name.into(), part));
        self
    }

    /// 将表单编码为请求体
    ///
    /// 请求体长度在编码前即可确定
    pub fn into_request_body(self) -> RequestBody<'a> {
        let mut reader = MultipartReader::default();
        for (name, part) in self.fields {
            let mut header = format!("--{}\r\n", self.boundary).into_bytes();
            header.extend_from_slice(&encode_headers(&name, &part.meta));
            header.extend_from_slice(b"\r\n\r\n");
            reader.append_bytes(header);
            reader.append(part.body, part.size);
            reader.append_bytes(b"\r\n".to_vec());
        }
        reader.append_bytes(format!("--{}--\r\n", self.boundary).into_bytes());
        let size = reader.size;
        RequestBody::from_reader(reader, size)
    }

    #[allow(dead_code)]
    fn ignore() {
        assert_impl!(Send: Self);
    }
}

/// Multipart 表单组件
pub struct Part<'a> {
    meta: PartMetadata,
    body: Box<dyn Read + Send + 'a>,
    size: u64,
}

impl<'a> Part<'a> {
    /// 设置 Multipart 的请求体为字符串
    #[inline]
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::bytes(value.into().into_bytes())
    }

    /// 设置 Multipart 的请求体为内存数据
    #[inline]
    #[must_use]
    pub fn bytes(value: impl Into<Vec<u8>>) -> Self {
        let value = value.into();
        let size = value.len() as u64;
        Self::stream(Cursor::new(value), size)
    }

    /// 设置 Multipart 的请求体为输入流
    ///
    /// 输入流必须恰好提供 `size` 字节的数据
    #[inline]
    #[must_use]
    pub fn stream(reader: impl Read + Send + 'a, size: u64) -> Self {
        Self {
            meta: Default::default(),
            body: Box::new(reader),
            size,
        }
    }

    /// 设置 Multipart 表单组件的元信息
    #[inline]
    #[must_use]
    pub fn metadata(mut self, metadata: PartMetadata) -> Self {
        self.meta = metadata;
        self
    }

    /// 获取表单组件的数据长度
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Debug for Part<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Part")
            .field("meta", &self.meta)
            .field("size", &self.size)
            .finish()
    }
}

/// Multipart 表单组件元信息
#[derive(Default, Debug, Clone)]
pub struct PartMetadata {
    headers: HeaderMap,
    file_name: Option<String>,
}

impl PartMetadata {
    /// 设置表单组件的 MIME 类型
    #[inline]
    #[must_use]
    pub fn mime(self, mime: Mime) -> Self {
        match HeaderValue::from_str(mime.as_ref()) {
            Ok(value) => self.add_header(CONTENT_TYPE, value),
            Err(_) => self,
        }
    }

    /// 添加表单组件的 HTTP 头
    #[inline]
    #[must_use]
    pub fn add_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 设置表单组件的文件名
    #[inline]
    #[must_use]
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

#[derive(Default)]
struct MultipartReader<'a> {
    readers: VecDeque<Box<dyn Read + Send + 'a>>,
    size: u64,
}

impl<'a> MultipartReader<'a> {
    fn append_bytes(&mut self, bytes: Vec<u8>) {
        let size = bytes.len() as u64;
        self.append(Box::new(Cursor::new(bytes)), size);
    }

    fn append(&mut self, reader: Box<dyn Read + Send + 'a>, size: u64) {
        self.readers.push_back(reader);
        self.size += size;
    }
}

impl Read for MultipartReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> IoResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while let Some(reader) = self.readers.front_mut() {
            match reader.read(buf)? {
                0 => {
                    self.readers.pop_front();
                }
                n => return Ok(n),
            }
        }
        Ok(0)
    }
}

fn gen_boundary() -> String {
    format!("{:016x}{:016x}", random::<u64>(), random::<u64>())
}

fn encode_headers(name: &str, field: &PartMetadata) -> Vec<u8> {
    let mut buf = b"content-disposition: form-data; ".to_vec();
    buf.extend_from_slice(&format_parameter("name", name));
    if let Some(file_name) = field.file_name.as_ref() {
        buf.extend_from_slice(b"; ");
        buf.extend_from_slice(format_file_name(file_name).as_bytes());
    }
    for (name, value) in field.headers.iter() {
        buf.extend_from_slice(b"\r\n");
        buf.extend_from_slice(name.as_str().as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
    }
    buf
}

fn format_file_name(file_name: &str) -> String {
    static REGEX: Lazy<Regex> = Lazy::new(|| Regex::new("\\\\|\"|\r|\n").unwrap());
    let mut formatted = String::from("filename=\"");
    let mut last_match = 0;
    for m in REGEX.find_iter(file_name) {
        formatted.push_str(&file_name[last_match..m.start()]);
        match m.as_str() {
            "\\" => formatted.push_str("\\\\"),
            "\"" => formatted.push_str("\\\""),
            "\r" => formatted.push_str("\\\r"),
            _ => formatted.push_str("\\\n"),
        }
        last_match = m.end();
    }
    formatted.push_str(&file_name[last_match..]);
    formatted.push('"');
    formatted
}

const PATH_SEGMENT_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

fn format_parameter(name: &str, value: &str) -> Vec<u8> {
    let legal_value = utf8_percent_encode(value, PATH_SEGMENT_ENCODE_SET).to_string();
    let mut formatted = name.as_bytes().to_vec();
    if value.len() == legal_value.len() {
        formatted.extend_from_slice(b"=\"");
        formatted.extend_from_slice(value.as_bytes());
        formatted.extend_from_slice(b"\"");
    } else {
        formatted.extend_from_slice(b"*=utf-8''");
        formatted.extend_from_slice(legal_value.as_bytes());
    };
    formatted
}
