//! 文档条目：不做任何压缩或裁剪，只补齐名称与格式标识。

use bytes::Bytes;

use crate::model::{FileKind, FormatTag, NormalizedFile, OtherFile};

pub fn normalize_document(bytes: Bytes, name: String, extension: Option<String>) -> NormalizedFile {
    let format = FormatTag::resolve(extension.as_deref(), &bytes);
    NormalizedFile::new(name, FileKind::Other(OtherFile { data: bytes, format }))
}
