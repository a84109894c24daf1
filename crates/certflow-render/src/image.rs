//! 模板图片头解析：只读取 PNG / JPEG 的像素尺寸

/// 图片格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
}

impl ImageKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageKind::Png => "image/png",
            ImageKind::Jpeg => "image/jpeg",
        }
    }
}

/// 图片基本信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    pub kind: ImageKind,
    pub width: u32,
    pub height: u32,
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// 从文件头解析格式与尺寸，无法识别时返回 None
pub fn probe(bytes: &[u8]) -> Option<ImageInfo> {
    if bytes.starts_with(&PNG_SIGNATURE) {
        probe_png(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        probe_jpeg(bytes)
    } else {
        None
    }
}

fn probe_png(bytes: &[u8]) -> Option<ImageInfo> {
    // 签名后第一个块必须是 IHDR：长度(4) + 类型(4) + 宽(4) + 高(4)
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    let width = read_u32_be(bytes, 16)?;
    let height = read_u32_be(bytes, 20)?;
    if width == 0 || height == 0 {
        return None;
    }

    Some(ImageInfo {
        kind: ImageKind::Png,
        width,
        height,
    })
}

fn probe_jpeg(bytes: &[u8]) -> Option<ImageInfo> {
    let mut pos = 2;

    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];

        // 填充字节
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // 无长度字段的标记
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let length = read_u16_be(bytes, pos + 2)? as usize;
        if length < 2 {
            return None;
        }

        // SOF0..SOF15，排除 DHT(C4) / JPG(C8) / DAC(CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let height = read_u16_be(bytes, pos + 5)? as u32;
            let width = read_u16_be(bytes, pos + 7)? as u32;
            if width == 0 || height == 0 {
                return None;
            }
            return Some(ImageInfo {
                kind: ImageKind::Jpeg,
                width,
                height,
            });
        }

        // SOS 之后是压缩数据
        if marker == 0xDA {
            return None;
        }

        pos += 2 + length;
    }

    None
}

fn read_u32_be(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_u16_be(bytes: &[u8], offset: usize) -> Option<u16> {
    let slice = bytes.get(offset..offset + 2)?;
    Some(u16::from_be_bytes([slice[0], slice[1]]))
}
