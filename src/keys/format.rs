//! PEM 格式的密钥识别与校验

use crate::error::{Error, Result};
use crate::identity::KeyType;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use zeroize::Zeroizing;

/// 类型检测时最多读取的字节数
pub const DETECT_PREFIX_LEN: usize = 4096;

/// 可导入的密钥文件最大字节数
pub const MAX_KEY_FILE_LEN: usize = 64 * 1024;

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_DASHES: &str = "-----";

/// SPKI 公钥标签
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
/// PKCS#8 私钥标签
pub const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const RSA_PUBLIC_KEY_LABEL: &str = "RSA PUBLIC KEY";
const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// 任意文件的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyClassification {
    Public,
    Private,
    Unknown,
}

impl KeyClassification {
    /// 已识别时返回对应的密钥类型
    pub fn key_type(self) -> Option<KeyType> {
        match self {
            KeyClassification::Public => Some(KeyType::Public),
            KeyClassification::Private => Some(KeyType::Private),
            KeyClassification::Unknown => None,
        }
    }
}

impl From<KeyType> for KeyClassification {
    fn from(key_type: KeyType) -> Self {
        match key_type {
            KeyType::Public => KeyClassification::Public,
            KeyType::Private => KeyClassification::Private,
        }
    }
}

/// 根据第一个 PEM `BEGIN` 标签对数据进行分类
///
/// 非 UTF-8 字节被宽松替换，因此任意二进制输入都只会得到 `Unknown`。
pub fn classify(data: &[u8]) -> KeyClassification {
    let text = String::from_utf8_lossy(data);
    let Some(start) = text.find(PEM_BEGIN) else {
        return KeyClassification::Unknown;
    };

    let rest = &text[start + PEM_BEGIN.len()..];
    let Some(end) = rest.find(PEM_DASHES) else {
        return KeyClassification::Unknown;
    };

    match &rest[..end] {
        PUBLIC_KEY_LABEL | RSA_PUBLIC_KEY_LABEL => KeyClassification::Public,
        PRIVATE_KEY_LABEL | RSA_PRIVATE_KEY_LABEL => KeyClassification::Private,
        _ => KeyClassification::Unknown,
    }
}

/// 读取文件的有限前缀并分类
///
/// 只有文件不存在或无法打开时才返回错误；读取失败、空文件或无法识别的内容都返回 `Unknown`。
/// 目录、FIFO、设备等非普通文件不会被打开，直接返回 `Unknown`。
pub fn detect_file(path: &Path) -> io::Result<KeyClassification> {
    if !fs::metadata(path)?.is_file() {
        return Ok(KeyClassification::Unknown);
    }
    let file = File::open(path)?;
    let mut prefix = Vec::with_capacity(DETECT_PREFIX_LEN);
    if file.take(DETECT_PREFIX_LEN as u64).read_to_end(&mut prefix).is_err() {
        return Ok(KeyClassification::Unknown);
    }
    Ok(classify(&prefix))
}

/// 读取待导入的密钥文件，超过 `MAX_KEY_FILE_LEN` 时拒绝
pub fn read_key_file(path: &Path) -> Result<Zeroizing<Vec<u8>>> {
    let metadata = fs::metadata(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("cannot open key file {}: {}", path.display(), e),
        ))
    })?;
    if !metadata.is_file() {
        return Err(rejected(path, "not a regular file".to_string()));
    }

    let file = File::open(path).map_err(|e| {
        Error::Io(io::Error::new(
            e.kind(),
            format!("cannot open key file {}: {}", path.display(), e),
        ))
    })?;

    let mut data = Zeroizing::new(Vec::new());
    file.take(MAX_KEY_FILE_LEN as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|e| {
            Error::Io(io::Error::new(
                e.kind(),
                format!("cannot read key file {}: {}", path.display(), e),
            ))
        })?;

    if data.len() > MAX_KEY_FILE_LEN {
        return Err(rejected(path, format!("file is larger than {} bytes", MAX_KEY_FILE_LEN)));
    }

    Ok(data)
}

/// 校验数据确实是指定类型的 RSA 密钥
///
/// 依次检查：非空、UTF-8、PEM 标签与类型一致、能被解码。
pub fn validate_key_material(data: &[u8], key_type: KeyType, path: &Path) -> Result<()> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Err(rejected(path, "file is empty".to_string()));
    }

    let text = std::str::from_utf8(data)
        .map_err(|_| rejected(path, "file is not a text PEM file".to_string()))?;

    match classify(data) {
        KeyClassification::Unknown => {
            return Err(rejected(path, "no PEM key header found".to_string()));
        }
        found if found != KeyClassification::from(key_type) => {
            return Err(rejected(
                path,
                format!("file contains a {} key, not a {} key", other_type(key_type), key_type),
            ));
        }
        _ => {}
    }

    let decoded = match key_type {
        KeyType::Public => decode_public_key(text).map(|_| ()),
        KeyType::Private => decode_private_key(text).map(|_| ()),
    };
    decoded.map_err(|reason| rejected(path, reason))
}

/// 从私钥 PEM 推导 SPKI 格式的公钥 PEM
pub fn public_pem_from_private(private_pem: &str) -> std::result::Result<String, String> {
    let private_key = decode_private_key(private_pem)?;
    RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| format!("cannot encode public key: {}", e))
}

fn decode_public_key(pem: &str) -> std::result::Result<RsaPublicKey, String> {
    RsaPublicKey::from_public_key_pem(pem)
        .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
        .map_err(|e| format!("invalid RSA public key: {}", e))
}

fn decode_private_key(pem: &str) -> std::result::Result<RsaPrivateKey, String> {
    RsaPrivateKey::from_pkcs8_pem(pem)
        .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
        .map_err(|e| format!("invalid RSA private key: {}", e))
}

fn other_type(key_type: KeyType) -> KeyType {
    match key_type {
        KeyType::Public => KeyType::Private,
        KeyType::Private => KeyType::Public,
    }
}

fn rejected(path: &Path, reason: String) -> Error {
    Error::FormatRejected {
        path: path.display().to_string(),
        reason,
    }
}
