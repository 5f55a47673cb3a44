//! 密钥标识：名称、类型以及 `"name/type"` 文本形式

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 密钥名称的最大字节数
pub const MAX_KEY_NAME_LEN: usize = 64;

/// 密钥类型，决定使用哪个根目录以及密钥对的哪一半
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Public,
    Private,
}

impl KeyType {
    /// 所有类型，按列表输出顺序排列
    pub const ALL: [KeyType; 2] = [KeyType::Public, KeyType::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Public => "public",
            KeyType::Private => "private",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(KeyType::Public),
            "private" => Ok(KeyType::Private),
            other => Err(Error::InvalidIdentity {
                name: other.to_string(),
                reason: "key type must be \"public\" or \"private\"".to_string(),
            }),
        }
    }
}

/// 经过校验的密钥名称（角色或用户组），可安全地用作单个路径段
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyName(String);

impl KeyName {
    /// 校验并构造名称
    ///
    /// 合法名称非空，不以 `.` 开头，只包含 ASCII 字母、数字、`-` 和 `_`。
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let reject = |reason: &str| Error::InvalidIdentity {
            name: name.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(reject("name must not be empty"));
        }
        if name.len() > MAX_KEY_NAME_LEN {
            return Err(reject("name is too long"));
        }
        if name.starts_with('.') {
            return Err(reject("name must not start with a dot"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(reject(
                "only letters, digits, '-' and '_' are allowed",
            ));
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for KeyName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for KeyName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<KeyName> for String {
    fn from(name: KeyName) -> Self {
        name.0
    }
}

impl FromStr for KeyName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// 单个密钥文件的地址：`(name, type)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyIdentity {
    pub name: KeyName,
    pub key_type: KeyType,
}

impl KeyIdentity {
    pub fn new(name: KeyName, key_type: KeyType) -> Self {
        Self { name, key_type }
    }

    /// 导出时建议的文件名，例如 `teachers_public_key.pem`
    pub fn default_export_file_name(&self) -> String {
        format!("{}_{}_key.pem", self.name, self.key_type)
    }
}

impl fmt::Display for KeyIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.key_type)
    }
}

impl FromStr for KeyIdentity {
    type Err = Error;

    /// 解析列表中的 `"name/type"` 条目
    fn from_str(s: &str) -> Result<Self> {
        let (name, key_type) = s.split_once('/').ok_or_else(|| Error::InvalidIdentity {
            name: s.to_string(),
            reason: "expected \"<name>/<type>\"".to_string(),
        })?;

        Ok(Self {
            name: KeyName::new(name)?,
            key_type: key_type.parse()?,
        })
    }
}
