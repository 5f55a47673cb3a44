//!
//! # 配置模块
//!
//! 包含密钥存储所使用的配置结构。
//! 根目录由外部配置提供，存储本身从不创建或删除它们。
//!
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 允许的最小 RSA 密钥位数
pub const MIN_RSA_KEY_BITS: usize = 2048;

/// 存储配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// 公钥根目录
    pub public_key_base_dir: PathBuf,
    /// 私钥根目录
    pub private_key_base_dir: PathBuf,
    /// 每个名称目录下的密钥文件名
    pub key_file_name: String,
    /// 私钥文件权限（Unix文件模式，如0o600）
    pub private_key_permissions: u32,
}

impl StorageConfig {
    /// 使用给定的两个根目录，其余字段取默认值
    pub fn with_roots(
        public_key_base_dir: impl Into<PathBuf>,
        private_key_base_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            public_key_base_dir: public_key_base_dir.into(),
            private_key_base_dir: private_key_base_dir.into(),
            ..Self::default()
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_key_base_dir: PathBuf::from("/etc/authkeys/keys/public"),
            private_key_base_dir: PathBuf::from("/etc/authkeys/keys/private"),
            key_file_name: "key".to_string(),
            private_key_permissions: 0o600, // 等同于 -rw-------
        }
    }
}

/// 加密配置
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CryptoConfig {
    /// RSA密钥位数
    pub rsa_key_bits: usize,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self { rsa_key_bits: 4096 }
    }
}

/// 完整配置文件
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfigFile {
    /// 存储配置
    #[serde(default)]
    pub storage: StorageConfig,
    /// 加密配置
    #[serde(default)]
    pub crypto: CryptoConfig,
}

impl ConfigFile {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("cannot read configuration file {}: {}", path.display(), e),
            ))
        })?;
        let config: ConfigFile = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 用环境变量覆盖配置项
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup("AUTHKEYS_PUBLIC_KEY_BASE_DIR") {
            self.storage.public_key_base_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup("AUTHKEYS_PRIVATE_KEY_BASE_DIR") {
            self.storage.private_key_base_dir = PathBuf::from(value);
        }

        if let Some(value) = lookup("AUTHKEYS_KEY_FILE_NAME") {
            self.storage.key_file_name = value;
        }

        if let Some(value) = lookup("AUTHKEYS_PRIVATE_KEY_PERMISSIONS") {
            let digits = value.trim_start_matches("0o");
            self.storage.private_key_permissions = u32::from_str_radix(digits, 8).map_err(|e| {
                Error::Configuration(format!("AUTHKEYS_PRIVATE_KEY_PERMISSIONS: {}", e))
            })?;
        }

        if let Some(value) = lookup("AUTHKEYS_RSA_BITS") {
            self.crypto.rsa_key_bits = value
                .parse()
                .map_err(|e| Error::Configuration(format!("AUTHKEYS_RSA_BITS: {}", e)))?;
        }

        self.validate()
    }

    /// 校验配置是否可用
    pub fn validate(&self) -> Result<()> {
        if self.crypto.rsa_key_bits < MIN_RSA_KEY_BITS {
            return Err(Error::Configuration(format!(
                "rsa_key_bits must be at least {}, got {}",
                MIN_RSA_KEY_BITS, self.crypto.rsa_key_bits
            )));
        }

        let file_name = self.storage.key_file_name.as_str();
        if file_name.is_empty()
            || file_name.starts_with('.')
            || file_name.contains(['/', '\\'])
        {
            return Err(Error::Configuration(format!(
                "key_file_name \"{}\" is not a plain file name",
                file_name
            )));
        }

        let permissions = self.storage.private_key_permissions;
        if permissions & !0o777 != 0 {
            return Err(Error::Configuration(format!(
                "private_key_permissions {:o} is not a plain permission mode",
                permissions
            )));
        }
        if permissions & 0o077 != 0 {
            return Err(Error::Configuration(format!(
                "private_key_permissions {:o} grants access to group or others",
                permissions
            )));
        }
        // 所有者不可读时新建的私钥不会出现在列表中
        if permissions & 0o400 == 0 {
            return Err(Error::Configuration(format!(
                "private_key_permissions {:o} does not let the owner read the key",
                permissions
            )));
        }

        if self.storage.public_key_base_dir == self.storage.private_key_base_dir {
            return Err(Error::Configuration(
                "public and private key base directories must differ".to_string(),
            ));
        }

        Ok(())
    }
}
