use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::{ConfigFile, CryptoConfig, StorageConfig};
use crate::error::{Error, Result};
use crate::identity::{KeyIdentity, KeyName, KeyType};
use crate::keys::format::{self, KeyClassification};
use crate::keys::{KeyPairGenerator, RsaKeyPairGenerator};
use crate::storage::rollback::Rollback;

/// 向刚创建的文件写入数据；参数依次为文件路径、文件句柄和数据
pub(crate) type WriteData = fn(&Path, &mut File, &[u8]) -> io::Result<()>;

fn write_data(_path: &Path, file: &mut File, data: &[u8]) -> io::Result<()> {
    file.write_all(data)
}

/// 认证密钥存储
///
/// 管理两个根目录下的密钥文件：
/// `public_key_base_dir/<name>/<key_file_name>` 与 `private_key_base_dir/<name>/<key_file_name>`。
/// 所有状态都在文件系统中，每次操作直接读写文件；根目录本身由配置提供，存储从不创建或删除它们。
///
/// 每个可能失败的操作都会覆盖 `result_message()`，供 UI 展示。
/// 操作需要 `&mut self`，同一实例不能被并发调用。
pub struct KeyStore<G = RsaKeyPairGenerator> {
    storage: StorageConfig,
    crypto: CryptoConfig,
    generator: G,
    result_message: String,
    write_data: WriteData,
}

impl KeyStore<RsaKeyPairGenerator> {
    /// 使用默认的 RSA 生成器创建密钥存储
    pub fn new(config: ConfigFile) -> Result<Self> {
        Self::with_generator(config, RsaKeyPairGenerator)
    }
}

impl<G: KeyPairGenerator> KeyStore<G> {
    /// 使用自定义的密钥对生成器创建密钥存储
    pub fn with_generator(config: ConfigFile, generator: G) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            storage: config.storage,
            crypto: config.crypto,
            generator,
            result_message: String::new(),
            write_data,
        })
    }

    /// 最近一次操作的说明（成功详情或失败原因）
    pub fn result_message(&self) -> &str {
        &self.result_message
    }

    /// 指定类型的根目录
    pub fn base_dir(&self, key_type: KeyType) -> &Path {
        match key_type {
            KeyType::Public => &self.storage.public_key_base_dir,
            KeyType::Private => &self.storage.private_key_base_dir,
        }
    }

    /// 密钥文件在磁盘上的位置
    pub fn key_file_path(&self, identity: &KeyIdentity) -> PathBuf {
        self.entry_dir(identity).join(&self.storage.key_file_name)
    }

    fn entry_dir(&self, identity: &KeyIdentity) -> PathBuf {
        self.base_dir(identity.key_type).join(identity.name.as_str())
    }

    fn entry_exists(&self, identity: &KeyIdentity) -> bool {
        fs::symlink_metadata(self.key_file_path(identity)).is_ok()
    }

    /// 列出所有存在的密钥，格式为 `"<name>/<type>"`
    ///
    /// 按名称排序，同名时公钥在前。根目录不存在时视为空。
    pub fn list_keys(&self) -> Vec<String> {
        self.list_identities()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// 与 `list_keys` 相同的快照，以标识值的形式返回
    pub fn list_identities(&self) -> Vec<KeyIdentity> {
        let mut identities = Vec::new();

        for key_type in KeyType::ALL {
            let root = self.base_dir(key_type);
            let entries = match fs::read_dir(root) {
                Ok(entries) => entries,
                Err(e) => {
                    debug!(root = %root.display(), error = %e, "skipping unreadable key directory");
                    continue;
                }
            };

            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_dir() {
                    continue;
                }

                let Some(name) = entry
                    .file_name()
                    .to_str()
                    .and_then(|name| KeyName::new(name).ok())
                else {
                    continue;
                };

                let key_file = path.join(&self.storage.key_file_name);
                if key_file.is_file() && File::open(&key_file).is_ok() {
                    identities.push(KeyIdentity::new(name, key_type));
                }
            }
        }

        identities.sort();
        debug!(count = identities.len(), "listed authentication keys");
        identities
    }

    /// 创建新的密钥对
    ///
    /// 任一半已存在时失败；写入过程中出错会删除本次创建的所有文件和目录。
    pub fn create_key_pair(&mut self, name: &str) -> Result<()> {
        let result = self.create_key_pair_inner(name);
        self.record("create key pair", result)
    }

    fn create_key_pair_inner(&self, name: &str) -> Result<String> {
        let name = KeyName::new(name)?;
        let public = KeyIdentity::new(name.clone(), KeyType::Public);
        let private = KeyIdentity::new(name.clone(), KeyType::Private);

        for identity in [&public, &private] {
            if self.entry_exists(identity) {
                return Err(Error::AlreadyExists(identity.to_string()));
            }
        }

        let pair = self.generator.generate(&self.crypto)?;

        let mut rollback = Rollback::default();
        self.write_entry(&mut rollback, &public, pair.public_pem.as_bytes())?;
        self.write_entry(&mut rollback, &private, pair.private_pem.as_bytes())?;
        rollback.commit();

        Ok(format!(
            "Key pair for \"{}\" has been created successfully.",
            name
        ))
    }

    /// 删除单个密钥文件，不影响另一半
    pub fn delete_key(&mut self, name: &str, key_type: KeyType) -> Result<()> {
        let result = self.delete_key_inner(name, key_type);
        self.record("delete key", result)
    }

    fn delete_key_inner(&self, name: &str, key_type: KeyType) -> Result<String> {
        let identity = KeyIdentity::new(KeyName::new(name)?, key_type);
        let path = self.key_file_path(&identity);

        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(identity.to_string()));
            }
            Err(e) => return Err(io_context(e, "cannot delete key file", &path)),
        }

        // 只有目录为空时才会成功，失败无关紧要
        let _ = fs::remove_dir(self.entry_dir(&identity));

        Ok(format!("Key \"{}\" has been deleted successfully.", identity))
    }

    /// 从外部文件导入密钥
    ///
    /// 目标已存在时拒绝（不会静默覆盖）；源文件必须是所声明类型的 PEM 格式 RSA 密钥。
    pub fn import_key(
        &mut self,
        name: &str,
        key_type: KeyType,
        source: impl AsRef<Path>,
    ) -> Result<()> {
        let result = self.import_key_inner(name, key_type, source.as_ref());
        self.record("import key", result)
    }

    fn import_key_inner(&self, name: &str, key_type: KeyType, source: &Path) -> Result<String> {
        let identity = KeyIdentity::new(KeyName::new(name)?, key_type);
        if self.entry_exists(&identity) {
            return Err(Error::AlreadyExists(identity.to_string()));
        }

        let data = format::read_key_file(source)?;
        format::validate_key_material(&data, key_type, source)?;

        let mut rollback = Rollback::default();
        self.write_entry(&mut rollback, &identity, &data)?;
        rollback.commit();

        Ok(format!("Key \"{}\" has been imported successfully.", identity))
    }

    /// 将存储中的密钥复制到目标文件
    ///
    /// 目标文件权限由系统默认值决定，保护导出的私钥是调用方的责任。
    /// `overwrite` 为 `false` 时拒绝覆盖已存在的文件。
    pub fn export_key(
        &mut self,
        name: &str,
        key_type: KeyType,
        destination: impl AsRef<Path>,
        overwrite: bool,
    ) -> Result<()> {
        let result = self.export_key_inner(name, key_type, destination.as_ref(), overwrite);
        self.record("export key", result)
    }

    fn export_key_inner(
        &self,
        name: &str,
        key_type: KeyType,
        destination: &Path,
        overwrite: bool,
    ) -> Result<String> {
        let identity = KeyIdentity::new(KeyName::new(name)?, key_type);
        let path = self.key_file_path(&identity);

        let data = match fs::read(&path) {
            Ok(data) => Zeroizing::new(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(identity.to_string()));
            }
            Err(e) => return Err(io_context(e, "cannot read key file", &path)),
        };

        let mut rollback = Rollback::default();
        if overwrite {
            // 先写入同目录下的临时文件，成功后再重命名，失败时原文件保持不变
            let temp_path = export_temp_path(destination);
            rollback
                .create_file(&temp_path, None, |file| (self.write_data)(destination, file, &data))
                .map_err(|e| io_context(e, "cannot write output file", destination))?;
            fs::rename(&temp_path, destination)
                .map_err(|e| io_context(e, "cannot replace output file", destination))?;
        } else {
            rollback
                .create_file(destination, None, |file| (self.write_data)(destination, file, &data))
                .map_err(|e| io_context(e, "cannot write output file", destination))?;
        }
        rollback.commit();

        let mut message = format!(
            "Key \"{}\" has been exported to \"{}\" successfully.",
            identity,
            destination.display()
        );
        if key_type == KeyType::Private {
            message.push_str(
                " The exported private key is not protected by restrictive file permissions; \
                 keep it in a safe place.",
            );
        }
        Ok(message)
    }

    /// 检测任意文件包含的密钥类型
    ///
    /// 无法识别不是错误，返回 `Unknown`；只有文件无法打开时才返回错误。
    pub fn detect_key_type(&mut self, path: impl AsRef<Path>) -> Result<KeyClassification> {
        let path = path.as_ref();
        match format::detect_file(path) {
            Ok(classification) => {
                self.result_message = match classification.key_type() {
                    Some(key_type) => {
                        format!("\"{}\" contains a {} key.", path.display(), key_type)
                    }
                    None => format!(
                        "The type of the key in \"{}\" could not be determined.",
                        path.display()
                    ),
                };
                debug!(path = %path.display(), ?classification, "detected key type");
                Ok(classification)
            }
            Err(e) => {
                let err = io_context(e, "cannot open key file", path);
                self.result_message = err.to_string();
                warn!(path = %path.display(), error = %err, "key type detection failed");
                Err(err)
            }
        }
    }

    /// 从已存储的私钥推导并写入同名公钥
    pub fn extract_public_key(&mut self, name: &str) -> Result<()> {
        let result = self.extract_public_key_inner(name);
        self.record("extract public key", result)
    }

    fn extract_public_key_inner(&self, name: &str) -> Result<String> {
        let name = KeyName::new(name)?;
        let private = KeyIdentity::new(name.clone(), KeyType::Private);
        let public = KeyIdentity::new(name, KeyType::Public);

        if self.entry_exists(&public) {
            return Err(Error::AlreadyExists(public.to_string()));
        }

        let private_path = self.key_file_path(&private);
        let private_pem = match fs::read_to_string(&private_path) {
            Ok(pem) => Zeroizing::new(pem),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::NotFound(private.to_string()));
            }
            Err(e) => return Err(io_context(e, "cannot read key file", &private_path)),
        };

        let public_pem = format::public_pem_from_private(&private_pem).map_err(|reason| {
            Error::FormatRejected {
                path: private_path.display().to_string(),
                reason,
            }
        })?;

        let mut rollback = Rollback::default();
        self.write_entry(&mut rollback, &public, public_pem.as_bytes())?;
        rollback.commit();

        Ok(format!(
            "Public key \"{}\" has been extracted from \"{}\" successfully.",
            public, private
        ))
    }

    /// 在回滚守卫下写入一个条目：必要时创建名称目录，再独占创建密钥文件
    fn write_entry(
        &self,
        rollback: &mut Rollback,
        identity: &KeyIdentity,
        data: &[u8],
    ) -> Result<()> {
        let root = self.base_dir(identity.key_type);
        if !root.is_dir() {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("key base directory {} does not exist", root.display()),
            )));
        }

        let dir = self.entry_dir(identity);
        rollback
            .create_dir_if_absent(&dir)
            .map_err(|e| io_context(e, "cannot create key directory", &dir))?;

        let path = dir.join(&self.storage.key_file_name);
        let mode = match identity.key_type {
            KeyType::Private => Some(self.storage.private_key_permissions),
            KeyType::Public => None,
        };

        let write = |file: &mut File| (self.write_data)(&path, file, data);
        rollback.create_file(&path, mode, write).map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::AlreadyExists(identity.to_string())
            } else {
                io_context(e, "cannot write key file", &path)
            }
        })
    }

    /// 记录操作结果并写日志
    fn record(&mut self, operation: &str, result: Result<String>) -> Result<()> {
        match result {
            Ok(message) => {
                info!(operation, "{}", message);
                self.result_message = message;
                Ok(())
            }
            Err(err) => {
                warn!(operation, error = %err, "operation failed");
                self.result_message = err.to_string();
                Err(err)
            }
        }
    }
}

fn io_context(e: io::Error, what: &str, path: &Path) -> Error {
    Error::Io(io::Error::new(
        e.kind(),
        format!("{} {}: {}", what, path.display(), e),
    ))
}

/// 覆盖导出时使用的临时文件，与目标位于同一目录以保证重命名是原子的
fn export_temp_path(destination: &Path) -> PathBuf {
    let file_name = destination
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()))
}
