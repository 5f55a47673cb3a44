//!
//! 集成测试的通用辅助函数
//!

use authkeys::{
    ConfigFile, CryptoConfig, KeyPairGenerator, KeyStore, PemKeyPair, RsaKeyPairGenerator,
    StorageConfig,
};
use std::fs;
use std::sync::OnceLock;
use tempfile::TempDir;

/// 每个测试进程只生成一次的 2048 位密钥对
pub fn shared_pair() -> PemKeyPair {
    static PAIR: OnceLock<PemKeyPair> = OnceLock::new();
    PAIR.get_or_init(|| {
        RsaKeyPairGenerator
            .generate(&CryptoConfig { rsa_key_bits: 2048 })
            .unwrap()
    })
    .clone()
}

/// 返回共享密钥对的生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct SharedKeyPairGenerator;

impl KeyPairGenerator for SharedKeyPairGenerator {
    fn generate(&self, _config: &CryptoConfig) -> authkeys::Result<PemKeyPair> {
        Ok(shared_pair())
    }
}

/// 在临时目录中创建两个根目录以及对应的密钥存储
pub fn setup_store() -> (KeyStore<SharedKeyPairGenerator>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let public_dir = dir.path().join("keys").join("public");
    let private_dir = dir.path().join("keys").join("private");
    fs::create_dir_all(&public_dir).unwrap();
    fs::create_dir_all(&private_dir).unwrap();

    let config = ConfigFile {
        storage: StorageConfig::with_roots(public_dir, private_dir),
        crypto: CryptoConfig { rsa_key_bits: 2048 },
    };
    let store = KeyStore::with_generator(config, SharedKeyPairGenerator).unwrap();
    (store, dir)
}
