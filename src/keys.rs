//! # Key Material Module
//!
//! PEM serialization markers, bounded-prefix key type detection, structural
//! validation of imported key files, and RSA key pair generation.
//!
//! ---
//!
//! # 密钥材料模块
//!
//! 包含 PEM 标记、基于有限前缀的类型检测、导入文件的结构校验以及 RSA 密钥对生成。

pub mod format;
pub mod generator;

pub use format::{DETECT_PREFIX_LEN, KeyClassification, MAX_KEY_FILE_LEN};
pub use generator::{KeyPairGenerator, PemKeyPair, RsaKeyPairGenerator};
