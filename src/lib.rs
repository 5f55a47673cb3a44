//! # authkeys: Host Authentication Key Store
//!
//! `authkeys` manages named RSA key pairs used to authorize remote-management
//! connections between a controller and managed hosts. Each key is addressed by
//! a `(name, type)` identity, where the name is a role or user group and the type
//! selects the public or private half.
//!
//! ## Core Concepts
//!
//! - **`KeyStore`**: owns the public and private root directories and creates,
//!   imports, exports, deletes, lists and classifies keys.
//! - **`KeyIdentity`**: the `"name/type"` address of one key file.
//! - **`Report`**: the `(success, title, message)` value a UI displays.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authkeys::{ConfigFile, KeyStore, KeyType, StorageConfig};
//!
//! fn main() -> authkeys::Result<()> {
//!     let config = ConfigFile {
//!         storage: StorageConfig::with_roots("/etc/authkeys/keys/public", "/etc/authkeys/keys/private"),
//!         ..Default::default()
//!     };
//!     let mut store = KeyStore::new(config)?;
//!
//!     store.create_key_pair("teachers")?;
//!     println!("{}", store.result_message());
//!
//!     store.export_key("teachers", KeyType::Public, "/tmp/teachers_public_key.pem", false)?;
//!     for key in store.list_keys() {
//!         println!("{key}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ---
//!
//! 本模块管理用于主机远程管理认证的 RSA 密钥对。

pub mod config;
pub mod error;
pub mod identity;
pub mod keys;
pub mod report;
pub mod service;
pub mod storage;

pub use config::{ConfigFile, CryptoConfig, StorageConfig};
pub use error::{Error, ErrorKind, Result};
pub use identity::{KeyIdentity, KeyName, KeyType};
pub use keys::{KeyClassification, KeyPairGenerator, PemKeyPair, RsaKeyPairGenerator};
pub use report::Report;
pub use service::{ServiceCommand, ServiceControl, ServiceQuery};
pub use storage::KeyStore;

/// The version of the `authkeys` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
