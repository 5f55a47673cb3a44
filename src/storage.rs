//! The storage module, defining how authentication keys are laid out on disk.
// 中文: 存储模块，定义认证密钥在磁盘上的布局。

pub mod key_store;
mod rollback;

pub use key_store::KeyStore;
