//! Defines the result value handed from the key store to a user interface.
//!
//! 定义密钥存储交给用户界面的结果值。

use crate::error::Result;
use crate::keys::KeyPairGenerator;
use crate::storage::KeyStore;
use serde::Serialize;

/// Title used when creating a key pair.
pub const TITLE_CREATE: &str = "Create key pair";
/// Title used when deleting a key.
pub const TITLE_DELETE: &str = "Delete authentication key";
/// Title used when importing a key.
pub const TITLE_IMPORT: &str = "Import authentication key";
/// Title used when exporting a key.
pub const TITLE_EXPORT: &str = "Export authentication key";
/// Title used when extracting a public key.
pub const TITLE_EXTRACT: &str = "Extract public key";

/// The outcome of one operation, ready for display.
///
/// 一次操作的结果，可直接展示。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Whether the operation succeeded; selects an informational or error notification.
    ///
    /// 操作是否成功；决定使用普通提示还是错误提示。
    pub success: bool,
    pub title: String,
    pub message: String,
}

impl Report {
    /// Builds a report from an operation's result and the store's last message.
    ///
    /// 根据操作结果和存储的最近消息构造报告。
    pub fn from_store<T, G: KeyPairGenerator>(
        title: &str,
        result: &Result<T>,
        store: &KeyStore<G>,
    ) -> Self {
        Self {
            success: result.is_ok(),
            title: title.to_string(),
            message: store.result_message().to_string(),
        }
    }

    /// The report shown when an operation needs a selected key but none was given.
    ///
    /// 需要选中密钥但未提供时的报告。
    pub fn missing_selection(title: &str) -> Self {
        let action = if title == TITLE_EXPORT { "export" } else { "delete" };
        Self {
            success: false,
            title: title.to_string(),
            message: format!("Please select a key to {}!", action),
        }
    }

    /// Reports with an empty message are not displayed at all.
    ///
    /// 消息为空的报告不展示。
    pub fn should_display(&self) -> bool {
        !self.message.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, CryptoConfig, StorageConfig};
    use crate::identity::KeyType;
    use crate::keys::generator::test_support::CachedKeyPairGenerator;
    use tempfile::tempdir;

    #[test]
    fn empty_message_is_suppressed() {
        let report = Report {
            success: true,
            title: TITLE_CREATE.to_string(),
            message: String::new(),
        };
        assert!(!report.should_display());
    }

    #[test]
    fn missing_selection_messages() {
        assert_eq!(
            Report::missing_selection(TITLE_DELETE).message,
            "Please select a key to delete!"
        );
        let report = Report::missing_selection(TITLE_EXPORT);
        assert_eq!(report.message, "Please select a key to export!");
        assert!(!report.success);
    }

    #[test]
    fn report_follows_store_outcome() {
        let dir = tempdir().unwrap();
        let config = ConfigFile {
            storage: StorageConfig::with_roots(dir.path().join("pub"), dir.path().join("priv")),
            crypto: CryptoConfig::default(),
        };
        let mut store = KeyStore::with_generator(config, CachedKeyPairGenerator).unwrap();
        assert!(store.result_message().is_empty());

        let result = store.delete_key("teachers", KeyType::Public);
        let report = Report::from_store(TITLE_DELETE, &result, &store);
        assert!(!report.success);
        assert!(report.should_display());
        assert_eq!(report.title, TITLE_DELETE);
        assert!(report.message.contains("teachers/public"));
    }
}
