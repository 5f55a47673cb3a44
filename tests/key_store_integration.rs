//!
//! 集成测试
//!
//! 验证密钥存储从创建、列出、导出、导入、检测到删除的完整流程，
//! 以及失败时磁盘状态保持不变。
//!

mod common;

use authkeys::{
    ConfigFile, CryptoConfig, Error, ErrorKind, KeyClassification, KeyIdentity, KeyStore,
    KeyType, Report, StorageConfig,
};
use common::{SharedKeyPairGenerator, setup_store, shared_pair};
use std::fs;
use std::path::Path;

/// 递归收集目录下的所有路径，用于比较操作前后的磁盘状态
fn snapshot(root: &Path) -> Vec<String> {
    let mut paths = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap().flatten() {
            let path = entry.path();
            paths.push(path.strip_prefix(root).unwrap().display().to_string());
            if path.is_dir() {
                pending.push(path);
            }
        }
    }
    paths.sort();
    paths
}

// === 核心功能测试 ===

#[test]
fn create_for_many_names_lists_both_halves() {
    let (mut store, _dir) = setup_store();
    let names = ["teachers", "students", "room-101", "IT_admins"];

    for name in names {
        store.create_key_pair(name).unwrap();
    }

    let keys = store.list_keys();
    for name in names {
        assert!(keys.contains(&format!("{name}/public")));
        assert!(keys.contains(&format!("{name}/private")));
    }
    assert_eq!(keys.len(), names.len() * 2);
}

#[test]
fn duplicate_create_leaves_single_pair() {
    let (mut store, dir) = setup_store();
    store.create_key_pair("teachers").unwrap();
    let before = snapshot(dir.path());

    let err = store.create_key_pair("teachers").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(snapshot(dir.path()), before);
    assert_eq!(store.list_keys(), vec!["teachers/public", "teachers/private"]);
}

#[test]
fn deleting_public_keeps_private() {
    let (mut store, _dir) = setup_store();
    store.create_key_pair("teachers").unwrap();

    store.delete_key("teachers", KeyType::Public).unwrap();
    assert_eq!(store.list_keys(), vec!["teachers/private"]);
}

#[test]
fn export_import_roundtrip_is_byte_identical() {
    let (mut store, dir) = setup_store();
    store.create_key_pair("teachers").unwrap();

    for key_type in KeyType::ALL {
        let file = dir.path().join(format!("teachers_{key_type}_key.pem"));
        store.export_key("teachers", key_type, &file, false).unwrap();
        store.import_key("lab", key_type, &file).unwrap();

        let original: KeyIdentity = format!("teachers/{key_type}").parse().unwrap();
        let copy: KeyIdentity = format!("lab/{key_type}").parse().unwrap();
        assert_eq!(
            fs::read(store.key_file_path(&original)).unwrap(),
            fs::read(store.key_file_path(&copy)).unwrap()
        );
    }
}

#[test]
fn detect_classifies_exports_and_junk() {
    let (mut store, dir) = setup_store();
    store.create_key_pair("teachers").unwrap();

    let public = dir.path().join("public.pem");
    let private = dir.path().join("private.pem");
    store.export_key("teachers", KeyType::Public, &public, false).unwrap();
    store.export_key("teachers", KeyType::Private, &private, false).unwrap();

    assert_eq!(store.detect_key_type(&public).unwrap(), KeyClassification::Public);
    assert_eq!(store.detect_key_type(&private).unwrap(), KeyClassification::Private);

    let empty = dir.path().join("empty.pem");
    fs::write(&empty, b"").unwrap();
    assert_eq!(store.detect_key_type(&empty).unwrap(), KeyClassification::Unknown);

    let random = dir.path().join("random.bin");
    let bytes: Vec<u8> = (0u32..2048).map(|i| (i.wrapping_mul(2654435761) >> 13) as u8).collect();
    fs::write(&random, bytes).unwrap();
    assert_eq!(store.detect_key_type(&random).unwrap(), KeyClassification::Unknown);

    // 目录不是普通文件，视为无法识别
    assert_eq!(store.detect_key_type(dir.path()).unwrap(), KeyClassification::Unknown);
}

#[test]
fn failed_private_write_leaves_nothing_behind() {
    let dir = tempfile::tempdir().unwrap();
    let public_dir = dir.path().join("public");
    let private_dir = dir.path().join("private");
    fs::create_dir(&public_dir).unwrap();
    fs::create_dir(&private_dir).unwrap();
    // 名称目录的位置被普通文件占用，私钥写入失败
    fs::write(private_dir.join("teachers"), b"blocker").unwrap();

    let config = ConfigFile {
        storage: StorageConfig::with_roots(&public_dir, &private_dir),
        crypto: CryptoConfig { rsa_key_bits: 2048 },
    };
    let mut store = KeyStore::with_generator(config, SharedKeyPairGenerator).unwrap();
    let before = snapshot(dir.path());

    let err = store.create_key_pair("teachers").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IoFailure);
    assert_eq!(snapshot(dir.path()), before);
    assert!(!public_dir.join("teachers").exists());

    let report = Report::from_store("Create key pair", &Err::<(), _>(err), &store);
    assert!(!report.success);
    assert!(report.should_display());
}

#[test]
fn missing_roots_list_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = ConfigFile {
        storage: StorageConfig::with_roots(
            dir.path().join("nope-pub"),
            dir.path().join("nope-priv"),
        ),
        crypto: CryptoConfig::default(),
    };
    let store = KeyStore::with_generator(config, SharedKeyPairGenerator).unwrap();
    assert!(store.list_keys().is_empty());
    assert!(store.list_identities().is_empty());
}

// === 失败路径测试 ===

#[test]
fn import_rejects_binary_garbage_without_side_effects() {
    let (mut store, dir) = setup_store();
    let garbage = dir.path().join("garbage.der");
    fs::write(&garbage, [0x30, 0x82, 0x01, 0x22, 0x30, 0x0d, 0x06, 0x09, 0xff]).unwrap();
    let before = snapshot(dir.path());

    let err = store.import_key("teachers", KeyType::Public, &garbage).unwrap_err();
    assert!(matches!(err, Error::FormatRejected { .. }));
    assert!(store.result_message().contains("rejected"));
    assert_eq!(snapshot(dir.path()), before);
}

#[test]
fn import_never_overwrites() {
    let (mut store, dir) = setup_store();
    store.create_key_pair("teachers").unwrap();
    let file = dir.path().join("other.pem");
    fs::write(&file, shared_pair().private_pem.as_bytes()).unwrap();

    let err = store.import_key("teachers", KeyType::Private, &file).unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)));
}

#[test]
fn pkcs1_keys_are_accepted() {
    use rsa::pkcs1::EncodeRsaPublicKey;
    use rsa::pkcs8::DecodePublicKey;

    let (mut store, dir) = setup_store();
    let public = rsa::RsaPublicKey::from_public_key_pem(&shared_pair().public_pem).unwrap();
    let pkcs1 = public.to_pkcs1_pem(rsa::pkcs8::LineEnding::LF).unwrap();
    let file = dir.path().join("pkcs1.pem");
    fs::write(&file, &pkcs1).unwrap();

    assert_eq!(store.detect_key_type(&file).unwrap(), KeyClassification::Public);
    store.import_key("legacy", KeyType::Public, &file).unwrap();
    assert_eq!(store.list_keys(), vec!["legacy/public"]);
}

#[test]
fn messages_track_latest_operation() {
    let (mut store, dir) = setup_store();

    store.create_key_pair("teachers").unwrap();
    let first = store.result_message().to_string();

    let _ = store.export_key("nobody", KeyType::Public, dir.path().join("x.pem"), false);
    assert_ne!(store.result_message(), first);
    assert!(store.result_message().contains("nobody/public"));
}
