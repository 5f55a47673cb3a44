//! 记录单次操作中新建的文件和目录，失败时按逆序删除

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

enum Created {
    File(PathBuf),
    Dir(PathBuf),
}

/// 回滚守卫
///
/// 未调用 `commit` 就被释放时，删除本次记录的所有路径，使磁盘恢复到操作之前的状态。
#[derive(Default)]
pub(crate) struct Rollback {
    created: Vec<Created>,
    committed: bool,
}

impl Rollback {
    /// 目录不存在时创建，并记录下来；父目录必须已存在
    pub(crate) fn create_dir_if_absent(&mut self, path: &Path) -> io::Result<()> {
        match fs::create_dir(path) {
            Ok(()) => {
                self.created.push(Created::Dir(path.to_path_buf()));
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// 以独占方式创建文件，并由 `write` 写入内容
    ///
    /// 目标已存在时返回 `AlreadyExists`，不会覆盖。文件一旦创建就被记录，
    /// 之后 `write` 或同步失败时同样会在回滚中删除。`mode` 仅在 Unix 上生效，
    /// 创建时即使用该模式，并在写入之前再显式设置一次以排除 umask 的影响。
    pub(crate) fn create_file<F>(
        &mut self,
        path: &Path,
        mode: Option<u32>,
        write: F,
    ) -> io::Result<()>
    where
        F: FnOnce(&mut File) -> io::Result<()>,
    {
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            if let Some(mode) = mode {
                options.mode(mode);
            }
        }

        let mut file = options.open(path)?;
        self.created.push(Created::File(path.to_path_buf()));

        #[cfg(unix)]
        {
            if let Some(mode) = mode {
                fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
            }
        }
        #[cfg(not(unix))]
        let _ = mode;

        write(&mut file)?;
        file.sync_all()
    }

    /// 确认操作成功，保留所有新建路径
    pub(crate) fn commit(mut self) {
        self.committed = true;
    }
}

impl Drop for Rollback {
    fn drop(&mut self) {
        if self.committed {
            return;
        }

        for created in self.created.drain(..).rev() {
            let (path, result) = match &created {
                Created::File(path) => (path, fs::remove_file(path)),
                Created::Dir(path) => (path, fs::remove_dir(path)),
            };
            match result {
                Ok(()) => warn!(path = %path.display(), "rolled back"),
                Err(e) => warn!(path = %path.display(), error = %e, "rollback failed"),
            }
        }
    }
}
