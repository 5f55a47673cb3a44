//! Launches the background service executable to start, stop, register or
//! unregister the host service. Not part of the key store.
//!
//! 启动后台服务程序以启动、停止、注册或注销主机服务。不属于密钥存储。

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output};
use tracing::{debug, info};

/// Argument prepended when there is no interactive user to show messages to.
pub const QUIET_ARG: &str = "-quiet";

/// 服务程序的文件名，不含平台扩展名
pub const SERVICE_EXECUTABLE_NAME: &str = "host-service";

/// 与当前程序位于同一目录的服务程序路径
pub fn default_executable() -> Result<PathBuf> {
    let current = std::env::current_exe()
        .map_err(|e| Error::Service(format!("cannot locate current executable: {}", e)))?;
    let dir = current.parent().ok_or_else(|| {
        Error::Service(format!("{} has no parent directory", current.display()))
    })?;
    Ok(dir.join(format!(
        "{}{}",
        SERVICE_EXECUTABLE_NAME,
        std::env::consts::EXE_SUFFIX
    )))
}

/// 向系统服务管理器查询的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceQuery {
    Registered,
    Running,
}

impl ServiceQuery {
    /// 查询使用的系统命令及参数
    #[cfg(windows)]
    pub fn command(self, service_name: &str) -> (&'static str, Vec<String>) {
        ("sc", vec!["query".to_string(), service_name.to_string()])
    }

    /// 查询使用的系统命令及参数
    #[cfg(not(windows))]
    pub fn command(self, service_name: &str) -> (&'static str, Vec<String>) {
        let verb = match self {
            ServiceQuery::Registered => "is-enabled",
            ServiceQuery::Running => "is-active",
        };
        ("systemctl", vec![verb.to_string(), "--quiet".to_string(), service_name.to_string()])
    }

    #[cfg(windows)]
    fn interpret(self, output: &Output) -> bool {
        match self {
            ServiceQuery::Registered => output.status.success(),
            ServiceQuery::Running => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains("RUNNING")
            }
        }
    }

    #[cfg(not(windows))]
    fn interpret(self, output: &Output) -> bool {
        output.status.success()
    }
}

/// 服务控制命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    Start,
    Stop,
    Register,
    Unregister,
}

impl ServiceCommand {
    /// 传给服务程序的命令行参数
    pub fn argument(self) -> &'static str {
        match self {
            ServiceCommand::Start => "-startservice",
            ServiceCommand::Stop => "-stopservice",
            ServiceCommand::Register => "-registerservice",
            ServiceCommand::Unregister => "-unregisterservice",
        }
    }

    fn verb(self) -> &'static str {
        match self {
            ServiceCommand::Start => "Starting",
            ServiceCommand::Stop => "Stopping",
            ServiceCommand::Register => "Registering",
            ServiceCommand::Unregister => "Unregistering",
        }
    }
}

/// Controls the background service by running its executable with a command argument.
///
/// 通过带命令参数运行服务程序来控制后台服务。
#[derive(Debug, Clone)]
pub struct ServiceControl {
    executable: PathBuf,
    service_name: String,
    interactive: bool,
}

impl ServiceControl {
    pub fn new(
        executable: impl Into<PathBuf>,
        service_name: impl Into<String>,
        interactive: bool,
    ) -> Self {
        Self {
            executable: executable.into(),
            service_name: service_name.into(),
            interactive,
        }
    }

    /// 使用 `default_executable()` 的服务程序
    pub fn with_default_executable(
        service_name: impl Into<String>,
        interactive: bool,
    ) -> Result<Self> {
        Ok(Self::new(default_executable()?, service_name, interactive))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn start(&self) -> Result<ExitStatus> {
        self.run(ServiceCommand::Start)
    }

    pub fn stop(&self) -> Result<ExitStatus> {
        self.run(ServiceCommand::Stop)
    }

    pub fn register(&self) -> Result<ExitStatus> {
        self.run(ServiceCommand::Register)
    }

    pub fn unregister(&self) -> Result<ExitStatus> {
        self.run(ServiceCommand::Unregister)
    }

    /// 服务是否已在系统服务管理器中注册
    pub fn is_registered(&self) -> Result<bool> {
        self.query(ServiceQuery::Registered)
    }

    /// 服务是否正在运行
    pub fn is_running(&self) -> Result<bool> {
        self.query(ServiceQuery::Running)
    }

    fn query(&self, query: ServiceQuery) -> Result<bool> {
        let (program, args) = query.command(&self.service_name);
        let output = Command::new(program)
            .args(&args)
            .output()
            .map_err(|e| Error::Service(format!("cannot run {}: {}", program, e)))?;

        let answer = query.interpret(&output);
        debug!(service = %self.service_name, ?query, answer, "queried service state");
        Ok(answer)
    }

    /// Arguments for `command`; non-interactive callers get `-quiet` first.
    pub fn arguments(&self, command: ServiceCommand) -> Vec<&'static str> {
        let mut args = Vec::with_capacity(2);
        if !self.interactive {
            args.push(QUIET_ARG);
        }
        args.push(command.argument());
        args
    }

    /// Runs the executable and waits for it to exit.
    pub fn run(&self, command: ServiceCommand) -> Result<ExitStatus> {
        if !self.executable.is_file() {
            return Err(Error::Service(format!(
                "service executable {} does not exist",
                self.executable.display()
            )));
        }

        info!(service = %self.service_name, "{} service", command.verb());
        let args = self.arguments(command);
        debug!(executable = %self.executable.display(), ?args, "launching service executable");

        let status = Command::new(&self.executable)
            .args(&args)
            .status()
            .map_err(|e| {
                Error::Service(format!(
                    "cannot launch {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        info!(service = %self.service_name, %status, "service executable finished");
        Ok(status)
    }
}
