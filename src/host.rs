//! 主机信息

use std::sync::LazyLock;

/// 进程ID与主机名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDetails {
    /// 进程ID（十进制字符串）
    pub pid: String,
    /// 主机名
    pub hostname: String,
}

/// 进程启动后首次访问时读取，进程生命周期内不变
static HOST_DETAILS: LazyLock<HostDetails> = LazyLock::new(|| HostDetails {
    pid: std::process::id().to_string(),
    hostname: gethostname::gethostname().to_string_lossy().into_owned(),
});

/// 获取当前进程ID和主机名
pub fn get_host_details() -> HostDetails {
    HOST_DETAILS.clone()
}
