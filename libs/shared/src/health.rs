use serde::{Deserialize, Serialize};
use sysinfo::{Pid, System};

/// リソースの使用状況
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatus {
    pub memory_usage_mb: u64,
    pub cpu_usage_percent: f32,
}

/// 自プロセスの状態を監視する
pub struct HealthMonitor {
    sys: System,
    pid: Pid,
}

impl HealthMonitor {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();
        let pid = Pid::from(std::process::id() as usize);
        Self { sys, pid }
    }

    pub fn check(&mut self) -> ResourceStatus {
        // 自プロセスのみリフレッシュ
        self.sys.refresh_process(self.pid);

        match self.sys.process(self.pid) {
            Some(process) => ResourceStatus {
                memory_usage_mb: process.memory() / 1024 / 1024,
                cpu_usage_percent: process.cpu_usage(),
            },
            None => ResourceStatus {
                memory_usage_mb: 0,
                cpu_usage_percent: 0.0,
            },
        }
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_own_process() {
        let mut monitor = HealthMonitor::new();
        let status = monitor.check();
        // 自プロセスは必ず存在するのでメモリは 0 より大きい
        assert!(status.memory_usage_mb > 0);
    }
}
