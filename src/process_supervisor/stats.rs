//! Per-process resource usage (best effort)

use sysinfo::{Pid, System};
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessUsage {
    pub memory_mb: f64,
    pub cpu_percent: f32,
}

/// Shared sysinfo handle; CPU figures need a previous refresh to be meaningful
pub struct ProcessStats {
    system: Mutex<System>,
}

impl ProcessStats {
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }

    /// Refresh and look up each pid; missing pids are omitted
    pub async fn sample(&self, pids: &[u32]) -> Vec<(u32, ProcessUsage)> {
        if pids.is_empty() {
            return Vec::new();
        }

        let mut system = self.system.lock().await;
        system.refresh_processes();

        pids.iter()
            .filter_map(|pid| {
                system.process(Pid::from_u32(*pid)).map(|p| {
                    (
                        *pid,
                        ProcessUsage {
                            memory_mb: p.memory() as f64 / (1024.0 * 1024.0),
                            cpu_percent: p.cpu_usage(),
                        },
                    )
                })
            })
            .collect()
    }
}

impl Default for ProcessStats {
    fn default() -> Self {
        Self::new()
    }
}
