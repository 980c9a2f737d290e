#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 記錄 flow 各階段的 CPU / 記憶體用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Mutex<Instant>,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let mut system = if enabled {
            System::new_with_specifics(RefreshKind::everything())
        } else {
            System::new()
        };

        let pid = if enabled {
            match sysinfo::get_current_pid() {
                Ok(pid) => Some(pid),
                Err(e) => {
                    tracing::warn!("⚠️ Monitoring disabled, cannot resolve current PID: {}", e);
                    None
                }
            }
        } else {
            None
        };

        if pid.is_some() {
            system.refresh_all();
        }

        Self {
            system: Mutex::new(system),
            pid,
            start_time: Mutex::new(Instant::now()),
            peak_memory: Mutex::new(0),
            enabled: enabled && pid.is_some(),
        }
    }

    /// 每個 flow 開始時重設峰值與計時
    pub fn begin_run(&self) {
        if let Ok(mut start) = self.start_time.lock() {
            *start = Instant::now();
        }
        if let Ok(mut peak) = self.peak_memory.lock() {
            *peak = 0;
        }
    }

    pub fn sample(&self) -> Option<SystemStats> {
        if !self.enabled {
            return None;
        }

        let mut system = self.system.lock().ok()?;
        system.refresh_all();

        let process = system.process(self.pid?)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        if memory_mb > *peak {
            *peak = memory_mb;
        }

        Some(SystemStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.lock().ok()?.elapsed(),
        })
    }

    pub fn log_phase(&self, flow: &str, phase: &str) {
        if let Some(stats) = self.sample() {
            tracing::info!(
                "📊 {} / {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                flow,
                phase,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    #[cfg(test)]
    pub(crate) fn record_peak(&self, memory_mb: u64) {
        if let Ok(mut peak) = self.peak_memory.lock() {
            *peak = (*peak).max(memory_mb);
        }
    }

    pub fn peak_memory_mb(&self) -> Option<u64> {
        if !self.enabled {
            return None;
        }
        self.peak_memory.lock().ok().map(|peak| *peak)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 沒有 cli feature 時不做任何取樣
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn begin_run(&self) {}

    pub fn log_phase(&self, _flow: &str, _phase: &str) {}

    pub fn peak_memory_mb(&self) -> Option<u64> {
        None
    }

    pub fn is_enabled(&self) -> bool {
        false
    }
}
