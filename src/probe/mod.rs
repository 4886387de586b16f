pub mod host;
pub mod procfs;
#[cfg(test)]
pub mod stub;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("metrics source unavailable: {0}")]
    Unavailable(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {detail}")]
    Parse { path: String, detail: String },
    #[error("process {pid} is gone")]
    ProcessGone { pid: u32 },
    #[error("interface {name} is gone")]
    InterfaceGone { name: String },
    #[error("{0} returned no data")]
    Missing(&'static str),
}

/// Opens one probe per snapshot build. The probe is released by dropping it.
pub trait MetricsSource {
    type Probe: Probe;

    fn open(&self) -> Result<Self::Probe, ProbeError>;
}

/// One point-in-time view of the host. Every query is independently
/// failable; a per-process query may fail because the process exited after
/// `process_ids` was answered.
pub trait Probe {
    fn memory(&self) -> Result<MemoryStats, ProbeError>;
    /// CPU package descriptions; callers use index 0 only.
    fn cpu_info(&self) -> Result<Vec<CpuInfo>, ProbeError>;
    fn cpu_cores(&self) -> Result<Vec<CpuCoreStats>, ProbeError>;
    fn file_systems(&self) -> Result<Vec<FileSystemEntry>, ProbeError>;
    fn file_system_usage(&self, dir: &str) -> Result<FileSystemUsage, ProbeError>;
    /// Name of the default-route interface. `None` means the host has no
    /// default route, which is not an error.
    fn primary_interface(&self) -> Result<Option<String>, ProbeError>;
    fn interfaces(&self) -> Result<Vec<String>, ProbeError>;
    fn interface_config(&self, name: &str) -> Result<InterfaceConfig, ProbeError>;
    fn interface_stats(&self, name: &str) -> Result<InterfaceStats, ProbeError>;
    fn uptime(&self) -> Result<f64, ProbeError>;
    fn process_ids(&self) -> Result<Vec<u32>, ProbeError>;
    fn process_overview(&self, pid: u32) -> Result<ProcessOverview, ProbeError>;
    fn process_cpu(&self, pid: u32) -> Result<ProcessCpu, ProbeError>;
    fn process_credentials(&self, pid: u32) -> Result<ProcessCredentials, ProbeError>;
    fn process_memory(&self, pid: u32) -> Result<ProcessMemory, ProbeError>;
    fn process_args(&self, pid: u32) -> Result<Vec<String>, ProbeError>;
    fn process_exe(&self, pid: u32) -> Result<ProcessExe, ProbeError>;
    fn network_info(&self) -> Result<NetworkInfo, ProbeError>;
    fn system_info(&self) -> Result<SystemInfo, ProbeError>;
    fn load_average(&self) -> Result<LoadAverage, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct MemoryStats {
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub used_percent: f64,
    pub free_percent: f64,
}

#[derive(Debug, Clone)]
pub struct CpuInfo {
    pub vendor: String,
    pub model: String,
    pub mhz: u64,
    pub total_cores: u32,
}

/// Cumulative scheduler tick counters for one core, as exposed by the OS.
#[derive(Debug, Clone)]
pub struct CpuCoreStats {
    pub user: u64,
    pub sys: u64,
    pub nice: u64,
    pub idle: u64,
    pub wait: u64,
    pub irq: u64,
    pub soft_irq: u64,
    pub stolen: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct FileSystemEntry {
    pub dir: String,
    pub dev: String,
    /// Coarse classification: local, remote, ram, swap, cdrom or none.
    pub kind: String,
    pub sys_type: String,
    pub options: String,
}

#[derive(Debug, Clone)]
pub struct FileSystemUsage {
    pub use_percent: f64,
    pub total: u64,
    pub free: u64,
    pub used: u64,
    pub available: u64,
    pub files: u64,
}

#[derive(Debug, Clone)]
pub struct InterfaceConfig {
    pub name: String,
    pub kind: String,
    pub ip: String,
    pub mac: String,
}

#[derive(Debug, Clone)]
pub struct InterfaceStats {
    pub speed: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Closed process-state set. Anything the OS reports outside the five named
/// states renders as an empty string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Sleeping,
    Running,
    Stopped,
    Zombie,
    Idle,
    Unknown,
}

impl ProcessState {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessState::Sleeping => "Sleeping",
            ProcessState::Running => "Running",
            ProcessState::Stopped => "Stopped",
            ProcessState::Zombie => "Zombie",
            ProcessState::Idle => "Idle",
            ProcessState::Unknown => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessOverview {
    pub name: String,
    pub state: ProcessState,
    pub threads: u64,
}

#[derive(Debug, Clone)]
pub struct ProcessCpu {
    /// Unix seconds the process started at.
    pub start_time: u64,
    /// Clock ticks spent in user and kernel mode.
    pub user: u64,
    pub sys: u64,
    pub total: u64,
    /// Unix seconds of the sample this probe was opened at.
    pub last_time: u64,
    pub percent: f64,
}

#[derive(Debug, Clone)]
pub struct ProcessCredentials {
    pub user: String,
    pub group: String,
}

#[derive(Debug, Clone)]
pub struct ProcessMemory {
    pub size: u64,
    pub resident: u64,
    pub share: u64,
    pub minor_faults: u64,
    pub major_faults: u64,
    pub page_faults: f64,
}

#[derive(Debug, Clone)]
pub struct ProcessExe {
    pub name: String,
    pub cwd: String,
    pub root: String,
}

#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub host_name: String,
    pub default_gateway: String,
    pub default_gateway_interface: String,
    pub primary_dns: String,
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub name: String,
    pub version: String,
    pub arch: String,
    pub machine: String,
    pub description: String,
    pub patch_level: String,
    pub vendor: String,
    pub vendor_version: String,
    pub vendor_name: String,
    pub vendor_code_name: String,
}

#[derive(Debug, Clone)]
pub struct LoadAverage {
    pub one: f64,
    pub five: f64,
    pub fifteen: f64,
}
