use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use nix::sys::statvfs::statvfs;
use nix::unistd::{Gid, Group};
use sysinfo::{
    CpuExt, NetworkExt, NetworksExt, Pid, PidExt, ProcessExt, ProcessStatus, System, SystemExt,
    UserExt,
};

use super::procfs;
use super::{
    CpuCoreStats, CpuInfo, FileSystemEntry, FileSystemUsage, InterfaceConfig, InterfaceStats,
    LoadAverage, MemoryStats, MetricsSource, NetworkInfo, ProbeError, Probe, ProcessCpu,
    ProcessCredentials, ProcessExe, ProcessMemory, ProcessOverview, ProcessState, SystemInfo,
};

/// Page size used to convert statm pages to bytes.
const PAGE_SIZE: u64 = 4096;

/// Live-host metrics source: sysinfo for the portable categories, procfs
/// and statvfs for tick counters, mount options, routes and inode counts.
#[derive(Debug, Clone)]
pub struct HostSource {
    proc_root: PathBuf,
}

impl Default for HostSource {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSource {
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl MetricsSource for HostSource {
    type Probe = HostProbe;

    fn open(&self) -> Result<HostProbe, ProbeError> {
        let mut sys = System::new_all();
        sys.refresh_users_list();
        sys.refresh_networks_list();
        sys.refresh_networks();
        Ok(HostProbe {
            sys,
            proc_root: self.proc_root.clone(),
            sampled_at: now_unix(),
        })
    }
}

pub struct HostProbe {
    sys: System,
    proc_root: PathBuf,
    sampled_at: u64,
}

impl HostProbe {
    fn read_proc(&self, name: &str) -> Result<String, ProbeError> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| ProbeError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    fn process(&self, pid: u32) -> Result<&sysinfo::Process, ProbeError> {
        self.sys
            .process(Pid::from_u32(pid))
            .ok_or(ProbeError::ProcessGone { pid })
    }

    /// Per-pid counters from `/proc/<pid>/stat`. A vanished directory means
    /// the process exited after enumeration.
    fn pid_stat(&self, pid: u32) -> Result<procfs::PidStat, ProbeError> {
        let path = self.proc_root.join(pid.to_string()).join("stat");
        let content =
            fs::read_to_string(&path).map_err(|_| ProbeError::ProcessGone { pid })?;
        procfs::parse_pid_stat(&content).ok_or_else(|| ProbeError::Parse {
            path: path.display().to_string(),
            detail: "malformed stat line".to_string(),
        })
    }
}

impl Probe for HostProbe {
    fn memory(&self) -> Result<MemoryStats, ProbeError> {
        let total = self.sys.total_memory();
        let free = self.sys.available_memory();
        let used = self.sys.used_memory();
        Ok(MemoryStats {
            total,
            free,
            used,
            used_percent: percent_of(used, total),
            free_percent: percent_of(free, total),
        })
    }

    fn cpu_info(&self) -> Result<Vec<CpuInfo>, ProbeError> {
        let cpus = self.sys.cpus();
        let first = match cpus.first() {
            Some(first) => first,
            None => return Ok(Vec::new()),
        };
        Ok(vec![CpuInfo {
            vendor: first.vendor_id().to_string(),
            model: first.brand().to_string(),
            mhz: first.frequency(),
            total_cores: cpus.len() as u32,
        }])
    }

    fn cpu_cores(&self) -> Result<Vec<CpuCoreStats>, ProbeError> {
        let content = self.read_proc("stat")?;
        Ok(procfs::parse_stat_cores(&content))
    }

    fn file_systems(&self) -> Result<Vec<FileSystemEntry>, ProbeError> {
        let content = self.read_proc("mounts")?;
        Ok(procfs::parse_mounts(&content)
            .into_iter()
            .map(|mount| FileSystemEntry {
                kind: procfs::filesystem_kind(&mount.sys_type).to_string(),
                dir: mount.dir,
                dev: mount.dev,
                sys_type: mount.sys_type,
                options: mount.options,
            })
            .collect())
    }

    fn file_system_usage(&self, dir: &str) -> Result<FileSystemUsage, ProbeError> {
        let stats = statvfs(dir).map_err(|errno| ProbeError::Io {
            path: dir.to_string(),
            source: std::io::Error::from_raw_os_error(errno as i32),
        })?;

        let block_size = if stats.fragment_size() > 0 {
            stats.fragment_size() as u64
        } else {
            stats.block_size() as u64
        };
        let total = stats.blocks() as u64 * block_size;
        let free = stats.blocks_free() as u64 * block_size;
        let available = stats.blocks_available() as u64 * block_size;
        let used = total.saturating_sub(free);

        Ok(FileSystemUsage {
            use_percent: percent_of(used, used + available),
            total,
            free,
            used,
            available,
            files: stats.files() as u64,
        })
    }

    fn primary_interface(&self) -> Result<Option<String>, ProbeError> {
        let path = self.proc_root.join("net/route");
        match fs::read_to_string(&path) {
            Ok(content) => Ok(procfs::parse_default_route(&content).map(|(iface, _)| iface)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ProbeError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    fn interfaces(&self) -> Result<Vec<String>, ProbeError> {
        let mut names: Vec<String> = self
            .sys
            .networks()
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort_unstable();
        Ok(names)
    }

    fn interface_config(&self, name: &str) -> Result<InterfaceConfig, ProbeError> {
        let data = self
            .sys
            .networks()
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, data)| data)
            .ok_or_else(|| ProbeError::InterfaceGone {
                name: name.to_string(),
            })?;

        let mac = data
            .mac_address()
            .0
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<Vec<_>>()
            .join(":");

        let addrs = if_addrs::get_if_addrs().map_err(|source| ProbeError::Io {
            path: "interface addresses".to_string(),
            source,
        })?;
        let ip = addrs
            .iter()
            .filter(|addr| addr.name == name)
            .map(|addr| addr.ip())
            .find(|ip| ip.is_ipv4())
            .or_else(|| {
                addrs
                    .iter()
                    .filter(|addr| addr.name == name)
                    .map(|addr| addr.ip())
                    .next()
            })
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(InterfaceConfig {
            name: name.to_string(),
            kind: procfs::interface_kind(name).to_string(),
            ip,
            mac,
        })
    }

    fn interface_stats(&self, name: &str) -> Result<InterfaceStats, ProbeError> {
        let data = self
            .sys
            .networks()
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, data)| data)
            .ok_or_else(|| ProbeError::InterfaceGone {
                name: name.to_string(),
            })?;

        let speed = fs::read_to_string(format!("/sys/class/net/{name}/speed"))
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0);

        Ok(InterfaceStats {
            speed,
            rx_packets: data.total_packets_received(),
            tx_packets: data.total_packets_transmitted(),
            rx_bytes: data.total_received(),
            tx_bytes: data.total_transmitted(),
        })
    }

    fn uptime(&self) -> Result<f64, ProbeError> {
        match self.read_proc("uptime") {
            Ok(content) => procfs::parse_uptime(&content).ok_or_else(|| ProbeError::Parse {
                path: self.proc_root.join("uptime").display().to_string(),
                detail: "malformed uptime".to_string(),
            }),
            Err(_) => Ok(self.sys.uptime() as f64),
        }
    }

    fn process_ids(&self) -> Result<Vec<u32>, ProbeError> {
        let mut pids: Vec<u32> = self.sys.processes().keys().map(|pid| pid.as_u32()).collect();
        pids.sort_unstable();
        Ok(pids)
    }

    fn process_overview(&self, pid: u32) -> Result<ProcessOverview, ProbeError> {
        let process = self.process(pid)?;
        let stat = self.pid_stat(pid)?;
        Ok(ProcessOverview {
            name: process.name().to_string(),
            state: map_state(process.status()),
            threads: stat.num_threads,
        })
    }

    fn process_cpu(&self, pid: u32) -> Result<ProcessCpu, ProbeError> {
        let process = self.process(pid)?;
        let stat = self.pid_stat(pid)?;
        Ok(ProcessCpu {
            start_time: process.start_time(),
            user: stat.utime,
            sys: stat.stime,
            total: stat.utime + stat.stime,
            last_time: self.sampled_at,
            percent: f64::from(process.cpu_usage()),
        })
    }

    fn process_credentials(&self, pid: u32) -> Result<ProcessCredentials, ProbeError> {
        let process = self.process(pid)?;

        let user = match process.user_id() {
            Some(uid) => self
                .sys
                .users()
                .iter()
                .find(|user| user.id() == uid)
                .map(|user| user.name().to_string())
                .unwrap_or_else(|| (**uid).to_string()),
            None => String::new(),
        };
        let group = match process.group_id() {
            Some(gid) => Group::from_gid(Gid::from_raw(*gid))
                .ok()
                .flatten()
                .map(|group| group.name)
                .unwrap_or_else(|| (*gid).to_string()),
            None => String::new(),
        };

        Ok(ProcessCredentials { user, group })
    }

    fn process_memory(&self, pid: u32) -> Result<ProcessMemory, ProbeError> {
        let process = self.process(pid)?;
        let stat = self.pid_stat(pid)?;

        let statm_path = self.proc_root.join(pid.to_string()).join("statm");
        let share = fs::read_to_string(statm_path)
            .ok()
            .and_then(|content| procfs::parse_statm_shared_pages(&content))
            .map(|pages| pages * PAGE_SIZE)
            .unwrap_or(0);

        Ok(ProcessMemory {
            size: process.virtual_memory(),
            resident: process.memory(),
            share,
            minor_faults: stat.minor_faults,
            major_faults: stat.major_faults,
            page_faults: (stat.minor_faults + stat.major_faults) as f64,
        })
    }

    fn process_args(&self, pid: u32) -> Result<Vec<String>, ProbeError> {
        Ok(self.process(pid)?.cmd().to_vec())
    }

    fn process_exe(&self, pid: u32) -> Result<ProcessExe, ProbeError> {
        let process = self.process(pid)?;
        Ok(ProcessExe {
            name: process.exe().display().to_string(),
            cwd: process.cwd().display().to_string(),
            root: process.root().display().to_string(),
        })
    }

    fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
        let route = fs::read_to_string(self.proc_root.join("net/route"))
            .ok()
            .and_then(|content| procfs::parse_default_route(&content));
        let (gateway, gateway_interface) = match route {
            Some((iface, gateway)) => (gateway.to_string(), iface),
            None => (String::new(), String::new()),
        };
        let dns = fs::read_to_string("/etc/resolv.conf")
            .ok()
            .and_then(|content| procfs::parse_resolv_conf(&content))
            .unwrap_or_default();

        Ok(NetworkInfo {
            host_name: self.sys.host_name().unwrap_or_default(),
            default_gateway: gateway,
            default_gateway_interface: gateway_interface,
            primary_dns: dns,
        })
    }

    fn system_info(&self) -> Result<SystemInfo, ProbeError> {
        Ok(SystemInfo {
            name: self.sys.name().unwrap_or_default(),
            version: self.sys.kernel_version().unwrap_or_default(),
            arch: std::env::consts::ARCH.to_string(),
            machine: std::env::consts::ARCH.to_string(),
            description: self.sys.long_os_version().unwrap_or_default(),
            patch_level: String::new(),
            vendor: self.sys.distribution_id(),
            vendor_version: self.sys.os_version().unwrap_or_default(),
            vendor_name: self.sys.name().unwrap_or_default(),
            vendor_code_name: String::new(),
        })
    }

    fn load_average(&self) -> Result<LoadAverage, ProbeError> {
        let load = self.sys.load_average();
        Ok(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }
}

fn map_state(status: ProcessStatus) -> ProcessState {
    match status {
        ProcessStatus::Sleep => ProcessState::Sleeping,
        ProcessStatus::Run => ProcessState::Running,
        ProcessStatus::Stop => ProcessState::Stopped,
        ProcessStatus::Zombie => ProcessState::Zombie,
        ProcessStatus::Idle => ProcessState::Idle,
        _ => ProcessState::Unknown,
    }
}

fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64) * 100.0
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
