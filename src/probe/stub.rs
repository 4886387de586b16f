//! Fixture-driven metrics source for tests: fixed data, plus injectable
//! whole-category and per-entry failures.

use std::collections::{HashMap, HashSet};

use super::{
    CpuCoreStats, CpuInfo, FileSystemEntry, FileSystemUsage, InterfaceConfig, InterfaceStats,
    LoadAverage, MemoryStats, MetricsSource, NetworkInfo, ProbeError, Probe, ProcessCpu,
    ProcessCredentials, ProcessExe, ProcessMemory, ProcessOverview, ProcessState, SystemInfo,
};

#[derive(Debug, Clone)]
pub struct StubProcess {
    pub overview: ProcessOverview,
    pub cpu: ProcessCpu,
    pub credentials: ProcessCredentials,
    pub memory: ProcessMemory,
    pub args: Vec<String>,
    pub exe: ProcessExe,
}

#[derive(Debug, Clone)]
pub struct StubSource {
    pub memory: MemoryStats,
    pub cpu_info: Vec<CpuInfo>,
    pub cores: Vec<CpuCoreStats>,
    pub file_systems: Vec<FileSystemEntry>,
    pub usage: HashMap<String, FileSystemUsage>,
    pub primary: Option<String>,
    pub interfaces: Vec<String>,
    pub interface_configs: HashMap<String, InterfaceConfig>,
    pub interface_stats: HashMap<String, InterfaceStats>,
    pub uptime: f64,
    pub pids: Vec<u32>,
    pub processes: HashMap<u32, StubProcess>,
    pub network_info: NetworkInfo,
    pub system_info: SystemInfo,
    pub load: LoadAverage,
    /// `open()` fails when set.
    pub unavailable: bool,
    /// Whole categories that fail by method name, e.g. "process_ids".
    pub fail_categories: HashSet<&'static str>,
    /// Directories whose usage sub-query fails.
    pub fail_usage_for: HashSet<String>,
}

impl StubSource {
    /// One core, one ext4 root filesystem 40% used, one primary `eth0`,
    /// one pid-1 `init` sleeping with no arguments.
    pub fn sample() -> Self {
        let mut usage = HashMap::new();
        usage.insert(
            "/".to_string(),
            FileSystemUsage {
                use_percent: 40.0,
                total: 100_000_000,
                free: 60_000_000,
                used: 40_000_000,
                available: 55_000_000,
                files: 1_000_000,
            },
        );

        let mut interface_configs = HashMap::new();
        interface_configs.insert(
            "eth0".to_string(),
            InterfaceConfig {
                name: "eth0".to_string(),
                kind: "Ethernet".to_string(),
                ip: "192.168.1.2".to_string(),
                mac: "aa:bb:cc:dd:ee:ff".to_string(),
            },
        );
        let mut interface_stats = HashMap::new();
        interface_stats.insert(
            "eth0".to_string(),
            InterfaceStats {
                speed: 1000,
                rx_packets: 1500,
                tx_packets: 1200,
                rx_bytes: 1_048_576,
                tx_bytes: 524_288,
            },
        );

        let mut processes = HashMap::new();
        processes.insert(
            1,
            StubProcess {
                overview: ProcessOverview {
                    name: "init".to_string(),
                    state: ProcessState::Sleeping,
                    threads: 1,
                },
                cpu: ProcessCpu {
                    start_time: 1_700_000_000,
                    user: 10,
                    sys: 5,
                    total: 15,
                    last_time: 1_700_003_600,
                    percent: 0.0,
                },
                credentials: ProcessCredentials {
                    user: "root".to_string(),
                    group: "root".to_string(),
                },
                memory: ProcessMemory {
                    size: 4_194_304,
                    resident: 1_048_576,
                    share: 262_144,
                    minor_faults: 120,
                    major_faults: 3,
                    page_faults: 123.0,
                },
                args: Vec::new(),
                exe: ProcessExe {
                    name: "/sbin/init".to_string(),
                    cwd: "/".to_string(),
                    root: "/".to_string(),
                },
            },
        );

        Self {
            memory: MemoryStats {
                total: 2_000_000_000,
                free: 800_000_000,
                used: 1_200_000_000,
                used_percent: 60.0,
                free_percent: 40.0,
            },
            cpu_info: vec![CpuInfo {
                vendor: "GenuineIntel".to_string(),
                model: "Stub CPU @ 2.40GHz".to_string(),
                mhz: 2400,
                total_cores: 1,
            }],
            cores: vec![CpuCoreStats {
                user: 100,
                sys: 50,
                nice: 0,
                idle: 800,
                wait: 25,
                irq: 5,
                soft_irq: 10,
                stolen: 10,
                total: 1000,
            }],
            file_systems: vec![FileSystemEntry {
                dir: "/".to_string(),
                dev: "/dev/sda1".to_string(),
                kind: "local".to_string(),
                sys_type: "ext4".to_string(),
                options: "rw,relatime".to_string(),
            }],
            usage,
            primary: Some("eth0".to_string()),
            interfaces: vec!["eth0".to_string()],
            interface_configs,
            interface_stats,
            uptime: 3600.5,
            pids: vec![1],
            processes,
            network_info: NetworkInfo {
                host_name: "stubhost".to_string(),
                default_gateway: "192.168.1.1".to_string(),
                default_gateway_interface: "eth0".to_string(),
                primary_dns: "8.8.8.8".to_string(),
            },
            system_info: SystemInfo {
                name: "Linux".to_string(),
                version: "6.1.0".to_string(),
                arch: "x86_64".to_string(),
                machine: "x86_64".to_string(),
                description: "Stub Linux 6.1".to_string(),
                patch_level: String::new(),
                vendor: "stubuntu".to_string(),
                vendor_version: "24.04".to_string(),
                vendor_name: "Linux".to_string(),
                vendor_code_name: String::new(),
            },
            load: LoadAverage {
                one: 0.5,
                five: 0.25,
                fifteen: 0.125,
            },
            unavailable: false,
            fail_categories: HashSet::new(),
            fail_usage_for: HashSet::new(),
        }
    }

    fn check(&self, category: &'static str) -> Result<(), ProbeError> {
        if self.fail_categories.contains(category) {
            Err(injected(category))
        } else {
            Ok(())
        }
    }
}

fn injected(what: &str) -> ProbeError {
    ProbeError::Io {
        path: what.to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "injected failure"),
    }
}

impl MetricsSource for StubSource {
    type Probe = StubProbe;

    fn open(&self) -> Result<StubProbe, ProbeError> {
        if self.unavailable {
            return Err(ProbeError::Unavailable("stub marked unavailable".to_string()));
        }
        Ok(StubProbe {
            data: self.clone(),
        })
    }
}

pub struct StubProbe {
    data: StubSource,
}

impl StubProbe {
    fn process(&self, pid: u32) -> Result<&StubProcess, ProbeError> {
        self.data
            .processes
            .get(&pid)
            .ok_or(ProbeError::ProcessGone { pid })
    }
}

impl Probe for StubProbe {
    fn memory(&self) -> Result<MemoryStats, ProbeError> {
        self.data.check("memory")?;
        Ok(self.data.memory.clone())
    }

    fn cpu_info(&self) -> Result<Vec<CpuInfo>, ProbeError> {
        self.data.check("cpu_info")?;
        Ok(self.data.cpu_info.clone())
    }

    fn cpu_cores(&self) -> Result<Vec<CpuCoreStats>, ProbeError> {
        self.data.check("cpu_cores")?;
        Ok(self.data.cores.clone())
    }

    fn file_systems(&self) -> Result<Vec<FileSystemEntry>, ProbeError> {
        self.data.check("file_systems")?;
        Ok(self.data.file_systems.clone())
    }

    fn file_system_usage(&self, dir: &str) -> Result<FileSystemUsage, ProbeError> {
        if self.data.fail_usage_for.contains(dir) {
            return Err(injected(dir));
        }
        self.data
            .usage
            .get(dir)
            .cloned()
            .ok_or_else(|| injected(dir))
    }

    fn primary_interface(&self) -> Result<Option<String>, ProbeError> {
        self.data.check("primary_interface")?;
        Ok(self.data.primary.clone())
    }

    fn interfaces(&self) -> Result<Vec<String>, ProbeError> {
        self.data.check("interfaces")?;
        Ok(self.data.interfaces.clone())
    }

    fn interface_config(&self, name: &str) -> Result<InterfaceConfig, ProbeError> {
        self.data
            .interface_configs
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::InterfaceGone {
                name: name.to_string(),
            })
    }

    fn interface_stats(&self, name: &str) -> Result<InterfaceStats, ProbeError> {
        self.data
            .interface_stats
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::InterfaceGone {
                name: name.to_string(),
            })
    }

    fn uptime(&self) -> Result<f64, ProbeError> {
        self.data.check("uptime")?;
        Ok(self.data.uptime)
    }

    fn process_ids(&self) -> Result<Vec<u32>, ProbeError> {
        self.data.check("process_ids")?;
        Ok(self.data.pids.clone())
    }

    fn process_overview(&self, pid: u32) -> Result<ProcessOverview, ProbeError> {
        Ok(self.process(pid)?.overview.clone())
    }

    fn process_cpu(&self, pid: u32) -> Result<ProcessCpu, ProbeError> {
        Ok(self.process(pid)?.cpu.clone())
    }

    fn process_credentials(&self, pid: u32) -> Result<ProcessCredentials, ProbeError> {
        Ok(self.process(pid)?.credentials.clone())
    }

    fn process_memory(&self, pid: u32) -> Result<ProcessMemory, ProbeError> {
        Ok(self.process(pid)?.memory.clone())
    }

    fn process_args(&self, pid: u32) -> Result<Vec<String>, ProbeError> {
        Ok(self.process(pid)?.args.clone())
    }

    fn process_exe(&self, pid: u32) -> Result<ProcessExe, ProbeError> {
        Ok(self.process(pid)?.exe.clone())
    }

    fn network_info(&self) -> Result<NetworkInfo, ProbeError> {
        self.data.check("network_info")?;
        Ok(self.data.network_info.clone())
    }

    fn system_info(&self) -> Result<SystemInfo, ProbeError> {
        self.data.check("system_info")?;
        Ok(self.data.system_info.clone())
    }

    fn load_average(&self) -> Result<LoadAverage, ProbeError> {
        self.data.check("load_average")?;
        Ok(self.data.load.clone())
    }
}
