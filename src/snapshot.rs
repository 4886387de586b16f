use thiserror::Error;
use tracing::warn;

use crate::document::{Node, ObjectNode};
use crate::probe::{
    FileSystemEntry, FileSystemUsage, MemoryStats, MetricsSource, NetworkInfo, ProbeError, Probe,
    SystemInfo,
};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("metrics provider unavailable: {source}")]
    ProviderUnavailable { source: ProbeError },
    #[error("{category} query failed: {source}")]
    Category {
        category: &'static str,
        source: ProbeError,
    },
}

fn category(name: &'static str) -> impl Fn(ProbeError) -> SnapshotError {
    move |source| SnapshotError::Category {
        category: name,
        source,
    }
}

/// Builds one complete snapshot document. Opens one probe for the whole
/// build and releases it on every exit path. A failed category aborts the
/// build; a failed list entry is skipped and logged, never mixed with stale
/// data.
pub fn build<S: MetricsSource>(source: &S) -> Result<Node, SnapshotError> {
    let probe = source
        .open()
        .map_err(|source| SnapshotError::ProviderUnavailable { source })?;

    let mut root = ObjectNode::new();
    root.insert(
        "memory",
        memory_node(&probe.memory().map_err(category("memory"))?),
    );
    root.insert("cpu", cpu_node(&probe)?);
    root.insert("file_systems", file_systems_node(&probe)?);
    root.insert("network_interfaces", interfaces_node(&probe)?);
    root.insert("uptime", probe.uptime().map_err(category("uptime"))?);
    root.insert("processes", processes_node(&probe)?);
    root.insert(
        "network_info",
        network_info_node(&probe.network_info().map_err(category("network_info"))?),
    );
    root.insert(
        "system_info",
        system_info_node(&probe.system_info().map_err(category("system_info"))?),
    );
    let load = probe.load_average().map_err(category("load_average"))?;
    root.insert(
        "load_average",
        vec![
            Node::Float(load.one),
            Node::Float(load.five),
            Node::Float(load.fifteen),
        ],
    );

    Ok(Node::Object(root))
}

fn memory_node(memory: &MemoryStats) -> ObjectNode {
    let mut node = ObjectNode::new();
    node.insert("total", memory.total);
    node.insert("free", memory.free);
    node.insert("used", memory.used);
    node.insert("used_percent", memory.used_percent as i64);
    node.insert("free_percent", memory.free_percent as i64);
    node
}

fn cpu_node<P: Probe>(probe: &P) -> Result<ObjectNode, SnapshotError> {
    let info_list = probe.cpu_info().map_err(category("cpu"))?;
    let info = info_list.first().ok_or(SnapshotError::Category {
        category: "cpu",
        source: ProbeError::Missing("cpu info list"),
    })?;

    let mut node = ObjectNode::new();
    node.insert("vendor", info.vendor.as_str());
    node.insert("model", info.model.as_str());
    node.insert("mhz", info.mhz);
    node.insert("total_cores", info.total_cores);

    let cores = probe.cpu_cores().map_err(category("cpu"))?;
    let mut core_nodes = Vec::with_capacity(cores.len());
    for core in &cores {
        let mut core_node = ObjectNode::new();
        core_node.insert("user", core.user);
        core_node.insert("sys", core.sys);
        core_node.insert("nice", core.nice);
        core_node.insert("idle", core.idle);
        core_node.insert("wait", core.wait);
        core_node.insert("irq", core.irq);
        core_node.insert("soft_irq", core.soft_irq);
        core_node.insert("stolen", core.stolen);
        core_node.insert("total", core.total);
        core_nodes.push(Node::Object(core_node));
    }
    node.insert("cores", core_nodes);
    Ok(node)
}

fn file_systems_node<P: Probe>(probe: &P) -> Result<Node, SnapshotError> {
    let entries = probe.file_systems().map_err(category("file_systems"))?;
    let mut nodes = Vec::with_capacity(entries.len());
    for entry in &entries {
        match probe.file_system_usage(&entry.dir) {
            Ok(usage) => nodes.push(file_system_node(entry, &usage)),
            Err(err) => warn!(dir = %entry.dir, error = %err, "skipping file system"),
        }
    }
    Ok(Node::Array(nodes))
}

fn file_system_node(entry: &FileSystemEntry, usage: &FileSystemUsage) -> Node {
    let mut node = ObjectNode::new();
    node.insert("dir", entry.dir.as_str());
    node.insert("dev", entry.dev.as_str());
    node.insert("type", entry.kind.as_str());
    node.insert("sys_type", entry.sys_type.as_str());
    node.insert("options", entry.options.as_str());

    let mut usage_node = ObjectNode::new();
    usage_node.insert("use_percent", usage.use_percent);
    usage_node.insert("total", usage.total);
    usage_node.insert("free", usage.free);
    usage_node.insert("used", usage.used);
    usage_node.insert("available", usage.available);
    usage_node.insert("files", usage.files);
    node.insert("usage", usage_node);

    Node::Object(node)
}

fn interfaces_node<P: Probe>(probe: &P) -> Result<Node, SnapshotError> {
    let primary = probe
        .primary_interface()
        .map_err(category("network_interfaces"))?;
    let names = probe.interfaces().map_err(category("network_interfaces"))?;

    let mut nodes = Vec::with_capacity(names.len());
    for name in &names {
        match interface_node(probe, name, primary.as_deref()) {
            Ok(node) => nodes.push(node),
            Err(err) => warn!(interface = %name, error = %err, "skipping interface"),
        }
    }
    Ok(Node::Array(nodes))
}

fn interface_node<P: Probe>(
    probe: &P,
    name: &str,
    primary: Option<&str>,
) -> Result<Node, ProbeError> {
    let config = probe.interface_config(name)?;
    let stats = probe.interface_stats(name)?;

    let mut node = ObjectNode::new();
    node.insert("name", config.name.as_str());
    node.insert("type", config.kind.as_str());
    node.insert("primary", primary == Some(config.name.as_str()));

    let mut address = ObjectNode::new();
    address.insert("ip", config.ip.as_str());
    address.insert("mac", config.mac.as_str());
    node.insert("address", address);

    let mut stat = ObjectNode::new();
    stat.insert("speed", stats.speed);
    stat.insert("rx_packets", stats.rx_packets);
    stat.insert("tx_packets", stats.tx_packets);
    stat.insert("rx_bytes", stats.rx_bytes);
    stat.insert("tx_bytes", stats.tx_bytes);
    node.insert("stat", stat);

    Ok(Node::Object(node))
}

fn processes_node<P: Probe>(probe: &P) -> Result<Node, SnapshotError> {
    let pids = probe.process_ids().map_err(category("processes"))?;
    let mut nodes = Vec::with_capacity(pids.len());
    for pid in pids {
        // A pid vanishing between enumeration and the sub-queries is an
        // expected race, not a snapshot failure.
        match process_node(probe, pid) {
            Ok(node) => nodes.push(node),
            Err(err) => warn!(pid, error = %err, "skipping process"),
        }
    }
    Ok(Node::Array(nodes))
}

fn process_node<P: Probe>(probe: &P, pid: u32) -> Result<Node, ProbeError> {
    let overview = probe.process_overview(pid)?;
    let cpu = probe.process_cpu(pid)?;
    let credentials = probe.process_credentials(pid)?;
    let memory = probe.process_memory(pid)?;
    let args = probe.process_args(pid)?;
    let exe = probe.process_exe(pid)?;

    let mut node = ObjectNode::new();
    node.insert("name", overview.name.as_str());
    node.insert("pid", i64::from(pid));
    node.insert("state", overview.state.as_str());
    node.insert("user", credentials.user.as_str());
    node.insert("group", credentials.group.as_str());
    node.insert("threads", overview.threads);

    let mut cpu_node = ObjectNode::new();
    cpu_node.insert("start_time", cpu.start_time);
    cpu_node.insert("user", cpu.user);
    cpu_node.insert("sys", cpu.sys);
    cpu_node.insert("total", cpu.total);
    cpu_node.insert("last_time", cpu.last_time);
    cpu_node.insert("percent", cpu.percent);
    node.insert("cpu", cpu_node);

    let mut memory_node = ObjectNode::new();
    memory_node.insert("size", memory.size);
    memory_node.insert("resident", memory.resident);
    memory_node.insert("share", memory.share);
    memory_node.insert("minor_faults", memory.minor_faults);
    memory_node.insert("major_faults", memory.major_faults);
    memory_node.insert("page_faults", memory.page_faults);
    node.insert("memory", memory_node);

    node.insert(
        "arguments",
        args.iter()
            .map(|arg| Node::Str(arg.clone()))
            .collect::<Vec<_>>(),
    );

    let mut exe_node = ObjectNode::new();
    exe_node.insert("name", exe.name.as_str());
    exe_node.insert("cwd", exe.cwd.as_str());
    exe_node.insert("root", exe.root.as_str());
    node.insert("exe", exe_node);

    Ok(Node::Object(node))
}

fn network_info_node(info: &NetworkInfo) -> ObjectNode {
    let mut node = ObjectNode::new();
    node.insert("host_name", info.host_name.as_str());
    node.insert("default_gateway", info.default_gateway.as_str());
    node.insert(
        "default_gateway_interface",
        info.default_gateway_interface.as_str(),
    );
    node.insert("primary_dns", info.primary_dns.as_str());
    node
}

fn system_info_node(info: &SystemInfo) -> ObjectNode {
    let mut node = ObjectNode::new();
    node.insert("name", info.name.as_str());
    node.insert("version", info.version.as_str());
    node.insert("arch", info.arch.as_str());
    node.insert("machine", info.machine.as_str());
    node.insert("description", info.description.as_str());
    node.insert("patch_level", info.patch_level.as_str());
    node.insert("vendor", info.vendor.as_str());
    node.insert("vendor_version", info.vendor_version.as_str());
    node.insert("vendor_name", info.vendor_name.as_str());
    node.insert("vendor_code_name", info.vendor_code_name.as_str());
    node
}
