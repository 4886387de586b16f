//! Pure parsers for the procfs-backed metric categories. All functions take
//! file contents as `&str` so they can be exercised on literal fixtures.

use std::net::Ipv4Addr;

use super::CpuCoreStats;

/// Per-core lines of `/proc/stat` (`cpu0 ...`, `cpu1 ...`); the aggregate
/// `cpu` line is skipped. Field order: user nice system idle iowait irq
/// softirq steal.
pub fn parse_stat_cores(content: &str) -> Vec<CpuCoreStats> {
    let mut cores = Vec::new();
    for line in content.lines() {
        let mut fields = line.split_whitespace();
        let label = match fields.next() {
            Some(label) => label,
            None => continue,
        };
        if !label.starts_with("cpu") || !label[3..].chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if label.len() == 3 {
            continue;
        }

        let mut ticks = [0_u64; 8];
        for slot in ticks.iter_mut() {
            *slot = fields
                .next()
                .and_then(|v| v.parse().ok())
                .unwrap_or_default();
        }
        let [user, nice, sys, idle, wait, irq, soft_irq, stolen] = ticks;
        cores.push(CpuCoreStats {
            user,
            sys,
            nice,
            idle,
            wait,
            irq,
            soft_irq,
            stolen,
            total: ticks.iter().sum(),
        });
    }
    cores
}

/// First value of `/proc/uptime`: seconds since boot with centisecond
/// resolution.
pub fn parse_uptime(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}

#[derive(Debug, Clone)]
pub struct MountEntry {
    pub dev: String,
    pub dir: String,
    pub sys_type: String,
    pub options: String,
}

/// `/proc/mounts` lines: device mount-point fstype options dump pass.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    let mut mounts = Vec::new();
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            continue;
        }
        mounts.push(MountEntry {
            dev: parts[0].to_string(),
            dir: parts[1].to_string(),
            sys_type: parts[2].to_string(),
            options: parts[3].to_string(),
        });
    }
    mounts
}

/// The counters this daemon needs from `/proc/<pid>/stat`.
#[derive(Debug, Clone, Default)]
pub struct PidStat {
    pub minor_faults: u64,
    pub major_faults: u64,
    pub utime: u64,
    pub stime: u64,
    pub num_threads: u64,
}

/// Parses `/proc/<pid>/stat`. The comm field may contain spaces and
/// parentheses, so fields are counted from the last `)`.
pub fn parse_pid_stat(content: &str) -> Option<PidStat> {
    let after_comm = content.rfind(')')? + 1;
    let fields: Vec<&str> = content[after_comm..].split_whitespace().collect();
    // Fields after comm: state(0) ppid(1) pgrp(2) session(3) tty_nr(4)
    // tpgid(5) flags(6) minflt(7) cminflt(8) majflt(9) cmajflt(10)
    // utime(11) stime(12) cutime(13) cstime(14) priority(15) nice(16)
    // num_threads(17)
    Some(PidStat {
        minor_faults: fields.get(7)?.parse().ok()?,
        major_faults: fields.get(9)?.parse().ok()?,
        utime: fields.get(11)?.parse().ok()?,
        stime: fields.get(12)?.parse().ok()?,
        num_threads: fields.get(17)?.parse().ok()?,
    })
}

/// Shared pages: third field of `/proc/<pid>/statm`.
pub fn parse_statm_shared_pages(content: &str) -> Option<u64> {
    content.split_whitespace().nth(2)?.parse().ok()
}

const RTF_UP: u32 = 0x0001;
const RTF_GATEWAY: u32 = 0x0002;

/// Default route from `/proc/net/route`: the up gateway entry with an
/// all-zero destination. Addresses are hex in little-endian byte order.
pub fn parse_default_route(content: &str) -> Option<(String, Ipv4Addr)> {
    for line in content.lines().skip(1) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            continue;
        }
        let destination = match u32::from_str_radix(fields[1], 16) {
            Ok(destination) => destination,
            Err(_) => continue,
        };
        let flags = u32::from_str_radix(fields[3], 16).unwrap_or(0);
        if destination != 0 || flags & (RTF_UP | RTF_GATEWAY) != (RTF_UP | RTF_GATEWAY) {
            continue;
        }
        let gateway = match u32::from_str_radix(fields[2], 16) {
            Ok(gateway) => gateway,
            Err(_) => continue,
        };
        let bytes = gateway.to_le_bytes();
        return Some((
            fields[0].to_string(),
            Ipv4Addr::new(bytes[0], bytes[1], bytes[2], bytes[3]),
        ));
    }
    None
}

/// First `nameserver` entry of `/etc/resolv.conf`.
pub fn parse_resolv_conf(content: &str) -> Option<String> {
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("nameserver") {
            let server = rest.trim();
            if !server.is_empty() {
                return Some(server.to_string());
            }
        }
    }
    None
}

/// Coarse filesystem classification keyed on the fstype reported by the
/// mount table.
pub fn filesystem_kind(sys_type: &str) -> &'static str {
    match sys_type {
        "ext2" | "ext3" | "ext4" | "xfs" | "btrfs" | "zfs" | "f2fs" | "reiserfs" | "jfs"
        | "vfat" | "exfat" | "ntfs" | "fuseblk" => "local",
        "nfs" | "nfs4" | "cifs" | "smbfs" | "sshfs" | "fuse.sshfs" | "9p" => "remote",
        "tmpfs" | "ramfs" | "devtmpfs" | "hugetlbfs" => "ram",
        "swap" => "swap",
        "iso9660" | "udf" => "cdrom",
        _ => "none",
    }
}

/// Interface classification from the conventional Linux name prefixes.
pub fn interface_kind(name: &str) -> &'static str {
    if name == "lo" || name.starts_with("lo:") {
        "Local Loopback"
    } else if name.starts_with("wl") {
        "Wireless"
    } else if name.starts_with("eth") || name.starts_with("en") || name.starts_with("em") {
        "Ethernet"
    } else if name.starts_with("br") || name.starts_with("docker") || name.starts_with("virbr") {
        "Bridge"
    } else if name.starts_with("tun") || name.starts_with("tap") || name.starts_with("wg") {
        "Tunnel"
    } else {
        "Unknown"
    }
}
