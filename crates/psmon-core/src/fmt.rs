//! Row formatting for the sampler output streams.
//!
//! Every stream is a header line followed by one row per sample; fields are
//! joined with `", "` and each line ends with `'\n'`. Header and rows are built
//! from the same column tables so they cannot drift apart.

use crate::sampler::procset::SampleRow;
use crate::sampler::system::SystemRow;

/// Field separator shared by headers and rows.
pub const SEPARATOR: &str = ", ";

/// One output column: its header name and how to render it from a record.
pub struct Column<T> {
    pub name: &'static str,
    pub value: fn(&T) -> String,
}

/// Bytes to kibibytes, truncating.
pub fn kib(bytes: u64) -> u64 {
    bytes / 1024
}

/// Bytes to gibibytes.
pub fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1u64 << 30) as f64
}

/// Percentages and other ratios: three decimal places.
pub fn fixed3(value: f64) -> String {
    format!("{:.3}", value)
}

/// Columns following `Timestamp, Uptime` in the process-set stream.
pub const PROCESS_SET_COLUMNS: &[Column<SampleRow>] = &[
    Column {
        name: "io.read",
        value: |r| r.record.read_count.to_string(),
    },
    Column {
        name: "io.read.KB",
        value: |r| kib(r.record.read_bytes).to_string(),
    },
    Column {
        name: "io.write",
        value: |r| r.record.write_count.to_string(),
    },
    Column {
        name: "io.write.KB",
        value: |r| kib(r.record.write_bytes).to_string(),
    },
    Column {
        name: "mem.rss.KB",
        value: |r| kib(r.record.rss_bytes).to_string(),
    },
    Column {
        name: "nctxsw",
        value: |r| r.record.ctx_switches.to_string(),
    },
    Column {
        name: "nthreads",
        value: |r| r.record.num_threads.to_string(),
    },
    Column {
        name: "%CPU",
        value: |r| fixed3(r.record.cpu_percent),
    },
    Column {
        name: "%MEM",
        value: |r| fixed3(r.record.mem_percent),
    },
];

fn line(fields: impl IntoIterator<Item = String>) -> String {
    let mut out = fields.into_iter().collect::<Vec<_>>().join(SEPARATOR);
    out.push('\n');
    out
}

/// Header line of the process-set stream.
pub fn process_set_header() -> String {
    line(
        ["Timestamp", "Uptime"]
            .into_iter()
            .chain(PROCESS_SET_COLUMNS.iter().map(|c| c.name))
            .map(str::to_string),
    )
}

/// One process-set row in header order.
pub fn format_process_row(row: &SampleRow) -> String {
    line(
        [row.timestamp.to_string(), row.uptime.to_string()]
            .into_iter()
            .chain(PROCESS_SET_COLUMNS.iter().map(|c| (c.value)(row))),
    )
}

/// Memory, swap, disk and host columns that follow the per-CPU block.
const SYSTEM_TAIL_COLUMNS: &[Column<SystemRow>] = &[
    Column {
        name: "%MEM",
        value: |r| fixed3(r.mem_percent),
    },
    Column {
        name: "mem.total.KB",
        value: |r| r.mem_total_kb.to_string(),
    },
    Column {
        name: "mem.used.KB",
        value: |r| r.mem_used_kb.to_string(),
    },
    Column {
        name: "mem.avail.KB",
        value: |r| r.mem_available_kb.to_string(),
    },
    Column {
        name: "mem.free.KB",
        value: |r| r.mem_free_kb.to_string(),
    },
    Column {
        name: "%SWAP",
        value: |r| fixed3(r.swap_percent),
    },
    Column {
        name: "swap.total.KB",
        value: |r| r.swap_total_kb.to_string(),
    },
    Column {
        name: "swap.used.KB",
        value: |r| r.swap_used_kb.to_string(),
    },
    Column {
        name: "swap.free.KB",
        value: |r| r.swap_free_kb.to_string(),
    },
    Column {
        name: "io.read",
        value: |r| r.disk.read_count.to_string(),
    },
    Column {
        name: "io.write",
        value: |r| r.disk.write_count.to_string(),
    },
    Column {
        name: "io.read.KB",
        value: |r| kib(r.disk.read_bytes).to_string(),
    },
    Column {
        name: "io.write.KB",
        value: |r| kib(r.disk.write_bytes).to_string(),
    },
    Column {
        name: "io.read.ms",
        value: |r| r.disk.read_time_ms.to_string(),
    },
    Column {
        name: "io.write.ms",
        value: |r| r.disk.write_time_ms.to_string(),
    },
    Column {
        name: "disk.total.GB",
        value: |r| fixed3(gib(r.disk_usage.total)),
    },
    Column {
        name: "disk.used.GB",
        value: |r| fixed3(gib(r.disk_usage.used)),
    },
    Column {
        name: "disk.free.GB",
        value: |r| fixed3(gib(r.disk_usage.free)),
    },
    Column {
        name: "hostname",
        value: |r| r.hostname.clone(),
    },
];

/// Header line of the whole-machine stream for a machine with `ncpu` CPUs.
pub fn system_header(ncpu: usize) -> String {
    let mut fields: Vec<String> = ["Timestamp", "Uptime", "NCPU", "%CPU"]
        .into_iter()
        .map(str::to_string)
        .collect();
    fields.extend((0..ncpu).map(|i| format!("%CPU{}", i)));
    fields.extend(SYSTEM_TAIL_COLUMNS.iter().map(|c| c.name.to_string()));
    line(fields)
}

/// One whole-machine row in header order.
pub fn format_system_row(row: &SystemRow) -> String {
    let mut fields = vec![
        row.timestamp.to_string(),
        row.uptime.to_string(),
        row.ncpu.to_string(),
        fixed3(row.cpu_percent),
    ];
    fields.extend(row.per_cpu_percent.iter().map(|p| fixed3(*p)));
    fields.extend(SYSTEM_TAIL_COLUMNS.iter().map(|c| (c.value)(row)));
    line(fields)
}
