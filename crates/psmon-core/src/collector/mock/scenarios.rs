//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` filesystem states
//! for testing process-tree sampling and whole-machine counters.

use super::filesystem::MockFs;
use crate::collector::traits::DiskUsage;

/// Compact description of a process for [`MockFs::add_simple_process`].
#[derive(Debug, Clone, Default)]
pub struct MockProcess {
    pub pid: u32,
    pub ppid: u32,
    pub name: &'static str,
    pub syscr: u64,
    pub syscw: u64,
    pub read_bytes: u64,
    pub write_bytes: u64,
    /// Resident pages (4 KiB each in tests).
    pub rss_pages: u64,
    pub utime: u64,
    pub stime: u64,
    pub threads: u32,
    pub voluntary_ctxt: u64,
    pub nonvoluntary_ctxt: u64,
    pub start_ticks: u64,
}

impl MockFs {
    /// Adds (or replaces) a process from a [`MockProcess`] description.
    pub fn add_simple_process(&mut self, p: &MockProcess) {
        let stat = format!(
            "{pid} ({name}) S {ppid} {pid} {pid} 0 -1 4194304 0 0 0 0 {utime} {stime} 0 0 20 0 {threads} 0 {start} 1000000 {rss} 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            pid = p.pid,
            name = p.name,
            ppid = p.ppid,
            utime = p.utime,
            stime = p.stime,
            threads = p.threads,
            start = p.start_ticks,
            rss = p.rss_pages,
        );
        let status = format!(
            "Name:\t{}\nPid:\t{}\nPPid:\t{}\nThreads:\t{}\nvoluntary_ctxt_switches:\t{}\nnonvoluntary_ctxt_switches:\t{}\n",
            p.name, p.pid, p.ppid, p.threads, p.voluntary_ctxt, p.nonvoluntary_ctxt
        );
        let io = format!(
            "rchar: 0\nwchar: 0\nsyscr: {}\nsyscw: {}\nread_bytes: {}\nwrite_bytes: {}\ncancelled_write_bytes: 0\n",
            p.syscr, p.syscw, p.read_bytes, p.write_bytes
        );
        self.add_process(p.pid, &stat, &status, &io, &format!("{}\n", p.name));
    }

    /// Creates a typical system with a few processes.
    ///
    /// Includes: init (PID 1), bash shell, and a `cat` child of the shell.
    /// System-wide files cover memory, CPU, disks, hostname and `/` capacity.
    pub fn typical_system() -> Self {
        let mut fs = Self::new();

        fs.add_file("/proc/sys/kernel/hostname", "testhost\n");
        fs.add_file(
            "/proc/meminfo",
            "\
MemTotal:       16384000 kB
MemFree:         8192000 kB
MemAvailable:   12000000 kB
Buffers:          512000 kB
Cached:          2048000 kB
SwapCached:            0 kB
SwapTotal:       4096000 kB
SwapFree:        3072000 kB
SReclaimable:     256000 kB
",
        );
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );

        // Whole disks have a /sys/block entry; partitions do not.
        fs.add_file(
            "/proc/diskstats",
            "\
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 80 800000 4000 5000 40 400000 2500 0 3500 6500 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
",
        );
        fs.add_dir("/sys/block/sda");
        fs.add_dir("/sys/block/nvme0n1");

        fs.set_disk_usage(
            "/",
            DiskUsage {
                total: 100 << 30,
                used: 40 << 30,
                free: 60 << 30,
            },
        );

        // PID 1 - init/systemd
        fs.add_process(
            1,
            "1 (systemd) S 0 1 1 0 -1 4194560 50000 1000000 100 500 1000 500 2000 1000 20 0 1 0 1 170000000 3000 18446744073709551615 0 0 0 0 0 0 0 0 1073745152 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tsystemd
Pid:\t1
PPid:\t0
Threads:\t1
voluntary_ctxt_switches:\t1000
nonvoluntary_ctxt_switches:\t100
",
            "rchar: 100000000\nwchar: 50000000\nsyscr: 50000\nsyscw: 25000\nread_bytes: 10000000\nwrite_bytes: 5000000\ncancelled_write_bytes: 0\n",
            "systemd\n",
        );

        // PID 1000 - bash shell
        fs.add_process(
            1000,
            "1000 (bash) S 999 1000 1000 34816 1001 4194304 5000 50000 0 0 100 50 200 100 20 0 1 0 100000 25000000 2000 18446744073709551615 0 0 0 0 0 0 65536 3670020 1266777851 0 0 0 17 2 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tbash
Pid:\t1000
PPid:\t999
Threads:\t1
voluntary_ctxt_switches:\t500
nonvoluntary_ctxt_switches:\t50
",
            "rchar: 1000000\nwchar: 500000\nsyscr: 5000\nsyscw: 2500\nread_bytes: 100000\nwrite_bytes: 50000\ncancelled_write_bytes: 0\n",
            "bash\n",
        );

        // PID 1001 - cat command (child of bash)
        fs.add_process(
            1001,
            "1001 (cat) R 1000 1000 1000 34816 1001 4194304 100 0 0 0 5 2 0 0 20 0 1 0 100100 5000000 500 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 1 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tcat
Pid:\t1001
PPid:\t1000
Threads:\t1
voluntary_ctxt_switches:\t10
nonvoluntary_ctxt_switches:\t2
",
            "rchar: 10000\nwchar: 10000\nsyscr: 100\nsyscw: 100\nread_bytes: 4096\nwrite_bytes: 4096\ncancelled_write_bytes: 0\n",
            "cat\n",
        );

        fs
    }

    /// Creates a system running a small supervised worker tree.
    ///
    /// ```text
    /// 1 systemd
    /// ├── 2000 supervisor
    /// │   ├── 2001 worker
    /// │   │   └── 2003 helper
    /// │   └── 2002 worker
    /// └── 2100 Indexer
    /// ```
    pub fn process_tree() -> Self {
        let mut fs = Self::typical_system();

        for p in Self::process_tree_members() {
            fs.add_simple_process(&p);
        }

        fs
    }

    /// The processes added by [`MockFs::process_tree`], for computing expectations.
    pub fn process_tree_members() -> Vec<MockProcess> {
        vec![
            MockProcess {
                pid: 2000,
                ppid: 1,
                name: "supervisor",
                syscr: 10,
                syscw: 5,
                read_bytes: 2048,
                write_bytes: 1024,
                rss_pages: 100,
                utime: 10,
                stime: 5,
                threads: 2,
                voluntary_ctxt: 7,
                nonvoluntary_ctxt: 3,
                start_ticks: 200000,
            },
            MockProcess {
                pid: 2001,
                ppid: 2000,
                name: "worker",
                syscr: 20,
                syscw: 10,
                read_bytes: 4096,
                write_bytes: 2048,
                rss_pages: 200,
                utime: 20,
                stime: 10,
                threads: 4,
                voluntary_ctxt: 15,
                nonvoluntary_ctxt: 5,
                start_ticks: 200100,
            },
            MockProcess {
                pid: 2002,
                ppid: 2000,
                name: "worker",
                syscr: 30,
                syscw: 15,
                read_bytes: 1000,
                write_bytes: 1000,
                rss_pages: 300,
                utime: 30,
                stime: 15,
                threads: 1,
                voluntary_ctxt: 25,
                nonvoluntary_ctxt: 5,
                start_ticks: 200200,
            },
            MockProcess {
                pid: 2003,
                ppid: 2001,
                name: "helper",
                syscr: 40,
                syscw: 20,
                read_bytes: 0,
                write_bytes: 0,
                rss_pages: 400,
                utime: 40,
                stime: 20,
                threads: 1,
                voluntary_ctxt: 30,
                nonvoluntary_ctxt: 10,
                start_ticks: 200300,
            },
            MockProcess {
                pid: 2100,
                ppid: 1,
                name: "Indexer",
                syscr: 1,
                syscw: 1,
                read_bytes: 512,
                write_bytes: 512,
                rss_pages: 50,
                utime: 1,
                stime: 1,
                threads: 1,
                voluntary_ctxt: 1,
                nonvoluntary_ctxt: 1,
                start_ticks: 210000,
            },
        ]
    }

    /// Creates a system with a zombie process.
    pub fn with_zombie_process() -> Self {
        let mut fs = Self::typical_system();

        // Add zombie process (state 'Z')
        fs.add_process(
            4000,
            "4000 (defunct) Z 1000 4000 1000 0 -1 4194308 0 0 0 0 0 0 0 0 20 0 1 0 400000 0 0 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 -1 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tdefunct
Pid:\t4000
PPid:\t1000
",
            "", // No io file for zombie
            "defunct\n",
        );

        fs
    }

    /// Creates a system with processes that have special characters in names.
    pub fn with_special_names() -> Self {
        let mut fs = Self::typical_system();

        // Process with spaces in name (like Firefox's "Web Content")
        fs.add_process(
            5000,
            "5000 (Web Content) S 4999 5000 4999 0 -1 4194304 100000 0 500 0 5000 1000 0 0 20 0 20 0 500000 2000000000 50000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\tWeb Content
Pid:\t5000
PPid:\t4999
Threads:\t20
voluntary_ctxt_switches:\t50000
nonvoluntary_ctxt_switches:\t10000
",
            "rchar: 500000000\nwchar: 100000000\nsyscr: 100000\nsyscw: 50000\nread_bytes: 100000000\nwrite_bytes: 50000000\ncancelled_write_bytes: 1000000\n",
            "Web Content\n",
        );

        // Process with parentheses in name
        fs.add_process(
            5001,
            "5001 (test(1)) S 1 5001 5001 0 -1 4194304 1000 0 0 0 10 5 0 0 20 0 1 0 500100 10000000 1000 18446744073709551615 0 0 0 0 0 0 0 0 0 0 0 0 17 0 0 0 0 0 0 0 0 0 0 0 0 0 0",
            "\
Name:\ttest(1)
Pid:\t5001
PPid:\t1
Threads:\t1
voluntary_ctxt_switches:\t100
nonvoluntary_ctxt_switches:\t10
",
            "rchar: 10000\nwchar: 5000\nsyscr: 100\nsyscw: 50\nread_bytes: 4096\nwrite_bytes: 2048\ncancelled_write_bytes: 0\n",
            "test(1)\n",
        );

        fs
    }
}
