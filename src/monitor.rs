//! Background system resource sampling.
//!
//! A sampler thread refreshes CPU, memory and disk figures on a fixed
//! interval; the latest snapshot is readable at any time from the UI or
//! orchestrator without blocking on a refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use sysinfo::{Disks, System};

use crate::defaults;

/// One point-in-time resource snapshot, all values in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResourceSnapshot {
    pub cpu: f32,
    pub memory: f32,
    pub disk: f32,
}

/// Background resource monitor. Stopped explicitly or on drop.
pub struct ResourceMonitor {
    snapshot: Arc<Mutex<ResourceSnapshot>>,
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ResourceMonitor {
    /// Start sampling on the default interval.
    pub fn start() -> Self {
        Self::start_with_interval(defaults::MONITOR_INTERVAL)
    }

    /// Start sampling on the given interval.
    pub fn start_with_interval(interval: Duration) -> Self {
        let snapshot = Arc::new(Mutex::new(ResourceSnapshot::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let thread_snapshot = Arc::clone(&snapshot);
        let thread_stop = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            let mut system = System::new();
            let mut disks = Disks::new_with_refreshed_list();
            while !thread_stop.load(Ordering::SeqCst) {
                let sample = sample(&mut system, &mut disks);
                *thread_snapshot
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = sample;
                // Sleep in slices so stop() is responsive.
                let mut remaining = interval;
                while !remaining.is_zero() && !thread_stop.load(Ordering::SeqCst) {
                    let slice = remaining.min(Duration::from_millis(200));
                    std::thread::sleep(slice);
                    remaining = remaining.saturating_sub(slice);
                }
            }
        });

        Self {
            snapshot,
            stop,
            handle: Some(handle),
        }
    }

    /// Latest snapshot; never blocks on a refresh.
    pub fn snapshot(&self) -> ResourceSnapshot {
        *self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stop the sampler thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sample(system: &mut System, disks: &mut Disks) -> ResourceSnapshot {
    system.refresh_cpu_usage();
    system.refresh_memory();
    disks.refresh(true);

    let cpu = system.global_cpu_usage();

    let total_memory = system.total_memory();
    let memory = if total_memory > 0 {
        system.used_memory() as f32 / total_memory as f32 * 100.0
    } else {
        0.0
    };

    let (total_space, available_space) = disks
        .iter()
        .fold((0u64, 0u64), |(total, avail), disk| {
            (total + disk.total_space(), avail + disk.available_space())
        });
    let disk = if total_space > 0 {
        (total_space - available_space) as f32 / total_space as f32 * 100.0
    } else {
        0.0
    };

    ResourceSnapshot { cpu, memory, disk }
}
