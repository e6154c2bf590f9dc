use crate::config::WatchOptions;
use metri_collect::namespace::NamespaceBuilder;
use metri_common::types::Unit;
use metri_watch::spec::WatchSpec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use sysinfo::System;

/// Names that `[[watches]]` entries may attach to.
pub const METRICS: [&str; 4] = ["LoadAverage", "Used", "Free", "Available"];

const MEGABYTE: f64 = 1024.0 * 1024.0;

type MemoryReading = fn(&System) -> u64;

/// Host metrics declared under `System`: the one-minute load average and
/// memory figures in megabytes under `System/Memory`.
pub struct HostMetrics {
    system: Arc<Mutex<System>>,
    watches: HashMap<String, Vec<WatchSpec>>,
}

impl HostMetrics {
    /// Validates every watch up front so a bad config fails at startup
    /// rather than on the first pass.
    pub fn new(options: &[WatchOptions]) -> anyhow::Result<Self> {
        let mut watches: HashMap<String, Vec<WatchSpec>> = HashMap::new();
        for option in options {
            if !METRICS.contains(&option.metric.as_str()) {
                anyhow::bail!(
                    "watch '{}' refers to unknown host metric '{}'",
                    option.watch.name,
                    option.metric
                );
            }
            let spec = WatchSpec::try_from(option.watch.clone())?;
            watches.entry(option.metric.clone()).or_default().push(spec);
        }
        Ok(Self {
            system: Arc::new(Mutex::new(System::new())),
            watches,
        })
    }

    pub fn watch_count(&self) -> usize {
        self.watches.values().map(Vec::len).sum()
    }

    fn specs(&self, metric: &str) -> Vec<WatchSpec> {
        self.watches.get(metric).cloned().unwrap_or_default()
    }

    pub fn define(self, root: &mut NamespaceBuilder) {
        root.namespace("System", |system| {
            let load_watches = self.specs("LoadAverage");
            system.metric("LoadAverage", move |m| {
                m.value(System::load_average().one).unit(Unit::None);
                for spec in &load_watches {
                    m.watch(spec.clone());
                }
                Ok(())
            });

            system.namespace("Memory", |memory| {
                let readings: [(&'static str, MemoryReading); 3] = [
                    ("Used", System::used_memory),
                    ("Free", System::free_memory),
                    ("Available", System::available_memory),
                ];
                for (name, read) in readings {
                    let host = Arc::clone(&self.system);
                    let specs = self.specs(name);
                    memory.metric(name, move |m| {
                        let mut sys = host.lock().unwrap_or_else(PoisonError::into_inner);
                        sys.refresh_memory();
                        m.value(read(&*sys) as f64 / MEGABYTE).unit(Unit::Megabytes);
                        for spec in &specs {
                            m.watch(spec.clone());
                        }
                        Ok(())
                    });
                }
            });
        });
    }
}
