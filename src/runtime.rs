//! Per-run execution context: worker count, verbosity and run id, set up once
//! in `main` and handed down explicitly.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadConfig {
    pub count: usize,
    pub source: String,
}

const ENV_HINTS: [&str; 6] = [
    "DHALO_THREADS",
    "RAYON_NUM_THREADS",
    "SLURM_CPUS_PER_TASK",
    "SLURM_CPUS_ON_NODE",
    "PBS_NP",
    "OMP_NUM_THREADS",
];

fn parse_env_threads(keys: &[&str]) -> Option<ThreadConfig> {
    for &key in keys {
        if let Ok(v) = std::env::var(key) {
            if let Ok(val) = v.parse::<usize>() {
                if val > 0 {
                    return Some(ThreadConfig {
                        count: val,
                        source: key.to_string(),
                    });
                }
            }
        }
    }
    None
}

/// Worker count from the first usable scheduler hint, else the core count.
pub fn detect_thread_config() -> ThreadConfig {
    if let Some(cfg) = parse_env_threads(&ENV_HINTS) {
        return cfg;
    }

    let fallback = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(1);

    ThreadConfig {
        count: fallback,
        source: "available_parallelism".to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    /// 0 = warnings only, 1 = info, 2 = debug, 3+ = trace.
    pub verbosity: u8,
    pub threads: ThreadConfig,
    /// Show progress bars on stderr.
    pub progress: bool,
}

impl RunContext {
    pub fn new(run_id: Option<String>, verbosity: u8, threads: Option<usize>) -> Self {
        let threads = match threads.filter(|&n| n > 0) {
            Some(count) => ThreadConfig {
                count,
                source: "--threads".to_string(),
            },
            None => detect_thread_config(),
        };
        RunContext {
            run_id: run_id.unwrap_or_else(|| format!("dhalo-{}", std::process::id())),
            verbosity,
            threads,
            progress: verbosity > 0,
        }
    }

    /// Single-threaded, silent context for tests and library callers.
    pub fn quiet(workers: usize) -> Self {
        RunContext {
            run_id: "dhalo".to_string(),
            verbosity: 0,
            threads: ThreadConfig {
                count: workers.max(1),
                source: "explicit".to_string(),
            },
            progress: false,
        }
    }

    pub fn workers(&self) -> usize {
        self.threads.count
    }

    fn default_filter(&self) -> &'static str {
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Installs the stderr log subscriber. `RUST_LOG` wins over verbosity.
    /// Only the first call in a process has any effect.
    pub fn init_logging(&self) {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.default_filter()));
            let installed = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .try_init();
            if let Err(err) = installed {
                eprintln!("[log] warn: failed to install subscriber ({err}); continuing without");
            }
        });
        tracing::info!(
            run = %self.run_id,
            threads = self.threads.count,
            hint = %self.threads.source,
            "run context ready"
        );
    }
}
