//! Reference consumer: flood a pool with trivial tasks and report
//! throughput. Not part of the core library.

use std::time::Instant;

use clap::{Parser, ValueEnum};
use threadmill::prelude::*;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Preset {
    /// Blank defaults (Fifo, 16 max, 8 initial).
    Blank,
    /// One worker per hardware thread.
    #[default]
    Common,
    /// Compute-heavy sizing.
    CpuBound,
    /// I/O-heavy sizing.
    IoBound,
    /// Timer/housekeeping sizing.
    TimeBound,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum Policy {
    #[default]
    Fifo,
    Lifo,
    Prio,
    Rand,
}

#[derive(Parser)]
#[command(name = "stress", about = "threadmill throughput tester", version)]
struct Cli {
    /// Pool sizing preset
    #[arg(long, value_enum, default_value = "common")]
    preset: Preset,

    /// Queue dequeue policy
    #[arg(long, value_enum, default_value = "fifo")]
    policy: Policy,

    /// Number of tasks to submit
    #[arg(long, default_value_t = 100_000)]
    tasks: usize,

    /// Resize the pool to this many workers before submitting
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.preset {
        Preset::Blank => PoolConfig::default(),
        Preset::Common => PoolConfig::common(),
        Preset::CpuBound => PoolConfig::cpu_bound(),
        Preset::IoBound => PoolConfig::io_bound(),
        Preset::TimeBound => PoolConfig::time_bound(),
    };

    let policy = match cli.policy {
        Policy::Fifo => TaskPolicy::Fifo,
        Policy::Lifo => TaskPolicy::Lifo,
        Policy::Prio => TaskPolicy::Prio,
        Policy::Rand => TaskPolicy::Rand,
    };

    let pool: ThreadPool<usize> = ThreadPoolBuilder::from_config(config)
        .policy(policy)
        .build()?;

    if let Some(workers) = cli.workers {
        pool.resize_workers(workers);
    }

    let report = pool.report();
    eprintln!(
        "pool up: {} workers, policy {:?}, {} tasks",
        report.running, policy, cli.tasks
    );

    let start = Instant::now();

    let handles: Vec<_> = (0..cli.tasks)
        .map(|i| pool.emplace(move || i.wrapping_mul(2654435761)))
        .collect();

    let mut checksum = 0usize;
    for handle in handles {
        checksum = checksum.wrapping_add(handle.wait()?);
    }

    let elapsed = start.elapsed();
    let rate = cli.tasks as f64 / elapsed.as_secs_f64();

    println!(
        "{} tasks in {:.3}s ({:.0} tasks/s, checksum {:x})",
        cli.tasks,
        elapsed.as_secs_f64(),
        rate,
        checksum
    );

    Ok(())
}
