use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lsmq::{Store, StoreConfig};

#[derive(Parser)]
#[command(name = "lsmq-cli", version, about = "Durable queue tooling")]
struct Cli {
    /// JSON store config; its directory is overridden by the command's.
    #[arg(long = "config", global = true)]
    config: Option<PathBuf>,
    #[arg(long = "debug", global = true)]
    debug: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Enqueue {
        dir: PathBuf,
        queue: String,
        payload: String,
    },
    Dequeue {
        dir: PathBuf,
        queue: String,
        #[arg(long = "from")]
        from: Option<u64>,
        #[arg(long = "count", default_value_t = 1)]
        count: usize,
    },
    Size {
        dir: PathBuf,
        queue: String,
    },
    Stats {
        dir: PathBuf,
        queue: String,
    },
    Bench {
        #[arg(long = "dir")]
        dir: Option<PathBuf>,
        #[arg(long = "messages", default_value_t = 100_000)]
        messages: u64,
        #[arg(long = "payload-bytes", default_value_t = 256)]
        payload_bytes: usize,
        #[arg(long = "keep")]
        keep: bool,
    },
    Destroy {
        dir: PathBuf,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut logger = env_logger::Builder::from_default_env();
    if cli.debug {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    let mut out = io::BufWriter::new(io::stdout());
    let base = base_config(cli.config.as_deref(), cli.debug)?;
    match cli.command {
        Commands::Enqueue {
            dir,
            queue,
            payload,
        } => {
            let store = open_store(&base, &dir)?;
            let id = store.queue(&queue)?.enqueue(payload.as_bytes())?;
            writeln!(out, "{id}")?;
            store.close()?;
        }
        Commands::Dequeue {
            dir,
            queue,
            from,
            count,
        } => {
            let store = open_store(&base, &dir)?;
            cmd_dequeue(&store, &queue, from, count, &mut out)?;
            store.close()?;
        }
        Commands::Size { dir, queue } => {
            let store = open_store(&base, &dir)?;
            writeln!(out, "{}", store.queue(&queue)?.approximate_size()?)?;
            store.close()?;
        }
        Commands::Stats { dir, queue } => {
            let store = open_store(&base, &dir)?;
            let stats = store.queue(&queue)?.stats()?;
            writeln!(out, "queue:             {queue}")?;
            writeln!(out, "head:              {}", stats.head)?;
            writeln!(out, "tail:              {}", stats.tail)?;
            writeln!(out, "approximate_size:  {}", stats.approximate_size)?;
            writeln!(out, "last_allocated_id: {}", stats.last_allocated_id)?;
            store.close()?;
        }
        Commands::Bench {
            dir,
            messages,
            payload_bytes,
            keep,
        } => cmd_bench(&base, dir, messages, payload_bytes, keep, &mut out)?,
        Commands::Destroy { dir } => {
            open_store(&base, &dir)?.destroy()?;
            writeln!(out, "destroyed {}", dir.display())?;
        }
    }
    out.flush()?;
    Ok(())
}

fn base_config(path: Option<&Path>, debug: bool) -> Result<StoreConfig> {
    let config = match path {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let debug = debug || config.debug;
    Ok(config.debug(debug))
}

fn open_store(base: &StoreConfig, dir: &Path) -> Result<Store> {
    let config = StoreConfig {
        directory: dir.to_path_buf(),
        ..base.clone()
    };
    Store::open(config).with_context(|| format!("opening store {}", dir.display()))
}

fn cmd_dequeue(
    store: &Store,
    name: &str,
    from: Option<u64>,
    count: usize,
    out: &mut dyn Write,
) -> Result<()> {
    let queue = store.queue(name)?;
    let mut start = from;
    for _ in 0..count {
        let Some(message) = queue.dequeue(start)? else {
            writeln!(out, "(empty)")?;
            break;
        };
        writeln!(
            out,
            "{}\t{}",
            message.id,
            String::from_utf8_lossy(&message.payload)
        )?;
        if start.is_some() {
            match message.id.checked_add(1) {
                Some(next) => start = Some(next),
                None => break,
            }
        }
    }
    Ok(())
}

fn cmd_bench(
    base: &StoreConfig,
    dir: Option<PathBuf>,
    messages: u64,
    payload_bytes: usize,
    keep: bool,
    out: &mut dyn Write,
) -> Result<()> {
    let dir = dir.unwrap_or_else(|| {
        std::env::temp_dir().join(format!("lsmq-bench-{}", std::process::id()))
    });
    let store = open_store(base, &dir)?;
    let queue = store.queue("bench")?;
    let payload = vec![0xAB_u8; payload_bytes];

    let start = Instant::now();
    for _ in 0..messages {
        queue.enqueue(&payload)?;
    }
    let enqueue_elapsed = start.elapsed();

    let start = Instant::now();
    let mut drained = 0u64;
    while queue.dequeue_next()?.is_some() {
        drained += 1;
    }
    let dequeue_elapsed = start.elapsed();

    report(out, "enqueue", messages, enqueue_elapsed.as_secs_f64())?;
    report(out, "dequeue", drained, dequeue_elapsed.as_secs_f64())?;

    drop(queue);
    if keep {
        store.close()?;
        writeln!(out, "kept {}", dir.display())?;
    } else {
        store.destroy()?;
    }
    Ok(())
}

fn report(out: &mut dyn Write, label: &str, count: u64, secs: f64) -> Result<()> {
    let rate = if secs > 0.0 { count as f64 / secs } else { 0.0 };
    writeln!(out, "{label}: {count} msgs in {secs:.3}s ({rate:.0} msg/sec)")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsmq::key;

    #[test]
    fn dequeue_from_stops_at_the_last_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store");
        {
            let keyspace = fjall::Config::new(&path).open_transactional().unwrap();
            let partition = keyspace.open_partition("edge", Default::default()).unwrap();
            let mut tx = keyspace.write_tx();
            tx.insert(&partition, &key::message_key(u64::MAX - 1)[..], &b"penultimate"[..]);
            tx.insert(&partition, &key::message_key(u64::MAX)[..], &b"last"[..]);
            tx.commit().unwrap();
            keyspace.persist(fjall::PersistMode::SyncAll).unwrap();
        }

        let store = open_store(&StoreConfig::default(), &path).unwrap();
        let mut out = Vec::new();
        cmd_dequeue(&store, "edge", Some(u64::MAX - 1), 5, &mut out).unwrap();
        let printed = String::from_utf8(out).unwrap();
        assert_eq!(
            printed,
            format!("{}\tpenultimate\n{}\tlast\n", u64::MAX - 1, u64::MAX)
        );
        store.close().unwrap();
    }
}
