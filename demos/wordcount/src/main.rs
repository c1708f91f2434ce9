use anyhow::{Context, Result};
use clap::Parser;
use mrlocal::{emit, Job, RunConfig, Values};
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::info;
use walkdir::WalkDir;

#[derive(Parser, Debug)]
struct Args {
    /// Input files or directories (searched recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Mapper threads (defaults to MRLOCAL_NUM_MAPPERS or the CPU count)
    #[arg(long)]
    mappers: Option<usize>,
    /// Reducer threads, one per partition
    #[arg(long)]
    reducers: Option<usize>,
    /// Print the run report as JSON on stderr
    #[arg(long)]
    stats: bool,
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_']+").expect("static regex"))
}

fn list_files(inputs: &[PathBuf]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for input in inputs {
        for entry in WalkDir::new(input) {
            let entry = entry.with_context(|| format!("walk {}", input.display()))?;
            if entry.file_type().is_file() {
                files.push(entry.path().display().to_string());
            }
        }
    }
    files.sort();
    Ok(files)
}

fn wordcount_map(path: &str) -> Result<()> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {}", path))?;
    for m in word_re().find_iter(&content) {
        emit(m.as_str().to_lowercase(), "1")?;
    }
    Ok(())
}

fn sum_values(values: &mut Values<'_>) -> Result<u64> {
    let mut total = 0u64;
    while let Some(v) = values.next_value() {
        total += std::str::from_utf8(v)?.parse::<u64>()?;
    }
    Ok(total)
}

struct PrintingReducer<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> mrlocal::Reducer for PrintingReducer<W> {
    fn reduce(&self, key: &[u8], values: &mut Values<'_>, _partition: usize) -> Result<()> {
        let total = sum_values(values)?;
        let mut out = self.out.lock().map_err(|_| anyhow::anyhow!("output lock poisoned"))?;
        writeln!(out, "{}\t{}", String::from_utf8_lossy(key), total)?;
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut config = RunConfig::from_env();
    if let Some(n) = args.mappers { config.num_mappers = n; }
    if let Some(n) = args.reducers { config.num_reducers = n; }

    let files = list_files(&args.inputs)?;
    info!(files = files.len(), mappers = config.num_mappers, reducers = config.num_reducers, "wordcount starting");
    let reducer = PrintingReducer { out: Mutex::new(std::io::stdout()) };
    let report = Job::new().inputs(files).config(config).run(wordcount_map, reducer)?;
    if args.stats {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}
