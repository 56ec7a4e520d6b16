//! FastSmap CLI entry point
//!
//! Converts the annotation objects of `.ace` dumps into flat feature tables.

use clap::{Parser, Subcommand};
use fast_smap::convert::ConversionOptions;
use fast_smap::core::{parse_ace_file, MemoryStore, MethodTable, ObjKey};
use fast_smap::formats::{self, RootRequest};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "fast-smap")]
#[command(about = "Annotation-to-feature projection for nested sequence assemblies")]
#[command(version)]
#[command(author = "FastSmap Contributors")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the objects under one or more roots into a feature table
    Convert {
        /// Input .ace files (plain, .gz or .bz2)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Root objects as NAME or CLASS:NAME
        #[arg(short = 'r', long = "root", required = true)]
        roots: Vec<String>,
        /// Class for roots given without one
        #[arg(long, default_value = "Sequence")]
        class: String,
        /// First base of the area, in root coordinates
        #[arg(long, requires = "end")]
        start: Option<i64>,
        /// Last base of the area, in root coordinates
        #[arg(long, requires = "start")]
        end: Option<i64>,
        /// Complement the strands of the whole conversion
        #[arg(long)]
        reverse: bool,
        /// Only convert objects with these methods
        #[arg(short = 'm', long = "method")]
        methods: Vec<String>,
        /// Never convert objects with these methods
        #[arg(long = "exclude-method")]
        exclude_methods: Vec<String>,
        /// Also convert objects whose method is marked calculated
        #[arg(long)]
        include_calculated: bool,
        /// Output file (optional, stdout if not specified)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
        /// Number of threads
        #[arg(short = 't', long, default_value = "1")]
        threads: usize,
    },
    /// Summarise the objects of .ace files
    Stats {
        /// Input .ace files (plain, .gz or .bz2)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

fn load_store(inputs: &[PathBuf]) -> anyhow::Result<MemoryStore> {
    let start = Instant::now();
    let mut store = MemoryStore::new();
    for input in inputs {
        eprintln!("Loading annotation file: {:?}", input);
        parse_ace_file(input, &mut store).map_err(|e| anyhow::anyhow!("Failed to load {:?}: {}", input, e))?;
    }
    eprintln!("{} objects loaded in {:.2}s", store.len(), start.elapsed().as_secs_f64());
    Ok(store)
}

fn parse_root(root: &str, default_class: &str) -> ObjKey {
    match root.split_once(':') {
        Some((class, name)) if !class.is_empty() && !name.is_empty() => ObjKey::new(class, name),
        _ => ObjKey::new(default_class, root),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let start = Instant::now();

    match cli.command {
        Commands::Convert {
            inputs,
            roots,
            class,
            start: area_start,
            end: area_end,
            reverse,
            methods,
            exclude_methods,
            include_calculated,
            output,
            threads,
        } => {
            let store = load_store(&inputs)?;
            let catalog = MethodTable::from_store(&store);
            let area = area_start.zip(area_end);
            let requests: Vec<RootRequest> = roots
                .iter()
                .map(|root| RootRequest { key: parse_root(root, &class), area })
                .collect();
            let options = ConversionOptions {
                include_methods: methods.into_iter().collect(),
                exclude_methods: exclude_methods.into_iter().collect(),
                include_calculated,
                reverse,
            };

            let mut out: Box<dyn Write> = match &output {
                Some(path) => {
                    eprintln!("Converting {} roots -> {:?}", requests.len(), path);
                    Box::new(BufWriter::with_capacity(128 * 1024, File::create(path)?))
                }
                None => Box::new(BufWriter::with_capacity(128 * 1024, io::stdout().lock())),
            };
            let stats = formats::convert_to_table(&store, &catalog, &requests, &options, &mut out, threads)?;
            out.flush()?;

            eprintln!("\n=== Conversion Statistics ===");
            eprintln!("Roots:           {}", requests.len());
            eprintln!("Features:        {}", stats.features);
            for (kind, count) in &stats.by_kind {
                eprintln!("  - {:<14} {}", kind.as_str(), count);
            }
            eprintln!("Warnings:        {}", stats.diagnostics);
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }

        Commands::Stats { inputs } => {
            let store = load_store(&inputs)?;
            let catalog = MethodTable::from_store(&store);
            let mut by_class: BTreeMap<&str, usize> = BTreeMap::new();
            for key in store.keys() {
                *by_class.entry(key.class.as_str()).or_default() += 1;
            }

            eprintln!("\n=== Store Statistics ===");
            eprintln!("Objects:         {}", store.len());
            for (class, count) in &by_class {
                eprintln!("  - {:<14} {}", class, count);
            }
            eprintln!("Methods:         {}", catalog.len());
            eprintln!("Time elapsed:    {:.2}s", start.elapsed().as_secs_f64());
        }
    }

    Ok(())
}
