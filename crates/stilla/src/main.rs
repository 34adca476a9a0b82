#![forbid(unsafe_code)]

//! Stilla CLI: XML canonicalization from the command line.

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use stilla_c14n::{parse_prefix_list, AlgorithmRegistry, C14nMode, Canonicalizer, SecureValidationPolicy};
use stilla_core::Error;
use stilla_xml::select::{select, Selection};
use stilla_xml::{ParseOptions, XmlDocument};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stilla",
    about = "Stilla: Pure Rust XML Canonicalization (C14N 1.0/1.1, Exclusive C14N)",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonicalize an XML document or one of its subtrees
    C14n {
        /// Input XML file
        file: PathBuf,

        /// Algorithm URI or short name (see `stilla info`)
        #[arg(short, long, default_value = "c14n")]
        algorithm: String,

        /// Same-document reference selecting a subtree (`#id`, `#xpointer(id('id'))`)
        #[arg(short, long)]
        reference: Option<String>,

        /// Register additional ID attribute names
        #[arg(long = "id-attr")]
        id_attr: Vec<String>,

        /// InclusiveNamespaces PrefixList for exclusive C14N (e.g. "ds xsi #default")
        #[arg(long = "inclusive-prefixes")]
        inclusive_prefixes: Option<String>,

        /// Render the in-scope default namespace at the subtree apex
        #[arg(long = "propagate-default-ns")]
        propagate_default_ns: bool,

        /// Enable secure validation (reject DTDs, bound attributes, comments and depth)
        #[arg(long)]
        secure: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported canonicalization algorithms
    Info,
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::C14n { verbose: true, .. });
    init_logging(verbose);

    let result = match cli.command {
        Commands::C14n {
            file,
            algorithm,
            reference,
            id_attr,
            inclusive_prefixes,
            propagate_default_ns,
            secure,
            output,
            verbose: _,
        } => cmd_c14n(C14nArgs {
            file,
            algorithm,
            reference,
            id_attr,
            inclusive_prefixes,
            propagate_default_ns,
            secure,
            output,
        }),
        Commands::Info => cmd_info(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `--verbose` selects debug.  Logs go to stderr
/// so stdout carries only canonical bytes.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

struct C14nArgs {
    file: PathBuf,
    algorithm: String,
    reference: Option<String>,
    id_attr: Vec<String>,
    inclusive_prefixes: Option<String>,
    propagate_default_ns: bool,
    secure: bool,
    output: Option<PathBuf>,
}

fn cmd_c14n(args: C14nArgs) -> Result<(), Error> {
    let registry = AlgorithmRegistry::with_defaults();
    let uri = C14nMode::from_name(&args.algorithm)
        .map(|mode| mode.uri().to_owned())
        .unwrap_or(args.algorithm);

    let policy = SecureValidationPolicy::default();
    let options = if args.secure {
        policy.parse_options()
    } else {
        ParseOptions::default()
    };
    let data = std::fs::read(&args.file).map_err(|e| with_path(&args.file, e))?;
    let mut xml = XmlDocument::parse_bytes(&data, options)?;
    for name in &args.id_attr {
        xml.add_id_attr(name);
    }
    let doc = xml.parse_doc()?;

    let root = match args.reference.as_deref() {
        Some(reference) => {
            let ids = xml.build_id_map(&doc);
            match select(&doc, &ids, reference)? {
                Selection::Document => doc.root(),
                Selection::Subtree(node) => node,
            }
        }
        None => doc.root(),
    };
    let prefixes = args
        .inclusive_prefixes
        .as_deref()
        .map(parse_prefix_list)
        .unwrap_or_default();

    tracing::debug!(file = %args.file.display(), %uri, "canonicalizing");

    let mut sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| with_path(path, e))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let mut c14n = Canonicalizer::new(&registry, &uri)?;
    if args.secure {
        c14n.set_secure_validation_policy(policy);
    }
    c14n.set_output(sink.as_mut());
    c14n.canonicalize_subtree(root, &prefixes, args.propagate_default_ns)?;
    Ok(())
}

fn cmd_info() -> Result<(), Error> {
    let registry = AlgorithmRegistry::with_defaults();
    println!("Stilla: Pure Rust XML Canonicalization");
    println!();
    println!("Supported canonicalization algorithms:");
    for uri in registry.uris() {
        let name = C14nMode::from_uri(&uri).map_or("", |mode| mode.short_name());
        println!("  {name:<18} {uri}");
    }
    Ok(())
}

// ── Utility functions ────────────────────────────────────────────────

fn with_path(path: &Path, err: io::Error) -> Error {
    Error::Io(io::Error::new(err.kind(), format!("{}: {err}", path.display())))
}
