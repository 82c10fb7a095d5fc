use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Parser;
use precp_driver::{SearchPathResolver, Session};
use precp_foundation::diagnostics::{DiagnosticSink, StderrDiagnostics};
use precp_foundation::source::SourceText;
use precp_macro::{Macro, MacroFlavor};
use tracing::{debug, error, metadata::LevelFilter};
use tracing_subscriber::{prelude::*, EnvFilter};

/// A standalone C-style preprocessor: macro expansion and conditional
/// compilation, nothing more.
#[derive(Debug, Parser)]
pub struct Args {
    /// File to preprocess. Absent, or `-`, reads from stdin.
    file: Option<PathBuf>,

    /// Add a directory to the #include search path. May be repeated.
    #[clap(short = 'I', value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Predefine a macro: `-D NAME` (empty body) or `-D NAME=VALUE`.
    #[clap(short = 'D', value_name = "NAME[=VALUE]")]
    define: Vec<String>,
}

fn parse_predefine(spec: &str) -> (String, String) {
    match spec.split_once('=') {
        Some((name, value)) => (name.to_string(), value.to_string()),
        None => (spec.to_string(), String::new()),
    }
}

fn main() {
    let subscriber = tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(io::stderr),
        );
    tracing::subscriber::set_global_default(subscriber)
        .expect("cannot set default tracing subscriber");

    let args = Args::parse();

    match fallible_main(args) {
        Ok(()) => (),
        Err(error) => {
            error!("{error:?}");
            std::process::exit(1);
        }
    }
}

pub fn fallible_main(args: Args) -> anyhow::Result<()> {
    let resolver = SearchPathResolver {
        include_dirs: args.include.clone(),
    };
    let mut session = Session::new(&resolver);

    for spec in &args.define {
        let (name, value) = parse_predefine(spec);
        debug!("predefining '{name}' from -D");
        session.table.define(
            name,
            Macro {
                flavor: MacroFlavor::ObjectLike,
                parameters: Vec::new(),
                body: value,
            },
        );
    }

    let source = read_source(args.file.as_deref())?;
    debug!("preprocessing {}", source.name);

    let mut diagnostics = StderrDiagnostics::default();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(err) = session.parse_file(source, &mut diagnostics, &mut out) {
        out.flush().ok();
        bail!("{err}");
    }
    out.flush().context("flushing stdout")?;

    if diagnostics.had_error() {
        bail!("preprocessing completed with errors");
    }
    Ok(())
}

fn read_source(file: Option<&Path>) -> anyhow::Result<SourceText> {
    let use_stdin = file.is_none() || file == Some(Path::new("-"));
    if use_stdin {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        return Ok(SourceText::new("<stdin>", buf));
    }
    let path = file.expect("use_stdin handles the None case above");
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read source file at {}", path.display()))?;
    Ok(SourceText::from_file(path.display().to_string(), path.to_path_buf(), contents))
}
