use clap::Parser;
use std::path::{Path, PathBuf};

use docx_stylespec::{Error, ParseOptions, RoleMap};

#[derive(Parser)]
#[command(
    name = "docx-stylespec",
    about = "Extract per-role style rules from a DOCX template as JSON"
)]
struct Args {
    /// Input DOCX template
    input: PathBuf,
    /// Output JSON file (defaults to input with .json extension)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// JSON options file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Role mapping file (defaults to role_mapping.json next to the template)
    #[arg(long)]
    role_map: Option<PathBuf>,
    /// Fail unless every required role and field is present
    #[arg(long)]
    strict: bool,
    /// Report missing fields instead of filling them from defaults
    #[arg(long)]
    no_fallback: bool,
    #[arg(long)]
    max_heading_level: Option<u32>,
    /// Template type key, or "auto" to detect it
    #[arg(long)]
    template_type: Option<String>,
}

fn options(args: &Args) -> Result<ParseOptions, Error> {
    let mut options = match &args.config {
        Some(path) => ParseOptions::from_json_file(path)?,
        None => ParseOptions::default(),
    };
    if let Some(path) = &args.role_map {
        options.role_map = Some(RoleMap::from_json_file(path)?);
    }
    if args.strict {
        options.strict = true;
    }
    if args.no_fallback {
        options.allow_fallback = false;
    }
    if let Some(level) = args.max_heading_level {
        options.max_heading_level = level;
    }
    if let Some(key) = &args.template_type {
        options.template_type = key.clone();
    }
    Ok(options)
}

fn run(args: &Args, output: &Path) -> Result<(), Error> {
    let options = options(args)?;
    let result = docx_stylespec::extract_style_spec(&args.input, &options)?;
    std::fs::write(output, result.to_json()?).map_err(Error::Io)
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if !args.input.exists() {
        eprintln!("Error: file not found: {}", args.input.display());
        std::process::exit(1);
    }
    if !args.input.is_file() {
        eprintln!("Error: not a file: {}", args.input.display());
        std::process::exit(1);
    }

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("json"));

    if let Err(e) = run(&args, &output) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
