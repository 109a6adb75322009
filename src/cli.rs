// src/cli.rs

use clap::Parser;
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;

use crate::config::{Nl2TrailConfig, TokenizerKind};
use crate::generator::Nl2Trail;
use crate::trail_check::{check_trail, TrailReport};

#[derive(Parser, Debug)]
#[command(author, version, about = "Natural language to CAD trail commands", long_about = None)]
pub struct CliArgs {
    /// Natural-language description, e.g. "create a 50mm cube"
    pub prompt: Option<String>,

    /// JSON config file; command-line flags override its values
    #[arg(long, conflicts_with = "export_dir")]
    pub config: Option<PathBuf>,

    /// Directory produced by the ONNX export step (t5_creo.onnx + tokenizer.json)
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    #[arg(long)]
    pub model: Option<PathBuf>,

    #[arg(long)]
    pub tokenizer: Option<PathBuf>,

    #[arg(long)]
    pub max_new_tokens: Option<usize>,

    /// Use the keyword fallback tokenizer (canned templates, smoke tests only)
    #[arg(long)]
    pub keyword_tokenizer: bool,

    /// Append the tokenizer's special tokens (EOS) to the encoder input
    #[arg(long)]
    pub add_special_tokens: bool,

    /// Read one prompt per line and write JSON lines to stdout
    #[arg(long, conflicts_with = "prompt")]
    pub input_file: Option<PathBuf>,

    /// Lint each generated trail and report findings on stderr
    #[arg(long)]
    pub check: bool,
}

#[derive(Serialize, Debug)]
struct BatchRecord<'a> {
    input: &'a str,
    output: String,
}

impl CliArgs {
    /// Layers defaults, then the config file or export dir, then explicit flags.
    pub fn resolve_config(&self) -> Result<Nl2TrailConfig, Box<dyn Error>> {
        let mut config = match (&self.config, &self.export_dir) {
            (Some(path), _) => Nl2TrailConfig::load(path)?,
            (None, Some(dir)) => Nl2TrailConfig::from_export_dir(dir)?,
            (None, None) => Nl2TrailConfig::default(),
        };

        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(tokenizer) = &self.tokenizer {
            config.tokenizer_path = tokenizer.clone();
        }
        if let Some(max_new_tokens) = self.max_new_tokens {
            config.max_new_tokens = max_new_tokens;
        }
        if self.keyword_tokenizer {
            config.tokenizer_kind = TokenizerKind::Keyword;
        }
        if self.add_special_tokens {
            config.add_special_tokens = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn report_check(input: &str, report: &TrailReport) {
    if report.is_valid() {
        info!("Trail check passed for '{}'", input);
        return;
    }
    eprintln!("Trail check for '{}': {:?}", input, report.status);
    for issue in &report.issues {
        eprintln!("  {}", issue);
    }
}

pub fn run_cli() -> Result<(), Box<dyn Error>> {
    // 1. Parse CLI arguments
    let args = CliArgs::parse();
    if args.prompt.is_none() && args.input_file.is_none() {
        return Err("no prompt given; pass a description or --input-file".into());
    }

    // 2. Resolve configuration
    let config = args.resolve_config()?;
    if config.tokenizer_kind == TokenizerKind::Keyword {
        warn!("Keyword tokenizer selected: output is a canned template, not model output");
    }

    // 3. Load model and tokenizer; failure here is fatal
    let generator = Nl2Trail::from_config(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    // 4. Generate
    if let Some(path) = &args.input_file {
        let reader = BufReader::new(File::open(path)?);
        for line in reader.lines() {
            let line = line?;
            let input = line.trim();
            if input.is_empty() {
                continue;
            }
            let output = generator.generate(input)?;
            if args.check {
                report_check(input, &check_trail(&output));
            }
            let record = BatchRecord { input, output };
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }
    } else if let Some(prompt) = &args.prompt {
        let output = generator.generate(prompt)?;
        if args.check {
            report_check(prompt, &check_trail(&output));
        }
        writeln!(out, "{}", output)?;
    }

    Ok(())
}
