//! Command-line front end.
//!
//! ```text
//! typing_form form --model rural.json [--stratum rural] [--model urban.json ...] \
//!     --config config.json [--out dir] [--detailed] [--skip-notes]
//! typing_form template --model model.json [--language "English (en)"]...
//! ```
//!
//! `form` writes `form.json` (sheet rows), `cart.mmd` and `form.mmd` to the
//! output directory, or prints the rows when no directory is given.
//! `template` prints a configuration skeleton for the model's variables.
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;
use tracing_subscriber::EnvFilter;

use typing_tree::config::template::config_template;
use typing_tree::emit::{DiagramOptions, cart_diagram, form_diagram};
use typing_tree::{RpartModel, TypingConfig, TypingPipeline};

const USAGE: &str = "typing_form

  form      Build the typing form
    --model <path>      rpart JSON export (repeat once for a second stratum)
    --stratum <label>   Stratum of the preceding model (default: file stem)
    --config <path>     Typing configuration
    --out <dir>         Write form.json, cart.mmd and form.mmd here
    --detailed          Probability stacks in the form diagram
    --skip-notes        Leave segment notes out of the form diagram

  template  Print a configuration skeleton
    --model <path>      rpart JSON export
    --language <lang>   Label language (repeatable, default: English (en))";

// =============================================================================
// Arguments
// =============================================================================

#[derive(Debug)]
struct Stratum {
    label: String,
    model: PathBuf,
}

#[derive(Debug)]
enum Command {
    Form {
        strata: Vec<Stratum>,
        config: PathBuf,
        out: Option<PathBuf>,
        detailed: bool,
        skip_notes: bool,
    },
    Template {
        model: PathBuf,
        languages: Vec<String>,
    },
}

fn usage_error(msg: &str) -> ! {
    eprintln!("error: {msg}\n\n{USAGE}");
    std::process::exit(2);
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "stratum".to_string())
}

fn value(flag: &str, it: &mut impl Iterator<Item = String>) -> String {
    it.next()
        .unwrap_or_else(|| usage_error(&format!("{flag} needs a value")))
}

fn parse_args() -> Command {
    let mut it = std::env::args().skip(1);
    let command = it.next().unwrap_or_else(|| usage_error("missing command"));

    let mut strata: Vec<Stratum> = Vec::new();
    let mut config: Option<PathBuf> = None;
    let mut out: Option<PathBuf> = None;
    let mut detailed = false;
    let mut skip_notes = false;
    let mut languages: Vec<String> = Vec::new();

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--model" => {
                let model = PathBuf::from(value("--model", &mut it));
                strata.push(Stratum { label: file_stem(&model), model });
            }
            "--stratum" => {
                let label = value("--stratum", &mut it);
                match strata.last_mut() {
                    Some(stratum) => stratum.label = label,
                    None => usage_error("--stratum must follow --model"),
                }
            }
            "--config" => config = Some(PathBuf::from(value("--config", &mut it))),
            "--out" => out = Some(PathBuf::from(value("--out", &mut it))),
            "--language" => languages.push(value("--language", &mut it)),
            "--detailed" => detailed = true,
            "--skip-notes" => skip_notes = true,
            "--help" => {
                eprintln!("{USAGE}");
                std::process::exit(0);
            }
            other => usage_error(&format!("unknown argument: {other}")),
        }
    }

    match command.as_str() {
        "form" => Command::Form {
            strata,
            config: config.unwrap_or_else(|| usage_error("form needs --config")),
            out,
            detailed,
            skip_notes,
        },
        "template" => {
            let model = match strata.as_slice() {
                [stratum] => stratum.model.clone(),
                _ => usage_error("template needs exactly one --model"),
            };
            if languages.is_empty() {
                languages.push("English (en)".to_string());
            }
            Command::Template { model, languages }
        }
        "--help" => {
            eprintln!("{USAGE}");
            std::process::exit(0);
        }
        other => usage_error(&format!("unknown command: {other}")),
    }
}

// =============================================================================
// Commands
// =============================================================================

fn read_model(path: &Path) -> typing_tree::Result<RpartModel> {
    Ok(RpartModel::from_json_str(&fs::read_to_string(path)?)?)
}

fn form(
    strata: &[Stratum],
    config: &Path,
    out: Option<&Path>,
    detailed: bool,
    skip_notes: bool,
) -> typing_tree::Result<()> {
    let config = TypingConfig::from_json_str(&fs::read_to_string(config)?)?;
    let models = strata
        .iter()
        .map(|s| read_model(&s.model))
        .collect::<typing_tree::Result<Vec<_>>>()?;
    let inputs: Vec<(&str, &RpartModel)> = strata
        .iter()
        .zip(&models)
        .map(|(s, m)| (s.label.as_str(), m))
        .collect();

    let pipeline = TypingPipeline::new(config);
    let model_tree = pipeline.build(&inputs)?;
    let form_tree = pipeline.rewrite(&model_tree)?;
    let rows = serde_json::to_string_pretty(&pipeline.rows(&form_tree)?)?;

    match out {
        Some(dir) => {
            let diagram = DiagramOptions::builder()
                .detailed(detailed)
                .skip_notes(skip_notes)
                .low_confidence_threshold(pipeline.config().settings.low_confidence_threshold)
                .build();
            fs::create_dir_all(dir)?;
            fs::write(dir.join("form.json"), rows)?;
            fs::write(dir.join("cart.mmd"), cart_diagram(&model_tree)?)?;
            fs::write(dir.join("form.mmd"), form_diagram(&form_tree, &diagram)?)?;
            info!(dir = %dir.display(), "form written");
        }
        None => println!("{rows}"),
    }
    Ok(())
}

fn template(model: &Path, languages: &[String]) -> typing_tree::Result<()> {
    let model = read_model(model)?;
    let languages: Vec<&str> = languages.iter().map(String::as_str).collect();
    let config = config_template(&model, &languages);
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let result = match parse_args() {
        Command::Form {
            strata,
            config,
            out,
            detailed,
            skip_notes,
        } => form(&strata, &config, out.as_deref(), detailed, skip_notes),
        Command::Template { model, languages } => template(&model, &languages),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
