use clap::{Parser, Subcommand};
use colored::Colorize;
use itertools::Itertools;
use miette::IntoDiagnostic;
use miette::miette;
use std::io::{self, BufWriter, IsTerminal, Read, Write};
use std::{fs, path::PathBuf};
use stylex_lang::{BUILTIN_FUNCTION_DOC, Defines, Engine, Feature, Properties, Value};

#[derive(Parser, Debug)]
#[command(name = "stylex")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "Examples:\n\n\
    To evaluate an expression against GeoJSON features:\n\
    $ stylex \"height > 100 ? 'tall' : 'short'\" buildings.geojson\n\n\
    To substitute defines before parsing:\n\
    $ stylex -D LIMIT=100 '${height} > LIMIT' buildings.geojson\n\n\
    To list the builtin functions:\n\
    $ stylex docs")]
#[command(
    about = "stylex evaluates feature style expressions against JSON and GeoJSON features.",
    long_about = None
)]
pub struct Cli {
    #[clap(flatten)]
    input: InputArgs,

    #[clap(flatten)]
    output: OutputArgs,

    #[clap(subcommand)]
    commands: Option<Commands>,

    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity,

    #[arg(value_name = "EXPRESSION OR FILE")]
    expression: Option<String>,
    files: Option<Vec<PathBuf>>,
}

#[derive(Clone, Debug, Default, clap::ValueEnum)]
enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct InputArgs {
    /// Load the expression from the file
    #[arg(short, long)]
    from_file: bool,

    /// Evaluate once without a feature
    #[arg(short, long)]
    null_input: bool,

    /// Define a name that is substituted before parsing
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", value_parser = parse_define)]
    defines: Vec<(String, String)>,

    /// Define a name that is removed before parsing
    #[arg(short = 'U', long = "undefine", value_name = "KEY")]
    undefines: Vec<String>,
}

#[derive(Clone, Debug, clap::Args, Default)]
struct OutputArgs {
    /// Set output format
    #[arg(short = 'F', long, value_enum, default_value_t)]
    output_format: Format,

    /// Compact instead of pretty-printed JSON output
    #[clap(short, long)]
    compact_output: bool,

    /// Output to the specified file
    #[clap(short = 'o', long = "output", value_name = "FILE")]
    output_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the builtin functions
    Docs,
    /// Check expression files for syntax errors, one expression per line
    Check {
        /// Path to the expression files to check
        files: Vec<PathBuf>,
    },
}

fn parse_define(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("invalid define `{s}`: expected KEY=VALUE"))
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        match &self.commands {
            Some(Commands::Docs) => self.docs(),
            Some(Commands::Check { files }) => self.check(files),
            None => {
                let expression = self.read_expression()?;
                let features = self.read_features()?;
                let defines = self.defines();
                log::debug!("evaluating `{}` against {} features", expression, features.len());

                let results = Engine::default()
                    .evaluate_batch(&expression, &features, &defines)
                    .map_err(miette::Report::new)?;
                self.print(results)
            }
        }
    }

    fn defines(&self) -> Defines {
        let mut defines: Defines = self.input.defines.iter().cloned().collect();
        for key in &self.input.undefines {
            defines.undefine(key);
        }
        defines
    }

    fn read_expression(&self) -> miette::Result<String> {
        let expression = self
            .expression
            .as_ref()
            .ok_or_else(|| miette!("Missing expression"))?;

        if self.input.from_file {
            fs::read_to_string(expression)
                .map(|content| content.trim().to_string())
                .into_diagnostic()
        } else {
            Ok(expression.clone())
        }
    }

    fn read_contents(&self) -> miette::Result<Vec<String>> {
        match &self.files {
            Some(files) if !files.is_empty() => files
                .iter()
                .map(|file| fs::read_to_string(file).into_diagnostic())
                .collect(),
            _ => {
                if io::stdin().is_terminal() {
                    return Ok(Vec::new());
                }

                let mut input = String::new();
                io::stdin().read_to_string(&mut input).into_diagnostic()?;
                Ok(vec![input])
            }
        }
    }

    fn read_features(&self) -> miette::Result<Vec<Feature>> {
        if self.input.null_input {
            return Ok(vec![Feature::default()]);
        }

        let contents = self.read_contents()?;
        if contents.iter().all(|content| content.trim().is_empty()) {
            return Ok(vec![Feature::default()]);
        }

        contents
            .iter()
            .filter(|content| !content.trim().is_empty())
            .map(|content| parse_features(content))
            .flatten_ok()
            .collect()
    }

    fn writer(&self) -> miette::Result<Box<dyn Write>> {
        Ok(match &self.output.output_file {
            Some(path) => Box::new(BufWriter::new(fs::File::create(path).into_diagnostic()?)),
            None => Box::new(BufWriter::new(io::stdout().lock())),
        })
    }

    fn print(&self, results: Vec<Result<Value, stylex_lang::Error>>) -> miette::Result<()> {
        let mut handle = self.writer()?;
        let total = results.len();
        let mut failures = 0;

        let values = results
            .into_iter()
            .map(|result| {
                result.map_err(|err| {
                    failures += 1;
                    eprintln!("{:?}", miette::Report::new(err));
                })
            })
            .collect_vec();

        match self.output.output_format {
            Format::Text => {
                for value in values.iter().flatten() {
                    writeln!(handle, "{}", value).into_diagnostic()?;
                }
            }
            Format::Json => {
                let json = values
                    .into_iter()
                    .map(|value| value.map(serde_json::Value::from).unwrap_or_default())
                    .collect_vec();
                if self.output.compact_output {
                    serde_json::to_writer(&mut handle, &json).into_diagnostic()?;
                } else {
                    serde_json::to_writer_pretty(&mut handle, &json).into_diagnostic()?;
                }
                writeln!(handle).into_diagnostic()?;
            }
        }

        handle.flush().into_diagnostic()?;

        if failures > 0 {
            Err(miette!("{} of {} features failed to evaluate", failures, total))
        } else {
            Ok(())
        }
    }

    fn docs(&self) -> miette::Result<()> {
        let mut handle = self.writer()?;

        for (name, doc) in BUILTIN_FUNCTION_DOC.iter().sorted_by_key(|(name, _)| *name) {
            writeln!(
                handle,
                "{}({})\t{}",
                name,
                doc.params.join(", "),
                doc.description
            )
            .into_diagnostic()?;
        }

        handle.flush().into_diagnostic()
    }

    fn check(&self, files: &[PathBuf]) -> miette::Result<()> {
        let mut handle = self.writer()?;
        let engine = Engine::default();
        let defines = self.defines();
        let mut has_error = false;

        for file in files {
            if !file.exists() {
                return Err(miette!("File not found: {}", file.display()));
            }

            let content = fs::read_to_string(file).into_diagnostic()?;
            let errors = content
                .lines()
                .enumerate()
                .filter(|(_, line)| !line.trim().is_empty())
                .filter_map(|(i, line)| {
                    engine
                        .expression(line, None, &defines)
                        .err()
                        .map(|err| (i + 1, line, err))
                })
                .collect_vec();

            if !errors.is_empty() {
                has_error = true;
                writeln!(handle, "{}", format!("Checking: {}", file.display()).bold()).ok();

                for (line_no, line, err) in errors {
                    writeln!(
                        handle,
                        "  {}: {} at line {}, {}",
                        "Error".red().bold(),
                        err,
                        line_no,
                        error_column(line, &err)
                    )
                    .into_diagnostic()?;
                }
                writeln!(handle).into_diagnostic()?;
            }
        }

        handle.flush().into_diagnostic()?;

        if has_error {
            Err(miette!("Syntax errors found"))
        } else {
            Ok(())
        }
    }
}

// Error offsets point into the text the parser saw. When defines or `${...}`
// references rewrote the line, that text is shown alongside the column.
fn error_column(line: &str, err: &stylex_lang::Error) -> String {
    let column = err.location.offset() + 1;

    if err.source_code == line {
        format!("column {}", column)
    } else {
        format!("column {} of `{}`", column, err.source_code)
    }
}

/// Reads a single feature, an array of features or a GeoJSON `FeatureCollection`.
fn parse_features(content: &str) -> miette::Result<Vec<Feature>> {
    let json: serde_json::Value = serde_json::from_str(content).into_diagnostic()?;

    match json {
        serde_json::Value::Object(mut map)
            if map.get("type").and_then(|t| t.as_str()) == Some("FeatureCollection") =>
        {
            match map.remove("features") {
                Some(serde_json::Value::Array(features)) => {
                    features.into_iter().map(parse_feature).collect()
                }
                _ => Err(miette!("FeatureCollection without a `features` array")),
            }
        }
        serde_json::Value::Array(features) => features.into_iter().map(parse_feature).collect(),
        feature => parse_feature(feature).map(|feature| vec![feature]),
    }
}

// Objects without `type` or `properties` members are taken as a bare property bag.
fn parse_feature(json: serde_json::Value) -> miette::Result<Feature> {
    match json {
        serde_json::Value::Object(map)
            if map.contains_key("properties") || map.contains_key("type") =>
        {
            serde_json::from_value(serde_json::Value::Object(map)).into_diagnostic()
        }
        serde_json::Value::Object(map) => {
            let properties: Properties = map
                .into_iter()
                .map(|(key, value)| (key, Value::from(value)))
                .collect();
            Ok(Feature::new(properties))
        }
        other => Err(miette!("Expected a feature object, got `{}`", other)),
    }
}
