//! Minimal CLI: JSON records + Hive type string → generic NDJSON.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde_json::Value;

use orc_value::config::{ConfigFile, TimeUnit};
use orc_value::load::datum_from_json;
use orc_value::type_spec::parse_type_spec;
use orc_value::RecordConverter;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// convert typed ORC-style records into generic values, or inspect a Hive type string
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// convert JSON-encoded records and print one generic value per line
    Convert(ConvertOut),
    /// parse a type string and print the descriptor tree
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JQ pre-process filter for each document; may emit several records
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ConvertOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// Hive type string of each record, e.g. 'struct<a:int,b:array<string>>'
    #[arg(long, short = 't')]
    type_spec: Option<String>,

    /// JSON config file (type_spec, time_unit, max_depth); flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,

    /// unit of converted timestamps, dates and day-time intervals
    #[arg(long, value_enum)]
    time_unit: Option<TimeUnit>,

    /// maximum nesting depth accepted while converting
    #[arg(long)]
    max_depth: Option<usize>,

    /// pretty-print each output value instead of NDJSON
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    /// Hive type string to parse
    #[arg(long, short = 't')]
    type_spec: String,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Every record of one input file, after the optional jq filter.
    fn load_documents(&self, source_path: &Path) -> Result<Vec<Value>> {
        let source_path_str = source_path.to_string_lossy();
        let source = std::fs::read_to_string(source_path)
            .with_context(|| format!("failed to read source file {source_path_str}"))?;
        let mut documents = Vec::new();
        if self.ndjson {
            for (line_no, line) in source.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let doc = serde_json::from_str::<Value>(line).with_context(|| {
                    format!("failed to parse JSON ({source_path_str}, line {})", line_no + 1)
                })?;
                documents.push(doc);
            }
        } else {
            let doc = serde_json::from_str::<Value>(&source)
                .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
            documents.push(doc);
        }
        let Some(jq_expr) = self.jq_expr.as_ref() else {
            return Ok(documents);
        };
        let mut filtered = Vec::with_capacity(documents.len());
        for doc in &documents {
            let out = crate::jq_exec::run_jaq(jq_expr, doc).with_context(|| {
                format!("failed to apply jq expression to source file ({source_path_str})")
            })?;
            filtered.extend(out);
        }
        Ok(filtered)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Convert(target) => target.run(),
            Command::Describe(target) => target.run(),
        }
    }
}

impl DescribeOut {
    fn run(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.report()?)?;
        write_output(self.out.as_deref(), &text)
    }

    /// Canonical type string, nesting depth and the full descriptor tree.
    fn report(&self) -> Result<Value> {
        let descriptor = parse_type_spec(&self.type_spec)?;
        Ok(serde_json::json!({
            "type": descriptor.to_string(),
            "depth": descriptor.depth(),
            "descriptor": descriptor,
        }))
    }
}

impl ConvertOut {
    fn run(&self) -> Result<()> {
        let config = match self.config.as_ref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        let mut options = config.options();
        if let Some(unit) = self.time_unit {
            options = options.with_time_unit(unit);
        }
        if let Some(depth) = self.max_depth {
            anyhow::ensure!(depth > 0, "--max-depth must be at least 1");
            options = options.with_max_depth(depth);
        }
        let type_spec = self.type_spec.as_deref().or(config.type_spec.as_deref());

        let source_paths = resolve_file_path_patterns(&self.input_settings.input)
            .context("failed to resolve input file paths")?;

        // one converter (and so one descriptor cache) per worker
        let per_file = source_paths
            .par_iter()
            .map_init(
                || RecordConverter::new(options),
                |conv, path| self.convert_file(conv, path, type_spec),
            )
            .collect::<Result<Vec<_>>>()?;

        let mut text = String::new();
        for line in per_file.into_iter().flatten() {
            text.push_str(&line);
            text.push('\n');
        }
        write_output(self.out.as_deref(), text.trim_end_matches('\n'))
    }

    fn convert_file(&self, conv: &mut RecordConverter, path: &Path, type_spec: Option<&str>) -> Result<Vec<String>> {
        let documents = self.input_settings.load_documents(path)?;
        let mut out = Vec::with_capacity(documents.len());
        for (index, doc) in documents.iter().enumerate() {
            let context = || format!("record #{index} of {}", path.display());
            let descriptor = conv.resolve(type_spec).with_context(context)?;
            let datum = datum_from_json(doc, &descriptor).with_context(context)?;
            let value = conv.convert_record(type_spec, &datum).with_context(context)?;
            let json = value.to_json();
            let line = if self.pretty { serde_json::to_string_pretty(&json)? } else { serde_json::to_string(&json)? };
            out.push(line);
        }
        tracing::info!(file = %path.display(), records = out.len(), "converted file");
        Ok(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, format!("{text}\n")).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'['))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched = glob::glob(pattern)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            // Pattern was explicitly a glob but matched nothing -> surface as an error
            anyhow::ensure!(!matched.is_empty(), "glob pattern matched no files: {pattern}");
            matched.sort();
            out.append(&mut matched);
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("orc-value-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn convert_file_reads_ndjson_records() {
        let dir = scratch_dir("ndjson");
        let path = dir.join("rows.ndjson");
        std::fs::write(&path, "{\"a\": 1, \"b\": [\"x\"]}\n\n[2, null]\n").unwrap();

        let cli = CommandLineInterface::try_parse_from([
            "orc-value", "convert", "--ndjson", "-i", path.to_str().unwrap(), "-t", "struct<a:int,b:array<string>>",
        ])
        .unwrap();
        let Command::Convert(target) = &cli.cmd else { panic!("expected convert") };
        let mut conv = RecordConverter::new(Default::default());
        let lines = target.convert_file(&mut conv, &path, target.type_spec.as_deref()).unwrap();
        assert_eq!(lines, vec![r#"{"a":1,"b":["x"]}"#, r#"{"a":2,"b":null}"#]);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn describe_writes_report_to_out_file() {
        let dir = scratch_dir("describe");
        let path = dir.join("nested").join("report.json");
        let cli = CommandLineInterface::try_parse_from([
            "orc-value", "describe", "-t", "struct<a:int,b:array<varchar(4)>>", "-o", path.to_str().unwrap(),
        ])
        .unwrap();
        cli.run().unwrap();

        let report: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(report["type"], "struct<a:int,b:array<varchar(4)>>");
        assert_eq!(report["depth"], 3);
        assert_eq!(report["descriptor"]["category"], "struct");
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn describe_rejects_bad_type_strings() {
        let cli = CommandLineInterface::try_parse_from(["orc-value", "describe", "-t", "map<array<int>,int>"]).unwrap();
        let Command::Describe(target) = &cli.cmd else { panic!("expected describe") };
        assert!(target.report().is_err());
    }

    #[test]
    fn jq_filter_fans_out_documents() {
        let dir = scratch_dir("jq");
        let path = dir.join("doc.json");
        std::fs::write(&path, r#"{"rows": [{"a": 1}, {"a": 2}]}"#).unwrap();
        let settings = InputSettings {
            ndjson: false,
            jq_expr: Some(".rows[]".into()),
            input: vec![path.to_string_lossy().into_owned()],
        };
        let docs = settings.load_documents(&path).unwrap();
        assert_eq!(docs.len(), 2);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn glob_without_matches_is_an_error() {
        let dir = scratch_dir("glob");
        let pattern = format!("{}/*.nothing", dir.display());
        assert!(resolve_file_path_patterns([pattern.as_str()]).is_err());
        let literal = resolve_file_path_patterns(["plain.json"]).unwrap();
        assert_eq!(literal, vec![PathBuf::from("plain.json")]);
        // no brace expansion in `glob`; braces are part of the file name
        let braced = resolve_file_path_patterns(["{a,b}.json"]).unwrap();
        assert_eq!(braced, vec![PathBuf::from("{a,b}.json")]);
        std::fs::remove_dir_all(dir).ok();
    }
}
