mod debug_report;

use chrono::NaiveDate;
use std::io::{self, IsTerminal, Read};
use tracing_subscriber::EnvFilter;
use trendscript::{EvaluateOptions, evaluate_verbose_with};

const LOG_ENV: &str = "TRENDSCRIPT_LOG";

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let out = match evaluate_verbose_with(&config.source, &config.options) {
        Ok(out) => out,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    if config.json {
        match serde_json::to_string_pretty(&out.evaluation) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                eprintln!("error: failed to encode result: {err}");
                std::process::exit(1);
            }
        }
    } else {
        debug_report::print_run(&config.source, &out, config.color);
    }

    if !out.evaluation.diagnostics.is_empty() {
        std::process::exit(1);
    }
}

struct CliConfig {
    source: String,
    options: EvaluateOptions,
    json: bool,
    color: bool,
}

fn parse_args() -> Result<CliConfig, String> {
    let mut path: Option<String> = None;
    let mut options = EvaluateOptions::default();
    let mut json = false;
    let mut color = io::stdout().is_terminal();
    let mut args = std::env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag.to_string(), Some(value.to_string())),
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| match inline.clone() {
            Some(value) => Ok(value),
            None => args.next().ok_or_else(|| format!("error: {name} expects a value")),
        };

        match flag.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-V" | "--version" => {
                println!("trendscript {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--color" => color = true,
            "--no-color" => color = false,
            "--json" => json = true,
            "--reference" => options.reference_date = parse_date("--reference", &value("--reference")?)?,
            "--start" => options.start_date = Some(parse_date("--start", &value("--start")?)?),
            "--days" => {
                let raw = value("--days")?;
                let days = raw.parse().map_err(|_| format!("error: invalid --days '{raw}' (expected a whole number)"))?;
                options.days = Some(days);
            }
            "-" if path.is_none() => path = Some(arg),
            _ if arg.starts_with('-') => return Err(format!("error: unknown option '{arg}'")),
            _ if path.is_some() => return Err("error: input provided multiple times".to_string()),
            _ => path = Some(arg),
        }
    }

    let source = match path.as_deref() {
        None | Some("-") => read_stdin_input()?,
        Some(path) => std::fs::read_to_string(path).map_err(|err| format!("error: failed to read '{path}': {err}"))?,
    };

    if source.trim().is_empty() {
        return Err(format!("error: no input provided\n\n{}", help_text()));
    }

    Ok(CliConfig { source, options, json, color })
}

fn read_stdin_input() -> Result<String, String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(|err| format!("error: failed to read stdin: {err}"))?;
    Ok(buffer)
}

fn parse_date(flag: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| format!("error: invalid {flag} '{value}' (expected YYYY-MM-DD)"))
}

fn print_help() {
    println!("{}", help_text());
}

fn help_text() -> String {
    format!(
        "trendscript {version}

Evaluate a trend script and summarize the simulated series.

Usage:
  trendscript [OPTIONS] [FILE]

  Reads the script from FILE, or from stdin when FILE is omitted or '-'.

Options:
  --start <date>        First simulated day (YYYY-MM-DD). Overrides the
                        script's startDate option.
  --days <n>            Number of simulated days. Overrides the script's
                        duration option.
  --reference <date>    Today's date for defaults and relative startDate
                        values (YYYY-MM-DD). Default: the local date.
  --json                Print the evaluation (diagnostics and graph data)
                        as JSON.
  --color               Force ANSI color output.
  --no-color            Disable ANSI color output.
  -h, --help            Show this help message.
  -V, --version         Print version information.

Environment:
  {log_env}       Log filter for operational logs on stderr
                        (e.g. debug). Default: warn.

Exit codes:
  0  Success.
  1  The script has diagnostics, or the simulation failed.
  2  Invalid arguments or missing input.
",
        version = env!("CARGO_PKG_VERSION"),
        log_env = LOG_ENV,
    )
}
