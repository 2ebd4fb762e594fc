use trendscript::{Diagnostic, EvaluationVerbose, GraphData, line_start_offset};

mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const DIM: &str = "\x1b[2m";
    pub const BOLD: &str = "\x1b[1m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const CYAN: &str = "\x1b[36m";
    pub const GRAY: &str = "\x1b[90m";

    pub struct Palette {
        enabled: bool,
    }

    impl Palette {
        pub fn new(enabled: bool) -> Self {
            Self { enabled }
        }

        pub fn paint(&self, s: impl AsRef<str>, color: &str) -> String {
            if self.enabled { format!("{}{}{}", color, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn bold(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", BOLD, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }

        pub fn dim(&self, s: impl AsRef<str>) -> String {
            if self.enabled { format!("{}{}{}", DIM, s.as_ref(), RESET) } else { s.as_ref().to_string() }
        }
    }
}

pub fn print_run(source: &str, out: &EvaluationVerbose, color: bool) {
    let palette = ansi::Palette::new(color);
    let evaluation = &out.evaluation;
    let details = &out.details;

    let lines = source.lines().count();
    println!("\n{}", palette.bold(palette.paint(format!("⚙  Evaluating: {lines} lines"), ansi::CYAN)));

    if !evaluation.diagnostics.is_empty() {
        println!("\n{}", palette.paint("━━━ Diagnostics ━━━", ansi::GRAY));
        for diagnostic in &evaluation.diagnostics {
            print_diagnostic(source, diagnostic, &palette);
        }
    }

    if let Some(graph) = &evaluation.graph {
        println!("\n{}", palette.paint("━━━ Series ━━━", ansi::GRAY));
        print_series(graph, &palette);

        println!("\n{}", palette.paint("━━━ Range ━━━", ansi::GRAY));
        println!(
            "  {} {} {}  {} {} days from {}",
            palette.paint(fmt_value(graph.range.0), ansi::YELLOW),
            palette.dim("to"),
            palette.paint(fmt_value(graph.range.1), ansi::YELLOW),
            palette.dim("│"),
            graph.options.nr_days,
            palette.paint(graph.options.start_date.to_string(), ansi::BLUE),
        );
        if !details.date_names.is_empty() {
            println!("  {} {}", palette.dim("dates:"), details.date_names.join(", "));
        }
        if let Some(last) = &details.final_state {
            let hidden: Vec<String> = last
                .iter()
                .filter(|(name, _)| !details.tracked_keys.iter().any(|k| k == name))
                .map(|(name, value)| format!("{name} = {}", fmt_value(value)))
                .collect();
            if !hidden.is_empty() {
                println!("  {} {}", palette.dim("hidden (final):"), hidden.join(", "));
            }
        }
    }

    println!("\n{}", palette.paint("━━━ Timing ━━━", ansi::GRAY));
    let metrics = &details.metrics;
    println!(
        "  Total: {}  │  Parse: {}  │  Bind: {}  │  Simulate: {}",
        palette.paint(format!("{:?}", metrics.total), ansi::GREEN),
        palette.dim(format!("{:?}", metrics.parse)),
        palette.dim(format!("{:?}", metrics.bind)),
        palette.paint(format!("{:?}", metrics.simulate), ansi::CYAN),
    );
    println!();
}

/// `line:col message`, then the offending source line with a caret.
fn print_diagnostic(source: &str, diagnostic: &Diagnostic, palette: &ansi::Palette) {
    println!(
        "  {} {}",
        palette.paint(format!("{}:{}", diagnostic.line, diagnostic.column), ansi::YELLOW),
        palette.paint(&diagnostic.message, ansi::RED),
    );

    let Some(start) = line_start_offset(source, diagnostic.line.saturating_sub(1)) else {
        return;
    };
    let text = source[start..].lines().next().unwrap_or("");
    println!("    {}", palette.dim(text));
    println!("    {}{}", " ".repeat(diagnostic.column.saturating_sub(1)), palette.bold(palette.paint("^", ansi::RED)));
}

fn print_series(graph: &GraphData, palette: &ansi::Palette) {
    for (props, series) in graph.options.state_keys_props.iter().zip(&graph.data) {
        let label = if props.label == props.key { props.key.clone() } else { format!("{} ({})", props.label, props.key) };
        let finite = series.iter().copied().filter(|v| v.is_finite());
        let min = finite.clone().fold(f64::INFINITY, f64::min);
        let max = finite.fold(f64::NEG_INFINITY, f64::max);

        println!("  {}", palette.bold(palette.paint(label, ansi::BLUE)));
        match (series.first(), series.last()) {
            (Some(first), Some(last)) => println!(
                "      {} {}  {} {}  {} {}  {} {}",
                palette.dim("first:"),
                fmt_value(*first),
                palette.dim("│ last:"),
                palette.paint(fmt_value(*last), ansi::GREEN),
                palette.dim("│ min:"),
                fmt_value(min),
                palette.dim("│ max:"),
                fmt_value(max),
            ),
            _ => println!("      {}", palette.dim("no samples")),
        }
    }
    if graph.data.is_empty() {
        println!("{}", palette.dim("  No tracked variables"));
    }
}

fn fmt_value(value: f64) -> String {
    if value.is_finite() { format!("{:.2}", value) } else { value.to_string() }
}
