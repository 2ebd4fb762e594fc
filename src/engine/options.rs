//! Graph options and property-list resolution.
//!
//! The trailing `options { ... }` block and the inline `{ label: ..., color:
//! ... }` lists after `var` declarations share one syntax ([`PropertyList`]);
//! this module turns them into typed values. Bad values are reported through
//! the [`DiagnosticLog`] and the default is kept, so option mistakes never
//! block the rest of the script from being analyzed.

use crate::diagnostics::DiagnosticLog;
use crate::syntax::ast::{PropertyList, PropertyValue};
use crate::Span;
use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_english::Dialect;
use serde::Serialize;
use thiserror::Error;

/// Default horizon: five years of 365 days.
pub(crate) const DEFAULT_DAYS: u32 = 5 * 365;
/// Longest accepted horizon (100 years of 366 days).
pub(crate) const MAX_DAYS: u32 = 36_600;
/// `color` value that keeps a variable out of the graph.
pub(crate) const HIDDEN_COLOR: &str = "hidden";

const DEFAULT_HEIGHT_PX: u32 = 200;
const DEFAULT_STROKE_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Area,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Legend {
    None,
    #[default]
    Line,
}

/// Display properties of one tracked variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateKeyProps {
    pub key: String,
    /// Legend label; the variable name unless overridden.
    pub label: String,
    pub color: Option<String>,
}

/// Everything the chart renderer needs besides the samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphOptions {
    pub start_date: NaiveDate,
    pub nr_days: u32,
    pub height_px: u32,
    /// Tracked (non-hidden) variables in declaration order.
    pub state_keys_props: Vec<StateKeyProps>,
    pub chart_type: ChartType,
    pub stroke_width: f64,
    pub legend: Legend,
}

impl GraphOptions {
    pub(crate) fn with_defaults(reference: NaiveDate) -> Self {
        GraphOptions {
            start_date: reference,
            nr_days: DEFAULT_DAYS,
            height_px: DEFAULT_HEIGHT_PX,
            state_keys_props: Vec::new(),
            chart_type: ChartType::default(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            legend: Legend::default(),
        }
    }
}

/// A malformed option value. The message is shown to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("invalid duration \"{0}\", expected <number><d|w|m|y> such as \"90d\" or \"5y\"")]
    Duration(String),

    #[error("duration \"{value}\" exceeds the maximum of {max} days")]
    DurationTooLong { value: String, max: u32 },

    #[error("invalid startDate \"{value}\": {reason}")]
    StartDate { value: String, reason: String },

    #[error("{days} days from {start} run past the last supported date")]
    HorizonOutOfRange { start: NaiveDate, days: u32 },

    #[error("option `{key}` expects {expected}")]
    WrongKind { key: String, expected: &'static str },

    #[error("unknown {key} \"{value}\", expected one of {allowed}")]
    UnknownValue { key: String, value: String, allowed: &'static str },

    #[error("option `{key}` must be a positive number")]
    NotPositive { key: String },
}

// --- Values ------------------------------------------------------------------

/// Parse `<int><unit>` into days, with d=1, w=7, m=31, y=365.
pub(crate) fn parse_duration(text: &str) -> Result<u32, OptionError> {
    let caps = regex!(r"^\s*([0-9]+)\s*([dwmy])\s*$").captures(text).ok_or_else(|| OptionError::Duration(text.to_string()))?;
    let too_long = || OptionError::DurationTooLong { value: text.to_string(), max: MAX_DAYS };

    let count: u64 = caps[1].parse().map_err(|_| too_long())?;
    let unit: u64 = match &caps[2] {
        "d" => 1,
        "w" => 7,
        "m" => 31,
        _ => 365,
    };
    let days = count.checked_mul(unit).ok_or_else(too_long)?;
    if days > u64::from(MAX_DAYS) {
        return Err(too_long());
    }
    u32::try_from(days).map_err(|_| too_long())
}

/// Reject an explicit day count above [`MAX_DAYS`].
pub(crate) fn check_days(days: u32) -> Result<u32, OptionError> {
    if days > MAX_DAYS {
        return Err(OptionError::DurationTooLong { value: format!("{days}d"), max: MAX_DAYS });
    }
    Ok(days)
}

/// Every simulated day, `start` through `start + days - 1`, must be a
/// representable date.
pub(crate) fn check_horizon(start: NaiveDate, days: u32) -> Result<(), OptionError> {
    let last = match days.checked_sub(1) {
        Some(offset) => start.checked_add_days(Days::new(u64::from(offset))),
        None => Some(start),
    };
    last.map(drop).ok_or(OptionError::HorizonOutOfRange { start, days })
}

const START_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d %Y", "%B %d %Y", "%b %d, %Y", "%B %d, %Y", "%d %b %Y", "%d %B %Y"];

/// Parse a `startDate` value.
///
/// Common absolute formats are tried first; anything else goes through
/// English date parsing relative to `reference` ("today", "next monday",
/// "2 weeks ago"). Time of day is dropped.
pub(crate) fn parse_start_date(text: &str, reference: NaiveDate) -> Result<NaiveDate, OptionError> {
    let trimmed = text.trim();
    if let Some(date) = START_DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok()) {
        return Ok(date);
    }

    // Relative offsets are added unchecked by the English parser.
    let oversized = regex!(r"[0-9]+").find_iter(trimmed).any(|m| m.as_str().parse::<u32>().map_or(true, |n| n > MAX_DAYS));
    if oversized {
        let reason = format!("relative offsets are limited to {MAX_DAYS}");
        return Err(OptionError::StartDate { value: text.to_string(), reason });
    }

    let now = Utc.from_utc_datetime(&reference.and_time(NaiveTime::MIN));
    chrono_english::parse_date_string(trimmed, now, Dialect::Us)
        .map(|dt| dt.date_naive())
        .map_err(|err| OptionError::StartDate { value: text.to_string(), reason: err.to_string() })
}

fn string_value(key: &str, value: &PropertyValue) -> Result<String, OptionError> {
    match value {
        PropertyValue::Str { value, .. } => Ok(value.clone()),
        _ => Err(OptionError::WrongKind { key: key.to_string(), expected: "a string" }),
    }
}

/// Strings and bare names are both accepted for enumerated values.
fn word_value(key: &str, value: &PropertyValue) -> Result<String, OptionError> {
    match value {
        PropertyValue::Str { value, .. } => Ok(value.clone()),
        PropertyValue::Name(ident) => Ok(ident.name.clone()),
        PropertyValue::Number { .. } => Err(OptionError::WrongKind { key: key.to_string(), expected: "a name or string" }),
    }
}

fn chart_type(word: String) -> Result<ChartType, OptionError> {
    match word.as_str() {
        "line" => Ok(ChartType::Line),
        "area" => Ok(ChartType::Area),
        _ => Err(OptionError::UnknownValue { key: "chartType".into(), value: word, allowed: "line, area" }),
    }
}

fn legend(word: String) -> Result<Legend, OptionError> {
    match word.as_str() {
        "none" => Ok(Legend::None),
        "line" => Ok(Legend::Line),
        _ => Err(OptionError::UnknownValue { key: "legend".into(), value: word, allowed: "none, line" }),
    }
}

fn positive_value(key: &str, value: &PropertyValue) -> Result<f64, OptionError> {
    match value {
        PropertyValue::Number { value, .. } if *value > 0.0 && value.is_finite() => Ok(*value),
        PropertyValue::Number { .. } => Err(OptionError::NotPositive { key: key.to_string() }),
        _ => Err(OptionError::WrongKind { key: key.to_string(), expected: "a number" }),
    }
}

// --- Resolution --------------------------------------------------------------

/// Resolve a variable's inline property list.
pub(crate) fn resolve_var_props(name: &str, props: Option<&PropertyList>, log: &mut DiagnosticLog<'_>) -> StateKeyProps {
    let mut resolved = StateKeyProps { key: name.to_string(), label: name.to_string(), color: None };
    let Some(props) = props else {
        return resolved;
    };

    for prop in &props.entries {
        let key = prop.key.name.as_str();
        let outcome = match key {
            "label" => string_value(key, &prop.value).map(|label| resolved.label = label),
            "color" => string_value(key, &prop.value).map(|color| resolved.color = Some(color)),
            _ => {
                tracing::debug!(var = name, key, "ignoring unknown variable property");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            log.report(prop.value.span(), err.to_string());
        }
    }
    resolved
}

/// Resolve the options block on top of the defaults.
///
/// `label` and `color` are accepted here as well, since the block shares the
/// variable property syntax, but they have no graph-wide meaning.
pub(crate) fn resolve_graph_options(
    block: Option<&PropertyList>,
    state_keys_props: Vec<StateKeyProps>,
    reference: NaiveDate,
    log: &mut DiagnosticLog<'_>,
) -> GraphOptions {
    let mut options = GraphOptions { state_keys_props, ..GraphOptions::with_defaults(reference) };
    let Some(block) = block else {
        return options;
    };

    let mut start_span: Option<Span> = None;
    let mut duration_span: Option<Span> = None;
    for prop in &block.entries {
        let key = prop.key.name.as_str();
        let value = &prop.value;
        let outcome = match key {
            "startDate" => string_value(key, value).and_then(|s| parse_start_date(&s, reference)).map(|date| {
                options.start_date = date;
                start_span = Some(value.span());
            }),
            "duration" => string_value(key, value).and_then(|s| parse_duration(&s)).map(|days| {
                options.nr_days = days;
                duration_span = Some(value.span());
            }),
            "height" => positive_value(key, value).map(|px| options.height_px = px.round().clamp(1.0, f64::from(u32::MAX)) as u32),
            "strokeWidth" => positive_value(key, value).map(|w| options.stroke_width = w),
            "chartType" => word_value(key, value).and_then(chart_type).map(|t| options.chart_type = t),
            "legend" => word_value(key, value).and_then(legend).map(|l| options.legend = l),
            "label" | "color" => string_value(key, value).map(drop),
            _ => {
                tracing::debug!(key, "ignoring unknown option");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            log.report(value.span(), err.to_string());
        }
    }

    if let Err(err) = check_horizon(options.start_date, options.nr_days) {
        match (start_span, duration_span) {
            (Some(span), _) => {
                log.report(span, err.to_string());
                options.start_date = reference;
            }
            (None, Some(span)) => {
                log.report(span, err.to_string());
                options.nr_days = DEFAULT_DAYS;
            }
            // Only the reference date is involved; the caller checks that.
            (None, None) => {}
        }
    }

    tracing::trace!(?options, "resolved graph options");
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2000, 2, 2).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn resolve(source: &str) -> (GraphOptions, Vec<String>) {
        let mut log = DiagnosticLog::new(source);
        let program = parse(source, &mut log);
        let options = resolve_graph_options(program.options.as_ref(), Vec::new(), reference(), &mut log);
        (options, log.into_diagnostics().into_iter().map(|d| d.message).collect())
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("10d"), Ok(10));
        assert_eq!(parse_duration("2w"), Ok(14));
        assert_eq!(parse_duration("3m"), Ok(93));
        assert_eq!(parse_duration(" 5y "), Ok(1825));
        assert_eq!(parse_duration("100y"), Ok(36_500));
        assert_eq!(parse_duration("0d"), Ok(0));
    }

    #[test]
    fn malformed_durations() {
        assert_eq!(parse_duration("5"), Err(OptionError::Duration("5".into())));
        assert_eq!(parse_duration("y5"), Err(OptionError::Duration("y5".into())));
        assert_eq!(parse_duration("1.5y"), Err(OptionError::Duration("1.5y".into())));
        assert_eq!(parse_duration("101y"), Err(OptionError::DurationTooLong { value: "101y".into(), max: MAX_DAYS }));
        assert!(matches!(parse_duration("99999999999999999999999d"), Err(OptionError::DurationTooLong { .. })));
        assert_eq!(parse_duration("\u{663}d"), Err(OptionError::Duration("\u{663}d".into())));
    }

    #[test]
    fn start_date_formats() {
        let want = date(2024, 3, 5);
        for text in ["2024-03-05", "2024/3/5", "Mar 5 2024", "March 5, 2024", "5 Mar 2024", "5 March 2024"] {
            assert_eq!(parse_start_date(text, reference()), Ok(want), "{text}");
        }
    }

    #[test]
    fn start_date_falls_back_to_english() {
        assert_eq!(parse_start_date("tomorrow", reference()), Ok(date(2000, 2, 3)));
        assert!(matches!(parse_start_date("not a date", reference()), Err(OptionError::StartDate { .. })));
        assert_eq!(parse_start_date("10 days ago", reference()), Ok(date(2000, 1, 23)));
        for text in ["4000000000 days ago", "3000000000 weeks ago", "99999999999999999999 days"] {
            let err = parse_start_date(text, reference()).unwrap_err();
            assert_eq!(err.to_string(), format!("invalid startDate \"{text}\": relative offsets are limited to 36600"));
        }
    }

    #[test]
    fn day_limits() {
        assert_eq!(check_days(MAX_DAYS), Ok(MAX_DAYS));
        assert_eq!(check_days(u32::MAX), Err(OptionError::DurationTooLong { value: "4294967295d".into(), max: MAX_DAYS }));

        let last = NaiveDate::MAX;
        assert_eq!(check_horizon(last, 0), Ok(()));
        assert_eq!(check_horizon(last, 1), Ok(()));
        assert_eq!(check_horizon(last, 2), Err(OptionError::HorizonOutOfRange { start: last, days: 2 }));
        assert_eq!(check_horizon(reference(), MAX_DAYS), Ok(()));
    }

    #[test]
    fn horizon_past_the_calendar_keeps_the_default_start() {
        let start = NaiveDate::MAX - Days::new(11);
        let source = format!("options {{ startDate: \"{start}\", duration: \"1m\" }}");
        let (options, diags) = resolve(&source);
        assert_eq!(diags, vec![format!("31 days from {start} run past the last supported date")]);
        assert_eq!(options.start_date, reference());
        assert_eq!(options.nr_days, 31);
    }

    #[test]
    fn defaults_without_block() {
        let (options, diags) = resolve("var a = 1");
        assert!(diags.is_empty());
        assert_eq!(options, GraphOptions::with_defaults(reference()));
        assert_eq!(options.nr_days, 1825);
        assert_eq!(options.height_px, 200);
    }

    #[test]
    fn block_overrides_defaults() {
        let (options, diags) = resolve(
            r#"options {
                 startDate: "Jan 1 2024", duration: "2w", height: 320
                 chartType: area; strokeWidth: 1.5; legend: "none"
                 unknownKey: 42
               }"#,
        );
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(options.start_date, date(2024, 1, 1));
        assert_eq!(options.nr_days, 14);
        assert_eq!(options.height_px, 320);
        assert_eq!(options.chart_type, ChartType::Area);
        assert_eq!(options.stroke_width, 1.5);
        assert_eq!(options.legend, Legend::None);
    }

    #[test]
    fn bad_values_are_reported_and_defaults_kept() {
        let (options, diags) = resolve(r#"options { duration: "forever", height: -3, chartType: pie, startDate: 7 }"#);
        assert_eq!(
            diags,
            vec![
                "invalid duration \"forever\", expected <number><d|w|m|y> such as \"90d\" or \"5y\"",
                "option `height` must be a positive number",
                "unknown chartType \"pie\", expected one of line, area",
                "option `startDate` expects a string",
            ]
        );
        assert_eq!(options, GraphOptions::with_defaults(reference()));
    }

    #[test]
    fn var_props() {
        let source = r#"var a = 1 { label: "Savings", color: "hidden", weight: 3 }"#;
        let mut log = DiagnosticLog::new(source);
        let program = parse(source, &mut log);
        let crate::syntax::ast::Declaration::Var { props, .. } = &program.declarations[0] else {
            panic!("expected var");
        };
        let resolved = resolve_var_props("a", props.as_ref(), &mut log);
        assert!(log.is_empty());
        assert_eq!(resolved.label, "Savings");
        assert_eq!(resolved.color.as_deref(), Some(HIDDEN_COLOR));
    }

    #[test]
    fn serializes_for_the_renderer() {
        let mut options = GraphOptions::with_defaults(reference());
        options.state_keys_props.push(StateKeyProps { key: "a".into(), label: "A".into(), color: None });
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["startDate"], "2000-02-02");
        assert_eq!(json["nrDays"], 1825);
        assert_eq!(json["heightPx"], 200);
        assert_eq!(json["chartType"], "line");
        assert_eq!(json["legend"], "line");
        assert_eq!(json["stateKeysProps"][0]["label"], "A");
    }
}
