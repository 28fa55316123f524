//! Output formatting utilities

use crate::error::Result;
use crate::orchestrator::ComparisonRun;
use crate::registry::ScanReport;
use crate::result::{ComparisonResult, DiffClassification};
use crate::strategy::StrategyDescriptor;
use serde_json::{json, Value};
use std::fmt::Write;

/// Highlights listed before the pretty output is truncated
const MAX_PRETTY_HIGHLIGHTS: usize = 20;

/// Pretty printer for tabcompare output
pub struct PrettyPrinter;

impl PrettyPrinter {
    pub fn print_comparison(run: &ComparisonRun) {
        println!("{}", Self::render_comparison(run));
    }

    pub fn print_strategy_list(report: &ScanReport) {
        println!("{}", Self::render_strategy_list(report));
    }

    pub fn print_descriptor(descriptor: &StrategyDescriptor) {
        println!("{}", Self::render_descriptor(descriptor));
    }

    /// Render a finished comparison run as a tree
    pub fn render_comparison(run: &ComparisonRun) -> String {
        let result = &run.result;
        let mut out = String::new();
        let _ = writeln!(out, "🔍 Comparison: {} ({} ms)", run.strategy, run.duration_ms);

        if let Some(error) = result.error() {
            let kind = result.error_kind().unwrap_or("execution");
            let _ = writeln!(out, "├─ 💥 Failed ({})", kind);
            let _ = write!(out, "└─ {}", error);
            return out;
        }

        if result.is_equal {
            let _ = writeln!(out, "├─ ✅ Result: EQUAL");
        } else {
            let _ = writeln!(out, "├─ ❌ Result: DIFFERENT");
        }

        for line in result.details.lines() {
            let _ = writeln!(out, "│  {}", line);
        }

        render_highlights(&mut out, result);

        let params = result
            .metadata
            .get("parameters")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        if let Some(fallbacks) = result.metadata.get("parameter_fallbacks") {
            let _ = writeln!(out, "├─ ⚠️  Defaults used for: {}", fallbacks);
        }
        let _ = write!(out, "└─ Parameters: {}", params);
        out
    }

    /// Render registered strategies and discovery errors
    pub fn render_strategy_list(report: &ScanReport) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🧩 Strategies ({}):", report.strategies.len());
        for (i, (name, strategy)) in report.strategies.iter().enumerate() {
            let last = i == report.strategies.len() - 1 && report.errors.is_empty();
            let prefix = if last { "└─" } else { "├─" };
            let source = report.sources.get(name).map(String::as_str).unwrap_or("");
            let _ = writeln!(out, "{} {} v{} [{}]", prefix, name, strategy.version(), source);
        }

        if !report.errors.is_empty() {
            let _ = writeln!(out, "└─ ⚠️  Discovery errors ({}):", report.errors.len());
            for (i, (source, message)) in report.errors.iter().enumerate() {
                let prefix = if i == report.errors.len() - 1 { "   └─" } else { "   ├─" };
                let _ = writeln!(out, "{} {}: {}", prefix, source, message);
            }
        }
        out.trim_end().to_string()
    }

    /// Render a descriptor with its parameter schema
    pub fn render_descriptor(descriptor: &StrategyDescriptor) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "🧩 {} v{}", descriptor.name, descriptor.version);
        let _ = writeln!(out, "├─ {}", descriptor.description);

        if descriptor.parameters.is_empty() {
            let _ = write!(out, "└─ No parameters");
            return out;
        }

        let _ = writeln!(out, "└─ Parameters:");
        let count = descriptor.parameters.len();
        for (i, (name, spec)) in descriptor.parameters.iter().enumerate() {
            let prefix = if i == count - 1 { "   └─" } else { "   ├─" };
            let options = if spec.options.is_empty() {
                String::new()
            } else {
                format!(" {{{}}}", spec.options.join("|"))
            };
            let _ = writeln!(
                out,
                "{} {} ({:?}{}, default {}): {}",
                prefix, name, spec.kind, options, spec.default, spec.description
            );
        }
        out.trim_end().to_string()
    }
}

fn render_highlights(out: &mut String, result: &ComparisonResult) {
    let reported: Vec<_> = result
        .highlights
        .iter()
        .filter(|h| h.diff_type != DiffClassification::Same)
        .collect();
    let same = result.highlights.len() - reported.len();

    let _ = writeln!(out, "├─ Highlights: {} reported, {} matching", reported.len(), same);
    for (i, h) in reported.iter().take(MAX_PRETTY_HIGHLIGHTS).enumerate() {
        let last = i == reported.len().min(MAX_PRETTY_HIGHLIGHTS) - 1 && reported.len() <= MAX_PRETTY_HIGHLIGHTS;
        let prefix = if last { "│  └─" } else { "│  ├─" };
        let _ = writeln!(
            out,
            "{} [{}] {}: {} → {} ({})",
            prefix, h.category, h.item, h.value_a, h.value_b, h.status
        );
    }
    if reported.len() > MAX_PRETTY_HIGHLIGHTS {
        let _ = writeln!(out, "│  └─ ... and {} more", reported.len() - MAX_PRETTY_HIGHLIGHTS);
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(data: &Value) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_run(run: &ComparisonRun) -> Result<String> {
        Ok(serde_json::to_string_pretty(run)?)
    }

    pub fn format_strategy_list(report: &ScanReport) -> Result<String> {
        let strategies: Vec<Value> = report
            .strategies
            .iter()
            .map(|(name, strategy)| {
                json!({
                    "name": name,
                    "version": strategy.version(),
                    "description": strategy.description(),
                    "source": report.sources.get(name),
                })
            })
            .collect();
        Self::format(&json!({
            "strategies": strategies,
            "errors": report.errors,
            "scanned_at": report.scanned_at,
        }))
    }

    pub fn format_descriptor(descriptor: &StrategyDescriptor) -> Result<String> {
        Ok(serde_json::to_string_pretty(descriptor)?)
    }
}
