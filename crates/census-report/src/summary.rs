use colored::Colorize;

use census_core::aggregate::AggregationResult;

/// Where one output channel was written.
#[derive(Debug, Clone)]
pub struct Written {
    /// `text` or `csv`
    pub channel: &'static str,
    /// File path, or `stdout`.
    pub destination: String,
    /// Package versions in the channel.
    pub entries: usize,
}

/// Short terminal summary of a run, for stderr.
pub fn format_summary(repo: &str, full: &AggregationResult, written: &[Written]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} {} ({})\n",
        "Cache census:".bold(),
        repo,
        full.ecosystem
    ));
    out.push_str(&format!(
        "  {} packages, {} versions",
        full.package_count().to_string().green(),
        full.len().to_string().green()
    ));
    if full.skipped > 0 {
        out.push_str(&format!(
            ", {} files skipped",
            full.skipped.to_string().yellow()
        ));
    }
    out.push('\n');

    if full.is_empty() {
        out.push_str(&format!("  {}\n", "No cached packages found".yellow().bold()));
    }

    for w in written {
        out.push_str(&format!(
            "  {:<4} -> {} ({} {})\n",
            w.channel,
            w.destination,
            w.entries,
            if w.entries == 1 { "entry" } else { "entries" }
        ));
    }
    out
}
