use std::io::Write;
use std::path::Path;

use owo_colors::OwoColorize;
use refcheck_core::{CheckStats, FindingKind, Reference, ReferenceReport};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

fn separator(w: &mut dyn Write, ch: &str, color: ColorMode) -> std::io::Result<()> {
    let sep = ch.repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold())
    } else {
        writeln!(w, "{}", sep)
    }
}

/// Print the per-document header and the number of extracted references.
pub fn print_document_header(
    w: &mut dyn Write,
    path: &Path,
    ref_count: usize,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "Extracting references from: {}", path.display().bold())?;
    } else {
        writeln!(w, "Extracting references from: {}", path.display())?;
    }
    writeln!(w, "Found {} references.", ref_count)?;
    writeln!(w)?;
    Ok(())
}

/// Print a document that could not be opened or decoded.
pub fn print_document_error(
    w: &mut dyn Write,
    path: &Path,
    error: &anyhow::Error,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}: {:#}", "ERROR:".red().bold(), path.display(), error)?;
    } else {
        writeln!(w, "ERROR: {}: {:#}", path.display(), error)?;
    }
    writeln!(w)?;
    Ok(())
}

/// Print the fields gleaned from each reference, without checking anything.
pub fn print_dump(w: &mut dyn Write, refs: &[Reference], color: ColorMode) -> std::io::Result<()> {
    for r in refs {
        if color.enabled() {
            writeln!(w, "{}", format!("[{}]", r.original_number).bold().yellow())?;
        } else {
            writeln!(w, "[{}]", r.original_number)?;
        }
        writeln!(w, "  Text:    {}", r.raw_citation)?;
        writeln!(
            w,
            "  Year:    {}",
            r.parsed
                .year
                .map(|y| y.to_string())
                .unwrap_or_else(|| "(none)".to_string())
        )?;
        writeln!(
            w,
            "  Authors: {}",
            if r.parsed.authors.is_empty() {
                "(none)".to_string()
            } else {
                r.parsed.authors.join("; ")
            }
        )?;
        if color.enabled() {
            writeln!(w, "  Title:   {}", r.parsed.title.cyan())?;
        } else {
            writeln!(w, "  Title:   {}", r.parsed.title)?;
        }
        for link in &r.links {
            writeln!(w, "  Link:    {}", link)?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// One status line per reference.
pub fn print_reference_status(
    w: &mut dyn Write,
    report: &ReferenceReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let number = report.reference.original_number;
    let title = truncate(&report.reference.parsed.title, 70);
    if report.is_clean() {
        if color.enabled() {
            writeln!(w, "[{}] {} {}", number, "CLEAN".green(), title)?;
        } else {
            writeln!(w, "[{}] CLEAN {}", number, title)?;
        }
        return Ok(());
    }

    let labels: Vec<&str> = report.findings.iter().map(|f| f.kind.label()).collect();
    let labels = labels.join(", ");
    if color.enabled() {
        writeln!(w, "[{}] {} {}", number, labels.red(), title)?;
    } else {
        writeln!(w, "[{}] {} {}", number, labels, title)?;
    }
    Ok(())
}

/// Print the detailed block for every reference with findings.
pub fn print_problems(
    w: &mut dyn Write,
    reports: &[ReferenceReport],
    color: ColorMode,
) -> std::io::Result<()> {
    let problems: Vec<&ReferenceReport> = reports.iter().filter(|r| !r.is_clean()).collect();
    if problems.is_empty() {
        return Ok(());
    }

    writeln!(w)?;
    let sep = "=".repeat(60);
    if color.enabled() {
        writeln!(w, "{}", sep.bold().red())?;
        writeln!(w, "{}", "PROBLEM REFERENCES".bold().red())?;
        writeln!(w, "{}", sep.bold().red())?;
    } else {
        writeln!(w, "{}", sep)?;
        writeln!(w, "PROBLEM REFERENCES")?;
        writeln!(w, "{}", sep)?;
    }

    for report in problems {
        print_problem_block(w, report, color)?;
    }
    Ok(())
}

fn print_problem_block(
    w: &mut dyn Write,
    report: &ReferenceReport,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{} {}", "Reference:".bold(), report.reference.raw_citation)?;
    } else {
        writeln!(w, "Reference: {}", report.reference.raw_citation)?;
    }

    for finding in &report.findings {
        let label = format!("{}:", finding.kind.label());
        if color.enabled() {
            let label = match finding.kind {
                FindingKind::FoundYearMismatch | FindingKind::FoundAuthorsMissing => {
                    label.yellow().to_string()
                }
                _ => label.red().to_string(),
            };
            writeln!(w, "  {} {}", label, finding.message)?;
        } else {
            writeln!(w, "  {} {}", label, finding.message)?;
        }
    }

    if let Some(m) = &report.matched {
        let year = m.year.map(|y| y.to_string()).unwrap_or_else(|| "?".into());
        let line = format!("Matched ({}): {}, {}", m.source, m.title, year);
        if color.enabled() {
            writeln!(w, "  {}", line.dimmed())?;
        } else {
            writeln!(w, "  {}", line)?;
        }
        if !m.authors.is_empty() {
            let authors = format!("Authors: {}", m.authors.join("; "));
            if color.enabled() {
                writeln!(w, "  {}", authors.dimmed())?;
            } else {
                writeln!(w, "  {}", authors)?;
            }
        }
    }

    for (source, message) in &report.source_errors {
        let line = format!("{} unavailable: {}", source, message);
        if color.enabled() {
            writeln!(w, "  {}", line.dimmed())?;
        } else {
            writeln!(w, "  {}", line)?;
        }
    }
    Ok(())
}

/// Print the final per-document summary.
pub fn print_summary(
    w: &mut dyn Write,
    stats: &CheckStats,
    color: ColorMode,
) -> std::io::Result<()> {
    writeln!(w)?;
    separator(w, "=", color)?;
    if color.enabled() {
        writeln!(w, "{}", "SUMMARY".bold())?;
    } else {
        writeln!(w, "SUMMARY")?;
    }
    separator(w, "=", color)?;

    writeln!(w, "  References checked: {}", stats.total)?;
    if color.enabled() {
        writeln!(w, "  {} {}", "Clean:".green(), stats.clean)?;
    } else {
        writeln!(w, "  Clean: {}", stats.clean)?;
    }

    let rows = [
        ("Not found:", stats.not_found),
        ("Retracted:", stats.retracted),
        ("Year mismatches:", stats.year_mismatch),
        ("Missing authors:", stats.authors_missing),
        ("Invalid links:", stats.invalid_link),
        ("Bogus:", stats.bogus),
    ];
    for (label, count) in rows {
        if count == 0 {
            continue;
        }
        if color.enabled() {
            writeln!(w, "  {} {}", label.red(), count)?;
        } else {
            writeln!(w, "  {} {}", label, count)?;
        }
    }
    writeln!(w)?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
