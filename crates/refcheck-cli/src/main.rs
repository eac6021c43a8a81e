use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use refcheck_core::config_file::{self, ConfigFile};
use refcheck_core::{CheckStats, Config, ProgressEvent, TitleMatchMode};
use refcheck_parsing::{Dictionary, ParsingConfigBuilder, ReferenceExtractor, WordList};
use refcheck_pdf_mupdf::MupdfSpanSource;

mod documents;
mod output;

use output::ColorMode;

/// Reference checker - flag fabricated or broken references in academic PDFs
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// PDF file, or a directory searched recursively for PDFs
    path: PathBuf,

    /// Print the fields extracted from each reference and exit without checking
    #[arg(long)]
    dump_info: bool,

    /// Only validate links; do not search bibliographic sources
    #[arg(long)]
    links_only: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Require exact (case-sensitive) title equality
    #[arg(long)]
    strict_titles: bool,

    /// Print only the references with problems
    #[arg(long)]
    problems_only: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// OpenAlex API key
    #[arg(long)]
    openalex_key: Option<String>,

    /// Contact address for the OpenAlex polite pool
    #[arg(long)]
    mailto: Option<String>,

    /// Word list (one word per line) used to decide line-break hyphens
    #[arg(long)]
    dictionary: Option<PathBuf>,

    /// Comma-separated list of sources to disable (e.g. openalex,arxiv)
    #[arg(long, value_delimiter = ',')]
    disable_sources: Vec<String>,

    /// Search timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Config file to use instead of the default cascade
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let file_config = match &cli.config {
        Some(path) => config_file::load_required(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => config_file::load_config(),
    };

    let config = build_config(&cli, &file_config);
    tracing::debug!(?config, "resolved configuration");

    let dictionary = resolve_dictionary(cli.dictionary.as_deref(), &file_config)?;
    let parsing = ParsingConfigBuilder::new()
        .dictionary(dictionary)
        .build()
        .context("building parsing config")?;
    let extractor = ReferenceExtractor::with_config(parsing);
    let backend = span_source(&file_config);

    let docs = documents::collect_documents(&cli.path)?;
    if docs.is_empty() {
        anyhow::bail!("No PDF files found under {}", cli.path.display());
    }

    let color = ColorMode(!cli.no_color && cli.output.is_none());
    let mut writer: Box<dyn Write> = if let Some(ref output_path) = cli.output {
        Box::new(
            std::fs::File::create(output_path)
                .with_context(|| format!("creating {}", output_path.display()))?,
        )
    } else {
        Box::new(std::io::stdout())
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    for doc in &docs {
        let refs = match extractor.extract_references_via_backend(doc, &backend) {
            Ok(refs) => refs,
            Err(e) => {
                output::print_document_error(&mut writer, doc, &e.into(), color)?;
                continue;
            }
        };
        output::print_document_header(&mut writer, doc, refs.len(), color)?;

        if cli.dump_info {
            output::print_dump(&mut writer, &refs, color)?;
            continue;
        }
        if refs.is_empty() {
            continue;
        }

        let pb = progress_bar(refs.len() as u64);
        let progress = {
            let pb = pb.clone();
            move |event: ProgressEvent| match event {
                ProgressEvent::Checking { title, .. } => pb.set_message(title),
                ProgressEvent::Result { .. } => pb.inc(1),
                ProgressEvent::SourceFailed {
                    index,
                    source,
                    message,
                } => pb.println(format!("[{}] {} failed: {}", index + 1, source, message)),
            }
        };
        let reports =
            refcheck_core::check_references(refs, config.clone(), progress, cancel.clone()).await?;
        pb.finish_and_clear();

        if !cli.problems_only {
            for report in &reports {
                output::print_reference_status(&mut writer, report, color)?;
            }
        }
        output::print_problems(&mut writer, &reports, color)?;
        output::print_summary(&mut writer, &CheckStats::from_reports(&reports), color)?;
        writer.flush()?;

        if cancel.is_cancelled() {
            tracing::warn!(document = %doc.display(), "interrupted; remaining documents skipped");
            break;
        }
    }

    writer.flush()?;
    Ok(())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let mut filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    if verbose {
        for krate in ["refcheck", "refcheck_core", "refcheck_parsing", "refcheck_pdf_mupdf"] {
            filter = filter.add_directive(format!("{krate}=debug").parse()?);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Defaults, then the config file, then environment variables, then flags.
fn build_config(cli: &Cli, file: &ConfigFile) -> Config {
    let mut config = Config::default();
    file.apply_to(&mut config);

    if let Some(key) = env_var("OPENALEX_KEY") {
        config.openalex_key = Some(key);
    }
    if let Some(mailto) = env_var("REFCHECK_MAILTO") {
        config.mailto = Some(mailto);
    }
    if let Some(secs) = env_var("REFCHECK_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.search_timeout_secs = secs;
    }

    if let Some(key) = &cli.openalex_key {
        config.openalex_key = Some(key.clone());
    }
    if let Some(mailto) = &cli.mailto {
        config.mailto = Some(mailto.clone());
    }
    if let Some(secs) = cli.timeout {
        config.search_timeout_secs = secs;
    }
    if !cli.disable_sources.is_empty() {
        config.disabled_sources = cli.disable_sources.clone();
    }
    if cli.strict_titles {
        config.title_match = TitleMatchMode::Strict;
    }
    config.links_only = cli.links_only;
    config
}

/// Flag, then `REFCHECK_DICTIONARY`, then the config file, then the system
/// word list. An explicitly named list that cannot be read is an error.
fn resolve_dictionary(
    flag: Option<&Path>,
    file: &ConfigFile,
) -> anyhow::Result<Arc<dyn Dictionary>> {
    let explicit = flag
        .map(Path::to_path_buf)
        .or_else(|| env_var("REFCHECK_DICTIONARY").map(PathBuf::from))
        .or_else(|| file.dictionary_path());

    let words = match explicit {
        Some(path) => WordList::load(&path)
            .with_context(|| format!("loading dictionary {}", path.display()))?,
        None => WordList::system().unwrap_or_default(),
    };
    tracing::debug!(words = words.len(), "dictionary loaded");
    Ok(Arc::new(words))
}

fn span_source(file: &ConfigFile) -> MupdfSpanSource {
    let mut source = MupdfSpanSource::new();
    if let Some(pdf) = &file.pdf {
        if let Some(ratio) = pdf.header_exclusion {
            source = source.with_header_exclusion(ratio);
        }
        if let Some(ratio) = pdf.footer_exclusion {
            source = source.with_footer_exclusion(ratio);
        }
    }
    source
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("refcheck").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_config_file() {
        let file: ConfigFile = toml_file(
            "[api_keys]\nmailto = \"file@example.org\"\n[network]\ntimeout_secs = 3\n",
        );
        let cli = parse(&[
            "paper.pdf",
            "--timeout",
            "7",
            "--strict-titles",
            "--disable-sources",
            "arxiv,openalex",
        ]);
        let config = build_config(&cli, &file);
        assert_eq!(config.search_timeout_secs, 7);
        assert_eq!(config.title_match, TitleMatchMode::Strict);
        assert_eq!(config.disabled_sources, vec!["arxiv", "openalex"]);
        assert!(!config.links_only);
        assert_eq!(config.link_timeout_secs, Config::default().link_timeout_secs);
    }

    #[test]
    fn pdf_section_sets_exclusion_bands() {
        let file: ConfigFile = toml_file("[pdf]\nheader_exclusion = 0.0\n");
        assert_eq!(
            span_source(&file),
            MupdfSpanSource::new().with_header_exclusion(0.0)
        );
        assert_eq!(span_source(&ConfigFile::default()), MupdfSpanSource::new());
    }

    #[test]
    fn missing_explicit_dictionary_is_error() {
        let file = ConfigFile::default();
        let err = resolve_dictionary(Some(Path::new("/nonexistent/words")), &file);
        assert!(err.is_err());
    }

    #[test]
    fn explicit_dictionary_is_loaded() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "spatiotemporal").unwrap();
        let dict = resolve_dictionary(Some(f.path()), &ConfigFile::default()).unwrap();
        assert!(dict.contains("spatiotemporal"));
        assert!(!dict.contains("zzzz"));
    }

    fn toml_file(content: &str) -> ConfigFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        config_file::load_required(f.path()).unwrap()
    }
}
