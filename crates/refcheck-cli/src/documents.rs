//! Input discovery: a single PDF, or every PDF under a directory.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Documents to process for `path`, in natural order.
///
/// A file is returned as-is whatever its extension. Directories are walked
/// recursively; unreadable entries are logged and skipped.
pub fn collect_documents(path: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if !path.exists() {
        anyhow::bail!("Path not found: {}", path.display());
    }
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut docs: Vec<PathBuf> = walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file() && is_pdf(e.path()))
        .map(|e| e.into_path())
        .collect();
    docs.sort_by(|a, b| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()));
    Ok(docs)
}

/// Compare strings so that digit runs order by numeric value:
/// `paper2.pdf` < `paper10.pdf`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();
    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let na = take_digits(&mut a);
                let nb = take_digits(&mut b);
                let ord = compare_digit_runs(&na, &nb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(it: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        it.next();
    }
    run
}

/// Numeric comparison of arbitrarily long digit runs; ties broken by length
/// so that `007` sorts after `7`.
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let ta = a.trim_start_matches('0');
    let tb = b.trim_start_matches('0');
    ta.len()
        .cmp(&tb.len())
        .then_with(|| ta.cmp(tb))
        .then_with(|| a.len().cmp(&b.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_numerically() {
        let mut names = vec!["paper10.pdf", "paper2.pdf", "paper1.pdf", "a.pdf"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["a.pdf", "paper1.pdf", "paper2.pdf", "paper10.pdf"]);
    }

    #[test]
    fn nested_directories_sort_naturally() {
        assert_eq!(natural_cmp("2/x.pdf", "10/a.pdf"), Ordering::Less);
        assert_eq!(natural_cmp("s/7.pdf", "s/007.pdf"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn collects_pdfs_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        for name in ["b10.pdf", "b9.PDF", "notes.txt", "sub/a1.pdf"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let docs = collect_documents(dir.path()).unwrap();
        let names: Vec<String> = docs
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b9.PDF", "b10.pdf", "sub/a1.pdf"]);
    }

    #[test]
    fn single_file_is_returned_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let docs = collect_documents(file.path()).unwrap();
        assert_eq!(docs, vec![file.path().to_path_buf()]);
    }

    #[test]
    fn missing_path_is_error() {
        assert!(collect_documents(Path::new("/nonexistent/refcheck")).is_err());
    }
}
