use super::types::ChangedFile;
use super::PrError;

/// A contiguous region of changes within a file patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    /// Raw lines of the hunk (prefixed with +, -, or space)
    pub lines: Vec<String>,
}

impl Hunk {
    pub fn added(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| l.strip_prefix('+'))
    }

    pub fn removed(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| l.strip_prefix('-'))
    }
}

/// Parse the per-file patch GitHub returns in `pulls.listFiles`.
///
/// Unlike a full `git diff`, the patch has no `diff --git` or `---`/`+++`
/// header; it starts directly at the first `@@` hunk header. Text before the
/// first hunk header is rejected, since it means the patch is not what we
/// think it is.
///
/// Lines are prefixed with:
///   '+' for additions
///   '-' for deletions
///   ' ' for context (unchanged)
///   '\' for "No newline at end of file" markers, which are skipped
pub fn parse_patch(patch: &str) -> Result<Vec<Hunk>, PrError> {
    let mut hunks = Vec::new();
    let mut current: Option<Hunk> = None;

    for line in patch.lines() {
        if line.starts_with("@@") {
            if let Some(hunk) = current.take() {
                hunks.push(hunk);
            }
            let (old_start, old_count, new_start, new_count) = parse_hunk_header(line)?;
            current = Some(Hunk {
                old_start,
                old_count,
                new_start,
                new_count,
                lines: Vec::new(),
            });
            continue;
        }

        let Some(hunk) = current.as_mut() else {
            if line.trim().is_empty() {
                continue;
            }
            return Err(PrError::DiffParse(format!(
                "Unexpected line before first hunk header: {}",
                line
            )));
        };

        if line.starts_with('+') || line.starts_with('-') || line.starts_with(' ') {
            hunk.lines.push(line.to_string());
        } else if line.is_empty() {
            // Some producers strip the leading space from empty context lines.
            hunk.lines.push(" ".to_string());
        }
    }

    if let Some(hunk) = current.take() {
        hunks.push(hunk);
    }
    Ok(hunks)
}

/// Count added and removed lines across all hunks.
pub fn line_counts(hunks: &[Hunk]) -> (usize, usize) {
    hunks.iter().fold((0, 0), |(adds, dels), hunk| {
        (adds + hunk.added().count(), dels + hunk.removed().count())
    })
}

/// Populate `additions`, `deletions` and `changes` from the patch when the
/// payload left them out. Files that already carry counts are left alone.
pub fn fill_missing_counts(file: &mut ChangedFile) -> Result<(), PrError> {
    if file.additions.is_some() && file.deletions.is_some() {
        return Ok(());
    }
    let Some(patch) = file.patch.as_deref() else {
        return Ok(());
    };
    let (additions, deletions) = line_counts(&parse_patch(patch)?);
    file.additions.get_or_insert(additions);
    file.deletions.get_or_insert(deletions);
    file.changes.get_or_insert(additions + deletions);
    Ok(())
}

fn parse_hunk_header(line: &str) -> Result<(usize, usize, usize, usize), PrError> {
    let header = line
        .trim()
        .strip_prefix("@@")
        .ok_or_else(|| PrError::DiffParse("Invalid hunk header".to_string()))?;
    // Anything after the closing @@ is the enclosing-function hint.
    let header = match header.split_once("@@") {
        Some((ranges, _)) => ranges.trim(),
        None => header.trim(),
    };
    let mut parts = header.split_whitespace();
    let old_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing old range".to_string()))?;
    let new_part = parts
        .next()
        .ok_or_else(|| PrError::DiffParse("Missing new range".to_string()))?;

    let (old_start, old_count) = parse_range(old_part, '-')?;
    let (new_start, new_count) = parse_range(new_part, '+')?;

    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(part: &str, prefix: char) -> Result<(usize, usize), PrError> {
    let range = part
        .strip_prefix(prefix)
        .ok_or_else(|| PrError::DiffParse("Invalid range prefix".to_string()))?;
    let (start_str, count_str) = match range.split_once(',') {
        Some((start, count)) => (start, count),
        None => (range, "1"),
    };
    let start = start_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range start in {}", part)))?;
    let count = count_str
        .parse::<usize>()
        .map_err(|_| PrError::DiffParse(format!("Invalid range count in {}", part)))?;
    Ok((start, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PACKAGE_PATCH: &str = r#"@@ -10,7 +10,7 @@ "dependencies": {
     "express": "^4.17.1",
-    "left-pad": "1.2.0",
+    "left-pad": "1.3.0",
     "lodash": "^4.17.21"
   },"#;

    #[test]
    fn test_parse_single_hunk() {
        let hunks = parse_patch(PACKAGE_PATCH).unwrap();
        assert_eq!(hunks.len(), 1);
        assert_eq!(hunks[0].old_start, 10);
        assert_eq!(hunks[0].new_count, 7);
        assert_eq!(line_counts(&hunks), (1, 1));
        assert_eq!(hunks[0].added().next(), Some(r#"    "left-pad": "1.3.0","#));
    }

    #[test]
    fn test_parse_multiple_hunks() {
        let patch = "@@ -1,2 +1,2 @@\n-a\n+b\n c\n@@ -20 +20,2 @@\n x\n+y\n";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks.len(), 2);
        assert_eq!(hunks[1].old_count, 1);
        assert_eq!(line_counts(&hunks), (2, 1));
    }

    #[test]
    fn test_no_newline_marker_is_ignored() {
        let patch = "@@ -1 +1 @@\n-old\n\\ No newline at end of file\n+new\n";
        let hunks = parse_patch(patch).unwrap();
        assert_eq!(hunks[0].lines.len(), 2);
    }

    #[test]
    fn test_rejects_text_before_hunk() {
        assert!(parse_patch("garbage\n@@ -1 +1 @@\n-a\n+b").is_err());
        assert!(parse_patch("@@ -x +1 @@\n").is_err());
    }

    #[test]
    fn test_empty_patch() {
        assert!(parse_patch("").unwrap().is_empty());
    }

    #[test]
    fn test_fill_missing_counts() {
        let mut file = ChangedFile {
            filename: "package.json".to_string(),
            patch: Some(PACKAGE_PATCH.to_string()),
            ..Default::default()
        };
        fill_missing_counts(&mut file).unwrap();
        assert_eq!(file.additions, Some(1));
        assert_eq!(file.deletions, Some(1));
        assert_eq!(file.changes, Some(2));
    }

    #[test]
    fn test_fill_missing_counts_keeps_reported_values() {
        let mut file = ChangedFile {
            filename: "package.json".to_string(),
            patch: Some(PACKAGE_PATCH.to_string()),
            additions: Some(9),
            deletions: Some(9),
            ..Default::default()
        };
        fill_missing_counts(&mut file).unwrap();
        assert_eq!(file.additions, Some(9));
        assert!(file.changes.is_none());
    }
}
