//! Case discovery, partitioning and navigation for one annotation session.
//!
//! Cases are partitioned into a *working list* (everything assigned to the
//! annotator for this output folder) and a *remaining list* (the subset not
//! yet saved). Both lists persist as flat text files next to the output
//! data, one case filename per line, and are rewritten after every change.
//!
//! Cases are sorted lexicographically by filename once, at discovery time,
//! and never re-sorted; index-based navigation relies on that order staying
//! stable for the whole session.

use std::path::{Path, PathBuf};

use crate::error::{AnnotrackError, Result};

/// Name of the working-list file inside the output folder.
pub const WORKING_LIST_FILENAME: &str = "working_list.txt";

/// Name of the remaining-list file inside the output folder.
pub const REMAINING_LIST_FILENAME: &str = "remaining_list.txt";

/// List all case filenames in a volume folder matching the configured input
/// extension, sorted lexicographically.
pub fn discover_cases(volume_folder: &Path, input_filetype: &str) -> Result<Vec<String>> {
    let mut cases = Vec::new();
    for entry in std::fs::read_dir(volume_folder)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.ends_with(input_filetype) {
            cases.push(name.to_string());
        }
    }
    cases.sort();
    log::info!(
        "Discovered {} case(s) in {:?}",
        cases.len(),
        volume_folder
    );
    Ok(cases)
}

/// Working/remaining list bookkeeping for one
/// (volume-folder, output-folder, annotator) tuple.
#[derive(Debug)]
pub struct CaseListManager {
    output_folder: PathBuf,
    working: Vec<String>,
    remaining: Vec<String>,
    current_index: usize,
}

impl CaseListManager {
    /// Partition the discovered case set, reusing prior on-disk lists when
    /// they exist and are consistent.
    ///
    /// A prior pair that contradicts itself or the discovered set fails
    /// with `InconsistentWorkflow`. That condition is never silently
    /// repaired: the list files are shared across annotators and a
    /// contradiction means on-disk corruption someone has to look at.
    pub fn partition(output_folder: &Path, discovered: Vec<String>) -> Result<Self> {
        let mut discovered = discovered;
        discovered.sort();

        let working_path = output_folder.join(WORKING_LIST_FILENAME);
        let remaining_path = output_folder.join(REMAINING_LIST_FILENAME);

        let (working, remaining) = if working_path.exists() || remaining_path.exists() {
            let prior_working = read_list_file(&working_path)?;
            let prior_remaining = read_list_file(&remaining_path)?;
            reuse_prior_lists(&discovered, prior_working, prior_remaining)?
        } else {
            log::info!("No prior work lists; starting fresh in {:?}", output_folder);
            (discovered.clone(), discovered.clone())
        };

        let manager = Self {
            output_folder: output_folder.to_path_buf(),
            current_index: 0,
            working,
            remaining,
        };
        manager.write_lists()?;
        Ok(manager)
    }

    /// The full case list for this annotator, in stable order.
    pub fn working_list(&self) -> &[String] {
        &self.working
    }

    /// Cases not yet saved by this annotator.
    pub fn remaining_list(&self) -> &[String] {
        &self.remaining
    }

    /// Whether every case has been saved at least once.
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Number of cases in the working list.
    pub fn case_count(&self) -> usize {
        self.working.len()
    }

    /// Index of the active case in the working list.
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Filename of the active case, or `None` when the working list is
    /// empty.
    pub fn current_case(&self) -> Option<&str> {
        self.working.get(self.current_index).map(String::as_str)
    }

    /// The first not-yet-saved case, used to resume a session.
    pub fn first_remaining(&self) -> Option<&str> {
        self.remaining.first().map(String::as_str)
    }

    /// Make `case` the active case.
    pub fn select(&mut self, case: &str) -> Result<()> {
        let index = self.working.iter().position(|c| c == case).ok_or_else(|| {
            AnnotrackError::inconsistent_workflow(format!(
                "case '{case}' is not in the working list"
            ))
        })?;
        self.current_index = index;
        Ok(())
    }

    /// Advance to the next case without saving (Next button). Clamps at the
    /// last case; never wraps.
    pub fn advance_without_save(&mut self) -> Option<&str> {
        if !self.working.is_empty() {
            self.current_index = (self.current_index + 1).min(self.working.len() - 1);
        }
        self.current_case()
    }

    /// Step back to the previous case (Previous button). Clamps at the
    /// first case; never wraps.
    pub fn step_back(&mut self) -> Option<&str> {
        self.current_index = self.current_index.saturating_sub(1);
        self.current_case()
    }

    /// Record that `saved_case` was saved, rewrite the list files, and
    /// return the next active case.
    ///
    /// While the remaining list is non-empty the next case is its first
    /// entry, not necessarily adjacent to `saved_case`. Once the remaining
    /// list drains, navigation falls back to working-list order
    /// (index + 1, clamped to the last case).
    pub fn advance_after_save(&mut self, saved_case: &str) -> Result<Option<&str>> {
        self.remaining.retain(|c| c != saved_case);
        self.write_lists()?;

        let next = if let Some(first) = self.remaining.first() {
            first.clone()
        } else {
            let index = self
                .working
                .iter()
                .position(|c| c == saved_case)
                .ok_or_else(|| {
                    AnnotrackError::inconsistent_workflow(format!(
                        "saved case '{saved_case}' is not in the working list"
                    ))
                })?;
            let next_index = (index + 1).min(self.working.len() - 1);
            self.working[next_index].clone()
        };

        self.select(&next)?;
        log::debug!(
            "Saved '{}'; {} case(s) remaining, next is '{}'",
            saved_case,
            self.remaining.len(),
            next
        );
        Ok(self.current_case())
    }

    /// Rewrite both list files.
    fn write_lists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_folder)?;
        write_list_file(&self.output_folder.join(WORKING_LIST_FILENAME), &self.working)?;
        write_list_file(
            &self.output_folder.join(REMAINING_LIST_FILENAME),
            &self.remaining,
        )?;
        Ok(())
    }
}

/// Validate a prior working/remaining pair against the discovered case set.
fn reuse_prior_lists(
    discovered: &[String],
    working: Vec<String>,
    remaining: Vec<String>,
) -> Result<(Vec<String>, Vec<String>)> {
    if let Some(dup) = first_duplicate(&working) {
        return Err(AnnotrackError::inconsistent_workflow(format!(
            "duplicate entry '{dup}' in {WORKING_LIST_FILENAME}"
        )));
    }
    if let Some(dup) = first_duplicate(&remaining) {
        return Err(AnnotrackError::inconsistent_workflow(format!(
            "duplicate entry '{dup}' in {REMAINING_LIST_FILENAME}"
        )));
    }
    for case in &remaining {
        if !working.contains(case) {
            return Err(AnnotrackError::inconsistent_workflow(format!(
                "remaining case '{case}' is not in the working list"
            )));
        }
    }

    let mut sorted_working = working.clone();
    sorted_working.sort();
    if sorted_working != discovered {
        return Err(AnnotrackError::inconsistent_workflow(format!(
            "working list ({} entries) does not match the discovered case set ({} entries)",
            working.len(),
            discovered.len()
        )));
    }

    log::info!(
        "Reusing prior work lists: {} working, {} remaining",
        working.len(),
        remaining.len()
    );
    Ok((working, remaining))
}

fn first_duplicate(list: &[String]) -> Option<&str> {
    for (i, case) in list.iter().enumerate() {
        if list[..i].contains(case) {
            return Some(case);
        }
    }
    None
}

fn read_list_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

fn write_list_file(path: &Path, cases: &[String]) -> Result<()> {
    let mut content = cases.join("\n");
    if !content.is_empty() {
        content.push('\n');
    }
    std::fs::write(path, content)?;
    Ok(())
}
