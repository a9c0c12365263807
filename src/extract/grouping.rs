//! Run-grouping over marker-delimited sibling sequences.
//!
//! Some listings render one logical field (the authors of a row, its
//! genres) as a flat run of siblings with no wrapping element, closed by a
//! label element. Walking the siblings in order, every non-marker appends
//! its text to the pending run and every marker closes the run as one
//! group. A run still open at the end has no closing marker and is
//! discarded.
//!
//! Groups line up positionally with the records they belong to: the Nth
//! group is the Nth record's. Callers zipping groups with separately
//! selected rows rely on both enumerating the same elements in the same
//! order; nothing here checks that the counts agree.

/// One element of a sibling sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sibling {
    Item(String),
    Marker,
}

/// Accumulator for a single grouping pass. Create one per pass; it is
/// consumed by [`ExtractionRun::finish`].
#[derive(Debug, Default)]
pub struct ExtractionRun {
    pending: Vec<String>,
    groups: Vec<Vec<String>>,
}

impl ExtractionRun {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a data item to the open run. Empty text is skipped.
    pub fn push(&mut self, text: impl Into<String>) {
        let text = text.into();
        if !text.is_empty() {
            self.pending.push(text);
        }
    }

    /// Close the open run as a group. A marker with nothing pending still
    /// emits an empty group so later groups keep their positions.
    pub fn marker(&mut self) {
        self.groups.push(std::mem::take(&mut self.pending));
    }

    pub fn feed(&mut self, sibling: Sibling) {
        match sibling {
            Sibling::Item(text) => self.push(text),
            Sibling::Marker => self.marker(),
        }
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Completed groups; an unterminated trailing run is dropped.
    pub fn finish(self) -> Vec<Vec<String>> {
        if !self.pending.is_empty() {
            log::trace!("Discarding {} unterminated item(s)", self.pending.len());
        }
        self.groups
    }
}

/// Run one grouping pass over `siblings`.
pub fn group_runs<I>(siblings: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = Sibling>,
{
    let mut run = ExtractionRun::new();
    for sibling in siblings {
        run.feed(sibling);
    }
    run.finish()
}
