use embedline_core::document::{Batch, Document};

/// Groups documents into fixed-size batches, preserving order.
#[derive(Debug)]
pub struct Batcher {
    size: usize,
    pending: Vec<Document>,
}

impl Batcher {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            pending: Vec::with_capacity(size),
        }
    }

    /// Add a document; returns a full batch once `size` documents are held.
    pub fn push(&mut self, doc: Document) -> Option<Batch> {
        self.pending.push(doc);
        if self.pending.len() >= self.size {
            let full = std::mem::replace(&mut self.pending, Vec::with_capacity(self.size));
            Some(Batch::new(full))
        } else {
            None
        }
    }

    /// Return whatever is left as a short batch.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.pending.is_empty() {
            None
        } else {
            Some(Batch::new(std::mem::take(&mut self.pending)))
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

/// Split `docs` into batches of `size`; the last one may be short.
pub fn batch_all(docs: impl IntoIterator<Item = Document>, size: usize) -> Vec<Batch> {
    let mut batcher = Batcher::new(size);
    let mut batches: Vec<Batch> = docs.into_iter().filter_map(|d| batcher.push(d)).collect();
    batches.extend(batcher.flush());
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn docs(n: usize) -> Vec<Document> {
        (0..n).map(|i| Document::new(i.to_string(), "t")).collect()
    }

    #[test]
    fn exact_multiple() {
        let batches = batch_all(docs(6), 3);
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.len() == 3));
    }

    #[test]
    fn short_last_batch() {
        let batches = batch_all(docs(7), 3);
        let sizes: Vec<_> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
    }

    #[test]
    fn order_preserved() {
        let batches = batch_all(docs(5), 2);
        let ids: Vec<&str> = batches.iter().flat_map(|b| b.ids()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3", "4"]);
    }

    #[test]
    fn empty_input() {
        assert!(batch_all(Vec::new(), 4).is_empty());
        assert!(Batcher::new(4).flush().is_none());
    }

    #[test]
    fn push_reports_pending() {
        let mut batcher = Batcher::new(2);
        assert!(batcher.push(Document::new("a", "x")).is_none());
        assert_eq!(batcher.pending(), 1);
        assert_eq!(batcher.push(Document::new("b", "y")).map(|b| b.len()), Some(2));
        assert_eq!(batcher.pending(), 0);
    }
}
