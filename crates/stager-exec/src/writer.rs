use serde_json::Value;
use stager_core::IndexClient;
use tracing::{debug, info};

use crate::error::ExecResult;

/// Totals of a completed [`BatchWriter::write_all`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub records: u64,
    pub batches: u64,
}

/// Pushes a record stream into one index collection in fixed-size batches.
pub struct BatchWriter<'a> {
    client: &'a dyn IndexClient,
    collection: String,
    batch_size: usize,
}

impl<'a> BatchWriter<'a> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(client: &'a dyn IndexClient, collection: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client,
            collection: collection.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Drain `records` into the collection.
    ///
    /// The first failing record stops the run; batches already sent stay written.
    pub fn write_all<I>(&self, records: I) -> ExecResult<WriteSummary>
    where
        I: IntoIterator<Item = ExecResult<Value>>,
    {
        let mut summary = WriteSummary::default();
        let mut batch = Vec::with_capacity(self.batch_size);

        for record in records {
            batch.push(record?);
            if batch.len() == self.batch_size {
                self.flush(&mut batch, &mut summary)?;
            }
        }
        if !batch.is_empty() {
            self.flush(&mut batch, &mut summary)?;
        }

        info!(
            target: "stager.exec.writer",
            collection = %self.collection,
            records = summary.records,
            batches = summary.batches,
            "records written"
        );
        Ok(summary)
    }

    fn flush(&self, batch: &mut Vec<Value>, summary: &mut WriteSummary) -> ExecResult<()> {
        self.client.write_records(&self.collection, batch)?;
        summary.records += batch.len() as u64;
        summary.batches += 1;
        debug!(target: "stager.exec.writer", collection = %self.collection, size = batch.len(), "batch sent");
        batch.clear();
        Ok(())
    }
}
