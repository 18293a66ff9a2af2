use std::path::{Path, PathBuf};

use crate::bag::domain::bag_error::BagError;
use crate::bag::domain::bag_reader::BagReader;
use crate::bag::infrastructure::bag_discovery::discover_bags;
use crate::bag::infrastructure::sqlite_bag_reader::SqliteBagReader;
use crate::pipeline::decode_video_use_case::{DecodeReport, DecodeVideoUseCase};
use crate::pipeline::pipeline_error::PipelineError;

pub type ReaderOpener = Box<dyn Fn(&Path) -> Result<Box<dyn BagReader>, BagError>>;

/// Outcome of converting every bag under a root.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub reports: Vec<DecodeReport>,
    /// Bags whose every topic was written or skipped.
    pub succeeded: usize,
    /// Bags that could not be read, or with at least one failed topic.
    pub failed: usize,
    pub failures: Vec<(PathBuf, String)>,
}

/// Discovers bags under a root and converts them one at a time.
///
/// One bag failing is logged and counted; the batch carries on.
pub struct BatchConvertUseCase {
    decoder: DecodeVideoUseCase,
    open_reader: ReaderOpener,
}

impl BatchConvertUseCase {
    pub fn new(decoder: DecodeVideoUseCase, open_reader: ReaderOpener) -> Self {
        Self {
            decoder,
            open_reader,
        }
    }

    /// Reads bags from their sqlite3 storage.
    pub fn with_sqlite(decoder: DecodeVideoUseCase) -> Self {
        Self::new(
            decoder,
            Box::new(|path| Ok(Box::new(SqliteBagReader::open(path)?) as Box<dyn BagReader>)),
        )
    }

    pub fn execute(&mut self, root: &Path) -> BatchReport {
        let mut batch = BatchReport::default();
        let bags = discover_bags(root);
        if bags.is_empty() {
            self.decoder.logger_mut().info("No bag files found.");
            return batch;
        }

        for (i, bag) in bags.iter().enumerate() {
            self.decoder.logger_mut().info(&format!(
                "Processing bag file [{}/{}]: {}",
                i + 1,
                bags.len(),
                bag.display()
            ));
            match self.convert(bag) {
                Ok(report) => {
                    if report.failed() == 0 {
                        batch.succeeded += 1;
                    } else {
                        batch.failed += 1;
                        batch.failures.push((
                            bag.clone(),
                            format!("{} topic(s) failed", report.failed()),
                        ));
                    }
                    batch.reports.push(report);
                }
                Err(e) => {
                    log::error!("{}: {e}", bag.display());
                    batch.failed += 1;
                    batch.failures.push((bag.clone(), e.to_string()));
                }
            }
        }

        self.decoder.logger().summary();
        log::info!(
            "Converted {} of {} bag(s), {} failed",
            batch.succeeded,
            bags.len(),
            batch.failed
        );
        batch
    }

    fn convert(&mut self, bag: &Path) -> Result<DecodeReport, PipelineError> {
        let reader = (self.open_reader)(bag)?;
        self.decoder.execute(reader.as_ref())
    }
}
