use crate::config::EtlConfig;
use crate::extract::Extractor;
use crate::load::Loader;
use crate::reddit::{RedditClient, SubmissionFeed};
use crate::store::{DuckDbConnector, StoreConnector};
use crate::transform::Transformer;
use anyhow::{Context, Result};

/// Row counts of one completed run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub loaded: usize,
}

/// Extract -> transform -> load, strictly in sequence, one run at a time.
pub struct RedditDuckDbEtl<F, C> {
    extractor: Extractor<F>,
    transformer: Transformer,
    loader: Loader<C>,
}

impl RedditDuckDbEtl<RedditClient, DuckDbConnector> {
    /// Wire the production components. Reddit authentication happens here.
    pub fn from_config(cfg: &EtlConfig) -> Result<Self> {
        Ok(Self::new(Extractor::connect(cfg)?, Transformer::new(cfg), Loader::from_config(cfg)))
    }
}

impl<F: SubmissionFeed, C: StoreConnector> RedditDuckDbEtl<F, C> {
    pub fn new(extractor: Extractor<F>, transformer: Transformer, loader: Loader<C>) -> Self {
        Self { extractor, transformer, loader }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.extractor = self.extractor.progress(yes);
        self
    }

    pub fn loader(&self) -> &Loader<C> {
        &self.loader
    }

    /// Any stage error aborts the run. Nothing is rolled back: a load that
    /// fails after dropping the destination leaves it absent.
    pub fn run(&self, start_date: &str, max_items: usize) -> Result<RunSummary> {
        let res = self.run_stages(start_date, max_items);
        if let Err(e) = &res {
            tracing::error!("Error in ETL pipeline: {:#}", e);
        }
        res
    }

    fn run_stages(&self, start_date: &str, max_items: usize) -> Result<RunSummary> {
        let extracted = self.extractor.extract(start_date, max_items).context("extract")?;
        tracing::info!("Reddit data extracted successfully.");
        tracing::debug!("Total no of rows extracted: {}", extracted.num_rows());
        let extracted_rows = extracted.num_rows();

        let transformed = self.transformer.transform(extracted).context("transform")?;
        tracing::info!("Data transformation completed.");
        tracing::debug!("Total no of rows transformed: {}", transformed.num_rows());

        self.loader.load(&transformed).context("load")?;
        tracing::info!("Data loaded into DuckDB successfully.");

        Ok(RunSummary { extracted: extracted_rows, loaded: transformed.num_rows() })
    }
}
