use std::io::Write;
use std::path::Path;

use crate::data::error::MalformedRecordError;
use crate::data::export;
use crate::data::filter::{filtered_dataset_indices, FilterCriteria, IncomeBracket, PriceRange};
use crate::data::loader;
use crate::data::model::{HousingDataset, HousingRecord};
use crate::data::stats::{price_histogram, summarize, HistogramBin, SummaryStats};

// ---------------------------------------------------------------------------
// Explorer state
// ---------------------------------------------------------------------------

/// Session state behind a housing dashboard, independent of rendering.
///
/// Every setter re-runs the filter so `visible_indices` and `stats` always
/// reflect `criteria`.
#[derive(Debug, Default)]
pub struct ExplorerState {
    /// Loaded dataset (None until a table is loaded).
    pub dataset: Option<HousingDataset>,

    /// Current widget selections.
    pub criteria: FilterCriteria,

    /// Indices of records passing the current filters (cached).
    pub visible_indices: Vec<usize>,

    /// Summary of the visible records.
    pub stats: SummaryStats,

    /// Status / warning message for the user.
    pub status_message: Option<String>,

    /// Whether the raw-data table is shown.
    pub show_raw_data: bool,
}

impl ExplorerState {
    /// Ingest a newly loaded dataset and reset the widgets to span it.
    pub fn set_dataset(&mut self, dataset: HousingDataset) {
        self.criteria = FilterCriteria::spanning(&dataset);
        self.dataset = Some(dataset);
        self.status_message = None;
        self.refilter();
    }

    /// Load a table from disk. Failures leave the current dataset in place
    /// and set `status_message`.
    pub fn load_path(&mut self, path: &Path) -> bool {
        match loader::load_file(path) {
            Ok(dataset) => {
                self.set_dataset(dataset);
                true
            }
            Err(e) => {
                if let Some(bad) = e.downcast_ref::<MalformedRecordError>() {
                    log::warn!("Data-quality problem in {}: {bad}", path.display());
                    self.status_message = Some(format!("Data-quality warning: {bad}"));
                } else {
                    log::error!("Failed to load file: {e:#}");
                    self.status_message = Some(format!("Error: {e:#}"));
                }
                false
            }
        }
    }

    /// Recompute `visible_indices` and `stats` after a criteria change.
    pub fn refilter(&mut self) {
        match &self.dataset {
            Some(ds) => {
                self.visible_indices = filtered_dataset_indices(ds, &self.criteria);
                self.stats =
                    summarize(self.visible_indices.iter().filter_map(|&i| ds.records.get(i)));
                log::debug!(
                    "{} of {} records visible",
                    self.visible_indices.len(),
                    ds.len()
                );
            }
            None => {
                self.visible_indices.clear();
                self.stats = SummaryStats::default();
            }
        }
    }

    /// Replace all criteria at once.
    pub fn set_criteria(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
        self.refilter();
    }

    pub fn set_price_range(&mut self, range: PriceRange) {
        self.criteria.price_range = range;
        self.refilter();
    }

    pub fn set_income_bracket(&mut self, bracket: IncomeBracket) {
        self.criteria.income_bracket = bracket;
        self.refilter();
    }

    pub fn set_min_house_age(&mut self, age: Option<f64>) {
        self.criteria.min_house_age = age;
        self.refilter();
    }

    /// Toggle a single location in the multi-select.
    pub fn toggle_location(&mut self, location: &str) {
        let selected = &mut self.criteria.location_categories;
        if !selected.remove(location) {
            selected.insert(location.to_string());
        }
        self.refilter();
    }

    /// Select every category of the loaded dataset.
    pub fn select_all_locations(&mut self) {
        if let Some(ds) = &self.dataset {
            self.criteria.location_categories = ds.categories.clone();
            self.refilter();
        }
    }

    /// Clear the multi-select. An empty selection restricts nothing.
    pub fn clear_locations(&mut self) {
        self.criteria.location_categories.clear();
        self.refilter();
    }

    /// Records passing the current filters, in source order. Indices that no
    /// longer point into the dataset are skipped.
    pub fn visible_records(&self) -> impl Iterator<Item = &HousingRecord> + '_ {
        let records = self
            .dataset
            .as_ref()
            .map(|ds| ds.records.as_slice())
            .unwrap_or_default();
        self.visible_indices
            .iter()
            .filter_map(move |&i| records.get(i))
    }

    /// The raw-data table, if the user asked to see it.
    pub fn raw_table(&self) -> Option<Vec<&HousingRecord>> {
        self.show_raw_data
            .then(|| self.visible_records().collect())
    }

    /// House-value distribution of the visible records.
    pub fn price_histogram(&self, bins: usize) -> Vec<HistogramBin> {
        price_histogram(self.visible_records(), bins)
    }

    /// Export the visible records as CSV.
    pub fn export_csv<W: Write>(&self, writer: W) -> anyhow::Result<()> {
        export::write_csv(self.visible_records(), writer)
    }
}
