#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum BarColor {
    #[default]
    CYAN,
    GREEN,
    RED,
}

/// Progress report sent from a reduction worker
#[derive(Debug, Clone, Default)]
pub struct WorkerStatus {
    /// Fraction of the worker's datasets that are finished
    pub progress: f32,
    /// Name of the dataset the worker is on
    pub dataset: String,
    pub worker_id: usize,
    /// CYAN while working, GREEN when a dataset succeeds, RED when one fails
    pub color: BarColor,
}

impl WorkerStatus {
    pub fn new(progress: f32, dataset: &str, worker_id: usize, color: BarColor) -> Self {
        Self {
            progress,
            dataset: dataset.to_string(),
            worker_id,
            color,
        }
    }
}
