//! Dataset progress summary for `car-enrich status`.
//!
//! Read-only: counts what a previous run left behind and suggests where the
//! next run should start.
use crate::record::CarRecord;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub dataset: PathBuf,
    pub total: usize,
    pub enriched: usize,
    pub missing_image: usize,
    pub missing_color: usize,
    /// 1-based index of the last record carrying an image.
    pub last_enriched_index: Option<usize>,
    /// 1-based index of the first record without an image.
    pub first_missing_index: Option<usize>,
    /// Resume point after the last enriched record; `None` once it is the
    /// final record.
    pub next_start: Option<usize>,
    /// Set when a lock file is present next to the dataset.
    pub locked_by_pid: Option<u32>,
}

impl DatasetStatus {
    pub fn from_records(dataset: PathBuf, records: &[CarRecord]) -> Self {
        let total = records.len();
        let enriched = records.iter().filter(|r| r.is_enriched()).count();
        let missing_color = records.iter().filter(|r| r.needs_color()).count();
        let last_enriched_index = records.iter().rposition(CarRecord::is_enriched).map(|i| i + 1);
        let first_missing_index = records
            .iter()
            .position(|r| !r.is_enriched())
            .map(|i| i + 1);
        let next_start = match last_enriched_index {
            Some(last) if last >= total => None,
            Some(last) => Some(last + 1),
            None if total == 0 => None,
            None => Some(1),
        };
        Self {
            dataset,
            total,
            enriched,
            missing_image: total - enriched,
            missing_color,
            last_enriched_index,
            first_missing_index,
            next_start,
            locked_by_pid: None,
        }
    }

    /// Human-readable multi-line summary.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "dataset: {}", self.dataset.display());
        let _ = writeln!(out, "records: {}", self.total);
        let _ = writeln!(
            out,
            "with image: {} (missing {})",
            self.enriched, self.missing_image
        );
        let _ = writeln!(out, "missing color: {}", self.missing_color);
        let _ = writeln!(
            out,
            "last enriched: {}",
            optional_index(self.last_enriched_index)
        );
        let _ = writeln!(
            out,
            "first missing: {}",
            optional_index(self.first_missing_index)
        );
        match self.next_start {
            Some(start) => {
                let _ = writeln!(out, "next: car-enrich run --start {start}");
            }
            None => {
                let _ = writeln!(out, "next: nothing left after the last enriched record");
            }
        }
        if let Some(pid) = self.locked_by_pid {
            let _ = writeln!(out, "locked by run with pid {pid}");
        }
        out
    }
}

fn optional_index(index: Option<usize>) -> String {
    index.map_or_else(|| "none".to_string(), |i| i.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Dimensions;

    fn enriched(model: &str, color: Option<&str>) -> CarRecord {
        let mut record = CarRecord::new("Renault", model, 2016);
        record.image_url = Some(format!("https://img.example.com/{model}.jpg"));
        record.image_size = Some(Dimensions::new(1920, 1080));
        record.car_color = color.map(str::to_string);
        record
    }

    #[test]
    fn counts_and_resume_point() {
        let records = vec![
            enriched("Clio", Some("firebrick")),
            CarRecord::new("Renault", "Megane", 2016),
            enriched("Twingo", None),
            CarRecord::new("Renault", "Zoe", 2020),
        ];

        let status = DatasetStatus::from_records(PathBuf::from("cars.json"), &records);

        assert_eq!(status.total, 4);
        assert_eq!((status.enriched, status.missing_image), (2, 2));
        assert_eq!(status.missing_color, 1);
        assert_eq!(status.last_enriched_index, Some(3));
        assert_eq!(status.first_missing_index, Some(2));
        assert_eq!(status.next_start, Some(4));
        assert!(status.render_text().contains("next: car-enrich run --start 4"));
    }

    #[test]
    fn untouched_dataset_starts_at_one() {
        let records = vec![CarRecord::new("Renault", "Clio", 2012)];
        let status = DatasetStatus::from_records(PathBuf::from("cars.json"), &records);
        assert_eq!(status.last_enriched_index, None);
        assert_eq!(status.next_start, Some(1));
    }

    #[test]
    fn enriched_tail_has_no_next_start() {
        let records = vec![enriched("Clio", Some("gray"))];
        let status = DatasetStatus::from_records(PathBuf::from("cars.json"), &records);
        assert_eq!(status.next_start, None);
        assert_eq!(status.first_missing_index, None);

        let empty = DatasetStatus::from_records(PathBuf::from("empty.json"), &[]);
        assert_eq!((empty.total, empty.next_start), (0, None));
    }
}
