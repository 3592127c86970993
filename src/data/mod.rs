/// Data layer: core types, decoding, and reconciliation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode bytes → TabularDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ TabularDataset  │  header + positional rows, column index
///   └────────────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ reconcile  │  project onto a feature contract → FeatureMatrix
///   └───────────┘
/// ```

pub mod loader;
pub mod model;
pub mod reconcile;
