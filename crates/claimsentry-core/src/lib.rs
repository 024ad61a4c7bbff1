mod config;
mod consolidate;
mod decode;
pub mod detect;
mod encode;
mod engine;
mod enrich;
mod error;
mod model;
mod reference;
pub mod schema;
mod tariff;

#[cfg(test)]
mod testing;

pub use config::{COLLUSION_WINDOW_DAYS, DetectionConfig};
pub use consolidate::{Anomaly, consolidate, detector_rows};
pub use decode::{RawTables, read_act_lines, read_transactions, row_count};
pub use detect::{Detections, Detector, Typology};
pub use encode::{Exports, anomalies_to_batch, project};
pub use engine::{Engine, RunReport, RunStatus, RunSummary};
pub use enrich::enrich;
pub use error::EngineError;
pub use model::{
    ActLabel, ActLine, BeneficiaryLabel, ContractTariff, EnrichedRecord, ServiceTypeLabel,
    StructureLabel, Transaction,
};
pub use reference::References;
pub use tariff::{TariffBook, read_tariffs};
