pub mod bounds;
pub mod codec;
pub mod export;
pub mod record;

pub use bounds::Bounds;
pub use codec::{DecodeError, Layer, Position, Ring, Shape, from_feature, stamp_id, to_feature};
pub use export::{ExportFile, ImportError};
pub use record::{GeodataRequest, Record};

/// Default geodata endpoint path, relative to the service base URL.
pub const GEODATA_PATH: &str = "/api/geodata";
