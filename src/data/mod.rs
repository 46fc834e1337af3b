pub mod composition;
pub mod resources;
pub mod scenario;
pub mod unit;
pub mod validate;

pub use composition::{Composition, TroopEntry};
pub use resources::{ResourceKind, ResourceStock};
pub use scenario::ScenarioFile;
pub use unit::{UnitCatalog, UnitClass, UnitDefinition, UnitStats, UnitTypeId};
