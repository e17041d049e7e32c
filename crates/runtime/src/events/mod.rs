//! Change notifications for inventory, equipment, and persistence.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::{EquipmentEvent, InventoryEvent, PersistenceEvent};
