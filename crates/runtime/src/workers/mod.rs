//! Background workers owned by the inventory service.

pub mod persistence;

pub use persistence::{
    Command, PersistenceConfig, PersistenceError, PersistenceWorker, StateUpdate,
};
