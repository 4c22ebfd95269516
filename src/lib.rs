// Library exports for the replay binary and the integration tests
//
// # Lock Usage Policy
//
// Shared state uses `parking_lot` locks throughout:
//
//   - `parking_lot::Mutex`:  field models (`FieldHandle`), file collections,
//                              bus subscriptions and the journal.
//
//   - `parking_lot::RwLock`: the field registry, which is read on every
//                              `get:field` lookup and written only on insert.
//
// Never hold a field-model lock while publishing on the bus; subscribers may
// look the same field up again.

/// Application version (root crate version, for use by sub-crates).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[macro_use]
pub mod debug;

pub mod bus;
pub mod cli;
pub mod field;
pub mod list_view;
pub mod scenario;
pub mod upload;
