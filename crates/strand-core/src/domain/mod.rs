//! Domain model (ids, property keys, property maps, scope cells, errors).
//!
//! ここにある型はすべて実行環境に依存しません（tokio を知らない）。

pub mod errors;
pub mod fiber_set;
pub mod ids;
pub mod property;
pub mod property_map;
pub mod scope_cell;
pub mod state;

pub use self::errors::Annotated;
pub use self::fiber_set::SupervisedFiberSet;
pub use self::ids::FiberId;
pub use self::property::{KeyId, Property, PropertyKey, PropertyValue};
pub use self::property_map::PropertyMap;
pub use self::scope_cell::ScopeCell;
pub use self::state::{FiberState, FiberStatusView, RegistryCounts};
