//! # Strata Core
//!
//! A layered key-value overlay: an ordered list of ordinary maps treated
//! as one logical map. Later layers shadow earlier ones for the same key,
//! while keys absent from later layers fall through to earlier ones.
//!
//! ```
//! use std::collections::BTreeMap;
//! use strata_core::LayeredMap;
//!
//! let mut map = LayeredMap::new([
//!     BTreeMap::from([("a", 1), ("b", 1)]),
//!     BTreeMap::from([("a", 2)]),
//! ])
//! .unwrap();
//!
//! assert_eq!(map["a"], 2);
//! assert_eq!(map["b"], 1);
//! assert_eq!(map.get_all("a"), vec![&1, &2]);
//!
//! map.insert("c", 3);
//! assert_eq!(map.layer_count(), 3);
//! ```

pub mod error;
pub mod map;
pub mod value;

// Re-export key types at crate root for ergonomics
pub use error::{ConstructionError, Error, Result};
pub use map::LayeredMap;
pub use value::json_type_name;
