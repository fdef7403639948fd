//! Gradient-boosted decision tree classifier
//!
//! - Fixed-point leaf values and thresholds at [`SCALE`]
//! - One regression tree per class per boosting round
//! - Binary persistence with a BLAKE3 hash of the canonical JSON form
//!
//! # Usage
//!
//! ```rust
//! use copa_core::gbdt::{ClassifierModel, Node, Tree, SCALE};
//!
//! let tree = Tree::new(
//!     vec![
//!         Node::internal(0, 0, 0, 1, 2),
//!         Node::leaf(1, -SCALE),
//!         Node::leaf(2, SCALE),
//!     ],
//!     SCALE,
//!     1,
//! );
//!
//! let model = ClassifierModel::new(
//!     vec!["Not Sustained".into(), "Sustained".into()],
//!     vec!["POLICE_SHOOTING_Yes".into()],
//!     vec![0, 0],
//!     vec![tree],
//!     vec![SCALE],
//!     14,
//! );
//!
//! assert_eq!(model.predict(&[SCALE]).unwrap(), "Sustained");
//! ```

pub mod model;
pub mod tree;

pub use model::{hash_path, ClassifierModel, ModelError, MODEL_VERSION, SCALE};
pub use tree::{Node, Tree};
