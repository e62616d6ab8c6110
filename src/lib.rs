//! Polygen is a grammar-driven random sentence generator.
//!
//! A grammar maps non-terminals to labeled alternatives. Generation expands the
//! start symbol at random, while label selections (`Nome.S`, `Ogg.(M|F)`) keep
//! separately expanded branches in agreement on gender, number and the like.
//!
//! # Example
//!
//! ```rust
//! use polygen::{Context, Document};
//!
//! let document = Document::parse(
//!     "S ::= Nome.S mangia Nome.P ;
//!      Nome ::= (S: il | P: i) (lup | gatt) ^ (S: o | P: i) ;",
//!     "S",
//! )
//! .unwrap();
//!
//! let mut context = Context::with_seed(42);
//! let text = document.generate(&mut context).unwrap();
//! assert!(text.starts_with("il "));
//! ```

pub mod collection;
pub mod context;
pub mod grammar;
pub mod parser;
pub mod selection;
pub mod utils;
pub mod walker;

pub use collection::ProductionCollection;
pub use context::Context;
pub use grammar::{Document, DocumentBuilder, GrammarConfig};
pub use selection::{Environment, LabelSelection, SelectionGroup};
pub use utils::{GrammarError, Result};
pub use walker::Walker;

// Re-export the grammar model
pub use grammar::{Atom, Group, Item, Join, Label, Production, Reference, Sequence};
