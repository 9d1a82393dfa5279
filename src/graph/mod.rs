// Declaration graph: modules, declarations, types and references

pub mod decl;
pub mod module;
pub mod set;
pub mod types;

pub use decl::*;
pub use module::*;
pub use set::ModuleSet;
pub use types::*;
