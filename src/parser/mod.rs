// Parser module for extracting syntax from Python source files

pub mod ast;
pub mod docstrings;
mod python;

pub use ast::*;
pub use docstrings::{extract_docstrings, DocstringExtractor, DocstringIndex};
pub use python::{cleandoc, PythonParser};
pub(crate) use python::read_source;
