// Snapshot persistence: serialize, instantiate, fix up

pub mod deserialize;
pub mod fixup;
pub mod format;
pub mod serialize;

pub use deserialize::{
    instantiate, instantiate_entry, instantiate_only, load, load_module_file, load_snapshot,
    load_snapshot_str, Instantiated, LoadResult,
};
pub use fixup::{fixup, FixupReport, SymbolIndex, UnresolvedReference};
pub use format::{DeclEntry, KindEntry, ModuleEntry, Snapshot, FORMAT_VERSION};
pub use serialize::{
    build_and_write, module_to_string, serialize_modules, write_module, write_module_entry,
    write_snapshot,
};
