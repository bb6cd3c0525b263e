/*!
Lightweight command dispatcher module.

Directory Layout:
  src/cmd/
    mod.rs      (this file: module declarations + re-exports only)
    probe.rs    (ProbeArgs  + execute_probe)
    fields.rs   (FieldsArgs + execute_fields)
    shared.rs   (header parsing, document loading, error output)
    format.rs   (style detection, colors, markers, box header, table)

Re-exports (public API expected by main.rs):
  - ProbeArgs,  execute_probe
  - FieldsArgs, execute_fields

Conventions:
  - Each subcommand module exposes exactly one public `execute_*`
    function that returns `anyhow::Result<()>`.
  - Argument structs derive `clap::Args` and are kept minimal.
  - Helpers used by more than one command live in `shared.rs`.
  - JSON output paths bypass `format.rs` so machine output stays clean.
*/

pub mod fields;
pub mod format;
pub mod probe;
pub mod shared;

pub use fields::{FieldsArgs, execute_fields};
pub use probe::{ProbeArgs, execute_probe};
