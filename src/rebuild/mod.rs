pub mod assemble;
pub mod diagnostics;
pub mod line_grouper;
pub mod overrides;
pub mod segment;
pub mod table_grid;

pub use assemble::{assemble, Assembler, AssemblyMode, AssemblyOptions};
pub use diagnostics::{Diagnostic, Diagnostics, TracingDiagnostics};
pub use overrides::{OverrideRegistry, PageStrategy, ReconstructionOverride};
pub use table_grid::{build_grid, TableGrid, TableParseError};
