pub mod alignment;
pub mod numbering_map;
pub mod reference;
pub mod residue;

// re-export for cleaner imports
pub use self::alignment::{AlignmentResult, AlignmentSegment};
pub use self::numbering_map::NumberingMap;
pub use self::reference::{ReferenceResidueRecord, parse_reference_records};
pub use self::residue::{ChainResidue, ChainSequence, ResidueKey};
