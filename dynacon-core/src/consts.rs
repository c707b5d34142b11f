//! Constants for dynacon configuration and file organization.
//!
//! This module defines environment variable names, default endpoints and the
//! file names used to lay out a submission on disk.

// Environment variable names

/// Environment variable name for setting the reference cache directory.
///
/// When set, this overrides the default cache location (`~/.dynacon/`).
///
/// # Example
///
/// ```bash
/// export DYNACON_CACHE=/custom/cache/path
/// ```
pub const DYNACON_CACHE_ENV: &str = "DYNACON_CACHE";

/// Environment variable name for the `blastp` executable.
pub const DYNACON_BLASTP_ENV: &str = "DYNACON_BLASTP";

/// Environment variable name for the prebuilt BLAST database.
pub const DYNACON_BLAST_DB_ENV: &str = "DYNACON_BLAST_DB";

/// Environment variable name for the residue registry endpoint.
pub const DYNACON_REGISTRY_API_ENV: &str = "DYNACON_REGISTRY_API";

/// Environment variable name for the generic number assignment endpoint.
pub const DYNACON_ASSIGN_API_ENV: &str = "DYNACON_ASSIGN_API";

/// Environment variable name for the root of submission directories.
pub const DYNACON_MEDIA_ROOT_ENV: &str = "DYNACON_MEDIA_ROOT";

/// Environment variable name for the folder holding the ChEBI lookup tables.
pub const DYNACON_CHEBI_ENV: &str = "DYNACON_CHEBI";

/// Environment variable name for the number of pipeline workers.
pub const DYNACON_WORKERS_ENV: &str = "DYNACON_WORKERS";

// Defaults

pub const DEFAULT_BLASTP: &str = "blastp";
pub const DEFAULT_BLAST_DB: &str = "blast/blast_db";
pub const DEFAULT_REGISTRY_API: &str = "https://gpcrdb.org/services/residues/extended/";
pub const DEFAULT_ASSIGN_API: &str =
    "https://gpcrdb.org/services/structure/assign_generic_numbers";
pub const DEFAULT_MEDIA_ROOT: &str = "./user_uploads";
pub const DEFAULT_CHEBI_FOLDER: &str = "./chebi";
pub const DEFAULT_CONTACTS_SCRIPT: &str = "getcontacts/get_dynamic_contacts.py";
pub const DEFAULT_INTERPRETER: &str = "python3";
pub const DEFAULT_CONTACTS_CORES: u32 = 12;
pub const DEFAULT_ALIGNER_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WORKERS: usize = 2;

// Submission layout

/// Subdirectory of a submission holding every stage output.
pub const RESULTS_SUBFOLDER: &str = "results";

/// Subdirectory of a submission holding per-frame reports, one folder per form.
pub const FRAMES_SUBFOLDER: &str = "frames";

/// Terminal artefact written by the Analysis stage.
pub const ANALYSIS_FILE: &str = "analysis.json";

/// Subdirectory of the cache folder holding registry responses.
pub const RESIDUES_SUBFOLDER: &str = "residues";

/// File extension of cached registry responses.
pub const RESIDUES_EXT: &str = ".json";

/// ChEBI derived lookup tables.
pub const INCHIKEY_TO_NAME_FILE: &str = "inchikey_to_name.json";
pub const INCHIKEY_TO_CHEBI_FILE: &str = "inchikey_to_chebiID.json";

/// Raw interaction output of one form.
pub fn raw_contacts_file(form_id: u32) -> String {
    format!("result{}.tsv", form_id)
}

/// Topology snapshot of one form.
pub fn topology_snapshot_file(form_id: u32) -> String {
    format!("top{}.pdb", form_id)
}

/// Snapshot annotated by the numbering assignment service.
pub fn numbered_snapshot_file(form_id: u32) -> String {
    format!("num_top{}.pdb", form_id)
}
