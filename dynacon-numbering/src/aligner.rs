//! Local alignment of chain sequences against the reference database.
//!
//! [`BlastAligner`] runs `blastp` once per query: the sequence goes in on
//! stdin, the XML report is written to a temporary file and its best hit is
//! parsed by [`parse_best_hit`].

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use dynacon_core::Config;
use dynacon_core::models::AlignmentResult;
use log::{debug, warn};

use crate::blast_xml::parse_best_hit;
use crate::errors::{NumberingError, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Aligns one query sequence against a fixed set of reference sequences.
pub trait SequenceAligner: Send + Sync {
    ///
    /// Align `query` and return the best hit.
    ///
    /// `Ok(None)` means the sequence could not be identified. Errors are
    /// reserved for failures to run the aligner at all and for hits whose
    /// description is malformed.
    ///
    fn align(&self, query: &str) -> Result<Option<AlignmentResult>>;
}

#[derive(Debug, Clone)]
pub struct BlastAligner {
    blastp: PathBuf,
    db: PathBuf,
    timeout: Duration,
}

impl BlastAligner {
    pub fn new(blastp: &Path, db: &Path, timeout: Duration) -> Self {
        BlastAligner {
            blastp: blastp.to_path_buf(),
            db: db.to_path_buf(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.blastp_path, &config.blast_db, config.aligner_timeout())
    }

    fn command(&self, out: &Path) -> Command {
        let mut cmd = Command::new(&self.blastp);
        cmd.arg("-query")
            .arg("-")
            .arg("-db")
            .arg(&self.db)
            .arg("-out")
            .arg(out)
            .arg("-outfmt")
            .arg("5")
            .arg("-max_target_seqs")
            .arg("1")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        cmd
    }
}

impl SequenceAligner for BlastAligner {
    fn align(&self, query: &str) -> Result<Option<AlignmentResult>> {
        if query.is_empty() {
            return Ok(None);
        }

        let report = tempfile::Builder::new()
            .prefix("dynacon-blast-")
            .suffix(".xml")
            .tempfile()?;

        let mut child = self
            .command(report.path())
            .spawn()
            .map_err(|source| NumberingError::AlignerSpawn {
                program: self.blastp.clone(),
                source,
            })?;

        // fed from its own thread so a child that never reads stays under the timeout
        let stdin_writer = child.stdin.take().map(|mut stdin| {
            let input = query.as_bytes().to_vec();
            thread::spawn(move || {
                // a process that exits without reading its input closes the pipe
                if let Err(e) = stdin.write_all(&input) {
                    debug!("Aligner stdin closed early: {}", e);
                }
            })
        });

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = stderr.read_to_string(&mut buf);
                buf
            })
        });

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                if let Some(handle) = stdin_writer {
                    let _ = handle.join();
                }
                warn!(
                    "Aligner timed out after {:?} on a query of {} residues",
                    self.timeout,
                    query.len()
                );
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        };
        if let Some(handle) = stdin_writer {
            let _ = handle.join();
        }

        if !status.success() {
            let stderr = stderr_reader
                .and_then(|h| h.join().ok())
                .unwrap_or_default();
            warn!(
                "Aligner exited with {} for query {}: {}",
                status,
                query,
                stderr.trim()
            );
            return Ok(None);
        }

        let xml = fs::read_to_string(report.path())?;
        if xml.trim().is_empty() {
            return Ok(None);
        }
        parse_best_hit(&xml)
    }
}
