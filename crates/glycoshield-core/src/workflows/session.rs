use crate::core::glycan::{self, AttachmentSpec, InputLineError, is_ignored_line};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::trajectory::FrameSource;
use crate::engine::error::{ArchiveError, EngineError};
use crate::engine::state::{PipelineStage, PipelineState, StatusHandle};
use crate::engine::tasks::merge::MergeOutput;
use crate::engine::tasks::sasa::ShieldingReport;
use crate::engine::tasks::shield::ShieldOutput;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::FileOptions;

/// Comment line every input book starts with.
const HEADER_LINE: &str = "#";

/// Ordered, de-duplicated attachment lines of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpecBook {
    lines: Vec<String>,
}

impl Default for InputSpecBook {
    fn default() -> Self {
        Self {
            lines: vec![HEADER_LINE.to_string()],
        }
    }
}

impl InputSpecBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a line unless an identical one is already present.
    /// Returns whether the line was added.
    pub fn add(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() || self.lines.iter().any(|l| l == line) {
            return false;
        }
        self.lines.push(line.to_string());
        true
    }

    /// Removes a line; returns whether it was present.
    pub fn remove(&mut self, line: &str) -> bool {
        let line = line.trim();
        let before = self.lines.len();
        self.lines.retain(|l| l != line);
        self.lines.len() != before
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of attachment lines, ignoring comments.
    pub fn len(&self) -> usize {
        self.lines.iter().filter(|l| !is_ignored_line(l)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The book as input-file text, one line per entry.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    pub fn attachments(&self) -> Result<Vec<AttachmentSpec>, InputLineError> {
        glycan::parse_attachments(&self.text())
    }
}

/// Outputs recorded by completed stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Artifacts {
    pub shield: Option<ShieldOutput>,
    /// Frames every site can supply; fixed when shield generation completes.
    pub max_frame: Option<usize>,
    pub merge: Option<MergeOutput>,
    pub sasa: Option<ShieldingReport>,
}

impl Artifacts {
    /// Drops the artifacts of `stage` and of every downstream stage.
    pub(crate) fn invalidate_from(&mut self, stage: PipelineStage) {
        if stage <= PipelineStage::Shield {
            self.shield = None;
            self.max_frame = None;
        }
        if stage <= PipelineStage::Merge {
            self.merge = None;
        }
        self.sasa = None;
    }
}

/// One user's pipeline: the selected protein, the attachment book, the stage
/// flags and the artifacts of completed stages.
#[derive(Debug)]
pub struct Session {
    protein: Option<PathBuf>,
    output_dir: PathBuf,
    inputs: InputSpecBook,
    status: StatusHandle,
    artifacts: Artifacts,
}

impl Session {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            protein: None,
            output_dir: output_dir.into(),
            inputs: InputSpecBook::new(),
            status: StatusHandle::new(),
            artifacts: Artifacts::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn protein(&self) -> Option<&Path> {
        self.protein.as_deref()
    }

    /// Selects the protein structure. Any previous results belong to another
    /// protein, so the pipeline restarts.
    pub fn set_protein(&mut self, path: impl Into<PathBuf>) -> Result<(), EngineError> {
        let path = path.into();
        if !path.is_file() {
            return Err(EngineError::Input(format!(
                "Protein structure {path:?} does not exist"
            )));
        }
        info!(protein = ?path, "Protein structure selected.");
        self.protein = Some(path);
        self.restart();
        Ok(())
    }

    /// Returns the pipeline to its initial state. The attachment book is kept.
    pub fn restart(&mut self) {
        self.status.reset();
        self.artifacts = Artifacts::default();
        debug!("Session restarted.");
    }

    pub fn status(&self) -> PipelineState {
        self.status.load()
    }

    pub fn status_handle(&self) -> StatusHandle {
        self.status.clone()
    }

    pub fn output_ready(&self) -> bool {
        self.status().output_ready()
    }

    pub fn artifacts(&self) -> &Artifacts {
        &self.artifacts
    }

    pub fn inputs(&self) -> &InputSpecBook {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut InputSpecBook {
        &mut self.inputs
    }

    pub(crate) fn begin_stage(&mut self, stage: PipelineStage) {
        self.status.invalidate_from(stage);
        self.artifacts.invalidate_from(stage);
    }

    pub(crate) fn complete_shield(&mut self, output: ShieldOutput) {
        self.artifacts.max_frame = Some(output.min_frame_count());
        self.artifacts.shield = Some(output);
        self.status.complete(PipelineStage::Shield);
    }

    pub(crate) fn complete_merge(&mut self, output: MergeOutput) {
        self.artifacts.merge = Some(output);
        self.status.complete(PipelineStage::Merge);
    }

    pub(crate) fn complete_sasa(&mut self, report: ShieldingReport) {
        self.artifacts.sasa = Some(report);
        self.status.complete(PipelineStage::Sasa);
    }

    /// Protein chains of the selected structure and their residue numbers.
    pub fn chain_residues(&self) -> Result<BTreeMap<char, Vec<isize>>, EngineError> {
        let path = self
            .protein
            .as_ref()
            .ok_or_else(|| EngineError::Input("No protein structure selected".into()))?;
        let protein = PdbFile::read_from_path(path).map_err(|e| EngineError::format(path, e))?;
        Ok(protein.structure().protein_chains())
    }

    /// Glycan names available in a library directory, sorted.
    pub fn list_glycan_library(&self, library_dir: &Path) -> Result<Vec<String>, EngineError> {
        glycan::list_library(library_dir).map_err(|e| EngineError::io(library_dir, e))
    }

    /// Builds the input line attaching `glycan` at `chain:resid`, with outputs
    /// inside the session's output directory.
    pub fn create_input_line(
        &self,
        chain_id: char,
        resid: isize,
        library_dir: &Path,
        glycan: &str,
    ) -> String {
        AttachmentSpec::for_library_glycan(chain_id, resid, library_dir, glycan, &self.output_dir)
            .to_string()
    }

    /// Packs the output directory into one zip archive. Only allowed once
    /// every stage has completed.
    pub fn package_output(&self, archive: &Path) -> Result<PathBuf, EngineError> {
        if !self.output_ready() {
            return Err(EngineError::State(format!(
                "output requested before all stages completed ({:?})",
                self.status().phase()
            )));
        }
        let entries = write_archive(&self.output_dir, archive).map_err(|source| {
            EngineError::Archive {
                path: archive.to_path_buf(),
                source,
            }
        })?;
        info!(archive = ?archive, entries, "Output packaged.");
        Ok(archive.to_path_buf())
    }
}

fn write_archive(root: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(archive)?;
    let archive_abs = archive.canonicalize().ok();
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if archive_abs.is_some() && path.canonicalize().ok() == archive_abs {
            continue;
        }
        let relative = path
            .strip_prefix(root)?
            .to_string_lossy()
            .replace('\\', "/");
        zip.start_file(relative, options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
        entries += 1;
    }
    let mut file = zip.finish()?;
    file.flush()?;
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use std::io::Read;

    #[test]
    fn book_starts_with_header_and_deduplicates() {
        let mut book = InputSpecBook::new();
        assert_eq!(book.lines(), ["#"]);
        assert!(book.is_empty());

        let line = "A 2,3,4 1,2,3 g.pdb g.xtc A_3.pdb A_3.xtc";
        assert!(book.add(line));
        assert!(!book.add(line));
        assert!(!book.add("   "));
        assert_eq!(book.len(), 1);
        assert_eq!(book.attachments().unwrap()[0].anchor(), 3);

        assert!(book.remove(line));
        assert!(!book.remove(line));
        assert!(book.is_empty());
    }

    #[test]
    fn clear_restores_header_only() {
        let mut book = InputSpecBook::new();
        book.add("A 2,3,4 1,2,3 g.pdb g.xtc A_3.pdb A_3.xtc");
        book.clear();
        assert_eq!(book, InputSpecBook::default());
        assert_eq!(book.text(), "#\n");
    }

    #[test]
    fn set_protein_requires_existing_file_and_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().join("out"));
        assert!(matches!(
            session.set_protein(dir.path().join("missing.pdb")),
            Err(EngineError::Input(_))
        ));

        session.complete_shield(ShieldOutput::default());
        assert!(session.status().shield_done);

        session.set_protein(fixtures::write_protein(dir.path())).unwrap();
        assert_eq!(session.status(), PipelineState::default());
        assert!(session.artifacts().shield.is_none());
    }

    #[test]
    fn chain_residues_lists_protein_residues() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path());
        assert!(session.chain_residues().is_err());

        session.set_protein(fixtures::write_protein(dir.path())).unwrap();
        let chains = session.chain_residues().unwrap();
        assert_eq!(chains[&'A'], vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn create_input_line_points_into_output_dir() {
        let session = Session::new("/work/out");
        let line = session.create_input_line('A', 3, Path::new("/lib"), "Man5");
        let spec: AttachmentSpec = line.parse().unwrap();

        assert_eq!(spec.anchor_residues, [2, 3, 4]);
        assert_eq!(spec.glycan_structure, Path::new("/lib/Man5/production_merged_noW.pdb"));
        assert_eq!(spec.output_trajectory, Path::new("/work/out/A_3.xtc"));
    }

    #[test]
    fn package_output_requires_every_stage() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(dir.path());
        let result = session.package_output(&dir.path().join("out.zip"));
        assert!(matches!(result, Err(EngineError::State(_))));
    }

    #[test]
    fn package_output_archives_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        fs::create_dir_all(out.join("nested")).unwrap();
        fs::write(out.join("a.csv"), "x\n").unwrap();
        fs::write(out.join("nested").join("b.pdb"), "END\n").unwrap();

        let mut session = Session::new(&out);
        for stage in PipelineStage::ALL {
            session.status.complete(stage);
        }
        let archive = session.package_output(&out.join("results.zip")).unwrap();

        let mut zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("nested/b.pdb")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "END\n");
    }

    #[test]
    fn archive_failures_keep_their_cause() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(dir.path().join("never_created"));
        for stage in PipelineStage::ALL {
            session.status.complete(stage);
        }

        let result = session.package_output(&dir.path().join("results.zip"));
        assert!(matches!(
            result,
            Err(EngineError::Archive {
                source: ArchiveError::Walk(_),
                ..
            })
        ));

        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let result = session.package_output(&blocker.join("results.zip"));
        assert!(matches!(
            result,
            Err(EngineError::Archive {
                source: ArchiveError::Io(_),
                ..
            })
        ));
    }

    #[test]
    fn begin_stage_drops_downstream_artifacts() {
        let mut session = Session::new("/tmp/unused");
        session.complete_shield(ShieldOutput::default());
        session.artifacts.sasa = Some(ShieldingReport::default());

        session.begin_stage(PipelineStage::Merge);
        assert!(session.artifacts().shield.is_some());
        assert!(session.artifacts().sasa.is_none());
        assert!(session.status().shield_done);
    }
}
