use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Instant;

use super::interface::{
    Assessment, Control, ControlSet, EvidenceFolder, EvidenceSource, RawEvidenceItem, SourceError,
    SourceErrorKind, SourceResult,
};

// On-disk export of one assessment, nested the way an operator would dump it:
// control sets -> controls -> evidence folders -> evidence items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub assessment_id: String,
    #[serde(default)]
    pub name: String,
    pub control_sets: Vec<SnapshotControlSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotControlSet {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub controls: Vec<SnapshotControl>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotControl {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub evidence_folders: Vec<SnapshotFolder>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFolder {
    pub id: String,
    pub date: String,
    #[serde(default)]
    pub evidence: Vec<RawEvidenceItem>,
}

/// Serves a single assessment from a `SnapshotDocument`.
pub struct SnapshotSource {
    assessment: Assessment,
    folders: BTreeMap<(String, String), Vec<EvidenceFolder>>,
    items: BTreeMap<(String, String), Vec<RawEvidenceItem>>,
}

impl SnapshotSource {
    pub fn from_path(path: impl AsRef<Path>) -> CoreResult<Self> {
        let bytes = fs::read(path)?;
        let doc: SnapshotDocument = serde_json::from_slice(&bytes)?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: SnapshotDocument) -> Self {
        let mut folders = BTreeMap::new();
        let mut items = BTreeMap::new();
        let mut control_sets = Vec::with_capacity(doc.control_sets.len());

        for cs in doc.control_sets {
            let mut controls = Vec::with_capacity(cs.controls.len());
            for control in cs.controls {
                let mut listed = Vec::with_capacity(control.evidence_folders.len());
                for folder in control.evidence_folders {
                    listed.push(EvidenceFolder {
                        id: folder.id.clone(),
                        date: folder.date,
                    });
                    items.insert((cs.id.clone(), folder.id), folder.evidence);
                }
                folders.insert((cs.id.clone(), control.id.clone()), listed);
                controls.push(Control {
                    id: control.id,
                    name: control.name,
                });
            }
            control_sets.push(ControlSet {
                id: cs.id,
                name: cs.name,
                controls,
            });
        }

        Self {
            assessment: Assessment {
                id: doc.assessment_id,
                name: doc.name,
                control_sets,
            },
            folders,
            items,
        }
    }

    fn check(&self, assessment_id: &str, deadline: Instant) -> SourceResult<()> {
        if Instant::now() > deadline {
            return Err(SourceError::new(
                SourceErrorKind::Timeout,
                "deadline exceeded before snapshot lookup",
            ));
        }
        if assessment_id != self.assessment.id {
            return Err(SourceError::new(
                SourceErrorKind::NotFound,
                format!("assessment not found: {}", assessment_id),
            ));
        }
        Ok(())
    }
}

impl EvidenceSource for SnapshotSource {
    fn get_assessment(&self, assessment_id: &str, deadline: Instant) -> SourceResult<Assessment> {
        self.check(assessment_id, deadline)?;
        Ok(self.assessment.clone())
    }

    fn get_evidence_folders(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        control_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<EvidenceFolder>> {
        self.check(assessment_id, deadline)?;
        self.folders
            .get(&(control_set_id.to_string(), control_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                SourceError::new(
                    SourceErrorKind::NotFound,
                    format!("control not found: {}/{}", control_set_id, control_id),
                )
            })
    }

    fn get_evidence_items(
        &self,
        assessment_id: &str,
        control_set_id: &str,
        evidence_folder_id: &str,
        deadline: Instant,
    ) -> SourceResult<Vec<RawEvidenceItem>> {
        self.check(assessment_id, deadline)?;
        self.items
            .get(&(control_set_id.to_string(), evidence_folder_id.to_string()))
            .cloned()
            .ok_or_else(|| {
                SourceError::new(
                    SourceErrorKind::NotFound,
                    format!(
                        "evidence folder not found: {}/{}",
                        control_set_id, evidence_folder_id
                    ),
                )
            })
    }
}
