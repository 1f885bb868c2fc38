use crate::assignment::{AssignmentState, Field, FieldAssignmentMap};
use crate::columns::{generate_preview_columns, Column};
use crate::preview::PreviewReport;
use crate::process::ImportSummary;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition {
        phase: &'static str,
        action: &'static str,
    },
    #[error("required fields are not assigned: {}", .0.join(", "))]
    MissingRequiredFields(Vec<String>),
}

/// Where an import currently stands.
///
/// Each phase carries forward what the earlier ones produced, so stepping back
/// from field assignment keeps both the preview and the assignments made so far.
#[derive(Debug, Clone, Default)]
pub enum ImportPhase {
    #[default]
    SelectingFile,
    PreviewReady {
        preview: PreviewReport,
        has_headers: bool,
        retained: Option<AssignmentState>,
    },
    AssigningFields {
        preview: PreviewReport,
        has_headers: bool,
        assignments: AssignmentState,
    },
    Streaming {
        preview: PreviewReport,
        has_headers: bool,
        assignments: FieldAssignmentMap,
    },
    Complete {
        preview: PreviewReport,
        has_headers: bool,
        assignments: FieldAssignmentMap,
        summary: ImportSummary,
    },
}

impl ImportPhase {
    pub fn name(&self) -> &'static str {
        match self {
            ImportPhase::SelectingFile => "selecting a file",
            ImportPhase::PreviewReady { .. } => "previewing",
            ImportPhase::AssigningFields { .. } => "assigning fields",
            ImportPhase::Streaming { .. } => "streaming",
            ImportPhase::Complete { .. } => "complete",
        }
    }

    pub fn preview(&self) -> Option<&PreviewReport> {
        match self {
            ImportPhase::SelectingFile => None,
            ImportPhase::PreviewReady { preview, .. }
            | ImportPhase::AssigningFields { preview, .. }
            | ImportPhase::Streaming { preview, .. }
            | ImportPhase::Complete { preview, .. } => Some(preview),
        }
    }

    pub fn has_headers(&self) -> bool {
        match self {
            ImportPhase::SelectingFile => false,
            ImportPhase::PreviewReady { has_headers, .. }
            | ImportPhase::AssigningFields { has_headers, .. }
            | ImportPhase::Streaming { has_headers, .. }
            | ImportPhase::Complete { has_headers, .. } => *has_headers,
        }
    }

    /// Columns for the current preview and header setting.
    pub fn columns(&self) -> Vec<Column> {
        self.preview()
            .map(|p| generate_preview_columns(&p.first_rows, self.has_headers()))
            .unwrap_or_default()
    }

    /// A new preview replaces whatever came before, unless a pass is running.
    ///
    /// A single-line file starts (and stays) without headers.
    pub fn preview_loaded(&mut self, preview: PreviewReport) -> Result<(), SessionError> {
        self.reject_while_streaming("load a preview")?;
        let has_headers = !preview.is_single_line;
        *self = ImportPhase::PreviewReady {
            preview,
            has_headers,
            retained: None,
        };
        Ok(())
    }

    pub fn set_has_headers(&mut self, value: bool) -> Result<(), SessionError> {
        match self {
            ImportPhase::PreviewReady {
                preview,
                has_headers,
                ..
            } => {
                *has_headers = value && !preview.is_single_line;
                Ok(())
            }
            _ => Err(self.invalid("change the header setting")),
        }
    }

    /// Move on to field assignment, restoring assignments from an earlier visit.
    pub fn confirm_preview(&mut self, fields: &[Field]) -> Result<(), SessionError> {
        let columns = self.columns();
        match std::mem::take(self) {
            ImportPhase::PreviewReady {
                preview,
                has_headers,
                retained,
            } => {
                let assignments = retained.unwrap_or_default().sync(fields, &columns);
                *self = ImportPhase::AssigningFields {
                    preview,
                    has_headers,
                    assignments,
                };
                Ok(())
            }
            other => {
                *self = other;
                Err(self.invalid("confirm the preview"))
            }
        }
    }

    /// Apply a user edit to the assignment state.
    pub fn update_assignments<F>(&mut self, edit: F) -> Result<(), SessionError>
    where
        F: FnOnce(&AssignmentState) -> AssignmentState,
    {
        match self {
            ImportPhase::AssigningFields { assignments, .. } => {
                *assignments = edit(assignments);
                Ok(())
            }
            _ => Err(self.invalid("edit assignments")),
        }
    }

    /// The declared field list changed: prune stale entries and auto-match again.
    pub fn fields_changed(&mut self, fields: &[Field]) -> Result<(), SessionError> {
        let columns = self.columns();
        self.update_assignments(|state| state.sync(fields, &columns))
    }

    /// Start the full pass. With required fields missing, validation is forced
    /// on and the phase is left as it was.
    pub fn start_streaming(&mut self, fields: &[Field]) -> Result<(), SessionError> {
        let missing: Vec<String> = match self {
            ImportPhase::AssigningFields { assignments, .. } => {
                let missing: Vec<String> = assignments
                    .assignments
                    .unassigned_required(fields)
                    .into_iter()
                    .map(|f| f.name.clone())
                    .collect();
                if !missing.is_empty() {
                    *assignments = assignments.force_validation();
                }
                missing
            }
            _ => return Err(self.invalid("start streaming")),
        };
        if !missing.is_empty() {
            return Err(SessionError::MissingRequiredFields(missing));
        }

        if let ImportPhase::AssigningFields {
            preview,
            has_headers,
            assignments,
        } = std::mem::take(self)
        {
            *self = ImportPhase::Streaming {
                preview,
                has_headers,
                assignments: assignments.assignments,
            };
        }
        Ok(())
    }

    pub fn complete(&mut self, summary: ImportSummary) -> Result<(), SessionError> {
        match std::mem::take(self) {
            ImportPhase::Streaming {
                preview,
                has_headers,
                assignments,
            } => {
                *self = ImportPhase::Complete {
                    preview,
                    has_headers,
                    assignments,
                    summary,
                };
                Ok(())
            }
            other => {
                *self = other;
                Err(self.invalid("complete"))
            }
        }
    }

    /// Step back one phase.
    ///
    /// Assigning goes back to the preview with the assignments retained;
    /// a loaded preview goes back to file selection and is dropped.
    pub fn go_back(&mut self) -> Result<(), SessionError> {
        match std::mem::take(self) {
            ImportPhase::AssigningFields {
                preview,
                has_headers,
                assignments,
            } => {
                *self = ImportPhase::PreviewReady {
                    preview,
                    has_headers,
                    retained: Some(assignments),
                };
                Ok(())
            }
            ImportPhase::PreviewReady { .. } => {
                *self = ImportPhase::SelectingFile;
                Ok(())
            }
            other => {
                *self = other;
                Err(self.invalid("go back"))
            }
        }
    }

    fn reject_while_streaming(&self, action: &'static str) -> Result<(), SessionError> {
        match self {
            ImportPhase::Streaming { .. } => Err(self.invalid(action)),
            _ => Ok(()),
        }
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            phase: self.name(),
            action,
        }
    }
}

/// Increment-and-compare epoch for discarding results of superseded work.
#[derive(Debug, Clone, Default)]
pub struct OperationLock {
    epoch: Arc<AtomicU64>,
}

impl OperationLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new operation; every earlier token goes stale.
    pub fn begin(&self) -> OperationToken {
        let value = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        OperationToken {
            epoch: Arc::clone(&self.epoch),
            value,
        }
    }

    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct OperationToken {
    epoch: Arc<AtomicU64>,
    value: u64,
}

impl OperationToken {
    pub fn is_current(&self) -> bool {
        self.epoch.load(Ordering::SeqCst) == self.value
    }

    /// Wrap a callback so it does nothing once this token is stale.
    pub fn guard<A, F>(&self, mut callback: F) -> impl FnMut(A)
    where
        F: FnMut(A),
    {
        let token = self.clone();
        move |arg| {
            if token.is_current() {
                callback(arg);
            }
        }
    }
}
