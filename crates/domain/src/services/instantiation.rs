//! Class instantiation from templates.
//!
//! Re-running generation for the same template and start times is safe: slots
//! that already hold a non-cancelled class are reported as skipped. A failure
//! on one slot never aborts the batch.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use super::recurrence;
use crate::errors::{ScheduleError, StoreError};
use crate::models::{
    ClassInstance, ClassOverrides, ClassTemplate, NewClassInstance, RecurrenceSpec,
};
use crate::stores::{ClassStore, TemplateStore};

/// A start time that could not be turned into a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FailedSlot {
    pub starts_at: NaiveDateTime,
    pub reason: String,
}

/// Outcome of one instantiation run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InstantiationReport {
    pub created: Vec<ClassInstance>,
    pub skipped: Vec<NaiveDateTime>,
    pub failed: Vec<FailedSlot>,
}

impl InstantiationReport {
    /// Start times worth retrying.
    pub fn failed_slots(&self) -> Vec<NaiveDateTime> {
        self.failed.iter().map(|f| f.starts_at).collect()
    }
}

/// Request payload for generating a template's schedule.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GenerateScheduleRequest {
    #[validate(nested)]
    pub recurrence: RecurrenceSpec,

    #[serde(default)]
    #[validate(nested)]
    pub overrides: ClassOverrides,
}

/// Creates concrete classes from a template.
#[derive(Clone)]
pub struct ClassInstantiator<S> {
    store: S,
}

impl<S: ClassStore> ClassInstantiator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Create one class per start time, skipping occupied slots.
    pub async fn instantiate(
        &self,
        template: &ClassTemplate,
        datetimes: &[NaiveDateTime],
        overrides: &ClassOverrides,
    ) -> InstantiationReport {
        let mut report = InstantiationReport::default();

        for starts_at in datetimes {
            match self.instantiate_slot(template, *starts_at, overrides).await {
                Ok(Some(class)) => report.created.push(class),
                Ok(None) => report.skipped.push(*starts_at),
                Err(err) => {
                    warn!(
                        template_id = %template.id,
                        starts_at = %starts_at,
                        error = %err,
                        "Failed to create class"
                    );
                    report.failed.push(FailedSlot {
                        starts_at: *starts_at,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            template_id = %template.id,
            created = report.created.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "Instantiated classes from template"
        );

        report
    }

    async fn instantiate_slot(
        &self,
        template: &ClassTemplate,
        starts_at: NaiveDateTime,
        overrides: &ClassOverrides,
    ) -> Result<Option<ClassInstance>, StoreError> {
        if self
            .store
            .find_class_at(template.organization_id, starts_at)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let data = NewClassInstance::from_template(template, starts_at, overrides);
        match self.store.create_class(data).await {
            Ok(class) => Ok(Some(class)),
            // A concurrent run claimed the slot between the lookup and the insert.
            Err(StoreError::Constraint(reason)) => {
                match self
                    .store
                    .find_class_at(template.organization_id, starts_at)
                    .await?
                {
                    Some(_) => Ok(None),
                    None => Err(StoreError::Constraint(reason)),
                }
            }
            Err(err) => Err(err),
        }
    }
}

impl<S: ClassStore + TemplateStore> ClassInstantiator<S> {
    /// Load a template, expand the rule and instantiate every occurrence.
    pub async fn generate_schedule(
        &self,
        template_id: Uuid,
        recurrence_spec: &RecurrenceSpec,
        overrides: &ClassOverrides,
    ) -> Result<InstantiationReport, ScheduleError> {
        let template = self
            .store
            .get_template(template_id)
            .await?
            .ok_or(ScheduleError::TemplateNotFound(template_id))?;

        let datetimes = recurrence::expand(recurrence_spec)?;
        Ok(self.instantiate(&template, &datetimes, overrides).await)
    }
}
