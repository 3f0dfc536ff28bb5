//!
//! Job backend interface and an in-memory implementation
//!
use std::{
    collections::BTreeMap,
    io::Read,
    sync::{Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::{
    attribute::AttributeGroup,
    error::IppError,
    job::{JobRecord, JobStatus},
    model::JobState,
    operation::{attr, JOB_OBJECT, JOB_OBJECT_FULL},
    util::ipp_timestamp,
    value::IppValue,
};

/// Print job life cycle actions the service delegates to the surrounding application
pub trait JobBackend {
    /// Backend representation of a job
    type Job;

    /// Create a job from the operation and job-template groups, returning its id
    fn create_job(&self, operation: &AttributeGroup, template: &AttributeGroup) -> Result<i32, IppError>;

    /// Attach the document to a created job, returning the id of the job that will print it
    fn submit_job(&self, document: &mut dyn Read, operation: &AttributeGroup, job_id: i32) -> Result<i32, IppError>;

    fn get_job(&self, job_id: i32) -> Result<Option<JobRecord<Self::Job>>, IppError>;

    /// List jobs, `all_jobs` widens the listing beyond the requesting user's jobs
    fn get_jobs(
        &self,
        first_index: i32,
        limit: i32,
        all_jobs: bool,
        exclude_completed: bool,
    ) -> Result<Vec<Self::Job>, IppError>;

    /// Job object group, [`JOB_OBJECT_FULL`] when `full` is set, [`JOB_OBJECT`] otherwise
    fn build_job_attributes(&self, job: &Self::Job, full: bool) -> Result<AttributeGroup, IppError>;

    fn cancel_job(&self, job: &Self::Job) -> Result<(), IppError>;

    fn get_job_uri(&self, job_id: i32) -> String;

    fn get_printer_uri(&self) -> String;
}

/// Job kept by [`MemoryBackend`]
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryJob {
    pub id: i32,
    pub name: String,
    pub user: String,
    pub status: JobStatus,
    pub template: AttributeGroup,
    pub document: Option<Vec<u8>>,
    pub created: DateTime<Utc>,
    pub processed: Option<DateTime<Utc>>,
    pub completed: Option<DateTime<Utc>>,
}

struct JobTable {
    next_id: i32,
    jobs: BTreeMap<i32, MemoryJob>,
}

/// Backend keeping jobs and documents in memory
pub struct MemoryBackend {
    printer_uri: String,
    table: Mutex<JobTable>,
}

impl MemoryBackend {
    pub fn new<S: Into<String>>(printer_uri: S) -> Self {
        MemoryBackend {
            printer_uri: printer_uri.into(),
            table: Mutex::new(JobTable {
                next_id: 1,
                jobs: BTreeMap::new(),
            }),
        }
    }

    fn table(&self) -> Result<MutexGuard<'_, JobTable>, IppError> {
        self.table
            .lock()
            .map_err(|_| IppError::InternalError("job table lock poisoned".into()))
    }

    /// Snapshot of a job
    pub fn job(&self, job_id: i32) -> Result<Option<MemoryJob>, IppError> {
        Ok(self.table()?.jobs.get(&job_id).cloned())
    }

    /// Move a job to another status, as a print worker would
    pub fn set_status(&self, job_id: i32, status: JobStatus) -> Result<(), IppError> {
        let mut table = self.table()?;
        let job = table
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| IppError::NotFound(format!("job {job_id}")))?;
        let now = Utc::now();
        match status.job_state() {
            state if state.is_terminal() => job.completed = Some(now),
            JobState::Processing => job.processed = job.processed.or(Some(now)),
            _ => {}
        }
        debug!("Job {job_id}: {:?} -> {status:?}", job.status);
        job.status = status;
        Ok(())
    }
}

fn text_value(group: &AttributeGroup, name: &str) -> Option<String> {
    group.get(name).and_then(|v| v.as_str()).map(ToOwned::to_owned)
}

fn timestamp(date: Option<&DateTime<Utc>>) -> i32 {
    date.map(ipp_timestamp).unwrap_or_default()
}

impl JobBackend for MemoryBackend {
    type Job = MemoryJob;

    fn create_job(&self, operation: &AttributeGroup, template: &AttributeGroup) -> Result<i32, IppError> {
        let mut table = self.table()?;
        let id = table.next_id;
        table.next_id += 1;

        let job = MemoryJob {
            id,
            name: text_value(operation, attr::JOB_NAME)
                .or_else(|| text_value(operation, attr::DOCUMENT_NAME))
                .unwrap_or_else(|| format!("job-{id}")),
            user: text_value(operation, attr::REQUESTING_USER_NAME).unwrap_or_else(|| "anonymous".to_owned()),
            status: JobStatus::Incoming,
            template: template.clone(),
            document: None,
            created: Utc::now(),
            processed: None,
            completed: None,
        };
        info!("Created job {id} '{}' for {}", job.name, job.user);
        table.jobs.insert(id, job);
        Ok(id)
    }

    fn submit_job(&self, document: &mut dyn Read, operation: &AttributeGroup, job_id: i32) -> Result<i32, IppError> {
        let mut data = Vec::new();
        document.read_to_end(&mut data)?;

        let mut table = self.table()?;
        let job = table
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| IppError::NotFound(format!("job {job_id}")))?;
        if job.status != JobStatus::Incoming {
            return Err(IppError::NotPossible(format!("job {job_id} is {:?}", job.status)));
        }
        if let Some(name) = text_value(operation, attr::DOCUMENT_NAME) {
            if job.name == format!("job-{job_id}") {
                job.name = name;
            }
        }
        info!("Received {} bytes for job {job_id}", data.len());
        job.document = Some(data);
        job.status = JobStatus::Pending;
        Ok(job_id)
    }

    fn get_job(&self, job_id: i32) -> Result<Option<JobRecord<MemoryJob>>, IppError> {
        Ok(self.table()?.jobs.get(&job_id).map(|job| JobRecord {
            id: job.id,
            status: job.status,
            submitted: job.document.is_some(),
            job: job.clone(),
        }))
    }

    // jobs carry no owner scope here: `all_jobs` lists every state,
    // otherwise `exclude_completed` picks active jobs and its negation finished ones
    fn get_jobs(
        &self,
        first_index: i32,
        limit: i32,
        all_jobs: bool,
        exclude_completed: bool,
    ) -> Result<Vec<MemoryJob>, IppError> {
        let table = self.table()?;
        Ok(table
            .jobs
            .values()
            .filter(|job| all_jobs || job.status.is_completed() != exclude_completed)
            .skip(first_index.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    fn build_job_attributes(&self, job: &MemoryJob, full: bool) -> Result<AttributeGroup, IppError> {
        let schema = if full { &JOB_OBJECT_FULL } else { &JOB_OBJECT };
        let mut group = AttributeGroup::new(schema);
        for (name, value) in job.template.values() {
            group.set(name, value.clone())?;
        }

        group.set(attr::JOB_ID, IppValue::Integer(job.id))?;
        group.set(attr::JOB_URI, IppValue::Uri(self.get_job_uri(job.id)))?;
        group.set(attr::JOB_STATE, IppValue::Enum(job.status.job_state() as i32))?;
        group.set(attr::JOB_STATE_REASONS, IppValue::keywords([job.status.state_reason()]))?;
        group.set("job_printer_uri", IppValue::Uri(self.get_printer_uri()))?;
        group.set(attr::JOB_NAME, IppValue::NameWithoutLanguage(job.name.clone()))?;
        group.set("job_originating_user_name", IppValue::NameWithoutLanguage(job.user.clone()))?;
        group.set("time_at_creation", IppValue::Integer(ipp_timestamp(&job.created)))?;
        group.set("time_at_processing", IppValue::Integer(timestamp(job.processed.as_ref())))?;
        group.set("time_at_completed", IppValue::Integer(timestamp(job.completed.as_ref())))?;
        group.set("job_printer_up_time", IppValue::Integer(ipp_timestamp(&Utc::now())))?;
        group.set("date_time_at_creation", job.created.into())?;
        if let Some(processed) = job.processed {
            group.set("date_time_at_processing", processed.into())?;
        }
        if let Some(completed) = job.completed {
            group.set("date_time_at_completed", completed.into())?;
        }
        Ok(group)
    }

    fn cancel_job(&self, job: &MemoryJob) -> Result<(), IppError> {
        let mut table = self.table()?;
        let stored = table
            .jobs
            .get_mut(&job.id)
            .ok_or_else(|| IppError::NotFound(format!("job {}", job.id)))?;
        if !matches!(stored.status, JobStatus::Incoming | JobStatus::Pending) {
            return Err(IppError::NotPossible(format!("job {} is {:?}", job.id, stored.status)));
        }
        info!("Canceled job {}", job.id);
        stored.status = JobStatus::Canceled;
        stored.completed = Some(Utc::now());
        Ok(())
    }

    fn get_job_uri(&self, job_id: i32) -> String {
        format!("{}/job/{job_id}", self.printer_uri.trim_end_matches('/'))
    }

    fn get_printer_uri(&self) -> String {
        self.printer_uri.clone()
    }
}
