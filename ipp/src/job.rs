//!
//! Job status as seen by a backend and its IPP representation
//!
use crate::model::JobState;

/// Life cycle of a job in the backend
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum JobStatus {
    /// Created, document not yet received
    Incoming,
    Pending,
    Processing,
    Printing,
    Completed,
    Canceled,
    Canceling,
    Error,
    Unknown,
}

impl JobStatus {
    /// IPP `job-state` reported for this status
    pub fn job_state(&self) -> JobState {
        match self {
            JobStatus::Incoming | JobStatus::Pending | JobStatus::Unknown => JobState::Pending,
            JobStatus::Processing | JobStatus::Printing | JobStatus::Canceling => JobState::Processing,
            JobStatus::Completed => JobState::Completed,
            JobStatus::Canceled => JobState::Canceled,
            JobStatus::Error => JobState::Aborted,
        }
    }

    /// IPP `job-state-reasons` keyword
    pub fn state_reason(&self) -> &'static str {
        match self {
            JobStatus::Incoming => "job-incoming",
            JobStatus::Pending | JobStatus::Unknown => "none",
            JobStatus::Processing => "job-transforming",
            JobStatus::Printing => "job-printing",
            JobStatus::Completed => "job-completed-successfully",
            JobStatus::Canceled => "job-canceled-by-user",
            JobStatus::Canceling => "processing-to-stop-point",
            JobStatus::Error => "aborted-by-system",
        }
    }

    pub fn is_cancelable(&self) -> bool {
        self.job_state().is_cancelable()
    }

    /// Jobs excluded by `which-jobs=not-completed`
    pub fn is_completed(&self) -> bool {
        self.job_state().is_terminal()
    }
}

/// Backend job lookup result
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord<J> {
    pub id: i32,
    pub status: JobStatus,
    /// A document has been received for the job
    pub submitted: bool,
    pub job: J,
}
