use std::fmt;

use serde::{Deserialize, Serialize};

/// Something a status source hands back on every poll.
pub trait Observation {
    /// Whether the remote side will never move this record again.
    fn is_terminal(&self) -> bool;

    /// Short label for logs and timeout errors (e.g. "InProgress").
    fn status_label(&self) -> String;
}

/// Lifecycle status of a SageMaker Processing job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Pending,
    InProgress,
    Stopping,
    Completed,
    Failed,
    Stopped,
    /// A status string this build does not know about. Never terminal.
    Unknown(String),
}

impl JobStatus {
    /// Map the service's status string onto the enum.
    pub fn from_service(raw: &str) -> Self {
        match raw {
            "Pending" => JobStatus::Pending,
            "InProgress" => JobStatus::InProgress,
            "Stopping" => JobStatus::Stopping,
            "Completed" => JobStatus::Completed,
            "Failed" => JobStatus::Failed,
            "Stopped" => JobStatus::Stopped,
            other => JobStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// Terminal, but not the happy path.
    pub fn is_failure(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Stopped)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::InProgress => write!(f, "InProgress"),
            JobStatus::Stopping => write!(f, "Stopping"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::Stopped => write!(f, "Stopped"),
            JobStatus::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Lifecycle status of an Augmented AI human loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanLoopStatus {
    InProgress,
    Stopping,
    Completed,
    Failed,
    Stopped,
    Unknown(String),
}

impl HumanLoopStatus {
    pub fn from_service(raw: &str) -> Self {
        match raw {
            "InProgress" => HumanLoopStatus::InProgress,
            "Stopping" => HumanLoopStatus::Stopping,
            "Completed" => HumanLoopStatus::Completed,
            "Failed" => HumanLoopStatus::Failed,
            "Stopped" => HumanLoopStatus::Stopped,
            other => HumanLoopStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            HumanLoopStatus::Completed | HumanLoopStatus::Failed | HumanLoopStatus::Stopped
        )
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, HumanLoopStatus::Failed | HumanLoopStatus::Stopped)
    }
}

impl fmt::Display for HumanLoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HumanLoopStatus::InProgress => write!(f, "InProgress"),
            HumanLoopStatus::Stopping => write!(f, "Stopping"),
            HumanLoopStatus::Completed => write!(f, "Completed"),
            HumanLoopStatus::Failed => write!(f, "Failed"),
            HumanLoopStatus::Stopped => write!(f, "Stopped"),
            HumanLoopStatus::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Status of a human review flow definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowStatus {
    Initializing,
    Active,
    Failed,
    Deleting,
    Unknown(String),
}

impl FlowStatus {
    pub fn from_service(raw: &str) -> Self {
        match raw {
            "Initializing" => FlowStatus::Initializing,
            "Active" => FlowStatus::Active,
            "Failed" => FlowStatus::Failed,
            "Deleting" => FlowStatus::Deleting,
            other => FlowStatus::Unknown(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowStatus::Active | FlowStatus::Failed)
    }
}

impl fmt::Display for FlowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowStatus::Initializing => write!(f, "Initializing"),
            FlowStatus::Active => write!(f, "Active"),
            FlowStatus::Failed => write!(f, "Failed"),
            FlowStatus::Deleting => write!(f, "Deleting"),
            FlowStatus::Unknown(raw) => write!(f, "Unknown({raw})"),
        }
    }
}

/// Snapshot of a processing job as reported by `DescribeProcessingJob`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingJobRecord {
    pub name: String,
    pub status: JobStatus,
    /// S3 locations of the job outputs, keyed by output name.
    pub outputs: Vec<(String, String)>,
    pub failure_reason: Option<String>,
}

impl Observation for ProcessingJobRecord {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }
}

/// Snapshot of a human loop as reported by `DescribeHumanLoop`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanLoopRecord {
    pub name: String,
    pub status: HumanLoopStatus,
    /// Where A2I writes the reviewer answers once the loop completes.
    pub output_uri: Option<String>,
    pub failure_reason: Option<String>,
}

impl Observation for HumanLoopRecord {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowDefinitionRecord {
    pub name: String,
    pub arn: Option<String>,
    pub status: FlowStatus,
    pub failure_reason: Option<String>,
}

impl Observation for FlowDefinitionRecord {
    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn status_label(&self) -> String {
        self.status.to_string()
    }
}
