//! Offline walk through the wait loop against a simulated processing job.

use crate::waiter::{JobStatus, ProcessingJobRecord, StatusSource};

/// A job that reports `Pending`, then `InProgress`, then its final status on poll `finish_after`.
pub struct SimulatedJob {
    name: String,
    finish_after: u32,
    fail: bool,
    polls: u32,
}

impl SimulatedJob {
    pub fn new(name: impl Into<String>, finish_after: u32, fail: bool) -> Self {
        Self {
            name: name.into(),
            finish_after: finish_after.max(1),
            fail,
            polls: 0,
        }
    }
}

impl StatusSource for SimulatedJob {
    type Record = ProcessingJobRecord;
    type Error = std::convert::Infallible;

    async fn fetch(&mut self) -> Result<Self::Record, Self::Error> {
        self.polls += 1;
        let status = match self.polls {
            n if n >= self.finish_after && self.fail => JobStatus::Failed,
            n if n >= self.finish_after => JobStatus::Completed,
            1 => JobStatus::Pending,
            _ => JobStatus::InProgress,
        };
        Ok(ProcessingJobRecord {
            name: self.name.clone(),
            failure_reason: (status == JobStatus::Failed)
                .then(|| "AlgorithmError: simulated failure".to_string()),
            outputs: if status == JobStatus::Completed {
                vec![(
                    "train_data".to_string(),
                    format!("s3://demo-bucket/{}/output/train_data", self.name),
                )]
            } else {
                Vec::new()
            },
            status,
        })
    }
}
