use be_api::Record;

/// Restricts dispatch to records produced by one job.
///
/// Matching is exact string equality on `origin.job_id`. With a filter set,
/// records without that field never match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobFilter {
    job_id: Option<String>,
}

impl JobFilter {
    pub fn new(job_id: Option<String>) -> Self {
        // An empty id means "no filter", as with an absent flag.
        Self {
            job_id: job_id.filter(|id| !id.is_empty()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.job_id.is_some()
    }

    pub fn matches(&self, record: &Record) -> bool {
        match &self.job_id {
            None => true,
            Some(target) => record
                .job_origin()
                .is_some_and(|origin| origin.job_id == target),
        }
    }
}
