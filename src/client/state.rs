use tracing::{error, info};

use crate::client::api::GradeApi;
use crate::client::storage::{load_samples, save_samples, KeyValueStore};
use crate::error::{ClientError, ClientResult};
use crate::model::grade::{GradeRequest, GradeResponse};
use crate::model::sample::{LetterGrade, Sample};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
}

/// Editor state for one user: samples, the essay being graded and the last feedback.
///
/// The sample list is written back to the store after every change.
#[derive(Debug)]
pub struct GraderSession<S: KeyValueStore> {
    store: S,
    samples: Vec<Sample>,
    essay_prompt: String,
    essay_text: String,
    grading_output: String,
    phase: Phase,
}

impl<S: KeyValueStore> GraderSession<S> {
    /// Starts a session with whatever samples the store already holds.
    pub fn hydrate(store: S) -> Self {
        let samples = load_samples(&store);
        Self {
            store,
            samples,
            essay_prompt: String::new(),
            essay_text: String::new(),
            grading_output: String::new(),
            phase: Phase::Idle,
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn essay_prompt(&self) -> &str {
        &self.essay_prompt
    }

    pub fn essay_text(&self) -> &str {
        &self.essay_text
    }

    pub fn grading_output(&self) -> &str {
        &self.grading_output
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn can_submit(&self) -> bool {
        self.phase == Phase::Idle
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn add_sample(&mut self) -> ClientResult<()> {
        let mut samples = self.samples.clone();
        samples.push(Sample::default());
        self.commit(samples)
    }

    pub fn delete_sample(&mut self, index: usize) -> ClientResult<Sample> {
        self.check_index(index)?;
        let mut samples = self.samples.clone();
        let removed = samples.remove(index);
        self.commit(samples)?;
        Ok(removed)
    }

    pub fn set_sample_text(&mut self, index: usize, text: impl Into<String>) -> ClientResult<()> {
        self.check_index(index)?;
        let mut samples = self.samples.clone();
        samples[index].text = text.into();
        self.commit(samples)
    }

    pub fn set_sample_grade(&mut self, index: usize, grade: LetterGrade) -> ClientResult<()> {
        self.check_index(index)?;
        let mut samples = self.samples.clone();
        samples[index].grade = grade.to_string();
        self.commit(samples)
    }

    pub fn set_essay_prompt(&mut self, prompt: impl Into<String>) {
        self.essay_prompt = prompt.into();
    }

    pub fn set_essay_text(&mut self, text: impl Into<String>) {
        self.essay_text = text.into();
    }

    /// Snapshots the current state into a request and marks the session busy.
    ///
    /// Returns `None` while a previous submission has not finished.
    pub fn begin_submission(&mut self) -> Option<GradeRequest> {
        if self.phase == Phase::Submitting {
            return None;
        }
        self.phase = Phase::Submitting;
        Some(GradeRequest {
            samples: self.samples.clone(),
            essay_text: self.essay_text.clone(),
            essay_prompt: self.essay_prompt.clone(),
        })
    }

    /// Applies the endpoint's answer. Failures keep the previous output.
    pub fn finish_submission(&mut self, result: ClientResult<GradeResponse>) -> ClientResult<&str> {
        self.phase = Phase::Idle;
        match result {
            Ok(resp) => {
                info!(output_chars = resp.grade.chars().count(), "grading output received");
                self.grading_output = resp.grade;
                Ok(&self.grading_output)
            }
            Err(e) => {
                error!(error = %e, "error grading essay");
                Err(e)
            }
        }
    }

    pub async fn grade_essay(&mut self, api: &dyn GradeApi) -> ClientResult<&str> {
        let request = self.begin_submission().ok_or(ClientError::Busy)?;
        let result = api.grade(&request).await;
        self.finish_submission(result)
    }

    fn check_index(&self, index: usize) -> ClientResult<()> {
        if index >= self.samples.len() {
            return Err(ClientError::SampleIndex {
                index,
                len: self.samples.len(),
            });
        }
        Ok(())
    }

    /// Stores the new list first; the in-memory list only changes once that succeeds.
    fn commit(&mut self, samples: Vec<Sample>) -> ClientResult<()> {
        save_samples(&mut self.store, &samples)?;
        self.samples = samples;
        Ok(())
    }
}
