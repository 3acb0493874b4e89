//! One interactive tutoring session: conversation state, timing, and the
//! append to the history log after every successful exchange.

#![allow(missing_docs)]

use std::time::Instant;

use crate::core::errors::Result;
use crate::history::record::InteractionRecord;
use crate::history::writer::HistoryWriter;
use crate::tutor::client::{Responder, ResponseRequest, Turn};
use crate::tutor::retry::RetryPolicy;

/// Drives exchanges against a [`Responder`] and logs each one.
#[derive(Debug)]
pub struct TutorSession<R> {
    responder: R,
    writer: HistoryWriter,
    retry: RetryPolicy,
    system_instruction: String,
    max_output_tokens: u32,
    turns: Vec<Turn>,
    started: Instant,
}

impl<R: Responder> TutorSession<R> {
    pub fn new(
        responder: R,
        writer: HistoryWriter,
        retry: RetryPolicy,
        system_instruction: impl Into<String>,
        max_output_tokens: u32,
    ) -> Self {
        Self {
            responder,
            writer,
            retry,
            system_instruction: system_instruction.into(),
            max_output_tokens,
            turns: Vec::new(),
            started: Instant::now(),
        }
    }

    /// Ask one question. On success the exchange joins the conversation and
    /// is appended to the log; on failure neither happens.
    pub fn ask(&mut self, query: &str) -> Result<String> {
        self.ask_with(query, std::thread::sleep)
    }

    /// [`Self::ask`] with an explicit sleeper for retry backoff.
    pub fn ask_with(
        &mut self,
        query: &str,
        sleep: impl FnMut(std::time::Duration),
    ) -> Result<String> {
        let elapsed = self.elapsed_minutes();
        let request = ResponseRequest {
            query,
            turns: &self.turns,
            system_instruction: &self.system_instruction,
            max_output_tokens: self.max_output_tokens,
        };
        let responder = &self.responder;
        let response = self
            .retry
            .execute_with(|| responder.respond(&request), sleep)?;

        self.turns.push(Turn::user(query));
        self.turns.push(Turn::model(response.clone()));
        let record = InteractionRecord::new(
            query,
            response.as_str(),
            self.responder.model_id(),
            Some(elapsed),
        );
        self.writer.append(&record)?;
        Ok(response)
    }

    /// Minutes since the session started, rounded to two decimals.
    pub fn elapsed_minutes(&self) -> f64 {
        round_minutes(self.started.elapsed().as_secs_f64())
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn writer(&self) -> &HistoryWriter {
        &self.writer
    }
}

fn round_minutes(seconds: f64) -> f64 {
    (seconds / 60.0 * 100.0).round() / 100.0
}
