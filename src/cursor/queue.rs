//! Sans-I/O state shared by the blocking and async iterators.
//!
//! The queue never talks to the server. [`CursorQueue::step`] returns the
//! next row or a statement the caller must run; the caller reports the result
//! back with [`CursorQueue::fetched`] or [`CursorQueue::failed`] and steps
//! again.

use std::collections::VecDeque;

use tracing::{debug, trace};

use super::{RefcursorOptions, sql};
use crate::error::NoRefcursorLeft;

/// Where the queue is in the name sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    BeforeFirstCursor,
    /// Index of the cursor most recently started.
    Streaming(usize),
    Exhausted,
}

/// What the caller should do next.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Step<R> {
    /// Hand this row to the caller.
    Row(R),
    /// Run this statement as a query and pass the rows to [`CursorQueue::fetched`].
    Fetch(String),
    /// Run this statement, then step again.
    Close(String),
    /// No cursor names remain. Every further step returns `Done`.
    Done,
}

struct ActiveCursor<R> {
    name: String,
    rows: VecDeque<R>,
    finished: bool,
}

pub(crate) struct CursorQueue<R> {
    names: VecDeque<String>,
    active: Option<ActiveCursor<R>>,
    started: usize,
    phase: Phase,
    options: RefcursorOptions,
}

impl<R> CursorQueue<R> {
    pub(crate) fn new<I, S>(names: I, options: RefcursorOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: VecDeque<String> = names.into_iter().map(Into::into).collect();
        trace!(cursors = names.len(), "refcursor queue created");
        Self {
            names,
            active: None,
            started: 0,
            phase: Phase::BeforeFirstCursor,
            options,
        }
    }

    pub(crate) fn step(&mut self) -> Step<R> {
        loop {
            if let Some(cursor) = self.active.as_mut() {
                if let Some(row) = cursor.rows.pop_front() {
                    return Step::Row(row);
                }
                if !cursor.finished {
                    return Step::Fetch(sql::fetch(&cursor.name, self.options.fetch_size));
                }
                if let Some(done) = self.active.take() {
                    trace!(cursor = %done.name, "refcursor drained");
                    if self.options.close_exhausted {
                        debug!(cursor = %done.name, "closing refcursor");
                        return Step::Close(sql::close(&done.name));
                    }
                }
                continue;
            }

            match self.names.pop_front() {
                Some(name) => {
                    self.start(&name);
                    self.active = Some(ActiveCursor {
                        name,
                        rows: VecDeque::new(),
                        finished: false,
                    });
                }
                None => {
                    self.finish();
                    return Step::Done;
                }
            }
        }
    }

    /// Record the rows returned by the last [`Step::Fetch`].
    pub(crate) fn fetched(&mut self, rows: Vec<R>) {
        let Some(cursor) = self.active.as_mut() else {
            return;
        };
        debug!(cursor = %cursor.name, rows = rows.len(), "refcursor rows fetched");
        cursor.finished = match self.options.fetch_size {
            0 => true,
            n => rows.len() < n as usize,
        };
        cursor.rows.extend(rows);
    }

    /// A round-trip failed. The server has aborted the transaction, so every
    /// remaining cursor is unreachable and the queue ends here.
    pub(crate) fn failed(&mut self) {
        if let Some(cursor) = self.active.take() {
            debug!(cursor = %cursor.name, "refcursor fetch failed");
        }
        if !self.names.is_empty() {
            debug!(skipped = self.names.len(), "abandoning remaining refcursors");
            self.names.clear();
        }
        self.finish();
    }

    /// Take the next cursor name outright, discarding whatever is left of the
    /// active cursor. The caller fetches it with `FETCH ALL`.
    pub(crate) fn take_cursor(&mut self) -> Result<String, NoRefcursorLeft> {
        self.active = None;
        match self.names.pop_front() {
            Some(name) => {
                self.start(&name);
                if self.names.is_empty() {
                    self.finish();
                }
                Ok(name)
            }
            None => {
                self.finish();
                Err(NoRefcursorLeft::with_message(format!(
                    "no refcursor left: all {} have been consumed",
                    self.started
                )))
            }
        }
    }

    pub(crate) fn options(&self) -> &RefcursorOptions {
        &self.options
    }

    pub(crate) fn remaining(&self) -> usize {
        self.names.len()
    }

    pub(crate) fn current_cursor(&self) -> Option<&str> {
        self.active.as_ref().map(|c| c.name.as_str())
    }

    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    fn start(&mut self, name: &str) {
        self.phase = Phase::Streaming(self.started);
        self.started += 1;
        trace!(cursor = %name, index = self.started - 1, "refcursor started");
    }

    fn finish(&mut self) {
        if self.phase != Phase::Exhausted {
            trace!(cursors = self.started, "refcursor queue exhausted");
            self.phase = Phase::Exhausted;
        }
    }
}
