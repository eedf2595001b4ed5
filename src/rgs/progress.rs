// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: progress.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use std::fmt;
use std::time::{Duration, Instant};

/// Coalescing window used when none is configured.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(30);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, clap::ValueEnum)]
pub enum ProgressMode {
	#[default]
	Auto,
	Always,
	Never,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ProgressConfig {
	pub mode: ProgressMode,
}

impl ProgressConfig {
	/// Whether progress should be repainted in place.
	pub fn is_live(&self, is_tty: bool) -> bool {
		match self.mode {
			ProgressMode::Never => false,
			ProgressMode::Always => true,
			ProgressMode::Auto => is_tty,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
	Queued,
	Running,
	Done,
}

impl fmt::Display for JobStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			JobStatus::Queued => "Queued",
			JobStatus::Running => "Running",
			JobStatus::Done => "Done",
		})
	}
}

/// What the renderer knows about one job.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressState {
	pub label: String,
	pub bytes_processed: u64,
	pub total_bytes: u64,
	pub percentage: f64,
	pub status: JobStatus,
	pub digest: Option<String>,
	pub display_line: String,
}

impl ProgressState {
	pub fn queued(algorithm: &str) -> Self {
		let mut state = Self {
			label: algorithm.to_uppercase(),
			bytes_processed: 0,
			total_bytes: 0,
			percentage: 0.0,
			status: JobStatus::Queued,
			digest: None,
			display_line: String::new(),
		};
		state.refresh_line();
		state
	}

	fn refresh_line(&mut self) {
		self.display_line = match (self.status, &self.digest) {
			(JobStatus::Done, Some(digest)) => {
				format!("{}: {}", self.label, digest)
			}
			(JobStatus::Queued, _) => {
				format!("{} Progress: {}", self.label, self.status)
			}
			_ => format!(
				"{} Progress: {:.2}%",
				self.label, self.percentage
			),
		};
	}
}

fn percent_of(processed: u64, total: u64) -> f64 {
	if total == 0 {
		return 100.0;
	}
	(100.0 * processed as f64 / total as f64).min(100.0)
}

/// Tracks one job's progress and decides when it is worth a redraw.
///
/// Reports arriving faster than the throttle window are coalesced. The
/// first report and the report made by [`ProgressTracker::finish`] are
/// always emitted.
pub struct ProgressTracker {
	state: ProgressState,
	throttle: Duration,
	last_emit: Option<Instant>,
}

impl ProgressTracker {
	pub fn new(total_bytes: u64, algorithm: &str, throttle: Duration) -> Self {
		let mut state = ProgressState::queued(algorithm);
		state.total_bytes = total_bytes;
		Self {
			state,
			throttle,
			last_emit: None,
		}
	}

	pub fn state(&self) -> &ProgressState {
		&self.state
	}

	/// Mark the job as running. An empty file is complete from the start.
	pub fn start(&mut self) -> &ProgressState {
		self.state.status = JobStatus::Running;
		self.state.percentage =
			percent_of(self.state.bytes_processed, self.state.total_bytes);
		self.state.refresh_line();
		&self.state
	}

	/// Account for `bytes` more bytes read. Returns true when the caller
	/// should redraw.
	pub fn record(&mut self, bytes: u64) -> bool {
		self.record_at(bytes, Instant::now())
	}

	pub fn record_at(&mut self, bytes: u64, now: Instant) -> bool {
		let state = &mut self.state;
		state.status = JobStatus::Running;
		state.bytes_processed = state
			.bytes_processed
			.saturating_add(bytes)
			.min(state.total_bytes);
		let pct = percent_of(state.bytes_processed, state.total_bytes);
		if pct > state.percentage {
			state.percentage = pct;
		}
		state.refresh_line();

		match self.last_emit {
			Some(last)
				if now.saturating_duration_since(last) < self.throttle =>
			{
				false
			}
			_ => {
				self.last_emit = Some(now);
				true
			}
		}
	}

	pub fn finish(&mut self, digest: String) -> &ProgressState {
		self.state.status = JobStatus::Done;
		self.state.percentage = 100.0;
		self.state.bytes_processed = self.state.total_bytes;
		self.state.digest = Some(digest);
		self.state.refresh_line();
		self.last_emit = Some(Instant::now());
		&self.state
	}
}
