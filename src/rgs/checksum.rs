// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: checksum.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use crate::rgs::digest::Accumulator;
use crate::rgs::error::{ChecksumError, Result};
use crate::rgs::progress::{ProgressState, ProgressTracker, DEFAULT_THROTTLE};
use crate::rgs::render::Renderer;
use crate::rgs::stream::{FileStream, DEFAULT_CHUNK_SIZE};
use log::debug;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum Schedule {
	#[default]
	Sequential,
	/// One worker thread per algorithm, each with its own file handle.
	Parallel,
}

#[derive(Clone, Debug)]
pub struct ChecksumOptions {
	pub chunk_size: usize,
	pub throttle: Duration,
	pub schedule: Schedule,
}

impl Default for ChecksumOptions {
	fn default() -> Self {
		Self {
			chunk_size: DEFAULT_CHUNK_SIZE,
			throttle: DEFAULT_THROTTLE,
			schedule: Schedule::Sequential,
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AlgorithmJob {
	pub name: String,
	pub index: usize,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DigestResult {
	pub algorithm: String,
	pub hex_digest: String,
}

/// Current line of every job plus the renderer that shows them.
struct Board<'a, W: Write> {
	states: Vec<ProgressState>,
	renderer: &'a mut Renderer<W>,
}

impl<W: Write> Board<'_, W> {
	fn update(&mut self, index: usize, state: &ProgressState) -> Result<()> {
		self.states[index] = state.clone();
		self.renderer.draw(&self.states)
	}

	fn conclude(&mut self) -> Result<()> {
		self.renderer.conclude(&self.states)
	}
}

/// Compute a digest of `path` for every name in `algorithms`.
///
/// Results come back in request order. The first failing job aborts the
/// run and no results are returned. The cursor is shown again on every
/// exit path.
pub fn run_all<W: Write + Send>(
	path: &Path,
	algorithms: &[String],
	options: &ChecksumOptions,
	renderer: &mut Renderer<W>,
) -> Result<Vec<DigestResult>> {
	if algorithms.is_empty() {
		return Err(ChecksumError::NoAlgorithms);
	}
	let jobs: Vec<AlgorithmJob> = algorithms
		.iter()
		.enumerate()
		.map(|(index, name)| AlgorithmJob {
			name: name.clone(),
			index,
		})
		.collect();

	let mut guard = renderer.session()?;
	let mut board = Board {
		states: jobs
			.iter()
			.map(|job| ProgressState::queued(&job.name))
			.collect(),
		renderer: &mut *guard,
	};
	board.renderer.draw(&board.states)?;

	let outcome = match options.schedule {
		Schedule::Sequential => run_sequential(path, &jobs, options, &mut board),
		Schedule::Parallel => {
			let shared = Mutex::new(board);
			let outcome = run_parallel(path, &jobs, options, &shared);
			board =
				shared.into_inner().unwrap_or_else(PoisonError::into_inner);
			outcome
		}
	};
	// Finished jobs stay visible even when a later one failed.
	let concluded = board.conclude();
	let results = outcome?;
	concluded?;
	Ok(results)
}

fn run_sequential<W: Write>(
	path: &Path,
	jobs: &[AlgorithmJob],
	options: &ChecksumOptions,
	board: &mut Board<'_, W>,
) -> Result<Vec<DigestResult>> {
	let never = AtomicBool::new(false);
	let mut results = Vec::with_capacity(jobs.len());
	for job in jobs {
		let result =
			checksum_job(path, job, options, &never, &mut |index, state| {
				board.update(index, state)
			})?;
		results.push(result);
	}
	Ok(results)
}

/// Every worker stops at its next chunk once any job has failed. The
/// reported error is the first real failure in request order.
fn run_parallel<W: Write + Send>(
	path: &Path,
	jobs: &[AlgorithmJob],
	options: &ChecksumOptions,
	board: &Mutex<Board<'_, W>>,
) -> Result<Vec<DigestResult>> {
	let abort = AtomicBool::new(false);
	let abort = &abort;
	let outcomes: Vec<Result<DigestResult>> = thread::scope(|scope| {
		let handles: Vec<_> = jobs
			.iter()
			.map(|job| {
				scope.spawn(move || {
					let outcome = checksum_job(
						path,
						job,
						options,
						abort,
						&mut |index, state| lock(board).update(index, state),
					);
					if outcome.is_err() {
						abort.store(true, Ordering::Relaxed);
					}
					outcome
				})
			})
			.collect();
		handles
			.into_iter()
			.map(|handle| {
				handle
					.join()
					.unwrap_or_else(|panic| std::panic::resume_unwind(panic))
			})
			.collect()
	});

	let mut results = Vec::with_capacity(outcomes.len());
	let mut cancelled = false;
	for outcome in outcomes {
		match outcome {
			Ok(result) => results.push(result),
			Err(ChecksumError::Cancelled) => cancelled = true,
			Err(err) => return Err(err),
		}
	}
	if cancelled {
		return Err(ChecksumError::Cancelled);
	}
	Ok(results)
}

fn lock<'m, T>(mutex: &'m Mutex<T>) -> MutexGuard<'m, T> {
	mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One full pass over `path` for a single algorithm.
fn checksum_job(
	path: &Path,
	job: &AlgorithmJob,
	options: &ChecksumOptions,
	abort: &AtomicBool,
	report: &mut dyn FnMut(usize, &ProgressState) -> Result<()>,
) -> Result<DigestResult> {
	let mut accumulator = Accumulator::from_name(&job.name)?;
	let stream = FileStream::open(path)?;
	debug!(
		"{}: hashing {} ({} bytes)",
		accumulator.algorithm(),
		stream.path().display(),
		stream.size()
	);
	let mut tracker =
		ProgressTracker::new(stream.size(), &job.name, options.throttle);
	report(job.index, tracker.start())?;

	for chunk in stream.chunks(options.chunk_size) {
		if abort.load(Ordering::Relaxed) {
			return Err(ChecksumError::Cancelled);
		}
		let chunk = chunk?;
		accumulator.update(&chunk);
		if tracker.record(chunk.len() as u64) {
			report(job.index, tracker.state())?;
		}
	}

	let hex_digest = accumulator.finalize();
	report(job.index, tracker.finish(hex_digest.clone()))?;
	debug!("{}: {}", job.name, hex_digest);
	Ok(DigestResult {
		algorithm: job.name.clone(),
		hex_digest,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use hex_literal::hex;
	use indicatif::{InMemoryTerm, ProgressDrawTarget};
	use tempfile::NamedTempFile;

	const PHRASE: &[u8] =
		b"Jeder wackere Bayer vertilgt bequem zwo Pfund Kalbshaxen.";

	fn temp_with(contents: &[u8]) -> NamedTempFile {
		let mut file = NamedTempFile::new().unwrap();
		file.write_all(contents).unwrap();
		file.flush().unwrap();
		file
	}

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	fn live_renderer() -> (Renderer<Vec<u8>>, InMemoryTerm) {
		let term = InMemoryTerm::new(16, 160);
		let renderer = Renderer::live(
			ProgressDrawTarget::term_like(Box::new(term.clone())),
			None,
			false,
		);
		(renderer, term)
	}

	fn plain_output(renderer: Renderer<Vec<u8>>) -> String {
		String::from_utf8(renderer.into_inner().unwrap()).unwrap()
	}

	#[test]
	fn results_follow_request_order() {
		let file = temp_with(PHRASE);
		let (mut renderer, _term) = live_renderer();
		let results = run_all(
			file.path(),
			&names(&["sha256", "md5"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap();
		assert_eq!(results.len(), 2);
		assert_eq!(results[0].algorithm, "sha256");
		assert_eq!(results[1].algorithm, "md5");
		assert_eq!(
			results[0].hex_digest,
			hex::encode(<sha2::Sha256 as sha2::Digest>::digest(PHRASE))
		);
		assert_eq!(
			results[1].hex_digest,
			hex::encode(<md5::Md5 as md5::Digest>::digest(PHRASE))
		);
	}

	#[test]
	fn digests_match_reference_with_tiny_chunks() {
		use sha2::{Digest, Sha256};
		let data: Vec<u8> = (0..5000u32).map(|i| (i * 7) as u8).collect();
		let file = temp_with(&data);
		let options = ChecksumOptions {
			chunk_size: 3,
			..ChecksumOptions::default()
		};
		let (mut renderer, _term) = live_renderer();
		let results =
			run_all(file.path(), &names(&["sha256"]), &options, &mut renderer)
				.unwrap();
		assert_eq!(
			results[0].hex_digest,
			hex::encode(Sha256::digest(&data))
		);
	}

	#[test]
	fn empty_file_yields_empty_input_digests() {
		let file = temp_with(b"");
		let (mut renderer, term) = live_renderer();
		let results = run_all(
			file.path(),
			&names(&["md5", "sha1"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap();
		assert_eq!(
			results[0].hex_digest,
			hex::encode(hex!("d41d8cd98f00b204e9800998ecf8427e"))
		);
		assert_eq!(
			results[1].hex_digest,
			hex::encode(hex!("da39a3ee5e6b4b0d3255bfef95601890afd80709"))
		);
		let screen = term.contents();
		assert!(screen.contains("MD5: d41d8cd98f00b204e9800998ecf8427e"));
		assert!(screen.contains("SHA1: da39a3ee5e6b4b0d3255bfef95601890afd80709"));
	}

	#[test]
	fn missing_file_restores_cursor() {
		let dir = tempfile::tempdir().unwrap();
		let (mut renderer, _term) = live_renderer();
		let err = run_all(
			&dir.path().join("missing"),
			&names(&["sha256"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap_err();
		assert!(matches!(err, ChecksumError::Io { .. }));
		assert!(!renderer.cursor_hidden());
	}

	#[test]
	fn unsupported_algorithm_aborts_remaining_jobs() {
		let file = temp_with(PHRASE);
		let (mut renderer, term) = live_renderer();
		let err = run_all(
			file.path(),
			&names(&["md5", "not-a-real-algo", "sha1"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap_err();
		assert!(matches!(
			err,
			ChecksumError::UnsupportedAlgorithm(ref name) if name == "not-a-real-algo"
		));
		let screen = term.contents();
		assert!(screen.contains("MD5: "));
		assert!(screen.contains("SHA1 Progress: Queued"));
		assert!(!screen.contains("SHA1: "));
		assert!(!renderer.cursor_hidden());
	}

	#[test]
	fn plain_output_keeps_finished_jobs_when_a_later_one_fails() {
		let file = temp_with(PHRASE);
		let mut renderer = Renderer::plain(Vec::new(), false);
		let err = run_all(
			file.path(),
			&names(&["md5", "bogus"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap_err();
		assert!(matches!(err, ChecksumError::UnsupportedAlgorithm(_)));
		assert_eq!(
			plain_output(renderer),
			format!(
				"MD5: {}\n",
				hex::encode(<md5::Md5 as md5::Digest>::digest(PHRASE))
			)
		);
	}

	#[test]
	fn plain_output_follows_request_order() {
		let file = temp_with(b"");
		let mut renderer = Renderer::plain(Vec::new(), false);
		run_all(
			file.path(),
			&names(&["sha1", "md5"]),
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap();
		assert_eq!(
			plain_output(renderer),
			"SHA1: da39a3ee5e6b4b0d3255bfef95601890afd80709\n\
			 MD5: d41d8cd98f00b204e9800998ecf8427e\n"
		);
	}

	#[test]
	fn empty_request_is_rejected() {
		let file = temp_with(PHRASE);
		let mut renderer = Renderer::plain(Vec::new(), false);
		let err = run_all(
			file.path(),
			&[],
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap_err();
		assert!(matches!(err, ChecksumError::NoAlgorithms));
		assert_eq!(renderer.draws(), 0);
		assert!(plain_output(renderer).is_empty());
	}

	#[test]
	fn fast_chunks_are_coalesced_but_final_state_is_drawn() {
		let data = vec![0x5a; 1000];
		let file = temp_with(&data);
		let options = ChecksumOptions {
			chunk_size: 1,
			throttle: Duration::from_secs(60),
			..ChecksumOptions::default()
		};
		let (mut renderer, term) = live_renderer();
		run_all(file.path(), &names(&["md5"]), &options, &mut renderer)
			.unwrap();
		// queued, start, first chunk, finish and the closing repaint
		assert!(renderer.draws() < 10);
		assert!(term.contents().contains("MD5: "));
	}

	#[test]
	fn parallel_schedule_matches_sequential() {
		let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
		let file = temp_with(&data);
		let requested = names(&["sha512", "md5", "blake3", "sha1"]);

		let (mut renderer, _term) = live_renderer();
		let sequential = run_all(
			file.path(),
			&requested,
			&ChecksumOptions::default(),
			&mut renderer,
		)
		.unwrap();

		let options = ChecksumOptions {
			chunk_size: 4096,
			schedule: Schedule::Parallel,
			..ChecksumOptions::default()
		};
		let (mut renderer, _term) = live_renderer();
		let parallel =
			run_all(file.path(), &requested, &options, &mut renderer).unwrap();
		assert_eq!(sequential, parallel);
	}

	#[test]
	fn parallel_failure_reports_the_failing_job() {
		let data = vec![0x11; 4 << 20];
		let file = temp_with(&data);
		let options = ChecksumOptions {
			chunk_size: 64,
			schedule: Schedule::Parallel,
			..ChecksumOptions::default()
		};
		let (mut renderer, _term) = live_renderer();
		let err = run_all(
			file.path(),
			&names(&["sha256", "bogus", "sha512"]),
			&options,
			&mut renderer,
		)
		.unwrap_err();
		assert!(matches!(
			err,
			ChecksumError::UnsupportedAlgorithm(ref name) if name == "bogus"
		));
		assert!(!renderer.cursor_hidden());
	}

	#[test]
	fn raised_abort_flag_stops_job_at_next_chunk() {
		let file = temp_with(PHRASE);
		let job = AlgorithmJob {
			name: "sha256".into(),
			index: 0,
		};
		let abort = AtomicBool::new(true);
		let mut reports = 0;
		let err = checksum_job(
			file.path(),
			&job,
			&ChecksumOptions::default(),
			&abort,
			&mut |_, _| {
				reports += 1;
				Ok(())
			},
		)
		.unwrap_err();
		assert!(matches!(err, ChecksumError::Cancelled));
		assert_eq!(reports, 1);
	}
}
