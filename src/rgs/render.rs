// SPDX-License-Identifier: MIT OR Apache-2.0
// Project: rustgensum
// File: render.rs
// Author: Volker Schwaberow <volker@schwaberow.de>
// Copyright (c) 2022 Volker Schwaberow

use crate::rgs::error::{ChecksumError, Result};
use crate::rgs::progress::{JobStatus, ProgressState};
use colored::Colorize;
use console::Term;
use indicatif::{
	MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle,
};
use std::io::Write;
use std::ops::{Deref, DerefMut};

enum Surface<W: Write> {
	/// One bar per job, repainted together by the `MultiProgress`.
	Live {
		multi: MultiProgress,
		bars: Vec<ProgressBar>,
	},
	/// Finished lines only, in request order, without escape sequences.
	Plain { out: W, printed: usize },
}

/// Sole writer of the progress block.
pub struct Renderer<W: Write> {
	surface: Surface<W>,
	cursor: Option<Term>,
	cursor_hidden: bool,
	color: bool,
	draws: usize,
}

fn line_style() -> ProgressStyle {
	ProgressStyle::with_template("{msg}")
		.unwrap_or_else(|_| ProgressStyle::default_bar())
}

fn paint(state: &ProgressState, color: bool) -> String {
	if !color {
		return state.display_line.clone();
	}
	let label = state.label.blue();
	match (state.status, &state.digest) {
		(JobStatus::Done, Some(digest)) => {
			format!("{}: {}", label, digest.green())
		}
		(JobStatus::Queued, _) => {
			format!("{} Progress: {}", label, "Queued".yellow())
		}
		_ => format!(
			"{} Progress: {}%",
			label,
			format!("{:.2}", state.percentage).green()
		),
	}
}

impl<W: Write> Renderer<W> {
	/// Repaint the block in place on `target`. `cursor` is the terminal
	/// whose cursor is hidden while a session is open.
	pub fn live(
		target: ProgressDrawTarget,
		cursor: Option<Term>,
		color: bool,
	) -> Self {
		Self {
			surface: Surface::Live {
				multi: MultiProgress::with_draw_target(target),
				bars: Vec::new(),
			},
			cursor,
			cursor_hidden: false,
			color,
			draws: 0,
		}
	}

	pub fn plain(out: W, color: bool) -> Self {
		Self {
			surface: Surface::Plain { out, printed: 0 },
			cursor: None,
			cursor_hidden: false,
			color,
			draws: 0,
		}
	}

	/// Number of snapshots handed to the renderer so far.
	pub fn draws(&self) -> usize {
		self.draws
	}

	pub fn cursor_hidden(&self) -> bool {
		self.cursor_hidden
	}

	/// The plain output sink, if this renderer has one.
	pub fn into_inner(self) -> Option<W> {
		match self.surface {
			Surface::Plain { out, .. } => Some(out),
			Surface::Live { .. } => None,
		}
	}

	/// Hide the cursor for the lifetime of the returned guard.
	pub fn session(&mut self) -> Result<CursorGuard<'_, W>> {
		if let Some(term) = &self.cursor {
			term.hide_cursor().map_err(ChecksumError::Render)?;
		}
		self.cursor_hidden = true;
		Ok(CursorGuard { renderer: self })
	}

	pub fn draw(&mut self, snapshot: &[ProgressState]) -> Result<()> {
		self.draws += 1;
		let color = self.color;
		match &mut self.surface {
			Surface::Live { multi, bars } => {
				while bars.len() < snapshot.len() {
					let bar = ProgressBar::new(100).with_style(line_style());
					bars.push(multi.add(bar));
				}
				for (bar, state) in bars.iter().zip(snapshot) {
					if bar.is_finished() {
						continue;
					}
					let line = paint(state, color);
					if state.status == JobStatus::Done {
						bar.finish_with_message(line);
					} else {
						bar.set_position(state.percentage as u64);
						bar.set_message(line);
					}
				}
				Ok(())
			}
			Surface::Plain { out, printed } => {
				let mut block = String::new();
				while let Some(state) = snapshot.get(*printed) {
					if state.status != JobStatus::Done {
						break;
					}
					block.push_str(&paint(state, color));
					block.push('\n');
					*printed += 1;
				}
				write_block(out, &block)
			}
		}
	}

	/// Leave the last known state of every job on screen. Called on success
	/// and failure alike.
	pub fn conclude(&mut self, snapshot: &[ProgressState]) -> Result<()> {
		self.draw(snapshot)?;
		let color = self.color;
		match &mut self.surface {
			Surface::Live { bars, .. } => {
				for bar in bars.iter().filter(|bar| !bar.is_finished()) {
					bar.abandon();
				}
				Ok(())
			}
			Surface::Plain { out, printed } => {
				let block: String = snapshot
					.iter()
					.skip(*printed)
					.filter(|state| state.status == JobStatus::Done)
					.map(|state| paint(state, color) + "\n")
					.collect();
				*printed = snapshot.len();
				write_block(out, &block)
			}
		}
	}
}

fn write_block<W: Write>(out: &mut W, block: &str) -> Result<()> {
	if block.is_empty() {
		return Ok(());
	}
	out.write_all(block.as_bytes())
		.and_then(|_| out.flush())
		.map_err(ChecksumError::Render)
}

/// Restores the cursor when dropped, on success and error paths alike.
pub struct CursorGuard<'a, W: Write> {
	renderer: &'a mut Renderer<W>,
}

impl<W: Write> Deref for CursorGuard<'_, W> {
	type Target = Renderer<W>;

	fn deref(&self) -> &Self::Target {
		self.renderer
	}
}

impl<W: Write> DerefMut for CursorGuard<'_, W> {
	fn deref_mut(&mut self) -> &mut Self::Target {
		self.renderer
	}
}

impl<W: Write> Drop for CursorGuard<'_, W> {
	fn drop(&mut self) {
		if let Some(term) = &self.renderer.cursor {
			let _ = term.show_cursor();
		}
		self.renderer.cursor_hidden = false;
	}
}
