/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use edt_allocator::config::CatalogManager;
use edt_allocator::grid::GridState;
use edt_allocator::scheduler::{AllocationError, AllocationReport, SessionAllocator};
use edt_allocator::volume::{self, MeanDenominator};

// ── CLI argument definition ───────────────────────────────────────────────────

/// Timetable session generator.
///
/// Example:
///   edt-allocator --catalog catalog.yaml --subject Algorithms --replace \
///                 --output sessions.yaml
#[derive(Debug, Parser)]
#[command(
    name = "edt-allocator",
    about = "Generate and assign timetable sessions from a YAML catalog",
    long_about = None,
)]
struct Cli {
    /// Path to the YAML catalog (week, subjects, teachers, rooms, sessions).
    #[arg(short = 'c', long = "catalog")]
    catalog: PathBuf,

    /// Subject to schedule; repeat for several.  All catalog subjects when absent.
    #[arg(short = 's', long = "subject")]
    subjects: Vec<String>,

    /// Remove the subjects' existing sessions before scheduling them again.
    #[arg(long, default_value_t = false)]
    replace: bool,

    /// Skip the teacher assignment phase.
    #[arg(long = "no-teachers", default_value_t = false)]
    no_teachers: bool,

    /// Skip the room assignment phase.
    #[arg(long = "no-rooms", default_value_t = false)]
    no_rooms: bool,

    /// Rank teachers by volume only.
    #[arg(long = "ignore-wishes", default_value_t = false)]
    ignore_wishes: bool,

    /// Draft mode: take the first slot and candidates even if they collide.
    #[arg(long = "allow-conflicts", default_value_t = false)]
    allow_conflicts: bool,

    /// Leave forfait-only teachers out of the VHM denominator.
    #[arg(long = "exclude-forfait-only", default_value_t = false)]
    exclude_forfait_only: bool,

    /// Write every session of the resulting grid to this YAML file.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Level is controlled by the RUST_LOG env-var (e.g. RUST_LOG=debug).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    info!(
        catalog              = %cli.catalog.display(),
        subjects             = ?cli.subjects,
        replace              = cli.replace,
        no_teachers          = cli.no_teachers,
        no_rooms             = cli.no_rooms,
        ignore_wishes        = cli.ignore_wishes,
        allow_conflicts      = cli.allow_conflicts,
        exclude_forfait_only = cli.exclude_forfait_only,
        "Configuration"
    );

    // ── Load catalog ──────────────────────────────────────────────────────────
    let mut manager = CatalogManager::new();
    if let Err(e) = manager.load_from_file(&cli.catalog) {
        error!("Failed to load catalog: {:#}", e);
        process::exit(1);
    }

    // Command-line flags only ever switch phases off.
    let mut policy = manager.policy();
    policy.assign_teachers &= !cli.no_teachers;
    policy.assign_rooms &= !cli.no_rooms;
    policy.respect_wishes &= !cli.ignore_wishes;
    policy.avoid_conflicts &= !cli.allow_conflicts;

    let denominator = if cli.exclude_forfait_only {
        MeanDenominator::ExcludeForfaitOnly
    } else {
        manager.denominator()
    };

    let mut grid = manager.build_grid();
    let catalog = Arc::new(manager.into_catalog());
    let allocator = SessionAllocator::new(Arc::clone(&catalog)).with_denominator(denominator);

    // ── Schedule ──────────────────────────────────────────────────────────────
    let subjects: Vec<String> = if cli.subjects.is_empty() {
        catalog.subjects.iter().map(|s| s.name.clone()).collect()
    } else {
        cli.subjects.clone()
    };

    let mut failed = 0usize;
    for name in &subjects {
        if cli.replace {
            let removed = grid.remove_subject(name);
            if !removed.is_empty() {
                info!(subject = %name, removed = removed.len(), "removed existing sessions");
            }
        }
        match allocator.auto_generate_subject_sessions(&mut grid, name, &policy) {
            Ok(report) => log_report(&report),
            Err(e) => {
                failed += 1;
                log_error(&e);
            }
        }
    }

    // ── Load table and audit ──────────────────────────────────────────────────
    info!(vhm = ?allocator.mean_volume(), "Teacher loads:");
    for row in volume::load_table(&catalog, grid.sessions(), denominator) {
        info!(
            "  [{name}]  taught={taught}  forfait={forfait}  supp={supp}  total={total}  deviation={dev}",
            name = row.name,
            taught = row.taught,
            forfait = row.forfait,
            supp = row.supplementary,
            total = row.total,
            dev = row
                .deviation
                .map_or_else(|| "n/a".to_string(), |d| d.to_string()),
        );
    }

    let conflicts = grid.conflicts();
    if conflicts.is_empty() {
        info!(sessions = grid.len(), "grid is conflict-free");
    } else {
        warn!(count = conflicts.len(), "grid contains conflicts:");
        for c in &conflicts {
            warn!(
                "  {:?} '{}' at {} shared by {:?}",
                c.kind, c.resource, c.slot, c.sessions
            );
        }
    }

    // ── Output ────────────────────────────────────────────────────────────────
    if let Some(path) = &cli.output {
        if let Err(e) = write_sessions(path, &grid) {
            error!("Failed to write sessions: {:#}", e);
            process::exit(1);
        }
        info!(path = %path.display(), sessions = grid.len(), "sessions written");
    }

    if failed > 0 {
        warn!(failed, "some subjects could not be scheduled");
    }
}

fn log_report(report: &AllocationReport) {
    let summary = report.summary();
    info!(
        subject = %report.subject,
        placed = summary.placed,
        partial = summary.partial,
        unplaced = summary.unplaced,
        "✓ subject scheduled"
    );
}

fn log_error(e: &AllocationError) {
    error!("✗ {}", e);
}

fn write_sessions(path: &Path, grid: &GridState) -> anyhow::Result<()> {
    let sessions: Vec<_> = grid.sessions().collect();
    let yaml = serde_yaml::to_string(&sessions).context("Failed to serialise sessions")?;
    std::fs::write(path, yaml)
        .with_context(|| format!("Cannot write sessions file: {}", path.display()))
}
