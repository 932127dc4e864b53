/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Pure arithmetic helpers over exact decimal volumes.
//!
//! Free functions so they can be used on any slice of volumes, not only on
//! the per-teacher table.

use rust_decimal::Decimal;

/// Arithmetic mean.  `None` for an empty slice.
pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().copied().sum();
    total.checked_div(Decimal::from(values.len()))
}

/// Population variance `Σ(x − μ)² / n`.  `None` for an empty slice.
pub fn variance(values: &[Decimal]) -> Option<Decimal> {
    let mu = mean(values)?;
    let squares: Decimal = values
        .iter()
        .map(|&v| {
            let d = v - mu;
            d * d
        })
        .sum();
    squares.checked_div(Decimal::from(values.len()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
