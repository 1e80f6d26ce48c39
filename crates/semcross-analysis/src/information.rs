//! Information Theory component (spec §4.7).
//!
//! A crossing collapses `N` distinct raise-site "meanings" onto a
//! shared `except` clause. `semantic_entropy_bits` is how many bits of
//! meaning the raise sites carry; `handler_discrimination_bits` is how
//! much of that a handler's observed behavior can still tell apart;
//! the gap between the two is `information_loss_bits`.

use std::collections::HashSet;

use serde::Serialize;

use semcross_python::{BodySummary, HandlerSite, RaiseSite};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InformationProfile {
    pub semantic_entropy_bits: f64,
    pub handler_discrimination_bits: f64,
    pub information_loss_bits: f64,
    pub collapse_ratio: f64,
}

/// Compute the information profile for one crossing's raise/handler
/// sites, per spec §4.7.
pub fn profile(raise_sites: &[RaiseSite], handler_sites: &[HandlerSite]) -> InformationProfile {
    let semantic_entropy_bits = semantic_entropy(raise_sites);
    let handler_discrimination_bits = if handler_sites.is_empty() {
        semantic_entropy_bits
    } else {
        let mean_capacity: f64 = handler_sites.iter().map(|h| capacity(h)).sum::<f64>() / handler_sites.len() as f64;
        semantic_entropy_bits * mean_capacity
    };
    let information_loss_bits = semantic_entropy_bits - handler_discrimination_bits;
    let collapse_ratio = if semantic_entropy_bits > 0.0 {
        information_loss_bits / semantic_entropy_bits
    } else {
        0.0
    };

    InformationProfile {
        semantic_entropy_bits,
        handler_discrimination_bits,
        information_loss_bits,
        collapse_ratio,
    }
}

/// `log2(|distinct (function, class) origins|)` when that count is at
/// least 2, else 0 — a single origin (or none) carries no ambiguity.
fn semantic_entropy(raise_sites: &[RaiseSite]) -> f64 {
    let origins: HashSet<(String, String)> = raise_sites.iter().map(RaiseSite::origin).collect();
    if origins.len() >= 2 {
        (origins.len() as f64).log2()
    } else {
        0.0
    }
}

/// How much of a raise site's meaning a handler's body preserves:
/// a re-raiser loses nothing, a handler that both returns a value and
/// assigns a default keeps some signal, a pure return/assign collapses
/// everything, and anything else (log-and-continue, bare `pass`) keeps
/// a quarter bit of distinguishing power.
fn capacity(handler: &HandlerSite) -> f64 {
    if handler.re_raises {
        1.0
    } else if handler.returns_value && handler.assigns_default {
        0.5
    } else if handler.returns_value || handler.assigns_default {
        0.0
    } else {
        match handler.body_summary {
            BodySummary::Other | BodySummary::Log | BodySummary::Pass => 0.25,
            _ => 0.0,
        }
    }
}
