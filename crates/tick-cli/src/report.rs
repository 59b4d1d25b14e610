//! Text formatting for snapshots, pending requests and drain outcomes.
//! The core never formats; everything user-visible is rendered here.

use serde::Serialize;
use tick_core::{
    DeltaRecord, DrainMode, DrainReport, Outcome, ReclaimRequest, StatusSnapshot, Tracked,
};

/// Pending request as shown to users.
#[derive(Serialize)]
pub struct PendingView {
    pub handle: u64,
    pub label: String,
    pub score: f64,
    pub weight: f64,
    pub ref_count: u32,
}

impl PendingView {
    pub fn from_request<T: std::fmt::Display>(req: &ReclaimRequest<Tracked<T>>) -> Self {
        Self {
            handle: req.handle.get(),
            label: req.resource.value().to_string(),
            score: req.score,
            weight: req.weight,
            ref_count: req.ref_count,
        }
    }
}

pub fn mode_name(mode: DrainMode) -> &'static str {
    match mode {
        DrainMode::Deferring => "deferring",
        DrainMode::Draining => "draining",
    }
}

pub fn print_status(snap: &StatusSnapshot) {
    println!("count:          {}", snap.count);
    println!("capacity:       {}", snap.capacity);
    println!("pressure:       {:.2}", snap.pressure);
    println!("mode:           {}", mode_name(snap.mode));
    println!("live handles:   {}", snap.live_handles);
    println!("released:       {}", snap.released_total);
    println!("double release: {}", snap.double_release_total);
    println!("cascades:       {}", snap.cascades);
}

pub fn print_pending(pending: &[PendingView]) {
    if pending.is_empty() {
        println!("pending: (none)");
        return;
    }
    println!("pending (head first):");
    for p in pending {
        println!(
            "  {} #{} score={:.4} weight={} refs={}",
            p.label, p.handle, p.score, p.weight, p.ref_count
        );
    }
}

pub fn print_outcomes(outcomes: &[Outcome]) {
    for outcome in outcomes {
        match outcome {
            Outcome::Released { handle, score } => {
                println!("  released {handle} score={score:.4}");
            }
            Outcome::DoubleReleaseAttempted { handle, score } => {
                println!("  DOUBLE RELEASE {handle} score={score:.4} (skipped)");
            }
        }
    }
    let report = DrainReport::from(outcomes);
    println!(
        "drained: released={}, double_release={}",
        report.released, report.double_release_attempted
    );
}

pub fn print_record(record: &DeltaRecord) {
    let fmt_vec = |v: &[f64]| {
        v.iter()
            .map(|x| format!("{x:.4}"))
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("pair:       {} -> {}", record.from_seq, record.to_seq);
    println!("deltas:     [{}]", fmt_vec(&record.deltas));
    println!("magnitude:  {:.6}", record.magnitude);
    println!("directions: [{}]", fmt_vec(&record.directions));
    println!("phase:      {:.6}", record.phase);
    println!("harmonic:   {:.6}", record.harmonic_factor);
    println!("observed:   {}", record.observed);
}
