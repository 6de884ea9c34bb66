//! Risk adjustment: cumulative probability of success
//!
//! The product of all phase PoS values is the terminal PoS; the product
//! over phases already started by a given year is the cumulative PoS at
//! that year. Phases not yet started do not reduce the cumulative PoS.

use crate::asset::PhaseInput;

/// Cumulative PoS at a calendar year: product of PoS over phases with
/// `start_year <= year`, in stable start-year order
pub fn cumulative_pos(phases: &[PhaseInput], year: i32) -> f64 {
    let mut sorted: Vec<&PhaseInput> = phases.iter().collect();
    sorted.sort_by(|a, b| {
        a.start_year
            .partial_cmp(&b.start_year)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
        .iter()
        .filter(|pi| (year as f64) >= pi.start_year)
        .map(|pi| pi.probability_of_success)
        .product()
}

/// Cumulative PoS over phases already sorted by start year
///
/// Used on the hot path so the sort happens once per evaluation, not once
/// per year.
pub(crate) fn cumulative_pos_sorted(sorted_phases: &[PhaseInput], year: i32) -> f64 {
    sorted_phases
        .iter()
        .filter(|pi| (year as f64) >= pi.start_year)
        .map(|pi| pi.probability_of_success)
        .product()
}

/// Terminal PoS: product of every phase's PoS
pub fn terminal_pos(phases: &[PhaseInput]) -> f64 {
    phases.iter().map(|pi| pi.probability_of_success).product()
}
