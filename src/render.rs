use crate::leaderboard::{AttemptView, Snapshot, StandingEntry};

/// Renders a snapshot as the text the `watch` and `show` commands print.
pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let event = &snapshot.event;
    out.push_str(&format!(
        "{} | {} | {} | {}\n",
        event.date, event.stage, event.location, event.class
    ));
    if snapshot.leaderboard.is_empty() {
        out.push_str("No sessions recorded for this day.\n");
        return out;
    }
    out.push_str(&format!(
        "{:>3}  {:<20} {:>12} {:>12} {:>8}\n",
        "Pos", "Driver", "Time", "Diff", "Attempts"
    ));
    for entry in &snapshot.leaderboard {
        out.push_str(&format!(
            "{:>3}  {:<20} {:>12} {:>12} {:>8}\n",
            entry.position, entry.name, entry.time, entry.diff, entry.attempts
        ));
    }
    out
}

pub fn render_attempts(driver: &str, attempts: &[AttemptView]) -> String {
    let mut out = format!("Attempts for {driver}:\n");
    if attempts.is_empty() {
        out.push_str("No attempts recorded.\n");
        return out;
    }
    for (index, attempt) in attempts.iter().enumerate() {
        out.push_str(&format!(
            "{:>3}  {:>12} {:<10} {:<20} {}\n",
            index + 1,
            attempt.time,
            attempt.status,
            attempt.vehicle,
            attempt.vehicle_class
        ));
    }
    out
}

pub fn render_standings(standings: &[StandingEntry]) -> String {
    let mut out = String::from("Championship standings:\n");
    if standings.is_empty() {
        out.push_str("No results recorded.\n");
        return out;
    }
    for entry in standings {
        out.push_str(&format!(
            "{:>3}  {:<20} {:>6}\n",
            entry.position, entry.name, entry.points
        ));
    }
    out
}
