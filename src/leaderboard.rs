use serde::Serialize;

use crate::session::Participant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub id: String,
    pub name: String,
    pub score: u32,
}

/// Pure projection of a roster snapshot: score descending, ties keep roster
/// order (stable sort), truncated to `top_n`. Never touches the roster.
pub fn project(roster: &[Participant], top_n: usize) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<&Participant> = roster.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked
        .into_iter()
        .take(top_n)
        .map(|p| LeaderboardEntry {
            id: p.id.clone(),
            name: p.name.clone(),
            score: p.score,
        })
        .collect()
}
