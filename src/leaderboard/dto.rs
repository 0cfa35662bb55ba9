use serde::Serialize;

use super::repo_types::StandingRow;

#[derive(Debug, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub points: i32,
    pub correct_predictions: i32,
    pub wrong_predictions: i32,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Public name: display name, else the email's local part. Emails are never exposed.
pub fn public_name(display_name: Option<&str>, email: &str) -> String {
    display_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| email.split('@').next().filter(|l| !l.is_empty()))
        .unwrap_or("Anonymous")
        .to_string()
}

/// Rows must already be in leaderboard order.
pub fn rank(rows: Vec<StandingRow>) -> Vec<LeaderboardEntry> {
    rows.into_iter()
        .enumerate()
        .map(|(i, r)| LeaderboardEntry {
            rank: i + 1,
            username: public_name(r.display_name.as_deref(), &r.email),
            points: r.points,
            correct_predictions: r.correct_predictions,
            wrong_predictions: r.wrong_predictions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(email: &str, display_name: Option<&str>, points: i32) -> StandingRow {
        StandingRow {
            email: email.into(),
            display_name: display_name.map(str::to_string),
            points,
            correct_predictions: 0,
            wrong_predictions: 0,
        }
    }

    #[test]
    fn names_fall_back_to_email_local_part() {
        assert_eq!(public_name(Some("Virat"), "v@example.com"), "Virat");
        assert_eq!(public_name(Some("  "), "rohit@example.com"), "rohit");
        assert_eq!(public_name(None, "@example.com"), "Anonymous");
    }

    #[test]
    fn ranks_start_at_one_in_row_order() {
        let entries = rank(vec![
            row("a@example.com", Some("Top"), 30),
            row("b@example.com", None, 8),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].rank, 1);
        assert_eq!(entries[0].username, "Top");
        assert_eq!(entries[1].rank, 2);
        assert_eq!(entries[1].username, "b");
        assert_eq!(entries[1].points, 8);

        let json = serde_json::to_string(&LeaderboardResponse { leaderboard: entries }).unwrap();
        assert!(!json.contains("@example.com"));
    }
}
