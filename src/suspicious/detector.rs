//! Multi-account correlation over signup fingerprints and prediction history.
//!
//! Two signals are checked, in this order:
//!
//! 1. accounts created from the same IP that picked different teams on the same match;
//! 2. accounts created within [`PROXIMITY_RADIUS_M`] of each other that picked different
//!    teams on at least one common match.
//!
//! [`detect_suspicious_activity`] only computes what should be flagged. Writing the flags
//! back is left to [`super::services::run_detection_pass`].

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::geo::Coordinates;
use super::repo_types::{PredictionRecord, SignupProfile};

/// Pairs at or under this distance count as the same signup location.
pub const PROXIMITY_RADIUS_M: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    SharedIp,
    NearbySignup,
}

/// One user implicated by one opposing bucket (shared IP) or one pair (nearby signup).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub user_id: Uuid,
    pub email: String,
    pub kind: ViolationKind,
    /// Text persisted as the user's flag reason.
    pub reason: String,
    /// Short form shown in the admin report.
    pub summary: String,
}

/// Flag write for one user. There is at most one per user per pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlagUpdate {
    pub user_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedExample {
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectionResult {
    pub ip_violations: usize,
    pub coord_violations: usize,
    pub violations: Vec<Violation>,
    /// Ordered by first implication; `reason` is the last one recorded for that user.
    pub flags: Vec<FlagUpdate>,
}

impl DetectionResult {
    pub fn total_violations(&self) -> usize {
        self.ip_violations + self.coord_violations
    }

    pub fn is_clean(&self) -> bool {
        self.flags.is_empty()
    }

    /// Report rows de-duplicated by email. An email keeps its first position and
    /// takes the latest summary recorded for it.
    pub fn flagged_examples(&self, limit: usize) -> Vec<FlaggedExample> {
        let mut out: Vec<FlaggedExample> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for v in &self.violations {
            match index.get(v.email.as_str()) {
                Some(&i) => out[i].reason = v.summary.clone(),
                None => {
                    index.insert(v.email.as_str(), out.len());
                    out.push(FlaggedExample {
                        email: v.email.clone(),
                        reason: v.summary.clone(),
                    });
                }
            }
        }
        out.truncate(limit);
        out
    }
}

#[derive(Default)]
struct Collector {
    result: DetectionResult,
    flag_index: HashMap<Uuid, usize>,
}

impl Collector {
    fn record(&mut self, user: &SignupProfile, kind: ViolationKind, reason: String, summary: String) {
        match kind {
            ViolationKind::SharedIp => self.result.ip_violations += 1,
            ViolationKind::NearbySignup => self.result.coord_violations += 1,
        }

        match self.flag_index.get(&user.id) {
            Some(&i) => self.result.flags[i].reason = reason.clone(),
            None => {
                self.flag_index.insert(user.id, self.result.flags.len());
                self.result.flags.push(FlagUpdate {
                    user_id: user.id,
                    reason: reason.clone(),
                });
            }
        }

        self.result.violations.push(Violation {
            user_id: user.id,
            email: user.email.clone(),
            kind,
            reason,
            summary,
        });
    }
}

/// Runs both checks over a snapshot of users and predictions.
///
/// Deterministic for a given input: IP groups and match buckets are visited in sorted
/// key order, users in input order.
pub fn detect_suspicious_activity(
    users: &[SignupProfile],
    predictions: &[PredictionRecord],
) -> DetectionResult {
    let mut by_user: HashMap<Uuid, Vec<&PredictionRecord>> = HashMap::new();
    for p in predictions {
        by_user.entry(p.user_id).or_default().push(p);
    }

    let mut collector = Collector::default();
    shared_ip_collusion(users, &by_user, &mut collector);
    nearby_signup_collusion(users, &by_user, &mut collector);
    collector.result
}

fn shared_ip_collusion(
    users: &[SignupProfile],
    by_user: &HashMap<Uuid, Vec<&PredictionRecord>>,
    out: &mut Collector,
) {
    let mut groups: BTreeMap<&str, Vec<&SignupProfile>> = BTreeMap::new();
    for u in users {
        if let Some(ip) = u.signup_ip.as_deref().filter(|ip| !ip.is_empty()) {
            groups.entry(ip).or_default().push(u);
        }
    }

    for (ip, members) in &groups {
        if members.len() < 2 {
            continue;
        }

        let mut by_match: BTreeMap<Uuid, Vec<&PredictionRecord>> = BTreeMap::new();
        for m in members {
            for p in by_user.get(&m.id).into_iter().flatten() {
                by_match.entry(p.match_id).or_default().push(*p);
            }
        }

        for preds in by_match.values() {
            if preds.len() < 2 {
                continue;
            }
            let teams: HashSet<&str> = preds.iter().map(|p| p.predicted_team.as_str()).collect();
            if teams.len() < 2 {
                continue;
            }

            let mut seen = HashSet::new();
            for p in preds {
                if !seen.insert(p.user_id) {
                    continue;
                }
                if let Some(user) = members.iter().find(|u| u.id == p.user_id) {
                    out.record(
                        user,
                        ViolationKind::SharedIp,
                        format!("Same IP ({ip}) with opposite predictions on match"),
                        format!("Same IP ({ip})"),
                    );
                }
            }
        }
    }
}

fn nearby_signup_collusion(
    users: &[SignupProfile],
    by_user: &HashMap<Uuid, Vec<&PredictionRecord>>,
    out: &mut Collector,
) {
    let located: Vec<(&SignupProfile, Coordinates)> = users
        .iter()
        .filter_map(|u| u.signup_coords.map(|c| (u, c)))
        .collect();
    let none: Vec<&PredictionRecord> = Vec::new();

    for i in 0..located.len() {
        for j in (i + 1)..located.len() {
            let (first, first_at) = located[i];
            let (second, second_at) = located[j];

            let distance = first_at.distance_to(&second_at);
            if !within_proximity(distance) {
                continue;
            }

            let first_preds = by_user.get(&first.id).unwrap_or(&none);
            let second_preds = by_user.get(&second.id).unwrap_or(&none);
            if !has_opposing_pick(first_preds, second_preds) {
                continue;
            }

            let meters = distance.round() as i64;
            for user in [first, second] {
                out.record(
                    user,
                    ViolationKind::NearbySignup,
                    format!("Nearby location ({meters}m) with opposite predictions"),
                    format!("Nearby ({meters}m)"),
                );
            }
        }
    }
}

fn within_proximity(distance_m: f64) -> bool {
    distance_m <= PROXIMITY_RADIUS_M
}

/// True on the first match where the two users picked different teams.
fn has_opposing_pick(first: &[&PredictionRecord], second: &[&PredictionRecord]) -> bool {
    first.iter().any(|p1| {
        second
            .iter()
            .any(|p2| p2.match_id == p1.match_id && p2.predicted_team != p1.predicted_team)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str, ip: Option<&str>, coords: Option<(f64, f64)>) -> SignupProfile {
        SignupProfile {
            id: Uuid::new_v4(),
            email: email.into(),
            signup_ip: ip.map(str::to_string),
            signup_coords: coords.map(|(lat, lng)| Coordinates::new(lat, lng)),
        }
    }

    fn pick(user: &SignupProfile, match_id: Uuid, team: &str) -> PredictionRecord {
        PredictionRecord {
            user_id: user.id,
            match_id,
            predicted_team: team.into(),
        }
    }

    fn flagged_ids(result: &DetectionResult) -> HashSet<Uuid> {
        result.flags.iter().map(|f| f.user_id).collect()
    }

    #[test]
    fn shared_ip_with_opposite_picks_flags_both() {
        let a = user("a@example.com", Some("203.0.113.9"), None);
        let b = user("b@example.com", Some("203.0.113.9"), None);
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "Pakistan")];

        let result = detect_suspicious_activity(&[a.clone(), b.clone()], &preds);

        assert_eq!(result.ip_violations, 2);
        assert_eq!(result.coord_violations, 0);
        assert_eq!(result.total_violations(), 2);
        assert_eq!(flagged_ids(&result), HashSet::from([a.id, b.id]));
        for f in &result.flags {
            assert!(f.reason.contains("203.0.113.9"), "reason: {}", f.reason);
        }
    }

    #[test]
    fn shared_ip_with_same_picks_is_clean() {
        let e = user("e@example.com", Some("198.51.100.7"), None);
        let f = user("f@example.com", Some("198.51.100.7"), None);
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();
        let preds = vec![
            pick(&e, m1, "India"),
            pick(&f, m1, "India"),
            pick(&e, m2, "Australia"),
            pick(&f, m2, "Australia"),
        ];

        let result = detect_suspicious_activity(&[e, f], &preds);
        assert!(result.is_clean());
        assert_eq!(result.total_violations(), 0);
    }

    #[test]
    fn whole_bucket_is_implicated_once_teams_differ() {
        let ip = Some("192.0.2.1");
        let a = user("a@example.com", ip, None);
        let b = user("b@example.com", ip, None);
        let c = user("c@example.com", ip, None);
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "India"), pick(&c, m, "England")];

        let result = detect_suspicious_activity(&[a.clone(), b.clone(), c.clone()], &preds);
        assert_eq!(result.ip_violations, 3);
        assert_eq!(flagged_ids(&result), HashSet::from([a.id, b.id, c.id]));
    }

    #[test]
    fn empty_or_missing_ip_is_not_grouped() {
        let a = user("a@example.com", Some(""), None);
        let b = user("b@example.com", Some(""), None);
        let c = user("c@example.com", None, None);
        let d = user("d@example.com", None, None);
        let m = Uuid::new_v4();
        let preds = vec![
            pick(&a, m, "India"),
            pick(&b, m, "Pakistan"),
            pick(&c, m, "India"),
            pick(&d, m, "Pakistan"),
        ];

        assert!(detect_suspicious_activity(&[a, b, c, d], &preds).is_clean());
    }

    #[test]
    fn one_flag_per_user_across_buckets() {
        let a = user("a@example.com", Some("203.0.113.9"), None);
        let b = user("b@example.com", Some("203.0.113.9"), None);
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();
        let preds = vec![
            pick(&a, m1, "India"),
            pick(&b, m1, "Pakistan"),
            pick(&a, m2, "Sri Lanka"),
            pick(&b, m2, "Bangladesh"),
        ];

        let result = detect_suspicious_activity(&[a, b], &preds);
        assert_eq!(result.ip_violations, 4);
        assert_eq!(result.flags.len(), 2);
    }

    #[test]
    fn nearby_signups_with_opposite_picks_are_flagged() {
        let c = user("c@example.com", None, Some((28.6139, 77.2090)));
        let d = user("d@example.com", None, Some((28.6140, 77.2091)));
        let n = Uuid::new_v4();
        let preds = vec![pick(&c, n, "India"), pick(&d, n, "Pakistan")];

        let result = detect_suspicious_activity(&[c.clone(), d.clone()], &preds);

        assert_eq!(result.ip_violations, 0);
        assert_eq!(result.coord_violations, 2);
        assert_eq!(flagged_ids(&result), HashSet::from([c.id, d.id]));

        let meters = c
            .signup_coords
            .unwrap()
            .distance_to(&d.signup_coords.unwrap())
            .round() as i64;
        assert!((14..=15).contains(&meters));
        for f in &result.flags {
            assert_eq!(
                f.reason,
                format!("Nearby location ({meters}m) with opposite predictions")
            );
        }
    }

    #[test]
    fn distant_signups_are_never_paired() {
        // roughly 1.1 km apart
        let a = user("a@example.com", None, Some((28.6139, 77.2090)));
        let b = user("b@example.com", None, Some((28.6239, 77.2090)));
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "Pakistan")];

        assert!(detect_suspicious_activity(&[a, b], &preds).is_clean());
    }

    #[test]
    fn proximity_threshold_is_inclusive() {
        assert!(within_proximity(0.0));
        assert!(within_proximity(50.0));
        assert!(!within_proximity(50.000_001));
    }

    // 1e-5 degree of latitude is about 1.112 m
    const BASE: (f64, f64) = (28.6139, 77.2090);

    fn nearby_pair_result(offset_deg: f64) -> (f64, DetectionResult) {
        let a = user("a@example.com", None, Some(BASE));
        let b = user("b@example.com", None, Some((BASE.0 + offset_deg, BASE.1)));
        let distance = a
            .signup_coords
            .unwrap()
            .distance_to(&b.signup_coords.unwrap());
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "Pakistan")];
        (distance, detect_suspicious_activity(&[a, b], &preds))
    }

    #[test]
    fn pair_just_inside_radius_is_flagged() {
        let (distance, result) = nearby_pair_result(0.000_448_76);
        assert!(distance > 49.8 && distance < 50.0, "distance: {distance}");
        assert_eq!(result.coord_violations, 2);
        assert_eq!(result.flags.len(), 2);
        // rounded for display
        assert_eq!(
            result.flags[0].reason,
            "Nearby location (50m) with opposite predictions"
        );
    }

    #[test]
    fn pair_just_outside_radius_is_clean() {
        let (distance, result) = nearby_pair_result(0.000_450_56);
        assert!(distance > 50.0 && distance < 50.2, "distance: {distance}");
        assert!(result.is_clean());
    }

    #[test]
    fn zero_latitude_is_a_real_location() {
        let a = user("a@example.com", None, Some((0.0, 10.0)));
        let b = user("b@example.com", None, Some((0.0, 10.0001)));
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "Pakistan")];

        let result = detect_suspicious_activity(&[a.clone(), b.clone()], &preds);

        assert_eq!(result.coord_violations, 2);
        assert_eq!(flagged_ids(&result), HashSet::from([a.id, b.id]));
    }

    #[test]
    fn one_opposing_match_is_enough_per_pair() {
        let a = user("a@example.com", None, Some((51.5007, -0.1246)));
        let b = user("b@example.com", None, Some((51.5007, -0.1246)));
        let m1 = Uuid::new_v4();
        let m2 = Uuid::new_v4();
        let preds = vec![
            pick(&a, m1, "England"),
            pick(&b, m1, "Australia"),
            pick(&a, m2, "England"),
            pick(&b, m2, "New Zealand"),
        ];

        let result = detect_suspicious_activity(&[a, b], &preds);
        assert_eq!(result.coord_violations, 2);
        assert!(result.flags[0].reason.starts_with("Nearby location (0m)"));
    }

    #[test]
    fn nearby_pair_without_common_match_is_clean() {
        let a = user("a@example.com", None, Some((19.0760, 72.8777)));
        let b = user("b@example.com", None, Some((19.0760, 72.8777)));
        let preds = vec![
            pick(&a, Uuid::new_v4(), "India"),
            pick(&b, Uuid::new_v4(), "Pakistan"),
        ];

        assert!(detect_suspicious_activity(&[a, b], &preds).is_clean());
    }

    #[test]
    fn users_without_predictions_are_never_flagged() {
        let a = user("a@example.com", Some("203.0.113.9"), Some((19.0760, 72.8777)));
        let b = user("b@example.com", Some("203.0.113.9"), Some((19.0760, 72.8777)));
        assert!(detect_suspicious_activity(&[a, b], &[]).is_clean());
    }

    #[test]
    fn lone_fingerprint_is_never_flagged() {
        let loner = user("solo@example.com", Some("203.0.113.50"), None);
        let a = user("a@example.com", Some("203.0.113.9"), None);
        let b = user("b@example.com", Some("203.0.113.9"), None);
        let m = Uuid::new_v4();
        let preds = vec![
            pick(&loner, m, "England"),
            pick(&a, m, "India"),
            pick(&b, m, "Pakistan"),
        ];

        let result = detect_suspicious_activity(&[loner.clone(), a, b], &preds);
        assert!(!flagged_ids(&result).contains(&loner.id));
    }

    #[test]
    fn nearby_reason_wins_over_shared_ip() {
        let a = user("a@example.com", Some("203.0.113.9"), Some((28.6139, 77.2090)));
        let b = user("b@example.com", Some("203.0.113.9"), Some((28.6139, 77.2090)));
        let m = Uuid::new_v4();
        let preds = vec![pick(&a, m, "India"), pick(&b, m, "Pakistan")];

        let result = detect_suspicious_activity(&[a, b], &preds);
        assert_eq!(result.ip_violations, 2);
        assert_eq!(result.coord_violations, 2);
        assert_eq!(result.flags.len(), 2);
        for f in &result.flags {
            assert!(f.reason.starts_with("Nearby location"), "reason: {}", f.reason);
        }

        let examples = result.flagged_examples(10);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].email, "a@example.com");
        assert_eq!(examples[0].reason, "Nearby (0m)");
    }

    #[test]
    fn same_input_gives_same_result() {
        let ip = Some("203.0.113.9");
        let users: Vec<_> = (0..6)
            .map(|i| user(&format!("u{i}@example.com"), ip, Some((10.0, 10.0))))
            .collect();
        let m = Uuid::new_v4();
        let preds: Vec<_> = users
            .iter()
            .enumerate()
            .map(|(i, u)| pick(u, m, if i % 2 == 0 { "India" } else { "Pakistan" }))
            .collect();

        assert_eq!(
            detect_suspicious_activity(&users, &preds),
            detect_suspicious_activity(&users, &preds)
        );
    }

    #[test]
    fn examples_are_capped() {
        let ip = Some("203.0.113.9");
        let users: Vec<_> = (0..12)
            .map(|i| user(&format!("u{i}@example.com"), ip, None))
            .collect();
        let m = Uuid::new_v4();
        let preds: Vec<_> = users
            .iter()
            .enumerate()
            .map(|(i, u)| pick(u, m, if i % 2 == 0 { "India" } else { "Pakistan" }))
            .collect();

        let result = detect_suspicious_activity(&users, &preds);
        assert_eq!(result.ip_violations, 12);
        let examples = result.flagged_examples(10);
        assert_eq!(examples.len(), 10);
        assert_eq!(examples[0].email, "u0@example.com");
        assert_eq!(examples[0].reason, "Same IP (203.0.113.9)");
    }
}
