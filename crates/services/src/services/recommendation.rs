//! Activity recommendation scoring.
//!
//! Scoring is pure: callers load the user context and the catalog, the
//! functions here rank a borrowed slice and return new values. Every missing
//! field falls back to a neutral score, so no input can make scoring fail.
//!
//! Per-user score, clamped to `[0, 100]`:
//!
//! | component          | weight | full credit                                      | otherwise |
//! |--------------------|--------|--------------------------------------------------|-----------|
//! | age fit            | 40     | age inside `[age_min, age_max]`                  | `40 - 5d`, 20 when unknown |
//! | preference fit     | 35     | a preference appears in category/title/description | 10, 17.5 with no preferences |
//! | role / difficulty  | 15     | parent+medium, teen+easy, teen+medium, child+easy | 7.5 |
//! | family context     | 10     | known family and an inclusion category            | 5 |

use db::{
    DBService,
    models::{
        activity::{Activity, Difficulty},
        family::Family,
        suggestion::{Suggestion, SuggestionStatus},
        user::{User, UserPreference, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};
use ts_rs::TS;
use utils::text::{normalize_tag, split_tags};
use uuid::Uuid;

pub const AGE_WEIGHT: f64 = 40.0;
pub const PREFERENCE_WEIGHT: f64 = 35.0;
pub const ROLE_WEIGHT: f64 = 15.0;
pub const FAMILY_WEIGHT: f64 = 10.0;

const AGE_PENALTY_PER_YEAR: f64 = 5.0;
const PREFERENCE_MISS: f64 = 10.0;

/// Categories that reward families with known members.
pub const INCLUSION_CATEGORIES: &[&str] = &["inclusion", "confiance"];

/// How many activities the family-wide ranking returns.
pub const FAMILY_TOP_N: usize = 10;

pub const REASON_AGE: &str = "age-appropriate";
pub const REASON_PREFERENCES: &str = "matches your preferences";
pub const REASON_ROLE: &str = "suited to your role";
pub const REASON_FAMILY: &str = "great for the whole family";

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("family not found")]
    FamilyNotFound,
    #[error("suggestion not found")]
    SuggestionNotFound,
}

/// Who the activities are being ranked for.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    pub age: Option<i32>,
    pub role: Option<UserRole>,
    /// Normalized preference tags, see [`ScoringContext::new`].
    preferences: Vec<String>,
    /// Other known members of the user's family.
    pub family_size: usize,
}

impl ScoringContext {
    /// Preferences are trimmed and lowercased; blank entries are dropped.
    pub fn new(
        age: Option<i32>,
        role: Option<UserRole>,
        preferences: &[String],
        family_size: usize,
    ) -> Self {
        Self {
            age,
            role,
            preferences: preferences.iter().filter_map(|p| normalize_tag(p)).collect(),
            family_size,
        }
    }

    pub fn preferences(&self) -> &[String] {
        &self.preferences
    }
}

/// An activity with its score, as returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct ScoredActivity {
    #[serde(flatten)]
    #[ts(flatten)]
    pub activity: Activity,
    pub match_score: u8,
    pub match_reasons: Vec<String>,
}

impl std::ops::Deref for ScoredActivity {
    type Target = Activity;
    fn deref(&self) -> &Self::Target {
        &self.activity
    }
}

/// Points awarded by each scoring component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub age: f64,
    pub preference: f64,
    pub role: f64,
    pub family: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u8 {
        clamp_score(self.age + self.preference + self.role + self.family)
    }

    pub fn reasons(&self) -> Vec<String> {
        [
            (self.age >= AGE_WEIGHT, REASON_AGE),
            (self.preference >= PREFERENCE_WEIGHT, REASON_PREFERENCES),
            (self.role >= ROLE_WEIGHT, REASON_ROLE),
            (self.family >= FAMILY_WEIGHT, REASON_FAMILY),
        ]
        .into_iter()
        .filter(|(full, _)| *full)
        .map(|(_, reason)| reason.to_string())
        .collect()
    }
}

fn clamp_score(total: f64) -> u8 {
    total.clamp(0.0, 100.0).round() as u8
}

pub fn age_fit(age: Option<i32>, activity: &Activity) -> f64 {
    let (Some(age), Some(min), Some(max)) = (age, activity.age_min, activity.age_max) else {
        return AGE_WEIGHT / 2.0;
    };
    let (age, min, max) = (i64::from(age), i64::from(min), i64::from(max));
    if (min..=max).contains(&age) {
        return AGE_WEIGHT;
    }
    let distance = (age - min).abs().min((age - max).abs());
    (AGE_WEIGHT - AGE_PENALTY_PER_YEAR * distance as f64).max(0.0)
}

/// `preferences` must already be lowercase, as held by [`ScoringContext`].
pub fn preference_fit(preferences: &[String], activity: &Activity) -> f64 {
    if preferences.is_empty() {
        return PREFERENCE_WEIGHT / 2.0;
    }
    let fields: Vec<String> = [
        activity.category.as_deref(),
        Some(activity.title.as_str()),
        activity.description.as_deref(),
    ]
    .into_iter()
    .flatten()
    .map(str::to_lowercase)
    .collect();

    let matched = preferences
        .iter()
        .any(|pref| fields.iter().any(|field| field.contains(pref.as_str())));
    if matched { PREFERENCE_WEIGHT } else { PREFERENCE_MISS }
}

pub fn role_fit(role: Option<UserRole>, difficulty: Option<Difficulty>) -> f64 {
    match (role, difficulty) {
        (Some(UserRole::Parent), Some(Difficulty::Medium))
        | (Some(UserRole::Teen), Some(Difficulty::Easy | Difficulty::Medium))
        | (Some(UserRole::Child), Some(Difficulty::Easy)) => ROLE_WEIGHT,
        _ => ROLE_WEIGHT / 2.0,
    }
}

fn category_in(activity: &Activity, categories: &[&str]) -> bool {
    activity
        .category
        .as_deref()
        .and_then(normalize_tag)
        .is_some_and(|c| categories.contains(&c.as_str()))
}

pub fn family_fit(family_size: usize, activity: &Activity) -> f64 {
    if family_size > 0 && category_in(activity, INCLUSION_CATEGORIES) {
        FAMILY_WEIGHT
    } else {
        FAMILY_WEIGHT / 2.0
    }
}

pub fn breakdown(ctx: &ScoringContext, activity: &Activity) -> ScoreBreakdown {
    ScoreBreakdown {
        age: age_fit(ctx.age, activity),
        preference: preference_fit(&ctx.preferences, activity),
        role: role_fit(ctx.role, activity.difficulty),
        family: family_fit(ctx.family_size, activity),
    }
}

pub fn score_activity(ctx: &ScoringContext, activity: &Activity) -> ScoredActivity {
    let parts = breakdown(ctx, activity);
    ScoredActivity {
        activity: activity.clone(),
        match_score: parts.total(),
        match_reasons: parts.reasons(),
    }
}

/// Score every activity and order by score, highest first. Equal scores keep input order.
pub fn rank_activities(ctx: &ScoringContext, activities: &[Activity]) -> Vec<ScoredActivity> {
    let mut scored: Vec<ScoredActivity> =
        activities.iter().map(|a| score_activity(ctx, a)).collect();
    // `sort_by` is stable
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored
}

const FAMILY_BASE: u32 = 50;
const WIDE_AGE_SPAN_YEARS: i64 = 30;
const LARGE_FAMILY: usize = 4;
const TOGETHER_WORDS: &[&str] = &["famille", "ensemble"];

/// Family-wide score for an activity, with the reasons that contributed.
pub fn family_score(family_size: usize, activity: &Activity) -> (u8, Vec<String>) {
    let mut score = FAMILY_BASE;
    let mut reasons = Vec::new();

    for (category, bonus, reason) in [
        ("inclusion", 20, "inclusive"),
        ("confiance", 15, "builds confidence"),
        ("dialogue", 15, "encourages dialogue"),
    ] {
        if category_in(activity, &[category]) {
            score += bonus;
            reasons.push(reason.to_string());
        }
    }

    let wide_span = match (activity.age_min, activity.age_max) {
        (Some(min), Some(max)) => i64::from(max) - i64::from(min) >= WIDE_AGE_SPAN_YEARS,
        _ => false,
    };
    if wide_span {
        score += 20;
        reasons.push("suits a wide age range".to_string());
    }

    if family_size >= LARGE_FAMILY {
        let together = [
            Some(activity.title.as_str()),
            activity.description.as_deref(),
            activity.category.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|text| {
            let text = text.to_lowercase();
            TOGETHER_WORDS.iter().any(|w| text.contains(w))
        });
        if together {
            score += 15;
            reasons.push("made for doing together".to_string());
        }
    }

    (score.min(100) as u8, reasons)
}

/// Top [`FAMILY_TOP_N`] activities for a whole family. Equal scores keep input order.
pub fn rank_for_family(family_size: usize, activities: &[Activity]) -> Vec<ScoredActivity> {
    let mut scored: Vec<ScoredActivity> = activities
        .iter()
        .map(|activity| {
            let (match_score, match_reasons) = family_score(family_size, activity);
            ScoredActivity {
                activity: activity.clone(),
                match_score,
                match_reasons,
            }
        })
        .collect();
    scored.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    scored.truncate(FAMILY_TOP_N);
    scored
}

/// Loads scoring inputs through the data layer and persists suggestions.
#[derive(Clone)]
pub struct RecommendationService {
    pool: SqlitePool,
}

impl RecommendationService {
    pub fn new(db: &DBService) -> Self {
        Self {
            pool: db.pool.clone(),
        }
    }

    /// Build the scoring context for a user: stored tags, else the family's preference blob.
    pub async fn context_for_user(&self, user: &User) -> Result<ScoringContext, RecommendationError> {
        let mut preferences = UserPreference::find_tags_by_user_id(&self.pool, user.id).await?;
        let mut family_size = 0;

        if let Some(family_id) = user.family_id {
            let members = User::count_by_family_id(&self.pool, family_id).await?;
            family_size = usize::try_from(members.saturating_sub(1)).unwrap_or(0);

            if preferences.is_empty() {
                preferences = Family::find_by_id(&self.pool, family_id)
                    .await?
                    .and_then(|family| family.preferences)
                    .map(|blob| split_tags(&blob))
                    .unwrap_or_default();
            }
        }

        Ok(ScoringContext::new(
            user.age,
            user.role,
            &preferences,
            family_size,
        ))
    }

    pub async fn recommend_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<ScoredActivity>, RecommendationError> {
        let user = User::find_by_id(&self.pool, user_id)
            .await?
            .ok_or(RecommendationError::UserNotFound)?;
        let ctx = self.context_for_user(&user).await?;
        let activities = Activity::find_all(&self.pool).await?;

        let mut ranked = rank_activities(&ctx, &activities);
        ranked.truncate(limit);
        debug!(
            user_id = %user_id,
            candidates = activities.len(),
            returned = ranked.len(),
            "Ranked activities for user"
        );
        Ok(ranked)
    }

    pub async fn recommend_for_family(
        &self,
        family_id: Uuid,
    ) -> Result<Vec<ScoredActivity>, RecommendationError> {
        Family::find_by_id(&self.pool, family_id)
            .await?
            .ok_or(RecommendationError::FamilyNotFound)?;
        let members = User::count_by_family_id(&self.pool, family_id).await?;
        let activities = Activity::find_all(&self.pool).await?;
        Ok(rank_for_family(
            usize::try_from(members).unwrap_or(0),
            &activities,
        ))
    }

    /// Rank, then record a pending suggestion for each returned activity.
    ///
    /// Pairs that already have a suggestion keep their current status.
    pub async fn suggest_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Suggestion>, RecommendationError> {
        let ranked = self.recommend_for_user(user_id, limit).await?;
        let mut suggestions = Vec::with_capacity(ranked.len());
        for scored in &ranked {
            let suggestion = Suggestion::create_if_absent(
                &self.pool,
                user_id,
                scored.id,
                i32::from(scored.match_score),
            )
            .await?;
            suggestions.push(suggestion);
        }
        info!(
            user_id = %user_id,
            count = suggestions.len(),
            "Recorded activity suggestions"
        );
        Ok(suggestions)
    }

    pub async fn list_suggestions(
        &self,
        user_id: Uuid,
        status: Option<SuggestionStatus>,
    ) -> Result<Vec<Suggestion>, RecommendationError> {
        Ok(Suggestion::find_by_user_id(&self.pool, user_id, status).await?)
    }

    pub async fn update_suggestion_status(
        &self,
        suggestion_id: Uuid,
        user_id: Uuid,
        status: SuggestionStatus,
    ) -> Result<Suggestion, RecommendationError> {
        Suggestion::update_status(&self.pool, suggestion_id, user_id, status)
            .await?
            .ok_or(RecommendationError::SuggestionNotFound)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use db::models::{
        activity::CreateActivity,
        family::CreateFamily,
        user::CreateUser,
    };

    use super::*;

    fn activity(
        title: &str,
        category: Option<&str>,
        ages: Option<(i32, i32)>,
        difficulty: Option<Difficulty>,
    ) -> Activity {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        Activity {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: None,
            category: category.map(str::to_string),
            difficulty,
            age_min: ages.map(|a| a.0),
            age_max: ages.map(|a| a.1),
            created_at: ts,
            updated_at: ts,
        }
    }

    fn sport() -> Activity {
        activity("Mini-foot", Some("sport"), Some((5, 12)), Some(Difficulty::Easy))
    }

    #[test]
    fn age_inside_bounds_gets_full_weight() {
        let a = sport();
        for age in 5..=12 {
            assert_eq!(age_fit(Some(age), &a), 40.0);
        }
    }

    #[test]
    fn age_outside_bounds_loses_five_per_year_and_floors_at_zero() {
        let a = sport();
        assert_eq!(age_fit(Some(4), &a), 35.0);
        assert_eq!(age_fit(Some(14), &a), 30.0);
        assert_eq!(age_fit(Some(20), &a), 0.0);
        assert_eq!(age_fit(Some(-30), &a), 0.0);
        assert_eq!(age_fit(Some(i32::MAX), &a), 0.0);
    }

    #[test]
    fn missing_age_or_bounds_is_neutral() {
        assert_eq!(age_fit(None, &sport()), 20.0);
        let unbounded = activity("Balade", None, None, None);
        assert_eq!(age_fit(Some(40), &unbounded), 20.0);
        let mut half = sport();
        half.age_max = None;
        assert_eq!(age_fit(Some(40), &half), 20.0);
    }

    #[test]
    fn preference_match_is_case_insensitive() {
        let activities = vec![
            sport(),
            activity("Atelier FOOTBALL", Some("loisirs"), None, None),
            activity("Peinture", Some("art"), None, None),
        ];
        let upper = ScoringContext::new(Some(9), None, &["Football".to_string()], 0);
        let lower = ScoringContext::new(Some(9), None, &["football".to_string()], 0);
        assert_eq!(
            rank_activities(&upper, &activities),
            rank_activities(&lower, &activities)
        );
        assert_eq!(preference_fit(upper.preferences(), &activities[1]), 35.0);
    }

    #[test]
    fn preference_miss_and_empty_preferences() {
        let a = sport();
        assert_eq!(preference_fit(&["musique".to_string()], &a), 10.0);
        assert_eq!(preference_fit(&[], &a), 17.5);
        // Blank tags are dropped, leaving the neutral score.
        let ctx = ScoringContext::new(None, None, &["  ".to_string()], 0);
        assert_eq!(preference_fit(ctx.preferences(), &a), 17.5);
    }

    #[test]
    fn preference_matches_description() {
        let mut a = activity("Sortie", Some("plein air"), None, None);
        a.description = Some("Randonnée en forêt".to_string());
        assert_eq!(preference_fit(&["forêt".to_string()], &a), 35.0);
    }

    #[test]
    fn role_and_difficulty_pairs() {
        use Difficulty::*;
        use UserRole::*;
        assert_eq!(role_fit(Some(Parent), Some(Medium)), 15.0);
        assert_eq!(role_fit(Some(Teen), Some(Easy)), 15.0);
        assert_eq!(role_fit(Some(Teen), Some(Medium)), 15.0);
        assert_eq!(role_fit(Some(Child), Some(Easy)), 15.0);
        assert_eq!(role_fit(Some(Child), Some(Hard)), 7.5);
        assert_eq!(role_fit(Some(Grandparent), Some(Easy)), 7.5);
        assert_eq!(role_fit(Some(Parent), None), 7.5);
        assert_eq!(role_fit(None, Some(Medium)), 7.5);
    }

    #[test]
    fn family_context_needs_known_members_and_inclusion_category() {
        let inclusion = activity("Jeu", Some("Inclusion"), None, None);
        assert_eq!(family_fit(2, &inclusion), 10.0);
        assert_eq!(family_fit(0, &inclusion), 5.0);
        assert_eq!(family_fit(3, &sport()), 5.0);
    }

    #[test]
    fn totals_stay_within_bounds() {
        let best = ScoreBreakdown {
            age: 40.0,
            preference: 35.0,
            role: 15.0,
            family: 10.0,
        };
        assert_eq!(best.total(), 100);
        assert_eq!(best.reasons().len(), 4);
        let worst = ScoreBreakdown {
            age: 0.0,
            preference: 0.0,
            role: 0.0,
            family: 0.0,
        };
        assert_eq!(worst.total(), 0);
        assert!(worst.reasons().is_empty());
    }

    #[test]
    fn child_who_likes_sport_scores_95() {
        let ctx = ScoringContext::new(Some(8), Some(UserRole::Child), &["sport".to_string()], 0);
        let scored = score_activity(&ctx, &sport());
        assert_eq!(scored.match_score, 95);
        assert_eq!(
            scored.match_reasons,
            vec![REASON_AGE, REASON_PREFERENCES, REASON_ROLE]
        );
    }

    #[test]
    fn parent_without_preferences_scores_30() {
        let ctx = ScoringContext::new(Some(30), Some(UserRole::Parent), &[], 3);
        let parts = breakdown(&ctx, &sport());
        assert_eq!(parts.age, 0.0);
        assert_eq!(parts.preference, 17.5);
        assert_eq!(parts.role, 7.5);
        assert_eq!(parts.family, 5.0);
        assert_eq!(parts.total(), 30);
        assert!(parts.reasons().is_empty());
    }

    #[test]
    fn ranking_is_deterministic_and_leaves_input_untouched() {
        let activities = vec![
            activity("A", Some("art"), Some((3, 6)), Some(Difficulty::Hard)),
            sport(),
            activity("C", Some("inclusion"), None, Some(Difficulty::Medium)),
        ];
        let before = activities.clone();
        let ctx = ScoringContext::new(Some(7), Some(UserRole::Child), &["sport".to_string()], 2);
        let first = rank_activities(&ctx, &activities);
        let second = rank_activities(&ctx, &activities);
        assert_eq!(activities, before);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
        assert_eq!(first[0].title, "Mini-foot");
    }

    #[test]
    fn equal_scores_keep_input_order() {
        let activities: Vec<Activity> = (0..6)
            .map(|i| activity(&format!("same-{i}"), Some("x"), None, None))
            .collect();
        let ctx = ScoringContext::default();
        let ranked = rank_activities(&ctx, &activities);
        let titles: Vec<&str> = ranked.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["same-0", "same-1", "same-2", "same-3", "same-4", "same-5"]
        );
    }

    #[test]
    fn family_score_components() {
        let mut a = activity("Soirée jeux en famille", Some("inclusion"), Some((3, 90)), None);
        let (score, reasons) = family_score(4, &a);
        // 50 + 20 inclusion + 20 wide span + 15 together, clamped
        assert_eq!(score, 100);
        assert_eq!(reasons.len(), 3);

        a.category = Some("dialogue".to_string());
        a.age_min = Some(70);
        assert_eq!(family_score(2, &a).0, 65);

        let plain = activity("Lecture", Some("calme"), None, None);
        assert_eq!(family_score(6, &plain), (50, Vec::new()));
    }

    #[test]
    fn family_ranking_returns_top_ten_stably() {
        let mut activities: Vec<Activity> = (0..12)
            .map(|i| activity(&format!("plain-{i}"), None, None, None))
            .collect();
        activities.push(activity("Cercle", Some("confiance"), None, None));
        let ranked = rank_for_family(3, &activities);
        assert_eq!(ranked.len(), FAMILY_TOP_N);
        assert_eq!(ranked[0].title, "Cercle");
        assert_eq!(ranked[0].match_score, 65);
        assert_eq!(ranked[1].title, "plain-0");
        assert_eq!(ranked[9].title, "plain-8");
    }

    #[tokio::test]
    async fn service_uses_family_preferences_and_records_suggestions() {
        let db = DBService::new_in_memory().await.unwrap();
        let service = RecommendationService::new(&db);

        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        for (id, name, age, role) in [
            (parent, "Alex", 38, UserRole::Parent),
            (child, "Lou", 8, UserRole::Child),
        ] {
            User::create(
                &db.pool,
                &CreateUser {
                    display_name: name.to_string(),
                    email: None,
                    age: Some(age),
                    role: Some(role),
                },
                id,
            )
            .await
            .unwrap();
        }
        let family = Family::create(
            &db.pool,
            Uuid::new_v4(),
            &CreateFamily {
                name: "Martin".to_string(),
                preferences: Some("Sport, cuisine".to_string()),
            },
            parent,
        )
        .await
        .unwrap();
        User::set_family(&db.pool, parent, Some(family.id)).await.unwrap();
        User::set_family(&db.pool, child, Some(family.id)).await.unwrap();

        for (title, category, ages, difficulty) in [
            ("Échecs", "réflexion", (12, 99), Difficulty::Hard),
            ("Mini-foot", "sport", (5, 12), Difficulty::Easy),
        ] {
            Activity::create(
                &db.pool,
                &CreateActivity {
                    title: title.to_string(),
                    description: None,
                    category: Some(category.to_string()),
                    difficulty: Some(difficulty),
                    age_min: Some(ages.0),
                    age_max: Some(ages.1),
                },
                Uuid::new_v4(),
            )
            .await
            .unwrap();
        }

        let ranked = service.recommend_for_user(child, 10).await.unwrap();
        assert_eq!(ranked[0].title, "Mini-foot");
        // 40 age + 35 family preference + 15 child/easy + 5 family context
        assert_eq!(ranked[0].match_score, 95);

        let suggestions = service.suggest_for_user(child, 1).await.unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].status, SuggestionStatus::Pending);

        let declined = service
            .update_suggestion_status(suggestions[0].id, child, SuggestionStatus::Declined)
            .await
            .unwrap();
        assert_eq!(declined.status, SuggestionStatus::Declined);

        // Re-suggesting leaves the declined status alone.
        let again = service.suggest_for_user(child, 1).await.unwrap();
        assert_eq!(again[0].status, SuggestionStatus::Declined);

        assert!(matches!(
            service
                .update_suggestion_status(suggestions[0].id, parent, SuggestionStatus::Completed)
                .await,
            Err(RecommendationError::SuggestionNotFound)
        ));

        let family_ranked = service.recommend_for_family(family.id).await.unwrap();
        assert_eq!(family_ranked.len(), 2);
        // Échecs spans 87 years
        assert_eq!(family_ranked[0].title, "Échecs");
    }
}
