use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Review left by a tender poster for the awarded user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub tender_id: Uuid,
    pub reviewer_id: Uuid,
    pub reviewed_user_id: Uuid,
    pub rating: i32,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request DTO for creating a review
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReviewRequest {
    pub tender_id: Uuid,
    pub reviewed_user_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Aggregate written back to the reviewed user's profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub rating: f64,
    pub rating_count: i32,
}

impl RatingSummary {
    /// Arithmetic mean over the full set of ratings.
    pub fn from_ratings(ratings: &[i32]) -> Self {
        if ratings.is_empty() {
            return Self {
                rating: 0.0,
                rating_count: 0,
            };
        }
        let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
        Self {
            rating: sum as f64 / ratings.len() as f64,
            rating_count: ratings.len() as i32,
        }
    }
}

/// Response DTO for review creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewCreatedResponse {
    pub review: Review,
    pub reviewed_user_rating: RatingSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_ratings() {
        let summary = RatingSummary::from_ratings(&[5, 4, 3]);
        assert_eq!(summary.rating, 4.0);
        assert_eq!(summary.rating_count, 3);
    }

    #[test]
    fn empty_set_is_zero() {
        assert_eq!(RatingSummary::from_ratings(&[]).rating_count, 0);
    }
}
