use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::money::Amount;

/// Longest plan period accepted, about a century.
pub const MAX_PLAN_DURATION_DAYS: i32 = 36_500;

#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: Amount,
    /// ISO 4217 code, upper-case.
    pub currency: String,
    pub duration_days: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl SubscriptionPlan {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Whether a new subscription may be bought on this plan.
    pub fn is_purchasable(&self) -> bool {
        self.is_active && !self.is_deleted() && self.price.is_positive() && self.duration_days > 0
    }

    /// End of a subscription period that starts at `start`, or `None` when
    /// it falls outside the representable date range.
    pub fn period_end(&self, start: DateTime<Utc>) -> Option<DateTime<Utc>> {
        Duration::try_days(i64::from(self.duration_days))
            .and_then(|period| start.checked_add_signed(period))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> SubscriptionPlan {
        let now = Utc::now();
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: "Monthly".into(),
            description: String::new(),
            price: Amount::from_minor_units(100_000),
            currency: "NGN".into(),
            duration_days: 30,
            is_active: true,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn purchasable_requires_active_undeleted_priced_plan() {
        assert!(plan().is_purchasable());

        let mut inactive = plan();
        inactive.is_active = false;
        assert!(!inactive.is_purchasable());

        let mut deleted = plan();
        deleted.deleted_at = Some(Utc::now());
        assert!(!deleted.is_purchasable());

        let mut free = plan();
        free.price = Amount::ZERO;
        assert!(!free.is_purchasable());

        let mut no_duration = plan();
        no_duration.duration_days = 0;
        assert!(!no_duration.is_purchasable());
    }

    #[test]
    fn period_end_adds_duration_in_days() {
        let start = Utc::now();
        assert_eq!(plan().period_end(start).unwrap() - start, Duration::days(30));
    }

    #[test]
    fn period_end_past_calendar_range_is_none() {
        let mut huge = plan();
        huge.duration_days = 200_000_000;
        assert_eq!(huge.period_end(Utc::now()), None);

        huge.duration_days = MAX_PLAN_DURATION_DAYS;
        assert!(huge.period_end(Utc::now()).is_some());
    }
}
