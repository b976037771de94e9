// Eligibility for joining and repurchase commissions

use crate::{
    account::KycStatus,
    config::{
        DEFAULT_MONTHLY_PURCHASE_THRESHOLD, DEFAULT_REQUIRED_DIRECT_REFERRALS,
        DEFAULT_REQUIRED_REFERRALS_PER_DIRECT,
    },
};
use serde::{Deserialize, Serialize};
use strum::Display;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EligibilityRules {
    pub required_direct_referrals: u32,
    pub required_referrals_per_direct: u32,
    pub monthly_purchase_threshold: u64,
}

impl Default for EligibilityRules {
    fn default() -> Self {
        Self {
            required_direct_referrals: DEFAULT_REQUIRED_DIRECT_REFERRALS,
            required_referrals_per_direct: DEFAULT_REQUIRED_REFERRALS_PER_DIRECT,
            monthly_purchase_threshold: DEFAULT_MONTHLY_PURCHASE_THRESHOLD,
        }
    }
}

/// Facts gathered from storage for a single evaluation
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct EligibilityInputs {
    pub kyc_status: KycStatus,
    /// Number of direct referrals of the user
    pub direct_referrals: u32,
    /// Direct referral count of each of the user's directs
    pub referrals_of_directs: Vec<u32>,
    /// Purchases of the user in the current calendar month
    pub month_purchase_total: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum IneligibilityReason {
    KycNotApproved,
    InsufficientDirectReferrals { have: u32, need: u32 },
    InsufficientQualifiedDirects { have: u32, need: u32 },
    MonthlyPurchaseBelowThreshold { total: u64, threshold: u64 },
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Eligibility {
    pub joining_eligible: bool,
    pub repurchase_eligible: bool,
    /// Everything that blocks repurchase eligibility, empty when eligible
    pub reasons: Vec<IneligibilityReason>,
}

/// Evaluate both eligibilities. All failing conditions are reported.
pub fn evaluate(inputs: &EligibilityInputs, rules: &EligibilityRules) -> Eligibility {
    let mut reasons = Vec::new();

    let kyc_approved = inputs.kyc_status.is_approved();
    if !kyc_approved {
        reasons.push(IneligibilityReason::KycNotApproved);
    }

    if inputs.direct_referrals < rules.required_direct_referrals {
        reasons.push(IneligibilityReason::InsufficientDirectReferrals {
            have: inputs.direct_referrals,
            need: rules.required_direct_referrals,
        });
    }

    let qualified_directs = inputs
        .referrals_of_directs
        .iter()
        .filter(|count| **count >= rules.required_referrals_per_direct)
        .count() as u32;
    if qualified_directs < rules.required_direct_referrals {
        reasons.push(IneligibilityReason::InsufficientQualifiedDirects {
            have: qualified_directs,
            need: rules.required_direct_referrals,
        });
    }

    if inputs.month_purchase_total < rules.monthly_purchase_threshold {
        reasons.push(IneligibilityReason::MonthlyPurchaseBelowThreshold {
            total: inputs.month_purchase_total,
            threshold: rules.monthly_purchase_threshold,
        });
    }

    Eligibility {
        joining_eligible: kyc_approved,
        repurchase_eligible: reasons.is_empty(),
        reasons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qualified() -> EligibilityInputs {
        EligibilityInputs {
            kyc_status: KycStatus::Approved,
            direct_referrals: 3,
            referrals_of_directs: vec![3, 3, 3],
            month_purchase_total: 50_000,
        }
    }

    #[test]
    fn test_fully_eligible() {
        let result = evaluate(&qualified(), &EligibilityRules::default());
        assert!(result.joining_eligible);
        assert!(result.repurchase_eligible);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_kyc_blocks_both() {
        let inputs = EligibilityInputs {
            kyc_status: KycStatus::Pending,
            ..qualified()
        };
        let result = evaluate(&inputs, &EligibilityRules::default());
        assert!(!result.joining_eligible);
        assert!(!result.repurchase_eligible);
        assert_eq!(result.reasons, vec![IneligibilityReason::KycNotApproved]);
    }

    #[test]
    fn test_three_three_rule() {
        let inputs = EligibilityInputs {
            direct_referrals: 4,
            referrals_of_directs: vec![3, 2, 5, 0],
            ..qualified()
        };
        let result = evaluate(&inputs, &EligibilityRules::default());
        assert!(result.joining_eligible);
        assert!(!result.repurchase_eligible);
        assert_eq!(
            result.reasons,
            vec![IneligibilityReason::InsufficientQualifiedDirects { have: 2, need: 3 }]
        );
    }

    #[test]
    fn test_reports_every_reason() {
        let inputs = EligibilityInputs {
            kyc_status: KycStatus::NotSubmitted,
            direct_referrals: 1,
            referrals_of_directs: vec![3],
            month_purchase_total: 49_999,
        };
        let result = evaluate(&inputs, &EligibilityRules::default());
        assert_eq!(result.reasons.len(), 4);
        assert_eq!(
            result.reasons[3],
            IneligibilityReason::MonthlyPurchaseBelowThreshold {
                total: 49_999,
                threshold: 50_000
            }
        );
    }
}
