//! Pure plan-limit evaluation.
//!
//! Both checks are side-effect-free functions of exactly two inputs, so any
//! decision can be reproduced after the fact from the plan and a count.

use crate::error::CoreError;
use crate::plans::Plan;

/// Decide whether a tenant on `plan` with `current_count` instances may
/// create one more.
///
/// Denies when the set is already at the plan limit; the denial message
/// names the plan and the numeric limit.
pub fn check_instance_quota(plan: Plan, current_count: usize) -> Result<(), CoreError> {
    let max = plan.max_instances();
    if current_count >= max {
        return Err(CoreError::QuotaExceeded(format!(
            "Instance limit reached for {plan} plan. Maximum: {max}"
        )));
    }
    Ok(())
}

/// Decide whether a tenant holding `current_count` instances may move to
/// `target` plan.
///
/// Denies when the tenant owns more instances than the target plan allows,
/// instructing the caller to delete instances first.
pub fn check_downgrade(target: Plan, current_count: usize) -> Result<(), CoreError> {
    let max = target.max_instances();
    if current_count > max {
        return Err(CoreError::QuotaExceeded(format!(
            "Cannot downgrade to {target} plan. You have {current_count} instances, \
             but the plan allows only {max}. Please delete some instances first."
        )));
    }
    Ok(())
}
