use cadence_db::model::Generator;

use crate::error::{ServiceError, ServiceResult};

/// ## Summary
/// Checks a generator before anything is written.
///
/// The span must not run backwards, `repeat_until` needs a rule and must not
/// fall before `event_end`, and a repeating span must fit within one period
/// of its rule's frequency. The rule itself has to expand.
///
/// ## Errors
/// Returns `ValidationError` for an inconsistent generator and `RuleError`
/// when the rule's params are unusable.
pub fn validate_generator(generator: &Generator) -> ServiceResult<()> {
    if generator.event_end < generator.event_start {
        return Err(ServiceError::ValidationError(
            "event_end must not be before event_start".to_string(),
        ));
    }

    if let Some(repeat_until) = generator.repeat_until {
        if generator.rule.is_none() {
            return Err(ServiceError::ValidationError(
                "repeat_until requires a rule".to_string(),
            ));
        }
        if repeat_until < generator.event_end {
            return Err(ServiceError::ValidationError(
                "repeat_until must not be before event_end".to_string(),
            ));
        }
    }

    if let Some(rule) = &generator.rule {
        if generator.duration() > rule.nominal_period() {
            return Err(ServiceError::ValidationError(format!(
                "a {} rule cannot repeat an occurrence longer than {} hours",
                rule.frequency,
                rule.nominal_period().num_hours()
            )));
        }
        rule.build_set(generator.event_start)?;
    }

    Ok(())
}
