//! User-facing onboarding text, kept out of the state machine.

use crate::types::{Keyboard, buttons};

use super::state::OnboardingStep;

/// The question asked when a step begins.
pub fn for_step(step: OnboardingStep) -> &'static str {
    match step {
        OnboardingStep::Name => "Let's set up your profile. What's your name?",
        OnboardingStep::Age => "How old are you?",
        OnboardingStep::Photo => "Send a photo of yourself.",
        OnboardingStep::Gender => "What's your gender?",
        OnboardingStep::Bio => "Last one: write a short bio about yourself.",
        OnboardingStep::Complete => "Your profile is ready.",
    }
}

/// Keyboard shown alongside a step prompt, where one helps.
///
/// The first question clears any leftover reply keyboard; the gender
/// question shows the two-label chooser.
pub fn keyboard_for_step(step: OnboardingStep) -> Option<Keyboard> {
    match step {
        OnboardingStep::Name => Some(Keyboard::Remove),
        OnboardingStep::Gender => Some(Keyboard::GenderChoice),
        OnboardingStep::Complete => Some(Keyboard::Main),
        _ => None,
    }
}

/// Sent once the final field is accepted and the profile is stored.
pub fn profile_ready() -> String {
    format!(
        "Your profile is ready! Tap \"{}\" whenever you want to talk to someone.",
        buttons::FIND
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_step_has_a_prompt() {
        use OnboardingStep::*;
        for step in [Name, Age, Photo, Gender, Bio, Complete] {
            assert!(!for_step(step).is_empty());
        }
    }

    #[test]
    fn keyboards_where_expected() {
        assert_eq!(
            keyboard_for_step(OnboardingStep::Name),
            Some(Keyboard::Remove)
        );
        assert_eq!(
            keyboard_for_step(OnboardingStep::Gender),
            Some(Keyboard::GenderChoice)
        );
        assert_eq!(keyboard_for_step(OnboardingStep::Age), None);
        assert_eq!(keyboard_for_step(OnboardingStep::Bio), None);
    }
}
