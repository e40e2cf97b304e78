//! Urgency escalation and validation.
//!
//! Reconciles the generator's urgency with deterministic safety rules,
//! medical-history risk factors and the statistical classifier's
//! confidence. Rules live in an ordered table and run top to bottom; the
//! transcript is trusted over the model for critical symptoms.
//!
//! Urgency only ever moves up from the generator's value.

use super::dictionary::{fold_case, first_match, RiskCategory, CRITICAL_TERMS, RISK_FACTORS, WORSENING_TERMS};
use super::types::{Confidence, Flag, FlagTag, PatientHistory, Urgency, UrgencyDecision};

/// Knobs for behavior that is kept for compatibility but may be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EscalationPolicy {
    /// Treat the bare substring "red" in the transcript as a red flag.
    /// Matches inside words such as "tired" or "required".
    pub literal_red_match: bool,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            literal_red_match: true,
        }
    }
}

/// Everything the cascade looks at for one classification.
#[derive(Debug, Clone, Copy)]
pub struct EscalationInput<'a> {
    pub transcript: &'a str,
    pub urgency: Urgency,
    pub flags: &'a [Flag],
    pub history: Option<&'a PatientHistory>,
    pub ml_confidence: f32,
}

/// Derived boolean signals, computed once per classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub has_red_flag: bool,
    pub literal_red: bool,
    pub is_immunocompromised: bool,
    pub is_high_risk: bool,
    pub mentions_severe: bool,
    pub mentions_worsening: bool,
}

impl RiskSignals {
    pub fn assess(input: &EscalationInput<'_>, policy: EscalationPolicy) -> Self {
        let text = fold_case(input.transcript);
        let history = input
            .history
            .map(|h| h.medical_history_text())
            .unwrap_or_default();

        let mut is_immunocompromised = false;
        let mut is_high_risk = false;
        for (category, terms) in RISK_FACTORS {
            if first_match(&history, terms).is_none() {
                continue;
            }
            match category {
                RiskCategory::Immunocompromised => is_immunocompromised = true,
                c if c.is_high_risk() => is_high_risk = true,
                _ => {}
            }
        }

        Self {
            has_red_flag: input.flags.iter().any(|f| f.tag == FlagTag::RedFlag),
            literal_red: policy.literal_red_match && text.contains("red"),
            is_immunocompromised,
            is_high_risk,
            mentions_severe: text.contains("severe"),
            mentions_worsening: text.contains("worsening"),
        }
    }

    /// Number of independent risk signals used for reinforcement.
    fn reinforcement_count(&self) -> usize {
        [
            self.has_red_flag,
            self.is_immunocompromised,
            self.is_high_risk,
            self.mentions_severe,
            self.mentions_worsening,
        ]
        .iter()
        .filter(|s| **s)
        .count()
    }
}

/// Result of running the cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct EscalationOutcome {
    pub decision: UrgencyDecision,
    /// Ids of rules that fired, in evaluation order.
    pub fired_rules: Vec<&'static str>,
    pub signals: RiskSignals,
}

// ── Rule table ──────────────────────────────────────────────

/// Where a rule sits in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleStage {
    /// Overrides everything and stops evaluation.
    Veto,
    /// Mutually exclusive: the first matching rule of this stage wins.
    Escalation,
    /// Confidence adjustments, always evaluated.
    Adjustment,
}

/// What a matching rule does to the running decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleEffect {
    Continue(UrgencyDecision),
    Stop(UrgencyDecision),
}

struct RuleContext<'a> {
    text: String,
    ml_confidence: f32,
    signals: &'a RiskSignals,
}

struct EscalationRule {
    /// Stable identifier for the audit log.
    id: &'static str,
    stage: RuleStage,
    /// `None` when the rule does not apply.
    apply: fn(&RuleContext<'_>, UrgencyDecision) -> Option<RuleEffect>,
}

static RULES: &[EscalationRule] = &[
    EscalationRule {
        id: "ESC-001",
        stage: RuleStage::Veto,
        apply: critical_term_veto,
    },
    EscalationRule {
        id: "ESC-003",
        stage: RuleStage::Escalation,
        apply: red_flag_escalation,
    },
    EscalationRule {
        id: "ESC-004",
        stage: RuleStage::Escalation,
        apply: immunocompromised_escalation,
    },
    EscalationRule {
        id: "ESC-005",
        stage: RuleStage::Escalation,
        apply: high_risk_worsening_escalation,
    },
    EscalationRule {
        id: "ESC-006",
        stage: RuleStage::Adjustment,
        apply: low_confidence_dampening,
    },
    EscalationRule {
        id: "ESC-007",
        stage: RuleStage::Adjustment,
        apply: multi_signal_reinforcement,
    },
];

fn critical_term_veto(ctx: &RuleContext<'_>, _: UrgencyDecision) -> Option<RuleEffect> {
    first_match(&ctx.text, CRITICAL_TERMS)
        .map(|_| RuleEffect::Stop(UrgencyDecision::new(Urgency::Urgent, Confidence::High)))
}

fn red_flag_escalation(ctx: &RuleContext<'_>, _: UrgencyDecision) -> Option<RuleEffect> {
    (ctx.signals.has_red_flag || ctx.signals.literal_red)
        .then(|| RuleEffect::Continue(UrgencyDecision::new(Urgency::Urgent, Confidence::High)))
}

fn immunocompromised_escalation(ctx: &RuleContext<'_>, current: UrgencyDecision) -> Option<RuleEffect> {
    if !ctx.signals.is_immunocompromised {
        return None;
    }
    let next = match current.urgency {
        Urgency::Routine => UrgencyDecision::new(Urgency::SemiUrgent, Confidence::Medium),
        Urgency::SemiUrgent => current.with_confidence(Confidence::High),
        Urgency::Urgent => return None,
    };
    Some(RuleEffect::Continue(next))
}

fn high_risk_worsening_escalation(ctx: &RuleContext<'_>, current: UrgencyDecision) -> Option<RuleEffect> {
    let worsening = first_match(&ctx.text, WORSENING_TERMS).is_some();
    (ctx.signals.is_high_risk && worsening && current.urgency == Urgency::Routine)
        .then(|| RuleEffect::Continue(UrgencyDecision::new(Urgency::SemiUrgent, Confidence::Medium)))
}

fn low_confidence_dampening(ctx: &RuleContext<'_>, current: UrgencyDecision) -> Option<RuleEffect> {
    (ctx.ml_confidence < 0.6 && current.urgency > Urgency::Routine)
        .then(|| RuleEffect::Continue(current.with_confidence(Confidence::Medium)))
}

fn multi_signal_reinforcement(ctx: &RuleContext<'_>, current: UrgencyDecision) -> Option<RuleEffect> {
    (ctx.signals.reinforcement_count() >= 2)
        .then(|| RuleEffect::Continue(current.with_confidence(Confidence::High)))
}

// ── Evaluation ──────────────────────────────────────────────

/// Clamp a classifier probability into `[0, 1]`; NaN counts as zero.
pub fn normalize_ml_confidence(score: f32) -> f32 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}

/// Run the full cascade and report which rules fired.
pub fn evaluate(input: &EscalationInput<'_>, policy: EscalationPolicy) -> EscalationOutcome {
    let ml_confidence = normalize_ml_confidence(input.ml_confidence);
    let signals = RiskSignals::assess(input, policy);
    let ctx = RuleContext {
        text: fold_case(input.transcript),
        ml_confidence,
        signals: &signals,
    };

    let floor = input.urgency;
    let mut decision = UrgencyDecision::new(floor, Confidence::from_score(ml_confidence));
    let mut fired_rules = Vec::new();
    let mut escalation_taken = false;

    for rule in RULES {
        if rule.stage == RuleStage::Escalation && escalation_taken {
            continue;
        }
        let Some(effect) = (rule.apply)(&ctx, decision) else {
            continue;
        };
        if rule.stage == RuleStage::Escalation {
            escalation_taken = true;
        }

        let (next, stop) = match effect {
            RuleEffect::Continue(next) => (next, false),
            RuleEffect::Stop(next) => (next, true),
        };
        decision = UrgencyDecision::new(next.urgency.max(floor), next.confidence);
        fired_rules.push(rule.id);

        tracing::warn!(
            rule_id = rule.id,
            urgency = %decision.urgency,
            confidence = %decision.confidence,
            "Escalation rule fired"
        );

        if stop {
            break;
        }
    }

    tracing::debug!(
        generator_urgency = %floor,
        final_urgency = %decision.urgency,
        final_confidence = %decision.confidence,
        rules_fired = fired_rules.len(),
        "Escalation complete"
    );

    EscalationOutcome {
        decision,
        fired_rules,
        signals,
    }
}

/// Final decision with the given policy.
pub fn escalate(input: &EscalationInput<'_>, policy: EscalationPolicy) -> UrgencyDecision {
    evaluate(input, policy).decision
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn history(items: &[&str]) -> PatientHistory {
        PatientHistory {
            medical_history: items.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn input<'a>(
        transcript: &'a str,
        urgency: Urgency,
        flags: &'a [Flag],
        history: Option<&'a PatientHistory>,
        ml_confidence: f32,
    ) -> EscalationInput<'a> {
        EscalationInput {
            transcript,
            urgency,
            flags,
            history,
            ml_confidence,
        }
    }

    // ── Worked scenarios ───────────────────────────────────────

    #[test]
    fn critical_terms_override_routine_generator() {
        let outcome = evaluate(
            &input(
                "I can't breathe, my throat is swollen, I have a fever.",
                Urgency::Routine,
                &[],
                None,
                0.9,
            ),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.decision, UrgencyDecision::new(Urgency::Urgent, Confidence::High));
        assert_eq!(outcome.fired_rules, vec!["ESC-001"]);
    }

    #[test]
    fn hiv_history_lifts_routine_to_semi_urgent() {
        let h = history(&["HIV"]);
        let outcome = evaluate(
            &input("Mild sore throat for two days, a bit scratchy.", Urgency::Routine, &[], Some(&h), 0.7),
            EscalationPolicy::default(),
        );
        assert_eq!(
            outcome.decision,
            UrgencyDecision::new(Urgency::SemiUrgent, Confidence::Medium)
        );
        assert!(outcome.signals.is_immunocompromised);
        assert!(!outcome.signals.is_high_risk);
        assert_eq!(outcome.fired_rules, vec!["ESC-004"]);
    }

    #[test]
    fn low_classifier_confidence_dampens_urgent() {
        let outcome = evaluate(
            &input("Ear ache since Monday.", Urgency::Urgent, &[], None, 0.4),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.decision, UrgencyDecision::new(Urgency::Urgent, Confidence::Medium));
        assert_eq!(outcome.fired_rules, vec!["ESC-006"]);
    }

    // ── ESC-001 ────────────────────────────────────────────────

    #[test]
    fn veto_matches_curly_apostrophe() {
        let d = escalate(
            &input("I can\u{2019}t swallow anything", Urgency::Routine, &[], None, 0.1),
            EscalationPolicy::default(),
        );
        assert_eq!(d, UrgencyDecision::new(Urgency::Urgent, Confidence::High));
    }

    #[test]
    fn veto_stops_later_rules() {
        let h = history(&["HIV", "diabetes"]);
        let outcome = evaluate(
            &input("stridor at night", Urgency::Routine, &[], Some(&h), 0.1),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.fired_rules, vec!["ESC-001"]);
        assert_eq!(outcome.decision.confidence, Confidence::High);
    }

    // ── ESC-003 ────────────────────────────────────────────────

    #[test]
    fn red_flag_tag_escalates_to_urgent() {
        let flags = vec![Flag::new(FlagTag::RedFlag, "drooling")];
        let outcome = evaluate(
            &input("Some drooling today", Urgency::Routine, &flags, None, 0.9),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.decision, UrgencyDecision::new(Urgency::Urgent, Confidence::High));
        assert_eq!(outcome.fired_rules, vec!["ESC-003"]);
    }

    #[test]
    fn literal_red_substring_is_policy_controlled() {
        let transcript = "Ear feels blocked and I am tired";
        let on = escalate(
            &input(transcript, Urgency::Routine, &[], None, 0.9),
            EscalationPolicy::default(),
        );
        assert_eq!(on.urgency, Urgency::Urgent);

        let off = escalate(
            &input(transcript, Urgency::Routine, &[], None, 0.9),
            EscalationPolicy {
                literal_red_match: false,
            },
        );
        assert_eq!(off, UrgencyDecision::new(Urgency::Routine, Confidence::High));
    }

    #[test]
    fn red_flag_wins_over_immune_status() {
        let h = history(&["on chemo for lymphoma"]);
        let flags = vec![Flag::new(FlagTag::RedFlag, "neck swelling")];
        let outcome = evaluate(
            &input("Neck swelling since Sunday", Urgency::Routine, &flags, Some(&h), 0.9),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.fired_rules[0], "ESC-003");
        assert!(!outcome.fired_rules.contains(&"ESC-004"));
    }

    // ── ESC-004 ────────────────────────────────────────────────

    #[test]
    fn immune_status_raises_semi_urgent_confidence() {
        let h = history(&["Kidney transplant 2019"]);
        let d = escalate(
            &input("Sinus pain for a week", Urgency::SemiUrgent, &[], Some(&h), 0.65),
            EscalationPolicy::default(),
        );
        assert_eq!(d, UrgencyDecision::new(Urgency::SemiUrgent, Confidence::High));
    }

    #[test]
    fn immune_status_leaves_urgent_alone() {
        let h = history(&["HIV"]);
        let outcome = evaluate(
            &input("Sinus pain for a week", Urgency::Urgent, &[], Some(&h), 0.9),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.decision, UrgencyDecision::new(Urgency::Urgent, Confidence::High));
        assert!(outcome.fired_rules.is_empty());
        assert!(outcome.signals.is_immunocompromised);
    }

    #[test]
    fn immune_status_match_skips_worsening_rule() {
        let h = history(&["HIV", "asthma"]);
        let outcome = evaluate(
            &input("Cough getting worse", Urgency::Routine, &[], Some(&h), 0.7),
            EscalationPolicy::default(),
        );
        assert!(outcome.fired_rules.contains(&"ESC-004"));
        assert!(!outcome.fired_rules.contains(&"ESC-005"));
    }

    // ── ESC-005 ────────────────────────────────────────────────

    #[test]
    fn high_risk_with_worsening_trend_escalates() {
        let h = history(&["Type 2 Diabetes"]);
        let outcome = evaluate(
            &input("Ear pain is deteriorating", Urgency::Routine, &[], Some(&h), 0.7),
            EscalationPolicy::default(),
        );
        assert_eq!(
            outcome.decision,
            UrgencyDecision::new(Urgency::SemiUrgent, Confidence::Medium)
        );
        assert_eq!(outcome.fired_rules, vec!["ESC-005"]);
    }

    #[test]
    fn high_risk_without_trend_does_nothing() {
        let h = history(&["COPD"]);
        let outcome = evaluate(
            &input("Ear pain, stable", Urgency::Routine, &[], Some(&h), 0.85),
            EscalationPolicy::default(),
        );
        assert_eq!(outcome.decision, UrgencyDecision::new(Urgency::Routine, Confidence::High));
        assert!(outcome.fired_rules.is_empty());
    }

    // ── ESC-006 / ESC-007 ──────────────────────────────────────

    #[test]
    fn dampening_ignores_routine() {
        let d = escalate(
            &input("Mild ear itch", Urgency::Routine, &[], None, 0.2),
            EscalationPolicy::default(),
        );
        assert_eq!(d, UrgencyDecision::new(Urgency::Routine, Confidence::Low));
    }

    #[test]
    fn reinforcement_runs_after_dampening() {
        let h = history(&["heart failure"]);
        let outcome = evaluate(
            &input("Severe ear pain, worsening", Urgency::Routine, &[], Some(&h), 0.3),
            EscalationPolicy::default(),
        );
        // "severe ear pain" is not a critical term; "severe pain" is.
        assert_eq!(
            outcome.fired_rules,
            vec!["ESC-005", "ESC-006", "ESC-007"]
        );
        assert_eq!(
            outcome.decision,
            UrgencyDecision::new(Urgency::SemiUrgent, Confidence::High)
        );
    }

    #[test]
    fn starting_confidence_is_banded() {
        let d = |ml| {
            escalate(
                &input("Ear itch", Urgency::Routine, &[], None, ml),
                EscalationPolicy::default(),
            )
            .confidence
        };
        assert_eq!(d(0.95), Confidence::High);
        assert_eq!(d(0.8), Confidence::High);
        assert_eq!(d(0.6), Confidence::Medium);
        assert_eq!(d(0.59), Confidence::Low);
    }

    #[test]
    fn ml_confidence_is_clamped() {
        assert_eq!(normalize_ml_confidence(f32::NAN), 0.0);
        assert_eq!(normalize_ml_confidence(-2.0), 0.0);
        assert_eq!(normalize_ml_confidence(7.5), 1.0);
        assert_eq!(normalize_ml_confidence(0.42), 0.42);
    }

    #[test]
    fn nan_confidence_dampens_like_zero() {
        let d = escalate(
            &input("Ear itch", Urgency::SemiUrgent, &[], None, f32::NAN),
            EscalationPolicy::default(),
        );
        assert_eq!(d, UrgencyDecision::new(Urgency::SemiUrgent, Confidence::Medium));
    }

    #[test]
    fn missing_history_equals_empty_history() {
        let empty = PatientHistory::default();
        let a = evaluate(
            &input("Sore throat", Urgency::Routine, &[], None, 0.5),
            EscalationPolicy::default(),
        );
        let b = evaluate(
            &input("Sore throat", Urgency::Routine, &[], Some(&empty), 0.5),
            EscalationPolicy::default(),
        );
        assert_eq!(a, b);
    }

    // ── Properties ─────────────────────────────────────────────

    fn any_urgency() -> impl Strategy<Value = Urgency> {
        prop::sample::select(Urgency::ALL.to_vec())
    }

    fn any_flags() -> impl Strategy<Value = Vec<Flag>> {
        prop::collection::vec(
            (prop::sample::select(FlagTag::ALL.to_vec()), "[a-z ]{1,12}")
                .prop_map(|(tag, kw)| Flag::new(tag, kw)),
            0..4,
        )
    }

    fn any_history() -> impl Strategy<Value = Option<PatientHistory>> {
        prop::option::of(
            prop::collection::vec(
                prop::sample::select(vec![
                    "HIV", "diabetes", "asthma", "hypertension", "cancer", "none", "COPD",
                ]),
                0..3,
            )
            .prop_map(|items| history(&items)),
        )
    }

    proptest! {
        #[test]
        fn critical_term_always_vetoes(
            prefix in "[a-zA-Z ,.]{0,40}",
            suffix in "[a-zA-Z ,.]{0,40}",
            term in prop::sample::select(CRITICAL_TERMS.to_vec()),
            urgency in any_urgency(),
            flags in any_flags(),
            hist in any_history(),
            ml in prop::num::f32::ANY,
            literal_red_match in any::<bool>(),
        ) {
            let transcript = format!("{prefix} {} {suffix}", term.to_uppercase());
            let d = escalate(
                &input(&transcript, urgency, &flags, hist.as_ref(), ml),
                EscalationPolicy { literal_red_match },
            );
            prop_assert_eq!(d, UrgencyDecision::new(Urgency::Urgent, Confidence::High));
        }

        #[test]
        fn never_lowers_generator_urgency(
            transcript in ".{0,120}",
            urgency in any_urgency(),
            flags in any_flags(),
            hist in any_history(),
            ml in prop::num::f32::ANY,
            literal_red_match in any::<bool>(),
        ) {
            let d = escalate(
                &input(&transcript, urgency, &flags, hist.as_ref(), ml),
                EscalationPolicy { literal_red_match },
            );
            prop_assert!(d.urgency >= urgency);
        }

        #[test]
        fn evaluation_is_deterministic(
            transcript in ".{0,120}",
            urgency in any_urgency(),
            flags in any_flags(),
            hist in any_history(),
            ml in 0.0f32..=1.0,
        ) {
            let i = input(&transcript, urgency, &flags, hist.as_ref(), ml);
            prop_assert_eq!(
                evaluate(&i, EscalationPolicy::default()),
                evaluate(&i, EscalationPolicy::default())
            );
        }
    }
}
