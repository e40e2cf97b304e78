use super::dictionary::{fold_case, FLAG_DICTIONARY};
use super::types::{push_unique, Flag, FlagTag, Urgency};

/// Flag injected when the transcript matches nothing in the dictionary,
/// so the caller always has a human-readable reason.
pub fn synthetic_flag(urgency: Urgency) -> Flag {
    match urgency {
        Urgency::Urgent => Flag::new(FlagTag::RedFlag, "critical symptoms detected"),
        Urgency::SemiUrgent => Flag::new(FlagTag::Severity, "moderate severity"),
        Urgency::Routine => Flag::new(FlagTag::Severity, "mild symptoms"),
    }
}

/// Scan the transcript against the keyword dictionary.
///
/// Tags are visited in declared order and phrases in listed order; a
/// keyword already seen (case-insensitively) keeps its first tag. Never
/// returns an empty list.
pub fn extract_fallback_flags(transcript: &str, urgency: Urgency) -> Vec<Flag> {
    let text = fold_case(transcript);
    let mut flags = Vec::new();

    for (tag, phrases) in FLAG_DICTIONARY {
        for phrase in phrases.iter().filter(|p| text.contains(*p)) {
            push_unique(&mut flags, Flag::new(*tag, *phrase));
        }
    }

    if flags.is_empty() {
        flags.push(synthetic_flag(urgency));
    }

    tracing::debug!(
        flag_count = flags.len(),
        urgency = %urgency,
        "Fallback flags extracted from transcript"
    );
    flags
}

/// Parsed flags when the generator supplied any, otherwise dictionary flags.
pub fn resolve_flags(parsed: Vec<Flag>, transcript: &str, urgency: Urgency) -> Vec<Flag> {
    if !parsed.is_empty() {
        return parsed;
    }
    tracing::info!("Generator returned no flags, using keyword fallback");
    extract_fallback_flags(transcript, urgency)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn tags_keywords_found_in_transcript() {
        let flags = extract_fallback_flags(
            "Mild sore throat for 2 days, improving with warm tea.",
            Urgency::Routine,
        );
        assert!(flags.contains(&Flag::new(FlagTag::Symptom, "sore throat")));
        assert!(flags.contains(&Flag::new(FlagTag::Severity, "mild")));
        assert!(flags.contains(&Flag::new(FlagTag::Progression, "improving")));
        assert!(flags.contains(&Flag::new(FlagTag::Duration, "days")));
        assert!(flags.contains(&Flag::new(FlagTag::RelievingFactors, "warm tea")));
    }

    #[test]
    fn discovery_follows_dictionary_order() {
        let flags = extract_fallback_flags("I feel dizzy and have a sore throat", Urgency::Routine);
        let tags: Vec<FlagTag> = flags.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec![FlagTag::Symptom, FlagTag::AssociatedSymptoms]);
        assert_eq!(flags[0].keyword, "sore throat");
        assert_eq!(flags[1].keyword, "dizzy");
    }

    #[test]
    fn first_tag_wins_for_shared_keyword() {
        // "headache" is listed under both SYMPTOM and ASSOCIATED_SYMPTOMS.
        let flags = extract_fallback_flags("Bad HEADACHE since yesterday", Urgency::Routine);
        let headache: Vec<&Flag> = flags.iter().filter(|f| f.keyword == "headache").collect();
        assert_eq!(headache.len(), 1);
        assert_eq!(headache[0].tag, FlagTag::Symptom);
    }

    #[test]
    fn matching_ignores_case_and_curly_apostrophes() {
        let flags = extract_fallback_flags("I CAN\u{2019}T SWALLOW", Urgency::Urgent);
        assert_eq!(flags, vec![Flag::new(FlagTag::RedFlag, "can't swallow")]);
    }

    #[test]
    fn synthetic_flag_per_urgency_when_nothing_matches() {
        let transcript = "Calling about my appointment time.";
        assert_eq!(
            extract_fallback_flags(transcript, Urgency::Urgent),
            vec![Flag::new(FlagTag::RedFlag, "critical symptoms detected")]
        );
        assert_eq!(
            extract_fallback_flags(transcript, Urgency::SemiUrgent),
            vec![Flag::new(FlagTag::Severity, "moderate severity")]
        );
        assert_eq!(
            extract_fallback_flags(transcript, Urgency::Routine),
            vec![Flag::new(FlagTag::Severity, "mild symptoms")]
        );
    }

    #[test]
    fn empty_transcript_still_yields_one_flag() {
        assert_eq!(extract_fallback_flags("", Urgency::Routine).len(), 1);
    }

    #[test]
    fn resolve_keeps_parsed_flags() {
        let parsed = vec![Flag::new(FlagTag::Symptom, "ear pain")];
        let resolved = resolve_flags(parsed.clone(), "sore throat and fever", Urgency::Routine);
        assert_eq!(resolved, parsed);
    }

    #[test]
    fn resolve_falls_back_when_parsed_empty() {
        let resolved = resolve_flags(vec![], "runny nose", Urgency::Routine);
        assert_eq!(resolved, vec![Flag::new(FlagTag::Symptom, "runny nose")]);
    }

    fn any_urgency() -> impl Strategy<Value = Urgency> {
        prop::sample::select(Urgency::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn never_returns_duplicate_keywords(transcript in ".{0,200}", urgency in any_urgency()) {
            let flags = extract_fallback_flags(&transcript, urgency);
            let keys: HashSet<String> = flags.iter().map(Flag::dedup_key).collect();
            prop_assert_eq!(keys.len(), flags.len());
        }

        #[test]
        fn never_returns_empty(transcript in ".{0,200}", urgency in any_urgency()) {
            prop_assert!(!extract_fallback_flags(&transcript, urgency).is_empty());
        }

        #[test]
        fn dictionary_heavy_transcripts_stay_unique(
            words in prop::collection::vec(
                prop::sample::select(vec![
                    "sore throat", "Sore Throat", "fever", "FEVER", "headache",
                    "mild", "severe", "days", "warm tea", "dizzy", "worsening",
                ]),
                0..20,
            ),
            urgency in any_urgency(),
        ) {
            let transcript = words.join(" ");
            let flags = extract_fallback_flags(&transcript, urgency);
            let keys: HashSet<String> = flags.iter().map(Flag::dedup_key).collect();
            prop_assert_eq!(keys.len(), flags.len());
            prop_assert!(!flags.is_empty());
        }
    }
}
