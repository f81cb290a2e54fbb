use proptest::prelude::*;
use promptore::{
    classify,
    nlp::{
        markers::count_markers,
        prompts::generate,
        segment::{normalize, split_phrases},
    },
    ExtractionMode, ModelFamily,
};

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-záéñ]{1,8}",
        "[A-Z][a-z]{1,6}".prop_map(|name| format!("${name}$")),
        Just(".".to_string()),
        Just(",".to_string()),
    ]
}

proptest! {
    #[test]
    fn buckets_partition_phrases_by_marker_count(tokens in proptest::collection::vec(token(), 0..40)) {
        let text = normalize(&tokens.join(" "));
        let candidates = split_phrases(&text);
        let bucket = classify(&candidates);

        prop_assert_eq!(bucket.phrase_count(), candidates.len());
        let mut markers = 0;
        for (count, phrases) in bucket.iter() {
            for phrase in phrases {
                prop_assert_eq!(count_markers(phrase), count);
                markers += count;
            }
        }
        prop_assert_eq!(markers, count_markers(&text));
    }

    #[test]
    fn pair_prompts_name_both_entities_once_masked(
        a in "[A-Z][a-z]{2,8}",
        b in "[A-Z][a-z]{2,8}",
        filler in "[a-z ]{0,20}",
    ) {
        let bucket = classify([format!("${a}$ {filler} ${b}$")]);
        let set = generate(&bucket, ModelFamily::Bert, &ExtractionMode::Full).unwrap();
        prop_assert_eq!(set.len(), 6);
        for (_, prompts) in set.iter() {
            for prompt in prompts {
                prop_assert!(prompt.contains(&a));
                prop_assert!(prompt.contains(&b));
                prop_assert_eq!(prompt.matches("[MASK]").count(), 1);
            }
        }
    }

    #[test]
    fn special_tokens_in_text_leave_one_mask(
        words in proptest::collection::vec(
            prop_oneof!["[a-z]{1,6}", Just("<mask>".to_string()), Just("</s>".to_string())],
            0..12,
        ),
    ) {
        let filler = words.join(" ");
        let bucket = classify([format!("$Ana$ {filler} $Luis$ y $Pedro$")]);
        let set = generate(&bucket, ModelFamily::Roberta, &ExtractionMode::Full).unwrap();
        for prompt in set.flatten() {
            prop_assert_eq!(prompt.matches("<mask>").count(), 1);
            prop_assert!(prompt.ends_with(" </s>"));
            prop_assert_eq!(prompt.matches("</s>").count(), 1);
        }
    }
}
