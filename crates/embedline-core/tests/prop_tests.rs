use proptest::prelude::*;

use embedline_core::clean::{MAX_CLEAN_CHARS, clean_text};
use embedline_core::document::{Batch, Document};
use embedline_core::vector::EmbeddingVector;

/// Text mixing words, URLs, sigils and assorted whitespace.
fn tweetish() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            "[a-zA-Z0-9]{1,8}",
            Just("https://t.co/x1".to_string()),
            Just("http@://a.b".to_string()),
            Just("@".to_string()),
            Just("#".to_string()),
            Just(" ".to_string()),
            Just("\n\t".to_string()),
            Just("é".to_string()),
        ],
        0..40,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn clean_is_idempotent(text in tweetish()) {
        let once = clean_text(&text);
        prop_assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn clean_is_idempotent_on_arbitrary_strings(text in ".{0,300}") {
        let once = clean_text(&text);
        prop_assert_eq!(clean_text(&once), once);
    }

    #[test]
    fn clean_output_is_bounded_and_trimmed(text in ".{0,1500}") {
        let cleaned = clean_text(&text);
        prop_assert!(cleaned.chars().count() <= MAX_CLEAN_CHARS);
        prop_assert_eq!(cleaned.trim(), cleaned.as_str());
        prop_assert!(!cleaned.contains('@') && !cleaned.contains('#'));
        prop_assert!(!cleaned.contains("  "));
    }

    #[test]
    fn cleaned_batch_never_grows(texts in proptest::collection::vec(tweetish(), 0..20)) {
        let docs: Vec<Document> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| Document::new(i.to_string(), t.clone()))
            .collect();
        let n = docs.len();
        let cleaned = Batch::new(docs).cleaned();
        prop_assert!(cleaned.len() <= n);
        prop_assert!(cleaned.documents.iter().all(|d| !d.text.is_empty()));
    }

    #[test]
    fn normalized_vectors_have_unit_norm(
        v in proptest::collection::vec(-100.0f32..100.0f32, 1..64)
            .prop_filter("non-zero", |v| v.iter().any(|x| x.abs() > 1e-3))
    ) {
        let mut emb = EmbeddingVector::new(v);
        emb.normalize();
        prop_assert!((emb.norm() - 1.0).abs() < 1e-4, "norm was {}", emb.norm());
    }
}
